//! Dashboard page module
//!
//! Serves the HTML shell on `/`. The page itself fetches the dataset
//! endpoints client-side, so rendering never touches the data directory.

use crate::config::AppConfig;
use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Copy of the dashboard compiled into the binary, used when the template file is unusable
const EMBEDDED_DASHBOARD: &str = include_str!("../../templates/index.html");

/// Source of the dashboard HTML
pub enum DashboardTemplate {
    /// Development mode: read the file on every request
    Reload(PathBuf),
    /// Production mode: content read once at startup
    Loaded(Arc<str>),
}

impl DashboardTemplate {
    pub fn from_config(app: &AppConfig) -> Self {
        if app.debug {
            return Self::Reload(app.template.clone());
        }

        let html = match std::fs::read_to_string(&app.template) {
            Ok(html) if !html.trim().is_empty() => html,
            Ok(_) => {
                logger::log_warning(&format!(
                    "Template '{}' is empty, using embedded dashboard",
                    app.template.display()
                ));
                EMBEDDED_DASHBOARD.to_string()
            }
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to load template '{}': {e}, using embedded dashboard",
                    app.template.display()
                ));
                EMBEDDED_DASHBOARD.to_string()
            }
        };
        Self::Loaded(html.into())
    }

    /// Current dashboard HTML, never empty
    pub async fn render(&self) -> String {
        match self {
            Self::Loaded(html) => html.to_string(),
            Self::Reload(path) => reload_template(path).await,
        }
    }
}

async fn reload_template(path: &Path) -> String {
    match fs::read_to_string(path).await {
        Ok(html) if !html.trim().is_empty() => html,
        Ok(_) => {
            logger::log_warning(&format!(
                "Template '{}' is empty, using embedded dashboard",
                path.display()
            ));
            EMBEDDED_DASHBOARD.to_string()
        }
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to reload template '{}': {e}, using embedded dashboard",
                path.display()
            ));
            EMBEDDED_DASHBOARD.to_string()
        }
    }
}

/// Serve the dashboard page
pub async fn serve_dashboard(
    ctx: &RequestContext<'_>,
    template: &DashboardTemplate,
) -> Response<Full<Bytes>> {
    let html = template.render().await;
    logger::log_debug(&format!("Rendered dashboard ({} bytes)", html.len()));
    http::build_html_response(html, ctx.is_head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_config(template: PathBuf, debug: bool) -> AppConfig {
        AppConfig {
            debug,
            template,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_embedded_dashboard_not_empty() {
        assert!(EMBEDDED_DASHBOARD.contains("<html"));
        assert!(EMBEDDED_DASHBOARD.contains("/api/marketshare"));
    }

    #[tokio::test]
    async fn test_production_reads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "<html>first</html>").unwrap();

        let template = DashboardTemplate::from_config(&app_config(path.clone(), false));
        std::fs::write(&path, "<html>second</html>").unwrap();

        assert_eq!(template.render().await, "<html>first</html>");
    }

    #[tokio::test]
    async fn test_debug_reloads_every_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "<html>first</html>").unwrap();

        let template = DashboardTemplate::from_config(&app_config(path.clone(), true));
        assert_eq!(template.render().await, "<html>first</html>");

        std::fs::write(&path, "<html>second</html>").unwrap();
        assert_eq!(template.render().await, "<html>second</html>");
    }

    #[tokio::test]
    async fn test_missing_template_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.html");

        for debug in [false, true] {
            let template = DashboardTemplate::from_config(&app_config(path.clone(), debug));
            assert_eq!(template.render().await, EMBEDDED_DASHBOARD);
        }
    }

    #[tokio::test]
    async fn test_empty_template_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "  \n").unwrap();

        let template = DashboardTemplate::from_config(&app_config(path, false));
        assert_eq!(template.render().await, EMBEDDED_DASHBOARD);
    }
}
