//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use crate::config::AppState;
use crate::dataset::Dataset;
use crate::handler::{api, dashboard};
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
}

/// Routes known to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Dashboard,
    Dataset(Dataset),
}

impl Route {
    fn resolve(path: &str) -> Option<Self> {
        if path == "/" {
            return Some(Self::Dashboard);
        }
        Dataset::from_route(path).map(Self::Dataset)
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, _body) = req.into_parts();
    logger::log_request(&parts.method, &parts.uri, parts.version);

    let mut response = route_request(&parts.method, parts.uri.path(), &state).await;
    http::apply_common_headers(&mut response, &state.config.http);
    Ok(response)
}

/// Route request based on path and method
async fn route_request(method: &Method, path: &str, state: &AppState) -> Response<Full<Bytes>> {
    // OPTIONS is answered for any path, like the default preflight handling
    if method == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors);
    }

    let Some(route) = Route::resolve(path) else {
        return http::build_404_response();
    };

    // Check HTTP method
    if let Some(resp) = check_http_method(method) {
        return resp;
    }

    let ctx = RequestContext {
        path,
        is_head: method == Method::HEAD,
    };

    match route {
        Route::Dashboard => dashboard::serve_dashboard(&ctx, &state.dashboard).await,
        Route::Dataset(dataset) => api::serve_dataset(&ctx, &state.datasets, dataset).await,
    }
}

/// Return 405 for anything other than GET/HEAD on a known route
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}
