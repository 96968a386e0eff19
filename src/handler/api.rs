//! Dataset API module
//!
//! Turns a dataset load into a JSON response: the document verbatim on
//! success, the error envelope with status 500 on any failure.

use crate::dataset::{Dataset, DatasetError, DatasetStore};
use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Body returned when a dataset cannot be served
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub details: String,
}

impl ErrorEnvelope {
    pub fn new(dataset: Dataset, err: &DatasetError) -> Self {
        Self {
            error: dataset.error_message(),
            details: err.to_string(),
        }
    }
}

/// Serve one dataset as JSON
pub async fn serve_dataset(
    ctx: &RequestContext<'_>,
    store: &DatasetStore,
    dataset: Dataset,
) -> Response<Full<Bytes>> {
    logger::log_debug(&format!(
        "{} -> {}",
        ctx.path,
        store.path_of(dataset).display()
    ));
    match store.load(dataset).await {
        Ok(document) => http::build_json_response(StatusCode::OK, &document, ctx.is_head),
        Err(err) => {
            logger::log_dataset_error(dataset.name(), &err);
            http::build_json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorEnvelope::new(dataset, &err),
                ctx.is_head,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let err = DatasetError::Read {
            path: "/srv/data/marketsegment.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        };
        let envelope = ErrorEnvelope::new(Dataset::MarketSegment, &err);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "error": "Failed to load market segmentation data",
                "details": "No such file or directory: '/srv/data/marketsegment.json'"
            })
        );
    }
}
