//! Dataset module
//!
//! File-backed data provider for the dashboard API. Each dataset is a static
//! JSON document under the data directory; the server never interprets its
//! shape, it only parses and re-serializes it.

mod error;

pub use error::DatasetError;

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// The datasets served under `/api/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    MarketShare,
    RevenueTrends,
    MarketSegment,
}

impl Dataset {
    pub const ALL: [Self; 3] = [Self::MarketShare, Self::RevenueTrends, Self::MarketSegment];

    /// Logical name, shared by the route and the file name
    pub const fn name(self) -> &'static str {
        match self {
            Self::MarketShare => "marketshare",
            Self::RevenueTrends => "revenuetrends",
            Self::MarketSegment => "marketsegment",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::MarketShare => "marketshare.json",
            Self::RevenueTrends => "revenuetrends.json",
            Self::MarketSegment => "marketsegment.json",
        }
    }

    pub const fn route(self) -> &'static str {
        match self {
            Self::MarketShare => "/api/marketshare",
            Self::RevenueTrends => "/api/revenuetrends",
            Self::MarketSegment => "/api/marketsegment",
        }
    }

    /// Static message placed in the `error` field of the failure envelope
    pub const fn error_message(self) -> &'static str {
        match self {
            Self::MarketShare => "Failed to load market share data",
            Self::RevenueTrends => "Failed to load revenue trends data",
            Self::MarketSegment => "Failed to load market segmentation data",
        }
    }

    /// Exact-match lookup of a request path
    pub fn from_route(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.route() == path)
    }
}

/// Reads datasets from a fixed base directory
#[derive(Debug, Clone)]
pub struct DatasetStore {
    data_dir: PathBuf,
}

impl DatasetStore {
    /// Relative directories are resolved against the working directory once, here
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        let data_dir = std::path::absolute(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_of(&self, dataset: Dataset) -> PathBuf {
        self.data_dir.join(dataset.file_name())
    }

    /// Read and parse a dataset. No retries, no fallback data.
    pub async fn load(&self, dataset: Dataset) -> Result<Value, DatasetError> {
        let path = self.path_of(dataset);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(source) => return Err(DatasetError::Read { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| DatasetError::Parse { path, source })
    }
}
