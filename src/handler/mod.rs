//! Request handler module
//!
//! Responsible for request routing dispatch and the handlers behind each route:
//! the dashboard page and the read-only dataset API.

pub mod api;
pub mod dashboard;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
