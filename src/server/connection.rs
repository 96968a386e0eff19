// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use super::signal::SignalHandler;
use crate::config;
use crate::handler;
use crate::logger::{self, AccessLogEntry};

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `signals` - Shutdown state; the connection closes after its current request once set
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<config::AppState>,
    conn_counter: &Arc<AtomicUsize>,
    signals: &SignalHandler,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        signals.subscribe(),
    );
}

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 connection settings (keep-alive)
/// 3. Serves the connection with the request handler
/// 4. Switches to graceful shutdown when the server starts draining
/// 5. Applies timeout to the connection
/// 6. Decrements connection counter when done
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<config::AppState>,
    conn_counter: Arc<AtomicUsize>,
    draining: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let timeout_duration = connection_timeout(performance);

        // keep_alive_timeout is a switch: 0 closes after one response, idle
        // keep-alive connections are bounded by the connection timeout
        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| serve_logged(req, peer_addr, Arc::clone(&service_state))),
        );
        let mut conn = std::pin::pin!(conn);

        let served = async {
            tokio::select! {
                result = conn.as_mut() => result,
                () = drain_requested(draining) => {
                    // Finish the request in progress, then close
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            }
        };

        // Apply timeout and handle result
        match tokio::time::timeout(timeout_duration, served).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Upper bound on the lifetime of one connection
#[must_use]
pub fn connection_timeout(performance: &config::PerformanceConfig) -> Duration {
    Duration::from_secs(std::cmp::max(
        performance.read_timeout,
        performance.write_timeout,
    ))
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn drain_requested(mut draining: watch::Receiver<bool>) {
    if draining.wait_for(|d| *d).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run the router and emit one access log line for the exchange
async fn serve_logged<B>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: Arc<config::AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let logging = &state.config.logging;
    if !logging.access_log {
        return handler::handle_request(req, Arc::clone(&state)).await;
    }

    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);
    let response = handler::handle_request(req, Arc::clone(&state)).await?;

    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &logging.access_log_format);

    Ok(response)
}

/// Capture the request side of an access log entry
fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_entry_from_request() {
        let req = Request::builder()
            .method("GET")
            .uri("/api/revenuetrends?range=q1")
            .header(USER_AGENT, "curl/8.5.0")
            .body(())
            .unwrap();
        let entry = access_entry(&req, "10.0.0.7:51234".parse().unwrap());

        assert_eq!(entry.remote_addr, "10.0.0.7");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/api/revenuetrends");
        assert_eq!(entry.query.as_deref(), Some("range=q1"));
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.5.0"));
        assert!(entry.referer.is_none());
    }
}
