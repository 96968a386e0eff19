// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config;
use crate::logger;

/// Accept connections and hand each one to its own task.
///
/// Returns once the signal handler requests shutdown. Open connections keep
/// running in their tasks until they finish their current request; use
/// [`drain_connections`] to wait for them.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &signals);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = signals.shutdown.notified() => {
                if signals.is_shutdown_requested() {
                    break;
                }
            }
        }
    }

    drop(listener);
    logger::log_debug(&format!(
        "Listener closed, {} connection(s) still active",
        active_connections.load(Ordering::SeqCst)
    ));
}

/// Wait until no connection task is left, at most `grace`.
///
/// Returns false when connections were still open at the deadline.
pub async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) -> bool {
    let drained = async {
        while active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    tokio::time::timeout(grace, drained).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marketshare.json"), r#"{"A": 40, "B": 60}"#).unwrap();

        let mut cfg = Config::default();
        cfg.app.data_dir = dir.path().to_path_buf();
        cfg.logging.access_log = false;

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(config::AppState::new(cfg));
        let signals = Arc::new(SignalHandler::new());

        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::new(AtomicUsize::new(0)),
            Arc::clone(&signals),
        ));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/marketshare HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let raw = String::from_utf8(raw).unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.ends_with(r#"{"A":40,"B":60}"#), "{raw}");

        signals.request_shutdown("test");
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_open_connection_finishes_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marketshare.json"), r#"{"A": 40, "B": 60}"#).unwrap();

        let mut cfg = Config::default();
        cfg.app.data_dir = dir.path().to_path_buf();
        cfg.logging.access_log = false;

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(config::AppState::new(cfg));
        let signals = Arc::new(SignalHandler::new());
        let active = Arc::new(AtomicUsize::new(0));

        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::clone(&active),
            Arc::clone(&signals),
        ));

        // Keep-alive request, so only the shutdown closes the connection
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/marketshare HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while active.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        signals.request_shutdown("test");
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();

        let mut raw = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
            .await
            .unwrap()
            .unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.ends_with(r#"{"A":40,"B":60}"#), "{raw}");

        assert!(drain_connections(&active, Duration::from_secs(5)).await);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keep_alive_zero_closes_after_response() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marketshare.json"), r#"{"A": 40}"#).unwrap();

        let mut cfg = Config::default();
        cfg.app.data_dir = dir.path().to_path_buf();
        cfg.logging.access_log = false;
        cfg.performance.keep_alive_timeout = 0;

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let signals = Arc::new(SignalHandler::new());
        let server = tokio::spawn(start_server_loop(
            listener,
            Arc::new(config::AppState::new(cfg)),
            Arc::new(AtomicUsize::new(0)),
            Arc::clone(&signals),
        ));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/marketshare HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
            .await
            .unwrap()
            .unwrap();
        assert!(String::from_utf8(raw).unwrap().ends_with(r#"{"A":40}"#));

        signals.request_shutdown("test");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_times_out_with_stuck_connection() {
        let active = AtomicUsize::new(1);
        assert!(!drain_connections(&active, Duration::from_millis(100)).await);

        active.store(0, Ordering::SeqCst);
        assert!(drain_connections(&active, Duration::from_millis(100)).await);
    }
}
