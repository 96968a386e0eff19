// Server module entry point
// Listener setup, connection handling, the accept loop and shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used types
pub use connection::connection_timeout;
pub use listener::create_listener;
pub use server_loop::{drain_connections, start_server_loop};
pub use signal::{start_signal_handler, SignalHandler};
