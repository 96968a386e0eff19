use clap::Parser;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod config;
mod dataset;
mod handler;
mod http;
mod logger;
mod server;

/// Market dashboard: one HTML page and three read-only JSON datasets
#[derive(Parser, Debug)]
#[command(name = "market-dashboard", version, about)]
struct Cli {
    /// Configuration file (extension optional). Defaults to an optional config.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Development mode: reload the template on every request, debug logging
    #[arg(long)]
    debug: bool,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = match cli.config.as_deref() {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    }
    .with_overrides(cli.host, cli.port, cli.debug);
    logger::init(&cfg)?;

    // Tokio runtime, sized by server.workers when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let state = Arc::new(config::AppState::new(cfg));
    logger::log_server_start(&addr, &state.config, state.datasets.data_dir());
    for dataset in dataset::Dataset::ALL {
        let path = state.datasets.path_of(dataset);
        if !path.is_file() {
            logger::log_warning(&format!(
                "{} will fail until {} exists",
                dataset.route(),
                path.display()
            ));
        }
    }

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    let grace = server::connection_timeout(&state.config.performance);
    let active_connections = Arc::new(AtomicUsize::new(0));
    server::start_server_loop(listener, state, Arc::clone(&active_connections), signals).await;

    if !server::drain_connections(&active_connections, grace).await {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, closing",
            active_connections.load(Ordering::SeqCst),
            grace.as_secs()
        ));
    }
    Ok(())
}
