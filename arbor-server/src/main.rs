use arbor_server::config::{CliArgs, ServerConfig};
use arbor_server::server::TreeServer;
use arbor_server::transport::NdjsonTransport;
use clap::Parser;

fn main() {
    let args = CliArgs::parse();

    // stdout carries protocol traffic only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut server = TreeServer::new(NdjsonTransport::new(), ServerConfig::from(&args));

    tracing::info!(base = %args.base, strict_rename = args.strict_rename, "arbor-server ready");

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
