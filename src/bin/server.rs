//! Node process entry point: joins (or starts) a ring, registers with the
//! directory, and serves the combined gRPC surface until killed.

use clap::Parser;
use log::LevelFilter;

use mr_chord::cli::ServerCli;
use mr_chord::config::Config;
use mr_chord::runtime;

#[tokio::main]
async fn main() {
    let args = ServerCli::parse();
    simple_logger::SimpleLogger::new()
        .env()
        .with_level(if args.dev_mode { LevelFilter::Debug } else { LevelFilter::Info })
        .init()
        .unwrap();

    let mut config = Config::default();
    if let Some(path) = &args.config {
        config = config.with_ini_overrides(path);
    }
    config.dev_mode = config.dev_mode || args.dev_mode;

    let handles = match runtime::bootstrap(args.address.clone(), args.peer, config).await {
        Ok(handles) => handles,
        Err(e) => {
            log::error!("failed to join ring: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = runtime::serve(handles).await {
        log::error!("server terminated: {}", e);
        std::process::exit(1);
    }
}
