use std::process::ExitCode;

use dirhost::config::Config;
use dirhost::error::ServerError;
use dirhost::logger;
use dirhost::server::{shutdown_signal, Server};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cfg = Config::load()?;
    logger::init(&cfg.logging).map_err(ServerError::Logging)?;

    // Worker thread count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers.filter(|&n| n > 0) {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let server = Server::bind(cfg)?;

    // Only announce once the port is actually held
    logger::log_server_start(server.local_addr()?.port());

    server.run(shutdown_signal()).await
}
