use shop_server::common::logger;
use shop_server::{Config, Server, ServerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; real deployments set the environment directly
    let _ = dotenv::dotenv();

    // Configuration first: missing payment credentials must fail startup
    let config = Config::from_env()?;
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    let _guard = logger::init_logger(
        if config.is_production() { "info" } else { "debug" },
        config.is_production(),
        log_dir.to_str(),
    )?;

    tracing::info!("Shop server starting...");

    let state = ServerState::initialize(&config).await?;
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
