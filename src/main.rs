use std::sync::Arc;

use anyhow::{Context as _, Result};
use dotenv::dotenv;

use xwordkit::cli::{Commands, Context};
use xwordkit::config::Config;
use xwordkit::swagent::{
    ServiceWorker,
    host::LoggingHost,
    http::HttpFetcher,
    runtime::spawn_agent,
};
use xwordkit::xwdb::{self, SqliteCacheStorage};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so it can set RUST_LOG too
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    // Initialize database
    let db = xwdb::connect(&config.db_path)
        .with_context(|| format!("Could not open database at {}", config.db_path))?;
    xwdb::initialize_db(&db)?;
    let storage = SqliteCacheStorage::open(&config.db_path)?;

    let worker = ServiceWorker::new(
        config.clone(),
        Arc::new(HttpFetcher::default()),
        Arc::new(storage),
        Arc::new(LoggingHost),
    );
    let state = worker.resume()?;
    log::debug!("Agent for {} starts {state:?}", config.cache_name());
    let agent = spawn_agent(Arc::clone(&worker));

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut ctx = Context { config, db, agent: agent.clone() };

    match Commands::run_command(&mut ctx, &args).await {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{output}"),
        Err(err) => {
            log::error!("Command failed: {err:#}");
            println!("Error: {err:#}");
        }
    }

    agent.shutdown().await?;
    Ok(())
}
