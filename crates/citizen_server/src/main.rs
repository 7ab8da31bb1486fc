use anyhow::{anyhow, Context, Result};
use citizen_core::db::open_db;
use citizen_core::{init_logging, PartyClient};
use citizen_server::{serve, AppState, ServerConfig, SharedResolver};
use log::info;
use std::sync::Arc;

fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;
    init_logging(&config.log_level, config.log_dir.as_deref())
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;

    // The blocking HTTP client owns its own runtime; build and drop it outside tokio.
    let party = Arc::new(PartyClient::new(config.party.clone()).context("invalid Party settings")?);
    let resolver: SharedResolver = party.clone();
    let state = AppState::new(conn, resolver, &config.default_municipality_id);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let served = runtime.block_on(serve(config.bind_addr, state));
    drop(runtime);
    drop(party);

    served.context("server terminated with an error")?;
    info!("event=app_stop module=api status=ok");
    Ok(())
}
