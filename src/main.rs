use std::sync::Arc;

use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smart_home_energy::{
    api::{self, AppState},
    clock::{Clock, SystemClock},
    config::Config,
    db::{self, PgStore},
    devices::DeviceService,
    energy::PowerModel,
    statistics::StatisticsService,
    store::{DeviceStore, MemoryStore, SnapshotStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent — env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let (devices, snapshots) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            info!("Database ready");
            shared(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; device state is kept in memory only");
            shared(MemoryStore::new())
        }
    };

    let model = Arc::new(PowerModel::new(config.power_model()));
    let model_config = model.config();
    info!(
        default_base_power = model_config.default_base_power,
        thermostat_setpoint = model_config.thermostat_setpoint,
        thermostat_deviation_scale = model_config.thermostat_deviation_scale,
        "Power model ready"
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let devices = DeviceService::new(devices, model, clock);
    let statistics = StatisticsService::new(devices.clone(), snapshots, config.stats_interval_secs);
    tokio::spawn(statistics.clone().run());

    let state = AppState { devices, statistics };

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Hands the same store out behind both storage traits.
fn shared<S>(store: S) -> (Arc<dyn DeviceStore>, Arc<dyn SnapshotStore>)
where
    S: DeviceStore + SnapshotStore + Clone + 'static,
{
    let devices: Arc<dyn DeviceStore> = Arc::new(store.clone());
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(store);
    (devices, snapshots)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
