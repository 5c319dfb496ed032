use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_fuel_ledger::config::{EnvironmentConfig, StoreBackend};
use fleet_fuel_ledger::database::DatabaseConnection;
use fleet_fuel_ledger::models::Vehicle;
use fleet_fuel_ledger::repositories::{
    InMemoryLedgerStore, InMemoryVehicleRegistry, LedgerStore, PgLedgerStore, VehicleRegistry,
    VehicleRepository,
};
use fleet_fuel_ledger::routes::build_router;
use fleet_fuel_ledger::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    info!("⛽ Fleet Fuel Ledger");
    info!("================================================");

    let config = EnvironmentConfig::from_env().context("configuración inválida")?;
    info!("🌍 Entorno: {}", config.environment);
    info!(
        "⚙️ Ledger: timeout {:?}, {} reintentos, política de viajes abiertos {:?}",
        config.ledger.store_timeout, config.ledger.max_append_retries, config.ledger.open_trip_policy
    );

    let (store, registry) = match open_backend(&config).await {
        Ok(backend) => backend,
        Err(e) => {
            error!("❌ Error inicializando el almacenamiento: {:#}", e);
            return Err(e);
        }
    };

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("dirección inválida {}", config.server_url()))?;
    let app = build_router(AppState::new(config, store, registry));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚗 Car entries:");
    info!("   POST /api/car-entry/start - Check-in");
    info!("   PUT  /api/car-entry/end - Check-out");
    info!("   POST /api/car-entry/fuel - Abastecimiento manual");
    info!("   GET  /api/car-entry - Listar viajes");
    info!("   GET  /api/car-entry/:entry_id - Obtener viaje");
    info!("   POST /api/car-entry/:entry_id/checkin/images - Adjuntar imágenes de check-in");
    info!("   POST /api/car-entry/:entry_id/checkout/images - Adjuntar imágenes de check-out");
    info!("   DELETE /api/car-entry/delete/:entry_id - Borrar viaje (admin)");
    info!("   POST /api/car-entry/reconcile - Reconciliar escrituras parciales (admin)");
    info!("⛽ Combustible:");
    info!("   GET  /api/vehicle/:vehicle_id/fuel - Saldo actual");
    info!("   GET  /api/vehicle/:vehicle_id/fuel/history - Historial");
    info!("   GET  /api/vehicle/:vehicle_id/fuel/verify - Verificar cadena (admin)");
    info!("📊 Estadísticas:");
    info!("   GET  /api/statistics - Estadísticas de flota (admin)");
    info!("   GET  /api/statistics/fleet - Instantánea de flota");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

async fn open_backend(
    config: &EnvironmentConfig,
) -> Result<(Arc<dyn LedgerStore>, Arc<dyn VehicleRegistry>)> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("DATABASE_URL es requerido con STORE_BACKEND=postgres")?;
            let connection = DatabaseConnection::connect(database).await?;
            connection.run_migrations().await?;

            let pool = connection.pool().clone();
            Ok((
                Arc::new(PgLedgerStore::new(pool.clone())),
                Arc::new(VehicleRepository::new(pool)),
            ))
        }
        StoreBackend::Memory => {
            warn!("🧪 Usando almacenamiento en memoria; los datos se pierden al reiniciar");
            let vehicles = match &config.memory_seed_vehicles {
                Some(path) => load_seed_vehicles(path).await?,
                None => Vec::new(),
            };
            info!("🚙 {} vehículos cargados en el registro en memoria", vehicles.len());

            Ok((
                Arc::new(InMemoryLedgerStore::new()),
                Arc::new(InMemoryVehicleRegistry::with_vehicles(vehicles)),
            ))
        }
    }
}

async fn load_seed_vehicles(path: &str) -> Result<Vec<Vehicle>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("no se pudo leer {}", path))?;
    let vehicles = serde_json::from_str(&raw).with_context(|| format!("JSON inválido en {}", path))?;
    Ok(vehicles)
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
