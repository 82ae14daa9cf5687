//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use asistencias::{
    build_router,
    config::{AppConfig, AppState},
    db::schema::{run_migrations, MigrationOptions},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let migration_options = MigrationOptions {
        seed_demo: config.seed_demo,
        bcrypt_cost: config.bcrypt_cost,
    };
    let bind_addr = config.bind_addr.clone();

    let app_state = AppState::new(config).await?;

    // Pone el esquema al día antes de atender pedidos
    let report = run_migrations(&app_state.db_pool, &migration_options).await?;
    if report.is_noop() {
        tracing::info!("✅ Esquema al día, sin cambios");
    } else {
        tracing::info!(
            "✅ Migraciones aplicadas: {} columnas nuevas, {} estados normalizados, {} contraseñas migradas",
            report.columns_added.len(),
            report.statuses_normalized,
            report.passwords_migrated
        );
    }

    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escuchando en {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
