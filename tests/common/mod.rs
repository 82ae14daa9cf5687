// Utilidades compartidas por los tests de integración

use asistencias::db::schema::{run_migrations, MigrationOptions};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

pub const TEST_BCRYPT_COST: u32 = 4;

/// Base en memoria. Una sola conexión que no se recicla, así todos ven los mismos datos.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new().in_memory(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("pool en memoria")
}

pub fn options(seed_demo: bool) -> MigrationOptions {
    MigrationOptions { seed_demo, bcrypt_cost: TEST_BCRYPT_COST }
}

pub async fn migrated_pool(seed_demo: bool) -> SqlitePool {
    let pool = memory_pool().await;
    run_migrations(&pool, &options(seed_demo)).await.expect("migraciones");
    pool
}
