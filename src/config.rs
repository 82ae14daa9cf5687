// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    common::i18n::I18nStore,
    db::{CustomerRepository, EquipmentRepository, TicketRepository, TrackingRepository, UserRepository},
    services::{
        auth::AuthService, CustomerService, DocumentService, EquipmentService, TicketService,
        TrackingService,
    },
};

const DEFAULT_DATABASE_URL: &str = "sqlite://asistencias.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// Configuración leída del entorno (.env incluido)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub seed_demo: bool,
    pub bcrypt_cost: u32,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "si" | "yes" | "on"),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET debe estar definido")?;
        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("BCRYPT_COST inválido: {}", raw))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            jwt_secret,
            bind_addr: var_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "static/uploads")),
            fonts_dir: PathBuf::from(var_or("FONTS_DIR", "fonts")),
            seed_demo: flag("SEED_DEMO", true),
            bcrypt_cost,
        })
    }
}

// El estado compartido por todos los handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub ticket_service: TicketService,
    pub equipment_service: EquipmentService,
    pub tracking_service: TrackingService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let db_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        tracing::info!("✅ Conexión con la base de datos establecida ({})", config.database_url);

        Self::from_pool(db_pool, config)
    }

    /// Arma el grafo de dependencias sobre un pool ya abierto.
    pub fn from_pool(db_pool: SqlitePool, config: AppConfig) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load()?);

        let user_repo = UserRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new();
        let ticket_repo = TicketRepository::new();
        let tracking_repo = TrackingRepository::new();

        let auth_service = AuthService::new(
            user_repo,
            config.jwt_secret.clone(),
            config.bcrypt_cost,
            db_pool.clone(),
        );
        let customer_service = CustomerService::new(customer_repo.clone());
        let ticket_service = TicketService::new(ticket_repo.clone(), customer_repo, tracking_repo.clone());
        let equipment_service = EquipmentService::new(EquipmentRepository::new(), config.upload_dir.clone());
        let tracking_service = TrackingService::new(tracking_repo);
        let document_service = DocumentService::new(ticket_repo, config.fonts_dir.clone());

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store,
            auth_service,
            customer_service,
            ticket_service,
            equipment_service,
            tracking_service,
            document_service,
        })
    }
}
