// src/db/schema.rs
//
// Evolución del esquema SQLite. Cada paso es idempotente: se puede correr
// contra una base vacía, contra una base vieja o dos veces seguidas.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::common::{
    db_utils::{ensure_ident, ensure_ident_list, has_column},
    error::AppError,
};
use crate::db::seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

/// Default de un ALTER TABLE. SQLite no acepta funciones como
/// `datetime('now')` ahí, así que solo hay constantes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    Text(&'static str),
    Integer(i64),
}

impl ColumnDefault {
    fn as_sql(&self) -> String {
        match self {
            ColumnDefault::Text(s) => format!("'{}'", s.replace('\'', "''")),
            ColumnDefault::Integer(i) => i.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub seed_demo: bool,
    pub bcrypt_cost: u32,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self { seed_demo: true, bcrypt_cost: bcrypt::DEFAULT_COST }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// "tabla.columna" agregadas en esta corrida
    pub columns_added: Vec<String>,
    pub indexes_ensured: usize,
    pub statuses_normalized: u64,
    pub admin_seeded: bool,
    pub passwords_migrated: u64,
    pub demo_rows_inserted: u64,
}

impl MigrationReport {
    /// `true` si la corrida no cambió nada.
    pub fn is_noop(&self) -> bool {
        self.columns_added.is_empty()
            && self.statuses_normalized == 0
            && !self.admin_seeded
            && self.passwords_migrated == 0
            && self.demo_rows_inserted == 0
    }
}

pub async fn ensure_table(conn: &mut SqliteConnection, create_sql: &str) -> Result<(), AppError> {
    sqlx::query(create_sql).execute(&mut *conn).await?;
    Ok(())
}

/// Agrega la columna si falta. Devuelve `true` si la agregó.
pub async fn add_column_if_missing(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    column_type: ColumnType,
    default: Option<ColumnDefault>,
) -> Result<bool, AppError> {
    let table = ensure_ident(table)?;
    let column = ensure_ident(column)?;

    if has_column(&mut *conn, table, column).await? {
        return Ok(false);
    }

    let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_type.as_sql());
    if let Some(default) = default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.as_sql());
    }
    sqlx::query(&sql).execute(&mut *conn).await?;

    tracing::debug!("➕ Columna {}.{} agregada", table, column);
    Ok(true)
}

/// Agrega una columna TEXT de timestamp y rellena las filas nulas con la hora actual.
pub async fn add_timestamp_column_and_backfill(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
) -> Result<bool, AppError> {
    let added = add_column_if_missing(conn, table, column, ColumnType::Text, None).await?;

    let sql = format!(
        "UPDATE {table} SET {column} = datetime('now') WHERE {column} IS NULL",
        table = table,
        column = column
    );
    sqlx::query(&sql).execute(&mut *conn).await?;

    Ok(added)
}

pub async fn ensure_index(
    conn: &mut SqliteConnection,
    name: &str,
    table: &str,
    columns: &str,
) -> Result<(), AppError> {
    let name = ensure_ident(name)?;
    let table = ensure_ident(table)?;
    let columns = ensure_ident_list(columns)?;

    let sql = format!("CREATE INDEX IF NOT EXISTS {} ON {} ({})", name, table, columns);
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

// --- Definiciones ---

const CREATE_TICKETS: &str = r#"
CREATE TABLE IF NOT EXISTS asistencias (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cliente TEXT,
    direccion TEXT,
    tipo TEXT,
    prioridad TEXT,
    tecnico TEXT,
    problema TEXT,
    fecha TEXT,
    pppoe TEXT
)"#;

const CREATE_EQUIPMENT: &str = r#"
CREATE TABLE IF NOT EXISTS equipos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL,
    tipo TEXT NOT NULL,
    descripcion TEXT
)"#;

const CREATE_TOOLS: &str = r#"
CREATE TABLE IF NOT EXISTS herramientas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL,
    tipo TEXT,
    imagen TEXT
)"#;

const CREATE_USAGE: &str = r#"
CREATE TABLE IF NOT EXISTS uso_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type TEXT NOT NULL,
    item_id INTEGER NOT NULL,
    tecnico TEXT NOT NULL,
    fecha TEXT NOT NULL,
    servicio TEXT
)"#;

const CREATE_INSTALLATION_PHOTOS: &str = r#"
CREATE TABLE IF NOT EXISTS fotos_asistencia (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asistencia_id INTEGER,
    tecnico TEXT,
    ruta_foto TEXT NOT NULL,
    descripcion TEXT,
    fecha TEXT
)"#;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS usuarios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    usuario TEXT UNIQUE NOT NULL,
    contrasena TEXT
)"#;

const CREATE_CUSTOMERS: &str = r#"
CREATE TABLE IF NOT EXISTS clientes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT,
    nombre      TEXT,
    referencia  TEXT,
    barrio      TEXT,
    telefono    TEXT,
    situacion   TEXT,
    exonerado   INTEGER DEFAULT 0,
    tipo        TEXT,
    valor       TEXT,
    tipo_valor  TEXT,
    vencimiento TEXT,
    cedula      TEXT,
    pppoe       TEXT,
    activo      INTEGER DEFAULT 1
)"#;

const CREATE_TECHNICIANS: &str = r#"
CREATE TABLE IF NOT EXISTS tecnicos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT,
    telefono TEXT,
    activo INTEGER DEFAULT 1
)"#;

const CREATE_TRACKS: &str = r#"
CREATE TABLE IF NOT EXISTS tecnico_tracks (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    tecnico_id INTEGER NOT NULL,
    movil      TEXT,
    lat        REAL NOT NULL,
    lng        REAL NOT NULL,
    accuracy   REAL,
    battery    REAL,
    source     TEXT,
    ts         TEXT NOT NULL
)"#;

const CREATE_POSITIONS: &str = r#"
CREATE TABLE IF NOT EXISTS tecnico_pos (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    tecnico_id INTEGER NOT NULL,
    lat        REAL NOT NULL,
    lng        REAL NOT NULL,
    ts         TEXT NOT NULL
)"#;

const CREATE_TICKET_PHOTOS: &str = r#"
CREATE TABLE IF NOT EXISTS ticket_fotos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL,
    archivo TEXT NOT NULL,
    created_at TEXT
)"#;

type ColumnSpec = (&'static str, ColumnType, Option<ColumnDefault>);

const TICKET_COLUMNS: &[ColumnSpec] = &[
    ("estado", ColumnType::Text, Some(ColumnDefault::Text("pendiente"))),
    ("lat", ColumnType::Real, None),
    ("lng", ColumnType::Real, None),
    ("cliente_id", ColumnType::Integer, None),
    ("cedula", ColumnType::Text, None),
    ("programada_en", ColumnType::Text, None),
    ("tecnico_id", ColumnType::Integer, None),
    ("canal", ColumnType::Text, Some(ColumnDefault::Text("web"))),
];

// Bases viejas crearon `herramientas` sin tipo
const TOOL_COLUMNS: &[ColumnSpec] = &[
    ("tipo", ColumnType::Text, None),
    ("imagen", ColumnType::Text, None),
];

const USER_COLUMNS: &[ColumnSpec] = &[
    ("password_hash", ColumnType::Text, None),
    ("email", ColumnType::Text, None),
    ("nombre", ColumnType::Text, None),
    ("rol", ColumnType::Text, Some(ColumnDefault::Text("operador"))),
    ("foto_url", ColumnType::Text, None),
    ("telefono", ColumnType::Text, None),
    ("area", ColumnType::Text, None),
    ("turno", ColumnType::Text, None),
    ("dark_mode", ColumnType::Integer, Some(ColumnDefault::Integer(0))),
    ("notifs", ColumnType::Integer, Some(ColumnDefault::Integer(1))),
];

// Una tabla `clientes` creada a mano puede no tener ninguna de estas
const CUSTOMER_COLUMNS: &[ColumnSpec] = &[
    ("external_id", ColumnType::Text, None),
    ("nombre", ColumnType::Text, None),
    ("referencia", ColumnType::Text, None),
    ("barrio", ColumnType::Text, None),
    ("telefono", ColumnType::Text, None),
    ("situacion", ColumnType::Text, None),
    ("exonerado", ColumnType::Integer, Some(ColumnDefault::Integer(0))),
    ("tipo", ColumnType::Text, None),
    ("valor", ColumnType::Text, None),
    ("tipo_valor", ColumnType::Text, None),
    ("vencimiento", ColumnType::Text, None),
    ("cedula", ColumnType::Text, None),
    ("pppoe", ColumnType::Text, None),
    ("activo", ColumnType::Integer, Some(ColumnDefault::Integer(1))),
];

const TECHNICIAN_COLUMNS: &[ColumnSpec] = &[
    ("telefono", ColumnType::Text, None),
    ("activo", ColumnType::Integer, Some(ColumnDefault::Integer(1))),
    ("telefono_whatsapp", ColumnType::Text, None),
    ("movil", ColumnType::Text, None),
    ("tracking_token", ColumnType::Text, None),
    ("lat", ColumnType::Real, None),
    ("lng", ColumnType::Real, None),
    ("pos_updated_at", ColumnType::Text, None),
];

const INDEXES: &[(&str, &str, &str)] = &[
    ("idx_asistencias_fecha", "asistencias", "fecha"),
    ("idx_asistencias_estado", "asistencias", "estado"),
    ("idx_asistencias_prog", "asistencias", "programada_en"),
    ("idx_asistencias_tecnico", "asistencias", "tecnico_id"),
    ("idx_clientes_external", "clientes", "external_id"),
    ("idx_clientes_tel", "clientes", "telefono"),
    ("idx_clientes_cedula", "clientes", "cedula"),
    ("idx_clientes_pppoe", "clientes", "pppoe"),
    ("idx_tracks_tecnico_ts", "tecnico_tracks", "tecnico_id, ts"),
    ("idx_tecnico_pos_tecnico_ts", "tecnico_pos", "tecnico_id, ts"),
    ("idx_uso_items_fecha", "uso_items", "fecha"),
];

async fn add_columns(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[ColumnSpec],
    report: &mut MigrationReport,
) -> Result<(), AppError> {
    for (name, column_type, default) in columns {
        if add_column_if_missing(conn, table, name, *column_type, *default).await? {
            report.columns_added.push(format!("{}.{}", table, name));
        }
    }
    Ok(())
}

async fn normalize_ticket_fields(conn: &mut SqliteConnection) -> Result<u64, AppError> {
    // Estados sucios o sinónimos del panel viejo ("Cerrado", "En proceso") -> valor canónico.
    // Solo lo que no se reconoce termina en pendiente.
    let normalized = sqlx::query(
        r#"
        UPDATE asistencias SET estado = CASE
            WHEN LOWER(TRIM(estado)) IN ('pendiente', 'en_progreso', 'resuelto', 'cancelado')
                THEN LOWER(TRIM(estado))
            WHEN LOWER(TRIM(estado)) IN ('cerrado', 'cerrada', 'resuelta', 'terminado', 'terminada',
                                         'finalizado', 'finalizada', 'completado', 'completada', 'hecho')
                THEN 'resuelto'
            WHEN LOWER(TRIM(estado)) IN ('en progreso', 'en proceso', 'en curso', 'en_proceso', 'proceso')
                THEN 'en_progreso'
            WHEN LOWER(TRIM(estado)) IN ('cancelada', 'anulado', 'anulada')
                THEN 'cancelado'
            ELSE 'pendiente'
        END
         WHERE estado IS NULL
            OR estado NOT IN ('pendiente', 'en_progreso', 'resuelto', 'cancelado')
        "#,
    )
    .execute(&mut *conn)
    .await?
    .rows_affected();

    sqlx::query("UPDATE asistencias SET canal = 'web' WHERE canal IS NULL OR TRIM(canal) = ''")
        .execute(&mut *conn)
        .await?;

    Ok(normalized)
}

/// Lleva el esquema a la versión actual y carga los datos iniciales.
/// Todo corre en una sola transacción.
pub async fn run_migrations(
    pool: &SqlitePool,
    options: &MigrationOptions,
) -> Result<MigrationReport, AppError> {
    let mut report = MigrationReport::default();
    let mut tx = pool.begin().await?;

    // 1. Asistencias
    ensure_table(&mut *tx, CREATE_TICKETS).await?;
    add_columns(&mut *tx, "asistencias", TICKET_COLUMNS, &mut report).await?;
    report.statuses_normalized = normalize_ticket_fields(&mut *tx).await?;

    // 2. Equipos, herramientas, uso y fotos
    ensure_table(&mut *tx, CREATE_EQUIPMENT).await?;
    ensure_table(&mut *tx, CREATE_TOOLS).await?;
    add_columns(&mut *tx, "herramientas", TOOL_COLUMNS, &mut report).await?;
    ensure_table(&mut *tx, CREATE_USAGE).await?;
    ensure_table(&mut *tx, CREATE_INSTALLATION_PHOTOS).await?;

    // 3. Usuarios
    ensure_table(&mut *tx, CREATE_USERS).await?;
    add_columns(&mut *tx, "usuarios", USER_COLUMNS, &mut report).await?;
    for column in ["created_at", "updated_at"] {
        if add_timestamp_column_and_backfill(&mut *tx, "usuarios", column).await? {
            report.columns_added.push(format!("usuarios.{}", column));
        }
    }

    report.admin_seeded = seed::seed_admin(&mut *tx, options.bcrypt_cost).await?;
    report.passwords_migrated = seed::migrate_passwords_to_hash(&mut *tx, options.bcrypt_cost).await?;

    // 4. Clientes
    ensure_table(&mut *tx, CREATE_CUSTOMERS).await?;
    add_columns(&mut *tx, "clientes", CUSTOMER_COLUMNS, &mut report).await?;

    // 5. Técnicos y tracking
    ensure_table(&mut *tx, CREATE_TECHNICIANS).await?;
    add_columns(&mut *tx, "tecnicos", TECHNICIAN_COLUMNS, &mut report).await?;
    ensure_table(&mut *tx, CREATE_TRACKS).await?;
    ensure_table(&mut *tx, CREATE_POSITIONS).await?;

    // 6. Fotos de tickets
    ensure_table(&mut *tx, CREATE_TICKET_PHOTOS).await?;
    if add_timestamp_column_and_backfill(&mut *tx, "ticket_fotos", "created_at").await? {
        report.columns_added.push("ticket_fotos.created_at".to_string());
    }

    // 7. Índices
    for (name, table, columns) in INDEXES {
        ensure_index(&mut *tx, name, table, columns).await?;
        report.indexes_ensured += 1;
    }

    // 8. Datos de demo
    if options.seed_demo {
        report.demo_rows_inserted += seed::seed_demo_items(&mut *tx).await?;
        report.demo_rows_inserted += seed::seed_demo_map(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::info!(
        "✅ Esquema verificado: {} columnas nuevas, {} índices, {} contraseñas migradas",
        report.columns_added.len(),
        report.indexes_ensured,
        report.passwords_migrated
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_defaults_are_quoted_constants() {
        assert_eq!(ColumnDefault::Text("pendiente").as_sql(), "'pendiente'");
        assert_eq!(ColumnDefault::Text("o'neil").as_sql(), "'o''neil'");
        assert_eq!(ColumnDefault::Integer(1).as_sql(), "1");
    }

    #[test]
    fn empty_report_is_noop() {
        let report = MigrationReport { indexes_ensured: 11, ..Default::default() };
        assert!(report.is_noop());
    }
}
