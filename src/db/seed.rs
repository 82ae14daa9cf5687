// src/db/seed.rs
//
// Datos iniciales. Cada función solo inserta cuando la tabla (o la fila) falta.

use sqlx::SqliteConnection;

use crate::common::{
    db_utils::{has_column, insert_filtered, now_timestamp, SqlValue},
    error::AppError,
};
use crate::services::auth::hash_password;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "fibra123";

const DEMO_EQUIPMENT: [(&str, &str, &str); 4] = [
    ("Router 5G", "Red", "Router de alta velocidad 5G"),
    ("ONU", "Red", "Unidad de red óptica"),
    ("Puntero por cantidad", "Herramienta", "Puntero para señal por cantidad"),
    ("Drop por metro", "Cableado", "Cable drop vendido por metro"),
];

const DEMO_TOOLS: [(&str, &str, &str); 3] = [
    ("Crimpadora", "Herramienta de red", "crimpadora.jpg"),
    ("Tester", "Medidor de señal", "tester.jpg"),
    ("Taladro", "Herramienta eléctrica", "taladro.jpg"),
];

const DEMO_POSITIONS: [(f64, f64); 3] = [(-25.286, -57.645), (-25.290, -57.640), (-25.295, -57.635)];

async fn count(conn: &mut SqliteConnection, table: &'static str) -> Result<i64, AppError> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *conn).await?)
}

/// Crea `admin` / `fibra123` si no hay ningún usuario.
pub async fn seed_admin(conn: &mut SqliteConnection, bcrypt_cost: u32) -> Result<bool, AppError> {
    if count(conn, "usuarios").await? > 0 {
        tracing::info!("ℹ️ Ya existe al menos un usuario, no se crea el admin");
        return Ok(false);
    }

    if has_column(&mut *conn, "usuarios", "password_hash").await? {
        let password_hash = hash_password(ADMIN_PASSWORD.to_string(), bcrypt_cost).await?;
        let now = now_timestamp();
        insert_filtered(
            conn,
            "usuarios",
            &[
                ("usuario", ADMIN_USERNAME.into()),
                ("password_hash", password_hash.into()),
                ("email", SqlValue::Null),
                ("nombre", "Administrador".into()),
                ("rol", "admin".into()),
                ("foto_url", SqlValue::Null),
                ("created_at", now.clone().into()),
                ("updated_at", now.into()),
            ],
        )
        .await?;
    } else {
        sqlx::query("INSERT INTO usuarios (usuario, contrasena) VALUES (?, ?)")
            .bind(ADMIN_USERNAME)
            .bind(ADMIN_PASSWORD)
            .execute(&mut *conn)
            .await?;
    }

    tracing::info!("✅ Usuario admin creado (usuario: {})", ADMIN_USERNAME);
    Ok(true)
}

/// Pasa a bcrypt toda contraseña en texto plano que todavía no tenga hash.
pub async fn migrate_passwords_to_hash(
    conn: &mut SqliteConnection,
    bcrypt_cost: u32,
) -> Result<u64, AppError> {
    if !has_column(&mut *conn, "usuarios", "password_hash").await? {
        return Ok(0);
    }

    let pending = sqlx::query_as::<_, (i64, String)>(
        r#"
        SELECT id, contrasena FROM usuarios
         WHERE (password_hash IS NULL OR TRIM(password_hash) = '')
           AND contrasena IS NOT NULL AND TRIM(contrasena) <> ''
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut migrated = 0;
    for (id, plain) in pending {
        let password_hash = hash_password(plain, bcrypt_cost).await?;
        sqlx::query(
            "UPDATE usuarios SET password_hash = ?, contrasena = '', updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *conn)
        .await?;
        migrated += 1;
    }

    if migrated > 0 {
        tracing::info!("🔐 Migradas {} contraseñas a password_hash", migrated);
    }
    Ok(migrated)
}

/// Equipos y herramientas de ejemplo, cada tabla solo si está vacía.
pub async fn seed_demo_items(conn: &mut SqliteConnection) -> Result<u64, AppError> {
    let mut inserted = 0;

    if count(conn, "equipos").await? == 0 {
        for (name, kind, description) in DEMO_EQUIPMENT {
            sqlx::query("INSERT INTO equipos (nombre, tipo, descripcion) VALUES (?, ?, ?)")
                .bind(name)
                .bind(kind)
                .bind(description)
                .execute(&mut *conn)
                .await?;
            inserted += 1;
        }
    }

    if count(conn, "herramientas").await? == 0 {
        for (name, kind, image) in DEMO_TOOLS {
            sqlx::query("INSERT INTO herramientas (nombre, tipo, imagen) VALUES (?, ?, ?)")
                .bind(name)
                .bind(kind)
                .bind(image)
                .execute(&mut *conn)
                .await?;
            inserted += 1;
        }
    }

    if inserted > 0 {
        tracing::info!("✅ Insertados {} equipos/herramientas de prueba", inserted);
    }
    Ok(inserted)
}

/// Técnico, posiciones, cliente y asistencia de demo para que el mapa muestre algo.
pub async fn seed_demo_map(conn: &mut SqliteConnection) -> Result<u64, AppError> {
    let mut inserted = 0;
    let now = now_timestamp();

    // 1. Técnico
    let technician_id = match sqlx::query_scalar::<_, i64>("SELECT id FROM tecnicos LIMIT 1")
        .fetch_optional(&mut *conn)
        .await?
    {
        Some(id) => id,
        None => {
            sqlx::query("INSERT INTO tecnicos (id, nombre, activo) VALUES (1, 'Juan', 1)")
                .execute(&mut *conn)
                .await?;
            inserted += 1;
            1
        }
    };

    // 2. Posiciones
    if count(conn, "tecnico_pos").await? == 0 {
        for (lat, lng) in DEMO_POSITIONS {
            sqlx::query("INSERT INTO tecnico_pos (tecnico_id, lat, lng, ts) VALUES (?, ?, ?, ?)")
                .bind(technician_id)
                .bind(lat)
                .bind(lng)
                .bind(&now)
                .execute(&mut *conn)
                .await?;
            inserted += 1;
        }
    }

    // 3. Cliente
    let demo_customer = sqlx::query_scalar::<_, i64>("SELECT id FROM clientes WHERE nombre = 'Cliente Demo'")
        .fetch_optional(&mut *conn)
        .await?;
    if demo_customer.is_none() {
        sqlx::query(
            "INSERT INTO clientes (nombre, telefono, situacion, activo)
             VALUES ('Cliente Demo', '0981111111', 'activo', 1)",
        )
        .execute(&mut *conn)
        .await?;
        inserted += 1;
    }

    // 4. Asistencia con coordenadas
    if count(conn, "asistencias").await? == 0 {
        sqlx::query(
            r#"
            INSERT INTO asistencias
                (cliente, direccion, tipo, prioridad, tecnico, problema, fecha, pppoe, lat, lng, estado, canal)
            VALUES
                ('Cliente Demo', 'Centro Asunción', 'Soporte', 'Media', 'Juan', 'Problema de prueba',
                 ?, 'cliente@spynet.com', -25.286, -57.645, 'pendiente', 'web')
            "#,
        )
        .bind(&now)
        .execute(&mut *conn)
        .await?;
        inserted += 1;
    }

    if inserted > 0 {
        tracing::info!("✅ Datos de demo del mapa cargados ({} filas)", inserted);
    }
    Ok(inserted)
}
