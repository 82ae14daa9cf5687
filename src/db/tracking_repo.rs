// src/db/tracking_repo.rs

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::{
    common::{
        db_utils::{insert_filtered, table_columns, SqlValue},
        error::AppError,
    },
    models::{
        ticket::TechnicianOption,
        tracking::{
            GpsPing, MapTicket, Technician, TechnicianLastPosition, TrackPoint, TECHNICIAN_COLUMNS,
        },
    },
};

// Técnicos, posiciones GPS y datos del mapa
#[derive(Clone, Default)]
pub struct TrackingRepository;

impl TrackingRepository {
    pub fn new() -> Self {
        Self
    }

    // --- Técnicos ---

    pub async fn list_technicians<'e, E>(&self, executor: E) -> Result<Vec<Technician>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM tecnicos ORDER BY nombre COLLATE NOCASE ASC", TECHNICIAN_COLUMNS);
        Ok(sqlx::query_as::<_, Technician>(&sql).fetch_all(executor).await?)
    }

    pub async fn find_technician<'e, E>(&self, executor: E, id: i64) -> Result<Option<Technician>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM tecnicos WHERE id = ?", TECHNICIAN_COLUMNS);
        Ok(sqlx::query_as::<_, Technician>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn active_technician_options<'e, E>(&self, executor: E) -> Result<Vec<TechnicianOption>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, TechnicianOption>(
            "SELECT id, nombre FROM tecnicos WHERE COALESCE(activo, 1) = 1 ORDER BY nombre COLLATE NOCASE ASC",
        )
        .fetch_all(executor)
        .await?)
    }

    pub async fn insert_technician(
        &self,
        conn: &mut SqliteConnection,
        fields: &[(&str, SqlValue)],
    ) -> Result<i64, AppError> {
        insert_filtered(conn, "tecnicos", fields)
            .await?
            .ok_or_else(|| anyhow::anyhow!("La tabla tecnicos no tiene columnas conocidas").into())
    }

    // --- Posiciones ---

    /// Registra el ping. `tecnico_pos` es de solo inserción.
    pub async fn insert_position(&self, conn: &mut SqliteConnection, ping: &GpsPing, ts: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO tecnico_pos (tecnico_id, lat, lng, ts) VALUES (?, ?, ?, ?)")
            .bind(ping.technician_id)
            .bind(ping.lat)
            .bind(ping.lng)
            .bind(ts)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn insert_track(&self, conn: &mut SqliteConnection, ping: &GpsPing, ts: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tecnico_tracks (tecnico_id, movil, lat, lng, accuracy, battery, source, ts)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ping.technician_id)
        .bind(ping.mobile_unit.as_deref())
        .bind(ping.lat)
        .bind(ping.lng)
        .bind(ping.accuracy)
        .bind(ping.battery)
        .bind(ping.source.as_deref())
        .bind(ts)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Actualiza la última posición del técnico si la tabla tiene esas columnas.
    pub async fn update_last_position(
        &self,
        conn: &mut SqliteConnection,
        ping: &GpsPing,
        ts: &str,
    ) -> Result<bool, AppError> {
        let columns = table_columns(&mut *conn, "tecnicos").await?;
        if !["lat", "lng", "pos_updated_at"].iter().all(|c| columns.contains(*c)) {
            return Ok(false);
        }

        sqlx::query("UPDATE tecnicos SET lat = ?, lng = ?, pos_updated_at = ? WHERE id = ?")
            .bind(ping.lat)
            .bind(ping.lng)
            .bind(ts)
            .bind(ping.technician_id)
            .execute(&mut *conn)
            .await?;
        Ok(true)
    }

    // --- Mapa ---

    /// Asistencias con coordenadas de los últimos `days` días.
    pub async fn map_tickets<'e, E>(&self, executor: E, days: i64) -> Result<Vec<MapTicket>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, MapTicket>(
            r#"
            SELECT a.id, a.cliente, a.direccion, a.tipo, a.prioridad, a.estado, a.programada_en,
                   a.lat, a.lng, COALESCE(t.nombre, a.tecnico) AS tecnico
              FROM asistencias a
              LEFT JOIN tecnicos t ON a.tecnico_id = t.id
             WHERE a.lat IS NOT NULL AND a.lng IS NOT NULL
               AND date(a.fecha) >= date('now', ?)
             ORDER BY datetime(a.fecha) DESC
            "#,
        )
        .bind(format!("-{} day", days))
        .fetch_all(executor)
        .await?)
    }

    /// Último punto de cada técnico.
    pub async fn latest_positions<'e, E>(&self, executor: E) -> Result<Vec<TechnicianLastPosition>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, TechnicianLastPosition>(
            r#"
            SELECT p.tecnico_id, t.nombre, p.lat, p.lng, p.ts
              FROM tecnico_pos p
              JOIN (SELECT tecnico_id, MAX(ts) AS max_ts FROM tecnico_pos GROUP BY tecnico_id) last
                ON last.tecnico_id = p.tecnico_id AND last.max_ts = p.ts
              LEFT JOIN tecnicos t ON t.id = p.tecnico_id
             GROUP BY p.tecnico_id
             ORDER BY t.nombre COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(executor)
        .await?)
    }

    /// Puntos entre dos días (inclusive), en orden cronológico.
    pub async fn trajectory<'e, E>(
        &self,
        executor: E,
        technician_id: i64,
        from: &str,
        to: &str,
    ) -> Result<Vec<TrackPoint>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, TrackPoint>(
            r#"
            SELECT lat, lng, ts
              FROM tecnico_pos
             WHERE tecnico_id = ? AND date(ts) BETWEEN date(?) AND date(?)
             ORDER BY ts ASC, id ASC
            "#,
        )
        .bind(technician_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?)
    }
}
