// src/db/equipment_repo.rs

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::{
    common::error::AppError,
    models::equipment::{Equipment, InstallationPhoto, ItemType, Tool, UsageRecord},
};

#[derive(Clone, Default)]
pub struct EquipmentRepository;

impl EquipmentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list_equipment<'e, E>(&self, executor: E) -> Result<Vec<Equipment>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, Equipment>(
            "SELECT id, nombre, tipo, descripcion FROM equipos ORDER BY nombre COLLATE NOCASE ASC",
        )
        .fetch_all(executor)
        .await?)
    }

    pub async fn list_tools<'e, E>(&self, executor: E) -> Result<Vec<Tool>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, Tool>(
            "SELECT id, nombre, tipo, imagen FROM herramientas ORDER BY nombre COLLATE NOCASE ASC",
        )
        .fetch_all(executor)
        .await?)
    }

    /// Últimos usos con el nombre del item resuelto según su tipo.
    pub async fn recent_usage<'e, E>(&self, executor: E, limit: i64) -> Result<Vec<UsageRecord>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, UsageRecord>(
            r#"
            SELECT u.id, u.item_type, u.item_id,
                   COALESCE(CASE u.item_type WHEN 'equipo' THEN e.nombre ELSE h.nombre END,
                            '(eliminado)') AS item_name,
                   u.tecnico, u.fecha, u.servicio
              FROM uso_items u
              LEFT JOIN equipos e ON u.item_type = 'equipo' AND e.id = u.item_id
              LEFT JOIN herramientas h ON u.item_type = 'herramienta' AND h.id = u.item_id
             ORDER BY datetime(u.fecha) DESC, u.id DESC
             LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?)
    }

    /// (equipos + herramientas)
    pub async fn count_items<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT (SELECT COUNT(*) FROM equipos) + (SELECT COUNT(*) FROM herramientas)",
        )
        .fetch_one(executor)
        .await?)
    }

    /// Items distintos usados en el día `day` (YYYY-MM-DD).
    pub async fn count_used_on<'e, E>(&self, executor: E, day: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM (SELECT DISTINCT item_type, item_id FROM uso_items WHERE fecha LIKE ?)",
        )
        .bind(format!("{}%", day))
        .fetch_one(executor)
        .await?)
    }

    pub async fn insert_equipment<'e, E>(
        &self,
        executor: E,
        name: &str,
        kind: &str,
        description: Option<&str>,
    ) -> Result<Equipment, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, Equipment>(
            "INSERT INTO equipos (nombre, tipo, descripcion) VALUES (?, ?, ?)
             RETURNING id, nombre, tipo, descripcion",
        )
        .bind(name)
        .bind(kind)
        .bind(description)
        .fetch_one(executor)
        .await?)
    }

    pub async fn insert_tool<'e, E>(&self, executor: E, name: &str, kind: Option<&str>) -> Result<Tool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, Tool>(
            "INSERT INTO herramientas (nombre, tipo) VALUES (?, ?) RETURNING id, nombre, tipo, imagen",
        )
        .bind(name)
        .bind(kind)
        .fetch_one(executor)
        .await?)
    }

    pub async fn equipment_exists(&self, conn: &mut SqliteConnection, id: i64) -> Result<bool, AppError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM equipos WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn find_tool<'e, E>(&self, executor: E, id: i64) -> Result<Option<Tool>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, Tool>("SELECT id, nombre, tipo, imagen FROM herramientas WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn insert_usage(
        &self,
        conn: &mut SqliteConnection,
        item_type: ItemType,
        item_id: i64,
        technician: &str,
        used_at: &str,
        service: Option<&str>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO uso_items (item_type, item_id, tecnico, fecha, servicio) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item_type)
        .bind(item_id)
        .bind(technician)
        .bind(used_at)
        .bind(service)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_tool_image<'e, E>(&self, executor: E, id: i64, image: &str) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE herramientas SET imagen = ? WHERE id = ?")
            .bind(image)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_installation_photo<'e, E>(
        &self,
        executor: E,
        ticket_id: Option<i64>,
        technician: &str,
        path: &str,
        description: Option<&str>,
        taken_at: &str,
    ) -> Result<InstallationPhoto, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, InstallationPhoto>(
            r#"
            INSERT INTO fotos_asistencia (asistencia_id, tecnico, ruta_foto, descripcion, fecha)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, asistencia_id, tecnico, ruta_foto, descripcion, fecha
            "#,
        )
        .bind(ticket_id)
        .bind(technician)
        .bind(path)
        .bind(description)
        .bind(taken_at)
        .fetch_one(executor)
        .await?)
    }
}
