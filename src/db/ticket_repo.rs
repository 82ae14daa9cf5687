// src/db/ticket_repo.rs

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::{
    common::{
        db_utils::{insert_filtered, SqlValue},
        error::AppError,
    },
    models::{
        agenda::AgendaEvent,
        ticket::{Ticket, TicketStatus, TICKET_COLUMNS},
    },
};

#[derive(Clone, Default)]
pub struct TicketRepository;

/// Filtros opcionales de la agenda.
#[derive(Debug, Default)]
pub struct AgendaFilter {
    pub status: Option<TicketStatus>,
    pub technician_id: Option<i64>,
}

impl TicketRepository {
    pub fn new() -> Self {
        Self
    }

    /// Todas las asistencias, la más nueva primero.
    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<Ticket>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {} FROM asistencias ORDER BY datetime(fecha) DESC, id DESC",
            TICKET_COLUMNS
        );
        Ok(sqlx::query_as::<_, Ticket>(&sql).fetch_all(executor).await?)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM asistencias WHERE id = ?", TICKET_COLUMNS);
        Ok(sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        fields: &[(&str, SqlValue)],
    ) -> Result<i64, AppError> {
        insert_filtered(conn, "asistencias", fields)
            .await?
            .ok_or_else(|| anyhow::anyhow!("La tabla asistencias no tiene columnas conocidas").into())
    }

    pub async fn set_schedule<'e, E>(
        &self,
        executor: E,
        id: i64,
        scheduled_at: Option<&str>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE asistencias SET programada_en = ? WHERE id = ?")
            .bind(scheduled_at)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: i64, status: TicketStatus) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE asistencias SET estado = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Asigna (o quita, con `None`) el técnico. El nombre libre se copia del técnico.
    pub async fn set_technician<'e, E>(
        &self,
        executor: E,
        id: i64,
        technician_id: Option<i64>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE asistencias
               SET tecnico_id = ?1,
                   tecnico = COALESCE((SELECT nombre FROM tecnicos WHERE id = ?1), tecnico)
             WHERE id = ?2
            "#,
        )
        .bind(technician_id)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Asistencias programadas para `day` (YYYY-MM-DD), por hora.
    pub async fn agenda<'e, E>(
        &self,
        executor: E,
        day: &str,
        filter: &AgendaFilter,
    ) -> Result<Vec<AgendaEvent>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut sql = format!(
            r#"
            SELECT x.*, c.nombre AS c_nombre, t.nombre AS t_nombre
              FROM (SELECT {} FROM asistencias) x
              LEFT JOIN clientes c ON x.cliente_id = c.id
              LEFT JOIN tecnicos t ON x.tecnico_id = t.id
             WHERE x.programada_en IS NOT NULL
               AND date(x.programada_en) = ?
            "#,
            TICKET_COLUMNS
        );
        if filter.status.is_some() {
            sql.push_str(" AND x.estado = ?");
        }
        if filter.technician_id.is_some() {
            sql.push_str(" AND x.tecnico_id = ?");
        }
        sql.push_str(" ORDER BY time(x.programada_en) ASC, x.id ASC");

        let mut query = sqlx::query_as::<_, AgendaEvent>(&sql).bind(day);
        if let Some(status) = filter.status {
            query = query.bind(status);
        }
        if let Some(technician_id) = filter.technician_id {
            query = query.bind(technician_id);
        }

        Ok(query.fetch_all(executor).await?)
    }
}
