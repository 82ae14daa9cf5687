// src/db/customer_repo.rs

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::{
    common::{
        db_utils::{insert_filtered, update_filtered, SqlValue},
        error::AppError,
    },
    models::{
        customer::{Customer, CustomerFilter, CUSTOMER_COLUMNS},
        ticket::{CustomerOption, Ticket, TICKET_COLUMNS},
    },
};

#[derive(Clone, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(&self, executor: E, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut sql = format!("SELECT {} FROM clientes WHERE 1=1", CUSTOMER_COLUMNS);
        let mut params: Vec<SqlValue> = Vec::new();

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let like = format!("%{}%", q);
            sql.push_str(
                " AND (IFNULL(nombre, '') LIKE ? OR IFNULL(telefono, '') LIKE ? OR IFNULL(referencia, '') LIKE ?)",
            );
            params.extend([like.clone().into(), like.clone().into(), like.into()]);
        }
        if let Some(situation) = filter.situacion.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND IFNULL(situacion, '') LIKE ?");
            params.push(format!("%{}%", situation).into());
        }
        if let Some(exempt) = filter.exonerado.as_deref().map(str::trim) {
            if exempt == "0" || exempt == "1" {
                sql.push_str(" AND COALESCE(exonerado, 0) = ?");
                params.push(SqlValue::Integer(if exempt == "1" { 1 } else { 0 }));
            }
        }
        if let Some(barrio) = filter.barrio.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            sql.push_str(" AND IFNULL(barrio, '') LIKE ?");
            params.push(format!("%{}%", barrio).into());
        }
        sql.push_str(" ORDER BY nombre COLLATE NOCASE ASC");

        let mut query = sqlx::query_as::<_, Customer>(&sql);
        for param in params {
            query = match param {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Text(s) => query.bind(s),
                SqlValue::Integer(i) => query.bind(i),
                SqlValue::Real(f) => query.bind(f),
            };
        }

        Ok(query.fetch_all(executor).await?)
    }

    pub async fn count_all<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clientes")
            .fetch_one(executor)
            .await?)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM clientes WHERE id = ?", CUSTOMER_COLUMNS);
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn find_id_by_external_id(
        &self,
        conn: &mut SqliteConnection,
        external_id: &str,
    ) -> Result<Option<i64>, AppError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT id FROM clientes WHERE external_id = ? LIMIT 1")
            .bind(external_id)
            .fetch_optional(&mut *conn)
            .await?)
    }

    pub async fn find_id_by_phone(
        &self,
        conn: &mut SqliteConnection,
        phone: &str,
    ) -> Result<Option<i64>, AppError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT id FROM clientes WHERE telefono = ? LIMIT 1")
            .bind(phone)
            .fetch_optional(&mut *conn)
            .await?)
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        fields: &[(&str, SqlValue)],
    ) -> Result<i64, AppError> {
        insert_filtered(conn, "clientes", fields)
            .await?
            .ok_or_else(|| anyhow::anyhow!("La tabla clientes no tiene columnas conocidas").into())
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        fields: &[(&str, SqlValue)],
    ) -> Result<u64, AppError> {
        update_filtered(conn, "clientes", fields, id).await
    }

    /// Invierte `activo`. Devuelve el valor nuevo, o `None` si el cliente no existe.
    pub async fn toggle_active<'e, E>(&self, executor: E, id: i64) -> Result<Option<bool>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_scalar::<_, bool>(
            "UPDATE clientes SET activo = CASE WHEN COALESCE(activo, 1) = 1 THEN 0 ELSE 1 END
              WHERE id = ? RETURNING activo",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM clientes WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Borra filas sin nombre, teléfono ni ID externo (restos de importaciones).
    pub async fn purge_blank<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "DELETE FROM clientes
              WHERE TRIM(IFNULL(nombre, '')) = ''
                AND TRIM(IFNULL(telefono, '')) = ''
                AND TRIM(IFNULL(external_id, '')) = ''",
        )
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Últimas asistencias cargadas con el nombre del cliente.
    pub async fn recent_tickets<'e, E>(
        &self,
        executor: E,
        customer_name: &str,
        limit: i64,
    ) -> Result<Vec<Ticket>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {} FROM asistencias WHERE cliente = ? ORDER BY datetime(fecha) DESC LIMIT ?",
            TICKET_COLUMNS
        );
        Ok(sqlx::query_as::<_, Ticket>(&sql)
            .bind(customer_name)
            .bind(limit)
            .fetch_all(executor)
            .await?)
    }

    pub async fn active_options<'e, E>(&self, executor: E) -> Result<Vec<CustomerOption>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, CustomerOption>(
            r#"
            SELECT id, nombre, cedula, pppoe, telefono, barrio, referencia,
                   COALESCE(NULLIF(TRIM(tipo), ''), 'cliente') AS tipo,
                   valor
              FROM clientes
             WHERE COALESCE(activo, 1) = 1
             ORDER BY nombre COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(executor)
        .await?)
    }

    /// (total, activos, exonerados)
    pub async fn counts<'e, E>(&self, executor: E) -> Result<(i64, i64, i64), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN COALESCE(activo, 1) = 1 THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN COALESCE(exonerado, 0) = 1 THEN 1 ELSE 0 END), 0)
              FROM clientes
            "#,
        )
        .fetch_one(executor)
        .await?)
    }

    /// Montos de clientes activos no exonerados, tal como están guardados.
    pub async fn billable_amounts<'e, E>(&self, executor: E) -> Result<Vec<(Option<String>, Option<String>)>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT valor, tipo_valor FROM clientes
              WHERE COALESCE(activo, 1) = 1 AND COALESCE(exonerado, 0) = 0",
        )
        .fetch_all(executor)
        .await?)
    }
}
