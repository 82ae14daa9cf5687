// src/db/user_repo.rs

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    common::{
        db_utils::{has_column, insert_filtered, now_timestamp, update_filtered, SqlValue},
        error::AppError,
    },
    models::auth::User,
};

const USER_COLUMNS: &str = "id, usuario, contrasena, password_hash, email, nombre, rol, foto_url, \
     created_at, updated_at";

// Repositorio de usuarios (tabla `usuarios`)
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

/// Credencial a guardar: hash si la tabla ya tiene `password_hash`, si no texto plano.
pub enum StoredPassword {
    Hash(String),
    Legacy(String),
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username<'e, E>(
        &self,
        executor: E,
        username: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {} FROM usuarios WHERE usuario = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM usuarios WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn username_exists<'e, E>(&self, executor: E, username: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM usuarios WHERE usuario = ?")
            .bind(username)
            .fetch_optional(executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn supports_password_hash<'e, E>(&self, executor: E) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        has_column(executor, "usuarios", "password_hash").await
    }

    pub async fn create_user(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        password: StoredPassword,
        email: Option<&str>,
        name: &str,
    ) -> Result<i64, AppError> {
        let id = match password {
            StoredPassword::Hash(password_hash) => {
                let now = now_timestamp();
                insert_filtered(
                    conn,
                    "usuarios",
                    &[
                        ("usuario", username.into()),
                        ("password_hash", password_hash.into()),
                        ("email", email.into()),
                        ("nombre", name.into()),
                        ("rol", "operador".into()),
                        ("foto_url", SqlValue::Null),
                        ("created_at", now.clone().into()),
                        ("updated_at", now.into()),
                    ],
                )
                .await?
            }
            StoredPassword::Legacy(plain) => {
                insert_filtered(
                    conn,
                    "usuarios",
                    &[("usuario", username.into()), ("contrasena", plain.into())],
                )
                .await?
            }
        };

        id.ok_or_else(|| anyhow::anyhow!("La tabla usuarios no tiene columnas conocidas").into())
    }

    /// Reemplaza la contraseña tocando solo las columnas que existen.
    pub async fn update_password(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        password: StoredPassword,
    ) -> Result<u64, AppError> {
        let fields: Vec<(&str, SqlValue)> = match password {
            StoredPassword::Hash(password_hash) => vec![
                ("password_hash", password_hash.into()),
                ("contrasena", SqlValue::Null),
                ("updated_at", now_timestamp().into()),
            ],
            StoredPassword::Legacy(plain) => vec![
                ("contrasena", plain.into()),
                ("updated_at", now_timestamp().into()),
            ],
        };
        update_filtered(conn, "usuarios", &fields, user_id).await
    }
}
