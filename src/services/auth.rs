// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{user_repo::StoredPassword, UserRepository},
    models::auth::{AuthResponse, Claims, ForgotPasswordPayload, User},
    services::legacy_hash::{verify_werkzeug_password, WerkzeugHash},
};

const SESSION_HOURS: i64 = 12;
const REMEMBER_DAYS: i64 = 30;

/// bcrypt en un hilo bloqueante.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Falla en la tarea de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falla en la tarea de verificación: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    bcrypt_cost: u32,
    pool: SqlitePool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, bcrypt_cost: u32, pool: SqlitePool) -> Self {
        Self { user_repo, jwt_secret, bcrypt_cost, pool }
    }

    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<i64, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::MissingField("username".into()));
        }
        if password.is_empty() {
            return Err(AppError::MissingField("password".into()));
        }

        let mut tx = self.pool.begin().await?;

        if self.user_repo.username_exists(&mut *tx, username).await? {
            return Err(AppError::UsernameAlreadyExists);
        }

        let stored = if self.user_repo.supports_password_hash(&mut *tx).await? {
            StoredPassword::Hash(hash_password(password.to_owned(), self.bcrypt_cost).await?)
        } else {
            StoredPassword::Legacy(password.to_owned())
        };

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(username);

        let id = self.user_repo.create_user(&mut *tx, username, stored, email, name).await?;
        tx.commit().await?;

        tracing::info!("👤 Usuario '{}' registrado", username);
        Ok(id)
    }

    pub async fn login_user(
        &self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_username(&self.pool, username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = match (user.password_hash.as_deref(), user.legacy_password.as_deref()) {
            (Some(h), _) if !h.trim().is_empty() => match WerkzeugHash::parse(h) {
                // Hash del panel anterior: si coincide se pasa a bcrypt
                Some(legacy) => {
                    let valid = verify_werkzeug_password(password.to_owned(), legacy).await?;
                    if valid {
                        self.upgrade_legacy_hash(user.id, password).await?;
                        tracing::info!("🔐 Hash werkzeug de '{}' migrado a bcrypt", user.username);
                    }
                    valid
                }
                None => match verify_password(password.to_owned(), h.to_owned()).await {
                    Ok(valid) => valid,
                    Err(AppError::BcryptError(e)) => {
                        tracing::warn!("⚠️ Hash ilegible para '{}': {}", user.username, e);
                        false
                    }
                    Err(e) => return Err(e),
                },
            },
            // Usuario todavía sin migrar
            (_, Some(plain)) if !plain.is_empty() => plain == password,
            _ => false,
        };

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id, remember)
    }

    pub async fn reset_password(&self, payload: &ForgotPasswordPayload) -> Result<(), AppError> {
        let username = payload.username.trim();
        for (field, value) in [
            ("username", username),
            ("newPassword", payload.new_password.as_str()),
            ("confirmPassword", payload.confirm_password.as_str()),
        ] {
            if value.is_empty() {
                return Err(AppError::MissingField(field.into()));
            }
        }
        if payload.new_password != payload.confirm_password {
            return Err(AppError::PasswordMismatch);
        }

        let mut tx = self.pool.begin().await?;

        let user = self
            .user_repo
            .find_by_username(&mut *tx, username)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let stored = if self.user_repo.supports_password_hash(&mut *tx).await? {
            StoredPassword::Hash(hash_password(payload.new_password.clone(), self.bcrypt_cost).await?)
        } else {
            StoredPassword::Legacy(payload.new_password.clone())
        };

        self.user_repo.update_password(&mut *tx, user.id, stored).await?;
        tx.commit().await?;

        tracing::info!("🔑 Contraseña actualizada para '{}'", username);
        Ok(())
    }

    /// Valida el token y confirma que el usuario sigue existiendo.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user_id: i64 = token_data.claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, AppError> {
        self.user_repo.find_by_id(user_id).await?.ok_or(AppError::UserNotFound)
    }

    async fn upgrade_legacy_hash(&self, user_id: i64, password: &str) -> Result<(), AppError> {
        let password_hash = hash_password(password.to_owned(), self.bcrypt_cost).await?;
        let mut conn = self.pool.acquire().await?;
        self.user_repo
            .update_password(&mut *conn, user_id, StoredPassword::Hash(password_hash))
            .await?;
        Ok(())
    }

    fn create_token(&self, user_id: i64, remember: bool) -> Result<AuthResponse, AppError> {
        let now = Utc::now();
        let lifetime = if remember {
            Duration::days(REMEMBER_DAYS)
        } else {
            Duration::hours(SESSION_HOURS)
        };
        let expires_at = now + lifetime;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?;

        Ok(AuthResponse { token, expires_at: expires_at.timestamp() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_verify_against_original_password() {
        let hashed = hash_password("fibra123".into(), 4).await.unwrap();
        assert!(verify_password("fibra123".into(), hashed.clone()).await.unwrap());
        assert!(!verify_password("otra".into(), hashed).await.unwrap());
    }
}
