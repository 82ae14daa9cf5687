// src/models/auth.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// Usuario del panel (tabla `usuarios`)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    #[sqlx(rename = "usuario")]
    #[schema(example = "admin")]
    pub username: String,

    // Contraseña legada en texto plano; queda vacía tras la migración a hash
    #[sqlx(rename = "contrasena")]
    #[serde(skip_serializing)]
    pub legacy_password: Option<String>,

    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub email: Option<String>,

    #[sqlx(rename = "nombre")]
    #[schema(example = "Administrador")]
    pub name: Option<String>,

    #[sqlx(rename = "rol")]
    #[schema(example = "operador")]
    pub role: Option<String>,

    #[sqlx(rename = "foto_url")]
    pub photo_url: Option<String>,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    /// Nombre a mostrar: `nombre` o, si falta, el usuario.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, message = "El usuario es obligatorio."))]
    #[schema(example = "maria")]
    pub username: String,

    #[validate(length(min = 1, message = "La contraseña es obligatoria."))]
    pub password: String,

    #[validate(email(message = "El e-mail no es válido."))]
    pub email: Option<String>,

    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "El usuario es obligatorio."))]
    pub username: String,

    pub password: String,

    // "Recordarme": sesión larga
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: i64,
}

// Claims del JWT de sesión; `sub` lleva el id del usuario como texto
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}
