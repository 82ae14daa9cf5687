// src/services/equipment_service.rs

use std::path::{Path, PathBuf};

use chrono::Local;
use sqlx::SqlitePool;

use crate::{
    common::{db_utils::now_timestamp, error::AppError},
    db::EquipmentRepository,
    models::equipment::{
        CreateEquipmentPayload, CreateToolPayload, Equipment, EquipmentOverview, EquipmentStats,
        InstallationPhoto, ItemType, Tool, UsagePayload,
    },
};

const HISTORY_LIMIT: i64 = 10;
const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Archivo recibido por multipart.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct EquipmentService {
    repo: EquipmentRepository,
    upload_dir: PathBuf,
}

/// Deja solo `[A-Za-z0-9._-]`, espacios como `_`, sin puntos al inicio.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = crate::services::customer_import::strip_diacritics(base)
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

pub fn is_allowed_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn checked_image_name(file: &UploadedFile) -> Result<String, AppError> {
    if file.bytes.is_empty() {
        return Err(AppError::InvalidUpload("archivo vacío".into()));
    }
    let name = secure_filename(&file.file_name);
    if name.is_empty() || !is_allowed_image(&name) {
        return Err(AppError::InvalidUpload(format!(
            "'{}' no es una imagen permitida ({})",
            file.file_name,
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        )));
    }
    Ok(name)
}

impl EquipmentService {
    pub fn new(repo: EquipmentRepository, upload_dir: PathBuf) -> Self {
        Self { repo, upload_dir }
    }

    pub async fn overview(&self, pool: &SqlitePool) -> Result<EquipmentOverview, AppError> {
        let equipment = self.repo.list_equipment(pool).await?;
        let tools = self.repo.list_tools(pool).await?;
        let history = self.repo.recent_usage(pool, HISTORY_LIMIT).await?;

        let total = self.repo.count_items(pool).await?;
        let today = Local::now().format("%Y-%m-%d").to_string();
        let in_use = self.repo.count_used_on(pool, &today).await?;

        Ok(EquipmentOverview {
            equipment,
            tools,
            history,
            stats: EquipmentStats { total, in_use, available: (total - in_use).max(0) },
        })
    }

    pub async fn register_equipment(
        &self,
        pool: &SqlitePool,
        payload: &CreateEquipmentPayload,
    ) -> Result<Equipment, AppError> {
        let description = payload.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
        let equipment = self
            .repo
            .insert_equipment(pool, payload.name.trim(), payload.kind.trim(), description)
            .await?;
        tracing::info!("📦 Equipo '{}' registrado", equipment.name);
        Ok(equipment)
    }

    pub async fn register_tool(&self, pool: &SqlitePool, payload: &CreateToolPayload) -> Result<Tool, AppError> {
        let kind = payload.kind.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let tool = self.repo.insert_tool(pool, payload.name.trim(), kind).await?;
        tracing::info!("🔧 Herramienta '{}' registrada", tool.name);
        Ok(tool)
    }

    /// Registra un uso. El id se busca primero entre los equipos y después entre las herramientas.
    pub async fn register_usage(&self, pool: &SqlitePool, payload: &UsagePayload) -> Result<i64, AppError> {
        let mut tx = pool.begin().await?;

        let item_type = if self.repo.equipment_exists(&mut *tx, payload.item_id).await? {
            ItemType::Equipment
        } else if self.repo.find_tool(&mut *tx, payload.item_id).await?.is_some() {
            ItemType::Tool
        } else {
            return Err(AppError::ResourceNotFound("Item".into()));
        };

        let service = payload.service.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let id = self
            .repo
            .insert_usage(
                &mut *tx,
                item_type,
                payload.item_id,
                payload.technician.trim(),
                &now_timestamp(),
                service,
            )
            .await?;
        tx.commit().await?;

        tracing::info!("📝 Uso de {} {} por {}", item_type.as_str(), payload.item_id, payload.technician.trim());
        Ok(id)
    }

    async fn store_file(&self, name: &str, bytes: &[u8]) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(name), bytes).await?;
        Ok(())
    }

    pub async fn upload_tool_image(
        &self,
        pool: &SqlitePool,
        tool_id: i64,
        file: &UploadedFile,
    ) -> Result<Tool, AppError> {
        let name = checked_image_name(file)?;
        if self.repo.find_tool(pool, tool_id).await?.is_none() {
            return Err(AppError::ResourceNotFound("Herramienta".into()));
        }

        self.store_file(&name, &file.bytes).await?;
        self.repo.set_tool_image(pool, tool_id, &name).await?;

        tracing::info!("🖼️ Imagen '{}' guardada para la herramienta {}", name, tool_id);
        self.repo
            .find_tool(pool, tool_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Herramienta".into()))
    }

    /// Guarda la foto con prefijo de fecha y la registra a nombre del usuario de la sesión.
    pub async fn upload_installation_photo(
        &self,
        pool: &SqlitePool,
        ticket_id: Option<i64>,
        technician: &str,
        description: Option<&str>,
        file: &UploadedFile,
    ) -> Result<InstallationPhoto, AppError> {
        let name = checked_image_name(file)?;
        let stamped = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), name);

        self.store_file(&stamped, &file.bytes).await?;

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let photo = self
            .repo
            .insert_installation_photo(pool, ticket_id, technician, &stamped, description, &now_timestamp())
            .await?;

        tracing::info!("📷 Foto '{}' registrada por {}", stamped, technician);
        Ok(photo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("foto crimpadora.JPG"), "foto_crimpadora.JPG");
        assert_eq!(secure_filename("C:\\fotos\\óptico.png"), "optico.png");
        assert_eq!(secure_filename(".htaccess"), "htaccess");
    }

    #[test]
    fn only_images_are_allowed() {
        assert!(is_allowed_image("onu.PNG"));
        assert!(is_allowed_image("a.jpeg"));
        assert!(!is_allowed_image("script.sh"));
        assert!(!is_allowed_image("sin_extension"));
    }

    #[test]
    fn empty_or_foreign_uploads_are_rejected() {
        let empty = UploadedFile { file_name: "a.png".into(), bytes: Vec::new() };
        assert!(matches!(checked_image_name(&empty), Err(AppError::InvalidUpload(_))));

        let pdf = UploadedFile { file_name: "doc.pdf".into(), bytes: vec![1, 2, 3] };
        assert!(matches!(checked_image_name(&pdf), Err(AppError::InvalidUpload(_))));

        let ok = UploadedFile { file_name: "mi foto.gif".into(), bytes: vec![1] };
        assert_eq!(checked_image_name(&ok).unwrap(), "mi_foto.gif");
    }
}
