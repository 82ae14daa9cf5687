// src/services/ticket_service.rs

use chrono::{Duration, Local, NaiveDate};
use sqlx::SqlitePool;

use crate::{
    common::{
        db_utils::{has_column, now_timestamp, SqlValue},
        error::AppError,
    },
    db::{ticket_repo::AgendaFilter, CustomerRepository, TicketRepository, TrackingRepository},
    models::{
        agenda::{AgendaQuery, AgendaView},
        ticket::{CreateTicketPayload, Ticket, TicketFormOptions, TicketStatus},
    },
    services::customer_import::strip_diacritics,
};

const DEFAULT_KIND: &str = "Soporte";
const DEFAULT_PRIORITY: &str = "Media";
const DEFAULT_CHANNEL: &str = "web";
const PPPOE_DOMAIN: &str = "spynet.com";
const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct TicketService {
    repo: TicketRepository,
    customer_repo: CustomerRepository,
    tracking_repo: TrackingRepository,
}

/// "Ramona Benítez" -> "ramonabenitez@spynet.com"
pub fn pppoe_from_name(name: &str) -> Option<String> {
    let slug: String = strip_diacritics(&name.to_lowercase())
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if slug.is_empty() {
        None
    } else {
        Some(format!("{}@{}", slug, PPPOE_DOMAIN))
    }
}

/// "2024-07-06T09:00" -> "2024-07-06 09:00"; vacío -> None
pub fn schedule_from_local(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.replacen('T', " ", 1))
}

fn text_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_day(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).map_err(|_| AppError::InvalidDate(value.to_string()))
}

impl TicketService {
    pub fn new(
        repo: TicketRepository,
        customer_repo: CustomerRepository,
        tracking_repo: TrackingRepository,
    ) -> Self {
        Self { repo, customer_repo, tracking_repo }
    }

    pub async fn list_tickets(&self, pool: &SqlitePool) -> Result<Vec<Ticket>, AppError> {
        self.repo.list(pool).await
    }

    pub async fn get_ticket(&self, pool: &SqlitePool, id: i64) -> Result<Ticket, AppError> {
        self.repo
            .find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Asistencia".into()))
    }

    pub async fn form_options(&self, pool: &SqlitePool) -> Result<TicketFormOptions, AppError> {
        let customers = self.customer_repo.active_options(pool).await?;
        let technicians = self.tracking_repo.active_technician_options(pool).await?;
        Ok(TicketFormOptions { customers, technicians })
    }

    pub async fn create_ticket(
        &self,
        pool: &SqlitePool,
        payload: &CreateTicketPayload,
    ) -> Result<Ticket, AppError> {
        let status = match trimmed(payload.status.as_deref()) {
            Some(raw) => raw.parse::<TicketStatus>()?,
            None => TicketStatus::default(),
        };

        let customer = payload.customer.trim();
        let pppoe = trimmed(payload.pppoe.as_deref()).or_else(|| pppoe_from_name(customer));

        let fields: Vec<(&str, SqlValue)> = vec![
            ("cliente", customer.into()),
            ("cliente_id", payload.customer_id.into()),
            ("direccion", trimmed(payload.address.as_deref()).into()),
            ("tipo", text_or(payload.kind.as_deref(), DEFAULT_KIND).into()),
            ("prioridad", text_or(payload.priority.as_deref(), DEFAULT_PRIORITY).into()),
            ("tecnico", trimmed(payload.technician.as_deref()).into()),
            ("tecnico_id", payload.technician_id.into()),
            ("problema", trimmed(payload.problem.as_deref()).into()),
            ("fecha", now_timestamp().into()),
            ("pppoe", pppoe.into()),
            ("estado", status.as_str().into()),
            ("programada_en", schedule_from_local(payload.scheduled_local.as_deref()).into()),
            ("canal", text_or(payload.channel.as_deref(), DEFAULT_CHANNEL).into()),
            ("lat", payload.lat.into()),
            ("lng", payload.lng.into()),
            ("cedula", trimmed(payload.cedula.as_deref()).into()),
        ];

        let mut tx = pool.begin().await?;
        let id = self.repo.insert(&mut *tx, &fields).await?;
        let ticket = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Asistencia".into()))?;
        tx.commit().await?;

        tracing::info!("🎫 Asistencia {} creada para '{}'", id, customer);
        Ok(ticket)
    }

    async fn require_column(&self, pool: &SqlitePool, column: &'static str) -> Result<(), AppError> {
        if has_column(pool, "asistencias", column).await? {
            Ok(())
        } else {
            tracing::warn!("⚠️ Falta la columna asistencias.{}", column);
            Err(AppError::MissingColumn { table: "asistencias".into(), column: column.into() })
        }
    }

    fn ensure_updated(rows: u64) -> Result<(), AppError> {
        if rows == 0 {
            Err(AppError::ResourceNotFound("Asistencia".into()))
        } else {
            Ok(())
        }
    }

    pub async fn reschedule(
        &self,
        pool: &SqlitePool,
        id: i64,
        scheduled_local: Option<&str>,
    ) -> Result<Ticket, AppError> {
        self.require_column(pool, "programada_en").await?;
        let scheduled_at = schedule_from_local(scheduled_local);
        Self::ensure_updated(self.repo.set_schedule(pool, id, scheduled_at.as_deref()).await?)?;
        self.get_ticket(pool, id).await
    }

    pub async fn change_status(&self, pool: &SqlitePool, id: i64, status: &str) -> Result<Ticket, AppError> {
        self.require_column(pool, "estado").await?;
        let status: TicketStatus = status.parse()?;
        Self::ensure_updated(self.repo.set_status(pool, id, status).await?)?;
        tracing::info!("🔄 Asistencia {} -> {}", id, status);
        self.get_ticket(pool, id).await
    }

    pub async fn assign_technician(
        &self,
        pool: &SqlitePool,
        id: i64,
        technician_id: Option<i64>,
    ) -> Result<Ticket, AppError> {
        self.require_column(pool, "tecnico_id").await?;
        if let Some(technician_id) = technician_id {
            if self.tracking_repo.find_technician(pool, technician_id).await?.is_none() {
                return Err(AppError::ResourceNotFound("Técnico".into()));
            }
        }
        Self::ensure_updated(self.repo.set_technician(pool, id, technician_id).await?)?;
        self.get_ticket(pool, id).await
    }

    /// Agenda del día. Si la base no tiene `programada_en` devuelve la vista
    /// vacía junto con el error a mostrar como aviso.
    pub async fn agenda(
        &self,
        pool: &SqlitePool,
        query: &AgendaQuery,
    ) -> Result<(AgendaView, Option<AppError>), AppError> {
        let day = match trimmed(query.dia.as_deref()) {
            Some(raw) => parse_day(&raw)?,
            None => Local::now().date_naive(),
        };
        let status = trimmed(query.estado.as_deref())
            .map(|s| s.parse::<TicketStatus>())
            .transpose()?;
        let technician_id = trimmed(query.tecnico_id.as_deref()).and_then(|t| t.parse::<i64>().ok());

        let technicians = self.tracking_repo.active_technician_options(pool).await?;
        let mut view = AgendaView {
            day: day.format(DAY_FORMAT).to_string(),
            prev_day: (day - Duration::days(1)).format(DAY_FORMAT).to_string(),
            next_day: (day + Duration::days(1)).format(DAY_FORMAT).to_string(),
            events: Vec::new(),
            technicians,
            warning: None,
        };

        if !has_column(pool, "asistencias", "programada_en").await? {
            let missing = AppError::MissingColumn {
                table: "asistencias".into(),
                column: "programada_en".into(),
            };
            return Ok((view, Some(missing)));
        }

        let filter = AgendaFilter { status, technician_id };
        view.events = self.repo.agenda(pool, &view.day, &filter).await?;
        Ok((view, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pppoe_is_ascii_slug_of_the_name() {
        assert_eq!(pppoe_from_name("Ramona Benítez"), Some("ramonabenitez@spynet.com".into()));
        assert_eq!(pppoe_from_name("Peña 2"), Some("pena2@spynet.com".into()));
        assert_eq!(pppoe_from_name("  "), None);
    }

    #[test]
    fn local_schedule_is_stored_with_a_space() {
        assert_eq!(schedule_from_local(Some("2024-07-06T09:00")), Some("2024-07-06 09:00".into()));
        assert_eq!(schedule_from_local(Some("")), None);
        assert_eq!(schedule_from_local(None), None);
    }

    #[test]
    fn blank_text_falls_back_to_default() {
        assert_eq!(text_or(Some("  "), DEFAULT_PRIORITY), "Media");
        assert_eq!(text_or(Some(" Alta "), DEFAULT_PRIORITY), "Alta");
    }

    #[test]
    fn day_must_be_iso() {
        assert!(parse_day("2024-02-29").is_ok());
        assert!(matches!(parse_day("29/02/2024"), Err(AppError::InvalidDate(_))));
    }
}
