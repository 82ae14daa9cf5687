// src/services/tracking_service.rs

use chrono::{Duration, Local, NaiveDate};
use sqlx::SqlitePool;

use crate::{
    common::{
        db_utils::{now_timestamp, SqlValue},
        error::AppError,
    },
    db::TrackingRepository,
    models::tracking::{
        CreateTechnicianPayload, GpsPing, GpsPingParams, MapData, Technician, TrackPoint,
        TrajectoryQuery,
    },
};

const MAP_DAYS: i64 = 15;

#[derive(Clone)]
pub struct TrackingService {
    repo: TrackingRepository,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn optional_number(field: &str, value: Option<&str>) -> Result<Option<f64>, AppError> {
    non_blank(value)
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| AppError::InvalidGpsPing(format!("{} no es numérico", field)))
        })
        .transpose()
}

fn required_number(field: &str, value: Option<&str>) -> Result<f64, AppError> {
    optional_number(field, value)?.ok_or_else(|| AppError::InvalidGpsPing(format!("falta {}", field)))
}

impl TryFrom<&GpsPingParams> for GpsPing {
    type Error = AppError;

    fn try_from(params: &GpsPingParams) -> Result<Self, Self::Error> {
        let technician_id = non_blank(params.tecnico_id.as_deref())
            .ok_or_else(|| AppError::InvalidGpsPing("falta tecnico_id".into()))?
            .parse::<i64>()
            .map_err(|_| AppError::InvalidGpsPing("tecnico_id no es numérico".into()))?;

        let lat = required_number("lat", params.lat.as_deref())?;
        let lng = required_number("lng", params.lng.as_deref())?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::InvalidGpsPing("coordenadas fuera de rango".into()));
        }

        Ok(GpsPing {
            technician_id,
            lat,
            lng,
            accuracy: optional_number("accuracy", params.accuracy.as_deref())?,
            battery: optional_number("battery", params.battery.as_deref())?,
            source: non_blank(params.source.as_deref()).map(str::to_string),
            mobile_unit: non_blank(params.movil.as_deref()).map(str::to_string),
        })
    }
}

/// Rango de la trayectoria; por defecto de ayer a hoy.
pub fn trajectory_range(query: &TrajectoryQuery, today: NaiveDate) -> Result<(String, String), AppError> {
    let parse = |value: Option<&str>, default: NaiveDate| -> Result<String, AppError> {
        match non_blank(value) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|_| AppError::InvalidDate(raw.to_string())),
            None => Ok(default.format("%Y-%m-%d").to_string()),
        }
    };
    let from = parse(query.desde.as_deref(), today - Duration::days(1))?;
    let to = parse(query.hasta.as_deref(), today)?;
    Ok((from, to))
}

impl TrackingService {
    pub fn new(repo: TrackingRepository) -> Self {
        Self { repo }
    }

    /// Guarda el ping: posición siempre, última posición del técnico si se puede
    /// y track detallado si vino algún dato extra.
    pub async fn record_ping(&self, pool: &SqlitePool, params: &GpsPingParams) -> Result<GpsPing, AppError> {
        let ping = GpsPing::try_from(params)?;
        let ts = now_timestamp();

        let mut tx = pool.begin().await?;
        self.repo.insert_position(&mut *tx, &ping, &ts).await?;
        self.repo.update_last_position(&mut *tx, &ping, &ts).await?;
        if ping.has_track_details() {
            self.repo.insert_track(&mut *tx, &ping, &ts).await?;
        }
        tx.commit().await?;

        tracing::debug!("📍 Ping del técnico {} ({}, {})", ping.technician_id, ping.lat, ping.lng);
        Ok(ping)
    }

    pub async fn map_data(&self, pool: &SqlitePool) -> Result<MapData, AppError> {
        let tickets = self.repo.map_tickets(pool, MAP_DAYS).await?;
        let technicians = self.repo.latest_positions(pool).await?;
        Ok(MapData { tickets, technicians })
    }

    pub async fn trajectory(
        &self,
        pool: &SqlitePool,
        technician_id: i64,
        query: &TrajectoryQuery,
    ) -> Result<Vec<TrackPoint>, AppError> {
        let (from, to) = trajectory_range(query, Local::now().date_naive())?;
        self.repo.trajectory(pool, technician_id, &from, &to).await
    }

    pub async fn list_technicians(&self, pool: &SqlitePool) -> Result<Vec<Technician>, AppError> {
        self.repo.list_technicians(pool).await
    }

    pub async fn create_technician(
        &self,
        pool: &SqlitePool,
        payload: &CreateTechnicianPayload,
    ) -> Result<Technician, AppError> {
        let text = |v: Option<&str>| -> SqlValue { non_blank(v).into() };
        let fields: Vec<(&str, SqlValue)> = vec![
            ("nombre", payload.name.trim().into()),
            ("telefono", text(payload.phone.as_deref())),
            ("activo", true.into()),
            ("telefono_whatsapp", text(payload.whatsapp_phone.as_deref())),
            ("movil", text(payload.mobile_unit.as_deref())),
            ("tracking_token", uuid::Uuid::new_v4().simple().to_string().into()),
        ];

        let mut tx = pool.begin().await?;
        let id = self.repo.insert_technician(&mut *tx, &fields).await?;
        let technician = self
            .repo
            .find_technician(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Técnico".into()))?;
        tx.commit().await?;

        tracing::info!("👷 Técnico '{}' creado", payload.name.trim());
        Ok(technician)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(tecnico_id: &str, lat: &str, lng: &str) -> GpsPingParams {
        GpsPingParams {
            tecnico_id: Some(tecnico_id.into()),
            lat: Some(lat.into()),
            lng: Some(lng.into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_ping_without_extras_has_no_track_details() {
        let ping = GpsPing::try_from(&params("1", "-25.2637", "-57.5759")).unwrap();
        assert_eq!(ping.technician_id, 1);
        assert!(!ping.has_track_details());
    }

    #[test]
    fn extras_are_parsed() {
        let mut p = params("2", "-25.3", "-57.6");
        p.battery = Some("87".into());
        p.source = Some(" app ".into());
        let ping = GpsPing::try_from(&p).unwrap();
        assert_eq!(ping.battery, Some(87.0));
        assert_eq!(ping.source.as_deref(), Some("app"));
        assert!(ping.has_track_details());
    }

    #[test]
    fn missing_or_invalid_fields_are_rejected() {
        assert!(matches!(
            GpsPing::try_from(&GpsPingParams::default()),
            Err(AppError::InvalidGpsPing(_))
        ));
        assert!(GpsPing::try_from(&params("x", "1", "1")).is_err());
        assert!(GpsPing::try_from(&params("1", "", "1")).is_err());
        assert!(GpsPing::try_from(&params("1", "95", "1")).is_err());
    }

    #[test]
    fn trajectory_defaults_to_yesterday_and_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let (from, to) = trajectory_range(&TrajectoryQuery::default(), today).unwrap();
        assert_eq!(from, "2024-02-29");
        assert_eq!(to, "2024-03-01");

        let bad = TrajectoryQuery { desde: Some("ayer".into()), hasta: None };
        assert!(matches!(trajectory_range(&bad, today), Err(AppError::InvalidDate(_))));
    }
}
