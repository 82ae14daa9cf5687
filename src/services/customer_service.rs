// src/services/customer_service.rs

use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::{
        db_utils::{table_columns, SqlValue},
        error::AppError,
    },
    db::CustomerRepository,
    models::customer::{
        Customer, CustomerDetail, CustomerFilter, CustomerList, CustomerPayload, CustomerSummary,
        ImportReport, PurgeReport,
    },
    services::customer_import::{
        delimiter_label, derive_active, extract_amount, parse_amount, parse_customers_csv,
        CustomerRecord, DEFAULT_KIND,
    },
};

const DETAIL_TICKETS: i64 = 10;

#[derive(Clone)]
pub struct CustomerService {
    repo: CustomerRepository,
}

/// Texto legado "tipo monto", solo cuando la tabla no tiene `tipo` y `valor` separados.
fn legacy_kind_amount(
    columns: &HashSet<String>,
    kind: &str,
    amount: Option<&str>,
    original: Option<&str>,
) -> Option<SqlValue> {
    if !columns.contains("tipo_valor") || (columns.contains("tipo") && columns.contains("valor")) {
        return None;
    }
    let text = match original {
        Some(raw) => raw.to_string(),
        None => format!("{} {}", kind, amount.unwrap_or("")).trim().to_string(),
    };
    Some(text.into())
}

fn record_fields(record: &CustomerRecord, columns: &HashSet<String>) -> Vec<(&'static str, SqlValue)> {
    let mut fields: Vec<(&'static str, SqlValue)> = vec![
        ("external_id", record.external_id.clone().into()),
        ("nombre", record.name.clone().into()),
        ("referencia", record.reference.clone().into()),
        ("barrio", record.neighborhood.clone().into()),
        ("telefono", record.phone.clone().into()),
        ("situacion", record.situation.clone().into()),
        ("exonerado", record.exempt.into()),
        ("vencimiento", record.due_date.clone().into()),
        ("activo", record.active.into()),
        ("tipo", record.kind.clone().into()),
        ("valor", record.amount.clone().into()),
    ];
    if let Some(legacy) =
        legacy_kind_amount(columns, &record.kind, record.amount.as_deref(), record.kind_amount.as_deref())
    {
        fields.push(("tipo_valor", legacy));
    }
    fields
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Datos del formulario: el estado activo sale de la situación y, si no dice nada, queda inactivo.
fn payload_record(payload: &CustomerPayload) -> CustomerRecord {
    let situation = blank_to_none(payload.situation.as_deref());
    CustomerRecord {
        external_id: blank_to_none(payload.external_id.as_deref()),
        name: payload.name.trim().to_string(),
        reference: blank_to_none(payload.reference.as_deref()),
        neighborhood: blank_to_none(payload.neighborhood.as_deref()),
        phone: blank_to_none(payload.phone.as_deref()),
        active: derive_active(situation.as_deref().unwrap_or(""), false),
        situation,
        exempt: payload.exempt,
        kind: blank_to_none(payload.kind.as_deref()).unwrap_or_else(|| DEFAULT_KIND.to_string()),
        amount: blank_to_none(payload.amount.as_deref()),
        kind_amount: None,
        due_date: blank_to_none(payload.due_date.as_deref()),
    }
}

/// Completa tipo/monto desde la columna legada y calcula el monto numérico.
fn with_derived_amount(mut customer: Customer) -> Customer {
    if customer.amount.as_deref().is_none_or(|a| a.trim().is_empty()) {
        customer.amount = customer.kind_amount.as_deref().and_then(extract_amount);
    }
    if customer.kind.as_deref().is_none_or(|k| k.trim().is_empty()) {
        customer.kind = Some(DEFAULT_KIND.to_string());
    }
    customer.amount_value = customer.amount.as_deref().and_then(parse_amount);
    customer
}

impl CustomerService {
    pub fn new(repo: CustomerRepository) -> Self {
        Self { repo }
    }

    pub async fn list_customers(
        &self,
        pool: &SqlitePool,
        filter: &CustomerFilter,
    ) -> Result<CustomerList, AppError> {
        let customers = self.repo.list(pool, filter).await?;
        let total = self.repo.count_all(pool).await?;

        Ok(CustomerList {
            customers: customers.into_iter().map(with_derived_amount).collect(),
            total,
        })
    }

    pub async fn get_customer<'e, E>(&self, executor: E, id: i64) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .map(with_derived_amount)
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".into()))
    }

    pub async fn customer_detail(&self, pool: &SqlitePool, id: i64) -> Result<CustomerDetail, AppError> {
        let customer = self.get_customer(pool, id).await?;
        let tickets = match customer.name.as_deref() {
            Some(name) => self.repo.recent_tickets(pool, name, DETAIL_TICKETS).await?,
            None => Vec::new(),
        };
        Ok(CustomerDetail { customer, tickets })
    }

    pub async fn create_customer(
        &self,
        pool: &SqlitePool,
        payload: &CustomerPayload,
    ) -> Result<Customer, AppError> {
        let record = payload_record(payload);

        let mut tx = pool.begin().await?;
        let columns = table_columns(&mut *tx, "clientes").await?;
        let id = self.repo.insert(&mut *tx, &record_fields(&record, &columns)).await?;
        let customer = self.get_customer(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("✅ Cliente {} creado", id);
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        pool: &SqlitePool,
        id: i64,
        payload: &CustomerPayload,
    ) -> Result<Customer, AppError> {
        let record = payload_record(payload);

        let mut tx = pool.begin().await?;
        if self.repo.find_by_id(&mut *tx, id).await?.is_none() {
            return Err(AppError::ResourceNotFound("Cliente".into()));
        }
        let columns = table_columns(&mut *tx, "clientes").await?;
        self.repo.update(&mut *tx, id, &record_fields(&record, &columns)).await?;
        let customer = self.get_customer(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(customer)
    }

    pub async fn toggle_active(&self, pool: &SqlitePool, id: i64) -> Result<Customer, AppError> {
        let mut tx = pool.begin().await?;
        self.repo
            .toggle_active(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".into()))?;
        let customer = self.get_customer(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(customer)
    }

    pub async fn delete_customer(&self, pool: &SqlitePool, id: i64) -> Result<(), AppError> {
        if self.repo.delete(pool, id).await? == 0 {
            return Err(AppError::ResourceNotFound("Cliente".into()));
        }
        tracing::info!("🗑️ Cliente {} eliminado", id);
        Ok(())
    }

    pub async fn purge_blank_customers(&self, pool: &SqlitePool) -> Result<PurgeReport, AppError> {
        let deleted = self.repo.purge_blank(pool).await?;
        tracing::info!("🧹 Limpieza de clientes vacíos: {} filas", deleted);
        Ok(PurgeReport { deleted })
    }

    pub async fn summary(&self, pool: &SqlitePool) -> Result<CustomerSummary, AppError> {
        let (total, active, exempt) = self.repo.counts(pool).await?;

        let monthly_billing = self
            .repo
            .billable_amounts(pool)
            .await?
            .into_iter()
            .filter_map(|(amount, legacy)| {
                amount
                    .as_deref()
                    .and_then(parse_amount)
                    .or_else(|| legacy.as_deref().and_then(parse_amount))
            })
            .fold(Decimal::ZERO, |acc, v| acc + v);

        Ok(CustomerSummary { total, active, exempt, monthly_billing })
    }

    /// Importa la planilla: upsert por ID externo y después por teléfono,
    /// todo en una transacción.
    pub async fn import_csv(&self, pool: &SqlitePool, bytes: &[u8]) -> Result<ImportReport, AppError> {
        let parsed = parse_customers_csv(bytes)?;

        let mut report = ImportReport {
            skipped: parsed.skipped,
            encoding: parsed.encoding.to_string(),
            delimiter: delimiter_label(parsed.delimiter),
            ignored_columns: parsed.ignored_columns.clone(),
            ..Default::default()
        };

        if !report.ignored_columns.is_empty() {
            tracing::warn!("⚠️ Columnas ignoradas: {}", report.ignored_columns.join(", "));
        }

        let mut tx = pool.begin().await?;
        let columns = table_columns(&mut *tx, "clientes").await?;

        for record in &parsed.records {
            let mut existing = None;
            if let Some(external_id) = record.external_id.as_deref() {
                existing = self.repo.find_id_by_external_id(&mut *tx, external_id).await?;
            }
            if existing.is_none() {
                if let Some(phone) = record.phone.as_deref() {
                    existing = self.repo.find_id_by_phone(&mut *tx, phone).await?;
                }
            }

            let fields = record_fields(record, &columns);
            match existing {
                Some(id) => {
                    self.repo.update(&mut *tx, id, &fields).await?;
                    report.updated += 1;
                }
                None => {
                    self.repo.insert(&mut *tx, &fields).await?;
                    report.inserted += 1;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            "✅ Importación OK: {} insertados, {} actualizados, {} omitidos (codificación {}, separador '{}')",
            report.inserted,
            report.updated,
            report.skipped,
            report.encoding,
            report.delimiter
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn legacy_column_only_when_split_columns_are_missing() {
        let modern = columns(&["tipo", "valor", "tipo_valor"]);
        assert_eq!(legacy_kind_amount(&modern, "cliente", Some("130.000"), None), None);

        let legacy = columns(&["tipo_valor"]);
        assert_eq!(
            legacy_kind_amount(&legacy, "cliente", Some("130.000"), None),
            Some(SqlValue::Text("cliente 130.000".into()))
        );
        assert_eq!(
            legacy_kind_amount(&legacy, "cliente", None, Some("Cliente 90.000")),
            Some(SqlValue::Text("Cliente 90.000".into()))
        );
    }

    #[test]
    fn form_defaults_to_inactive() {
        let payload = CustomerPayload {
            external_id: Some("  ".into()),
            name: " Ana ".into(),
            reference: None,
            neighborhood: None,
            phone: None,
            situation: Some("moroso".into()),
            exempt: false,
            kind: None,
            amount: Some("90.000".into()),
            due_date: None,
        };
        let record = payload_record(&payload);
        assert_eq!(record.name, "Ana");
        assert_eq!(record.external_id, None);
        assert_eq!(record.kind, "cliente");
        assert!(!record.active);
    }
}
