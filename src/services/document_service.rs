// src/services/document_service.rs

use std::io::Cursor;
use std::path::PathBuf;

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use genpdf::{elements, style, Element};
use sqlx::SqlitePool;

use crate::{
    common::{db_utils::now_timestamp, error::AppError},
    db::TicketRepository,
    models::ticket::Ticket,
};

const FONT_FAMILY: &str = "Roboto";
const COLUMN_WEIGHTS: [usize; 8] = [3, 3, 2, 2, 1, 3, 4, 2];
const HEADERS: [&str; 8] = [
    "Cliente", "Dirección", "Técnico", "Tipo", "Prioridad", "PPPoE", "Problema", "Fecha",
];

#[derive(Clone)]
pub struct DocumentService {
    repo: TicketRepository,
    fonts_dir: PathBuf,
}

fn cell(value: Option<&str>) -> String {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("").to_string()
}

/// Celdas de una fila del listado; el problema vacío se muestra como "N/A".
fn ticket_row(ticket: &Ticket) -> [String; 8] {
    let problem = cell(ticket.problem.as_deref());
    [
        cell(ticket.customer_name.as_deref()),
        cell(ticket.address.as_deref()),
        cell(ticket.technician_name.as_deref()),
        cell(ticket.kind.as_deref()),
        cell(ticket.priority.as_deref()),
        cell(ticket.pppoe.as_deref()),
        if problem.is_empty() { "N/A".to_string() } else { problem },
        cell(ticket.created_at.as_deref()),
    ]
}

impl DocumentService {
    pub fn new(repo: TicketRepository, fonts_dir: PathBuf) -> Self {
        Self { repo, fonts_dir }
    }

    pub async fn generate_tickets_pdf(&self, pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
        let tickets = self.repo.list(pool).await?;
        self.render_tickets(&tickets)
    }

    pub async fn generate_tickets_docx(&self, pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
        let tickets = self.repo.list(pool).await?;
        Self::render_tickets_docx(&tickets)
    }

    /// Mismo listado que el PDF, como tabla de Word.
    pub fn render_tickets_docx(tickets: &[Ticket]) -> Result<Vec<u8>, AppError> {
        let text_cell = |text: &str, bold: bool| {
            let mut run = Run::new().add_text(text).size(16);
            if bold {
                run = run.bold();
            }
            TableCell::new().add_paragraph(Paragraph::new().add_run(run))
        };

        let mut rows = vec![TableRow::new(HEADERS.iter().map(|h| text_cell(*h, true)).collect())];
        for ticket in tickets {
            let cells = ticket_row(ticket)
                .iter()
                .map(|value| text_cell(value.as_str(), false))
                .collect();
            rows.push(TableRow::new(cells));
        }

        let docx = Docx::new()
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Tickets de Asistencia").bold().size(32)),
            )
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(format!(
                "Generado: {} | Total: {}",
                now_timestamp(),
                tickets.len()
            ))))
            .add_paragraph(Paragraph::new())
            .add_table(Table::new(rows));

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| AppError::DocxError(e.to_string()))?;

        tracing::info!("📝 Word de asistencias generado ({} filas)", tickets.len());
        Ok(buffer.into_inner())
    }

    fn render_tickets(&self, tickets: &[Ticket]) -> Result<Vec<u8>, AppError> {
        if !self.fonts_dir.is_dir() {
            return Err(AppError::FontNotFound(self.fonts_dir.display().to_string()));
        }
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None)
            .map_err(|e| AppError::FontNotFound(format!("{}: {}", self.fonts_dir.display(), e)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title("Reporte de Asistencias");
        doc.set_font_size(8);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(
            elements::Paragraph::new("REPORTE DE ASISTENCIAS")
                .styled(style::Style::new().bold().with_font_size(16)),
        );
        doc.push(elements::Paragraph::new(format!(
            "Generado: {} | Total: {}",
            now_timestamp(),
            tickets.len()
        )));
        doc.push(elements::Break::new(1.5));

        let mut table = elements::TableLayout::new(COLUMN_WEIGHTS.to_vec());
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let bold = style::Style::new().bold();
        let mut header = table.row();
        for title in HEADERS {
            header.push_element(elements::Paragraph::new(title).styled(bold));
        }
        header.push().map_err(|e| AppError::PdfError(e.to_string()))?;

        for ticket in tickets {
            let mut row = table.row();
            for value in ticket_row(ticket) {
                row.push_element(elements::Paragraph::new(value));
            }
            row.push().map_err(|e| AppError::PdfError(e.to_string()))?;
        }

        doc.push(table);

        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(|e| AppError::PdfError(e.to_string()))?;

        tracing::info!("📄 PDF de asistencias generado ({} filas)", tickets.len());
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::TicketStatus;

    fn ticket() -> Ticket {
        Ticket {
            id: 1,
            customer_name: Some("Ramona".into()),
            customer_id: None,
            address: Some(" Barrio Obrero ".into()),
            kind: Some("Soporte".into()),
            priority: Some("Alta".into()),
            technician_name: None,
            technician_id: None,
            problem: Some("  ".into()),
            created_at: Some("2024-07-05 14:30:00".into()),
            pppoe: Some("ramona@spynet.com".into()),
            status: TicketStatus::Pending,
            scheduled_at: None,
            channel: "web".into(),
            lat: None,
            lng: None,
            cedula: None,
        }
    }

    #[test]
    fn blank_problem_prints_as_not_available() {
        let row = ticket_row(&ticket());
        assert_eq!(row[1], "Barrio Obrero");
        assert_eq!(row[2], "");
        assert_eq!(row[6], "N/A");
    }

    #[test]
    fn word_report_is_a_zip_with_every_row() {
        let bytes = DocumentService::render_tickets_docx(&[ticket(), ticket()]).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let parsed = docx_rs::read_docx(&bytes).unwrap();
        let table_rows: usize = parsed
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                docx_rs::DocumentChild::Table(table) => Some(table.rows.len()),
                _ => None,
            })
            .sum();
        // encabezado + 2 asistencias
        assert_eq!(table_rows, 3);
    }

    #[test]
    fn missing_font_directory_is_reported() {
        let service = DocumentService::new(TicketRepository::new(), PathBuf::from("/no/existe/fonts"));
        let err = service.render_tickets(&[ticket()]).unwrap_err();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }
}
