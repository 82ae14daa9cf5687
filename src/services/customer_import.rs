// src/services/customer_import.rs
//
// Lectura y normalización de la planilla de clientes (CSV). Todo lo de este
// módulo es puro; la escritura en la base la hace `CustomerService`.

use std::{collections::HashMap, str::FromStr};

use chrono::NaiveDate;
use csv::ReaderBuilder;
use encoding_rs::{UTF_8, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::common::error::AppError;

const SNIFF_SAMPLE_CHARS: usize = 1024;
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'|', b'\t'];

const TRUE_WORDS: [&str; 9] = ["1", "si", "sí", "true", "verdadero", "x", "s", "y", "yes"];
const INACTIVE_WORDS: [&str; 4] = ["inactivo", "baja", "suspendido", "cancelado"];
const ACTIVE_WORDS: [&str; 5] = ["activo", "al día", "al dia", "en servicio", "ok"];

pub const DEFAULT_KIND: &str = "cliente";

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("regex de encabezados"));
static DMY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})$").expect("regex de fecha D/M/Y")
});
static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d.,]*").expect("regex de montos"));

// --- 1. Encabezados ---

/// Campo de `clientes` al que apunta un encabezado del CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerField {
    ExternalId,
    Name,
    Reference,
    Neighborhood,
    Phone,
    Situation,
    Exempt,
    KindAmount,
    Kind,
    Amount,
    DueDate,
}

impl CustomerField {
    /// Sinónimos aceptados, ya pasados por `normalize_header_key`.
    pub fn from_header_key(key: &str) -> Option<Self> {
        let field = match key {
            "id" | "external_id" => CustomerField::ExternalId,
            "nombre" => CustomerField::Name,
            "referencia" => CustomerField::Reference,
            "barrio" => CustomerField::Neighborhood,
            "telefono" | "telefono_1" | "tel" | "tefono" | "celular" => CustomerField::Phone,
            "situacion" | "estado" => CustomerField::Situation,
            "exonerado" | "exento" => CustomerField::Exempt,
            "tipo_valor" => CustomerField::KindAmount,
            "tipo" => CustomerField::Kind,
            "valor" => CustomerField::Amount,
            "vencimiento" | "fecha_vencimiento" => CustomerField::DueDate,
            _ => return None,
        };
        Some(field)
    }
}

/// Quita tildes y diéresis del alfabeto español/portugués.
pub fn strip_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// " Teléfono 1 " -> "telefono_1"
pub fn normalize_header_key(header: &str) -> String {
    let folded = strip_diacritics(header.trim()).to_lowercase();
    NON_ALNUM_RE.replace_all(&folded, "_").trim_matches('_').to_string()
}

// --- 2. Valores ---

pub fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    TRUE_WORDS.contains(&v.as_str())
}

/// D/M/Y o D-M-Y a ISO. Lo que no se entiende se devuelve tal cual.
pub fn parse_date_to_iso(value: &str) -> Option<String> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = DMY_RE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = if caps[3].len() == 2 { format!("20{}", &caps[3]) } else { caps[3].to_string() };

        return match year.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, month, day)) {
            Some(date) => Some(date.format("%Y-%m-%d").to_string()),
            None => Some(s.to_string()),
        };
    }

    // YYYY-MM-DD y cualquier otro texto pasan sin cambios
    Some(s.to_string())
}

/// Solo dígitos si quedan al menos 6; si no, el texto original.
pub fn normalize_phone(value: &str) -> Option<String> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 6 {
        Some(digits)
    } else {
        Some(raw.to_string())
    }
}

/// Primer número de un texto ("cliente 130.000" -> "130.000").
pub fn extract_amount(text: &str) -> Option<String> {
    AMOUNT_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
        .filter(|s| !s.is_empty())
}

/// Separa tipo y monto. `kind_or_combined` puede venir como "cliente 130.000".
pub fn split_kind_amount(kind_or_combined: Option<&str>, amount: Option<&str>) -> (String, Option<String>) {
    let source = kind_or_combined.map(str::trim).unwrap_or("");

    let kind = match AMOUNT_RE.find(source) {
        Some(m) => source[..m.start()].trim(),
        None => source,
    }
    .to_lowercase();
    let kind = if kind.is_empty() { DEFAULT_KIND.to_string() } else { kind };

    let amount = amount
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .or_else(|| extract_amount(source));

    (kind, amount)
}

/// "130.000" -> 130000; "1.500,50" -> 1500.50. Punto de miles, coma decimal.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let number = extract_amount(text)?;
    let normalized = number.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).ok()
}

/// Activo según la situación: las palabras negativas mandan, después las
/// afirmativas; si no aparece ninguna se usa `fallback`.
pub fn derive_active(situation: &str, fallback: bool) -> bool {
    let s = situation.trim().to_lowercase();
    if INACTIVE_WORDS.iter().any(|w| s.contains(w)) {
        return false;
    }
    if ACTIVE_WORDS.iter().any(|w| s.contains(w)) {
        return true;
    }
    fallback
}

// --- 3. Archivo ---

/// UTF-8 con BOM, UTF-8 y por último Latin-1, que nunca falla.
pub fn decode_bytes(bytes: &[u8]) -> (String, &'static str) {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(rest) {
            return (text.into_owned(), "utf-8-sig");
        }
    }
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return (text.into_owned(), "utf-8");
    }
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    (text.into_owned(), "latin-1")
}

/// Olfatea el separador en el comienzo del texto: gana el candidato que
/// aparece la misma cantidad de veces en todas las líneas. Si ninguno es
/// consistente, compara `;` contra `,` en la primera línea.
pub fn guess_delimiter(text: &str) -> u8 {
    let sample: String = text.chars().take(SNIFF_SAMPLE_CHARS).collect();
    let truncated = text.chars().nth(SNIFF_SAMPLE_CHARS).is_some();

    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if truncated && lines.len() > 1 {
        lines.pop();
    }

    let mut best: Option<(u8, f32)> = None;
    for &delimiter in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> =
            lines.iter().map(|l| l.bytes().filter(|&b| b == delimiter).count()).collect();
        let Some(&first) = counts.first() else { continue };
        if first == 0 || counts.iter().any(|&c| c != first) {
            continue;
        }
        let score = first as f32;
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((delimiter, score));
        }
    }

    if let Some((delimiter, _)) = best {
        return delimiter;
    }

    let head = text.lines().next().unwrap_or("");
    if head.matches(';').count() > head.matches(',').count() {
        b';'
    } else {
        b','
    }
}

pub fn delimiter_label(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

/// Fila ya normalizada, lista para upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub external_id: Option<String>,
    pub name: String,
    pub reference: Option<String>,
    pub neighborhood: Option<String>,
    pub phone: Option<String>,
    pub situation: Option<String>,
    pub exempt: bool,
    pub kind: String,
    pub amount: Option<String>,
    /// Texto combinado original, si vino en la columna `tipo_valor`
    pub kind_amount: Option<String>,
    pub due_date: Option<String>,
    pub active: bool,
}

impl CustomerRecord {
    /// `None` cuando la fila no trae ni ID externo, ni nombre, ni teléfono.
    pub fn from_fields(values: &HashMap<CustomerField, String>) -> Option<Self> {
        let get = |field: CustomerField| -> Option<&str> {
            values.get(&field).map(|v| v.trim()).filter(|v| !v.is_empty())
        };

        let external_id = get(CustomerField::ExternalId).map(str::to_string);
        let name = get(CustomerField::Name).unwrap_or("").to_string();
        let phone = get(CustomerField::Phone).and_then(normalize_phone);

        if external_id.is_none() && name.is_empty() && phone.is_none() {
            return None;
        }

        let situation = get(CustomerField::Situation).map(str::to_string);
        let kind_amount = get(CustomerField::KindAmount).map(str::to_string);
        let (kind, amount) = split_kind_amount(
            get(CustomerField::Kind).or(kind_amount.as_deref()),
            get(CustomerField::Amount),
        );

        Some(Self {
            external_id,
            name,
            reference: get(CustomerField::Reference).map(str::to_string),
            neighborhood: get(CustomerField::Neighborhood).map(str::to_string),
            phone,
            active: derive_active(situation.as_deref().unwrap_or(""), true),
            situation,
            exempt: get(CustomerField::Exempt).map(parse_bool).unwrap_or(false),
            kind,
            amount,
            kind_amount,
            due_date: get(CustomerField::DueDate).and_then(parse_date_to_iso),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub records: Vec<CustomerRecord>,
    pub skipped: u64,
    pub encoding: &'static str,
    pub delimiter: u8,
    pub ignored_columns: Vec<String>,
}

/// Decodifica, detecta separador, mapea encabezados y normaliza cada fila.
pub fn parse_customers_csv(bytes: &[u8]) -> Result<ParsedCsv, AppError> {
    let (text, encoding) = decode_bytes(bytes);
    let delimiter = guess_delimiter(&text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::CsvNoHeaders);
    }

    let mut mapping: Vec<Option<CustomerField>> = Vec::with_capacity(headers.len());
    let mut ignored_columns = Vec::new();
    for header in headers.iter() {
        let field = CustomerField::from_header_key(&normalize_header_key(header));
        if field.is_none() {
            ignored_columns.push(header.to_string());
        }
        mapping.push(field);
    }
    if mapping.iter().all(Option::is_none) {
        return Err(AppError::CsvNoKnownColumns);
    }

    let mut records = Vec::new();
    let mut skipped = 0;

    for result in reader.records() {
        let row = result?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            skipped += 1;
            continue;
        }

        // Si dos columnas apuntan al mismo campo, queda el primer valor no vacío
        let mut values: HashMap<CustomerField, String> = HashMap::new();
        for (cell, field) in row.iter().zip(&mapping) {
            let Some(field) = field else { continue };
            let cell = cell.trim();
            let slot = values.entry(*field).or_default();
            if slot.is_empty() {
                *slot = cell.to_string();
            }
        }

        match CustomerRecord::from_fields(&values) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    Ok(ParsedCsv { records, skipped, encoding, delimiter, ignored_columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn header_keys_are_folded() {
        assert_eq!(normalize_header_key(" Teléfono 1 "), "telefono_1");
        assert_eq!(normalize_header_key("Situación"), "situacion");
        assert_eq!(normalize_header_key("Fecha de Vencimiento"), "fecha_de_vencimiento");
        assert_eq!(normalize_header_key("__ID__"), "id");
    }

    #[test]
    fn header_synonyms_resolve() {
        assert_eq!(CustomerField::from_header_key("celular"), Some(CustomerField::Phone));
        assert_eq!(CustomerField::from_header_key("estado"), Some(CustomerField::Situation));
        assert_eq!(CustomerField::from_header_key("exento"), Some(CustomerField::Exempt));
        assert_eq!(CustomerField::from_header_key("observaciones"), None);
    }

    #[test]
    fn bools_accept_spanish_words() {
        for v in ["1", "Si", "SÍ", "x", "Yes", " verdadero "] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["", "0", "no", "falso"] {
            assert!(!parse_bool(v), "{v}");
        }
    }

    #[test]
    fn dates_become_iso() {
        assert_eq!(parse_date_to_iso("5/7/24").as_deref(), Some("2024-07-05"));
        assert_eq!(parse_date_to_iso("05-07-2024").as_deref(), Some("2024-07-05"));
        assert_eq!(parse_date_to_iso("2024-07-05").as_deref(), Some("2024-07-05"));
        // Fecha imposible y texto libre quedan como vinieron
        assert_eq!(parse_date_to_iso("31/02/2024").as_deref(), Some("31/02/2024"));
        assert_eq!(parse_date_to_iso("fin de mes").as_deref(), Some("fin de mes"));
        assert_eq!(parse_date_to_iso("  "), None);
    }

    #[test]
    fn phones_keep_digits_only_when_long_enough() {
        assert_eq!(normalize_phone("(0981) 123-456").as_deref(), Some("0981123456"));
        assert_eq!(normalize_phone("int 12").as_deref(), Some("int 12"));
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn kind_and_amount_are_split() {
        assert_eq!(
            split_kind_amount(Some("Cliente 130.000"), None),
            ("cliente".to_string(), Some("130.000".to_string()))
        );
        assert_eq!(
            split_kind_amount(Some("Empresa"), Some("250.000")),
            ("empresa".to_string(), Some("250.000".to_string()))
        );
        assert_eq!(split_kind_amount(None, None), ("cliente".to_string(), None));
        assert_eq!(
            split_kind_amount(Some("150.000"), None),
            ("cliente".to_string(), Some("150.000".to_string()))
        );
    }

    #[test]
    fn amounts_parse_with_thousand_dots() {
        assert_eq!(parse_amount("130.000"), Some(dec("130000")));
        assert_eq!(parse_amount("Gs. 1.500,50"), Some(dec("1500.50")));
        assert_eq!(parse_amount("sin monto"), None);
    }

    #[test]
    fn negative_situation_wins() {
        assert!(!derive_active("Inactivo", true));
        assert!(!derive_active("baja por mora", true));
        assert!(derive_active("Al día", false));
        assert!(derive_active("", true));
        assert!(!derive_active("moroso", false));
    }

    #[test]
    fn decodes_latin1_when_not_utf8() {
        let (text, enc) = decode_bytes(b"nombre;tel\xe9fono\n");
        assert_eq!(enc, "latin-1");
        assert!(text.contains("teléfono"));

        let (text, enc) = decode_bytes("\u{feff}nombre".as_bytes());
        assert_eq!(enc, "utf-8-sig");
        assert_eq!(text, "nombre");

        let (_, enc) = decode_bytes("Situación".as_bytes());
        assert_eq!(enc, "utf-8");
    }

    #[test]
    fn sniffs_consistent_delimiter() {
        assert_eq!(guess_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(guess_delimiter("a|b\n1|2\n"), b'|');
        assert_eq!(guess_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        // Monto con coma decimal dentro de un CSV con punto y coma
        assert_eq!(guess_delimiter("nombre;valor\nAna;1,5\nLuis;2\n"), b';');
    }

    #[test]
    fn falls_back_to_first_line_counts() {
        // Ningún candidato es consistente
        assert_eq!(guess_delimiter("a;b;c\n1;2\n"), b';');
        assert_eq!(guess_delimiter("a,b,c\n1,2\n"), b',');
        assert_eq!(guess_delimiter(""), b',');
    }

    #[test]
    fn parses_a_realistic_sheet() {
        let csv = "ID;Nombre;Teléfono;Situación;Exonerado;Tipo Valor;Vencimiento;Obs\n\
                   1043;Ramona Benítez;0981 123 456;Al día;no;Cliente 130.000;5/7/24;x\n\
                   ;;;;;;;\n\
                   ;;;;;;;solo obs\n\
                   ;Pedro;;baja;si;;;\n";
        let parsed = parse_customers_csv(csv.as_bytes()).unwrap();

        assert_eq!(parsed.delimiter, b';');
        assert_eq!(parsed.encoding, "utf-8");
        assert_eq!(parsed.ignored_columns, vec!["Obs".to_string()]);
        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.records.len(), 2);

        let ramona = &parsed.records[0];
        assert_eq!(ramona.external_id.as_deref(), Some("1043"));
        assert_eq!(ramona.phone.as_deref(), Some("0981123456"));
        assert_eq!(ramona.kind, "cliente");
        assert_eq!(ramona.amount.as_deref(), Some("130.000"));
        assert_eq!(ramona.due_date.as_deref(), Some("2024-07-05"));
        assert!(ramona.active);
        assert!(!ramona.exempt);

        let pedro = &parsed.records[1];
        assert!(!pedro.active);
        assert!(pedro.exempt);
    }

    #[test]
    fn rejects_sheets_without_known_headers() {
        assert!(matches!(parse_customers_csv(b"foo,bar\n1,2\n"), Err(AppError::CsvNoKnownColumns)));
        assert!(matches!(parse_customers_csv(b""), Err(AppError::CsvNoHeaders)));
    }
}
