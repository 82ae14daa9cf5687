mod common;

use asistencias::{
    db::CustomerRepository,
    models::customer::{CustomerFilter, CustomerPayload},
    services::CustomerService,
};
use rust_decimal::Decimal;

use common::migrated_pool;

fn service() -> CustomerService {
    CustomerService::new(CustomerRepository::new())
}

// Planilla exportada desde Excel: Latin-1 y punto y coma
const LATIN1_SHEET: &[u8] = b"ID;Nombre;Tel\xe9fono;Situaci\xf3n;Tipo Valor\n\
A1;Mar\xeda L\xf3pez;0981 111 222;Al d\xeda;Cliente 130.000\n\
;Pedro;0982-333-444;baja;Cliente 90.000\n\
;;;;\n\
;;;activo;\n";

#[tokio::test]
async fn imports_latin1_semicolon_sheet() {
    let pool = migrated_pool(false).await;
    let report = service().import_csv(&pool, LATIN1_SHEET).await.unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.encoding, "latin-1");
    assert_eq!(report.delimiter, ";");
    assert!(report.ignored_columns.is_empty());

    let list = service()
        .list_customers(&pool, &CustomerFilter::default())
        .await
        .unwrap();
    assert_eq!(list.total, 2);

    let maria = list.customers.iter().find(|c| c.external_id.as_deref() == Some("A1")).unwrap();
    assert_eq!(maria.name.as_deref(), Some("María López"));
    assert_eq!(maria.phone.as_deref(), Some("0981111222"));
    assert_eq!(maria.kind.as_deref(), Some("cliente"));
    assert_eq!(maria.amount.as_deref(), Some("130.000"));
    assert_eq!(maria.amount_value, Some(Decimal::from(130_000)));
    assert!(maria.active);

    let pedro = list.customers.iter().find(|c| c.name.as_deref() == Some("Pedro")).unwrap();
    assert!(!pedro.active);

    // Solo María está activa y no exonerada
    let summary = service().summary(&pool).await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.active, 1);
    assert_eq!(summary.monthly_billing, Decimal::from(130_000));
}

#[tokio::test]
async fn reimport_updates_by_external_id_then_phone() {
    let pool = migrated_pool(false).await;
    service().import_csv(&pool, LATIN1_SHEET).await.unwrap();

    let second = "id,nombre,telefono,situacion\n\
                  A1,María López Actualizada,0981 000 000,inactivo\n\
                  ,Pedro Gómez,(0982) 333-444,al dia\n";
    let report = service().import_csv(&pool, second.as_bytes()).await.unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 2);
    assert_eq!(report.encoding, "utf-8");
    assert_eq!(report.delimiter, ",");

    let list = service()
        .list_customers(&pool, &CustomerFilter::default())
        .await
        .unwrap();
    assert_eq!(list.total, 2);

    let maria = list.customers.iter().find(|c| c.external_id.as_deref() == Some("A1")).unwrap();
    assert_eq!(maria.name.as_deref(), Some("María López Actualizada"));
    assert_eq!(maria.phone.as_deref(), Some("0981000000"));
    assert!(!maria.active);

    let pedro = list
        .customers
        .iter()
        .find(|c| c.phone.as_deref() == Some("0982333444"))
        .unwrap();
    assert_eq!(pedro.name.as_deref(), Some("Pedro Gómez"));
    assert!(pedro.active);
}

#[tokio::test]
async fn filters_search_and_purge() {
    let pool = migrated_pool(false).await;
    service().import_csv(&pool, LATIN1_SHEET).await.unwrap();

    let by_phone = CustomerFilter { q: Some("0982".into()), ..Default::default() };
    let found = service().list_customers(&pool, &by_phone).await.unwrap();
    assert_eq!(found.customers.len(), 1);
    assert_eq!(found.customers[0].name.as_deref(), Some("Pedro"));
    // El total siempre es el de toda la tabla
    assert_eq!(found.total, 2);

    sqlx::query("INSERT INTO clientes (nombre, telefono, external_id) VALUES ('  ', NULL, '')")
        .execute(&pool)
        .await
        .unwrap();
    let purged = service().purge_blank_customers(&pool).await.unwrap();
    assert_eq!(purged.deleted, 1);
}

#[tokio::test]
async fn form_edits_derive_active_and_toggle() {
    let pool = migrated_pool(false).await;
    let payload = CustomerPayload {
        external_id: None,
        name: "Rosa".into(),
        reference: Some("frente a la plaza".into()),
        neighborhood: Some("San Vicente".into()),
        phone: Some("0983555666".into()),
        situation: Some("sin datos".into()),
        exempt: true,
        kind: None,
        amount: Some("100.000".into()),
        due_date: None,
    };

    let created = service().create_customer(&pool, &payload).await.unwrap();
    assert!(!created.active);
    assert!(created.exempt);
    assert_eq!(created.kind.as_deref(), Some("cliente"));

    let toggled = service().toggle_active(&pool, created.id).await.unwrap();
    assert!(toggled.active);

    let detail = service().customer_detail(&pool, created.id).await.unwrap();
    assert!(detail.tickets.is_empty());

    service().delete_customer(&pool, created.id).await.unwrap();
    assert!(service().get_customer(&pool, created.id).await.is_err());
}

#[tokio::test]
async fn strips_utf8_bom_before_reading_headers() {
    let pool = migrated_pool(false).await;
    let sheet = b"\xEF\xBB\xBFID,Nombre,Tel\xC3\xA9fono\nB7,Jos\xC3\xA9 Ortiz,0985 123 456\n";

    let report = service().import_csv(&pool, sheet).await.unwrap();

    assert_eq!(report.encoding, "utf-8-sig");
    assert_eq!(report.delimiter, ",");
    assert_eq!(report.inserted, 1);
    assert!(report.ignored_columns.is_empty());

    let list = service()
        .list_customers(&pool, &CustomerFilter::default())
        .await
        .unwrap();
    // Si el BOM quedara pegado, "ID" no se reconocería como ID externo
    let jose = list.customers.iter().find(|c| c.external_id.as_deref() == Some("B7")).unwrap();
    assert_eq!(jose.name.as_deref(), Some("José Ortiz"));
    assert_eq!(jose.phone.as_deref(), Some("0985123456"));
}

#[tokio::test]
async fn uneven_rows_fall_back_to_first_line_delimiter() {
    let pool = migrated_pool(false).await;
    // `;` no aparece igual en todas las líneas y `,` falta en el encabezado
    let sheet = "Nombre;Teléfono;Situación\n\
                 Ana Gómez;0981 555 666;activo, al día\n\
                 Luis;0983-777-888\n";

    let report = service().import_csv(&pool, sheet.as_bytes()).await.unwrap();

    assert_eq!(report.delimiter, ";");
    assert_eq!(report.inserted, 2);

    let list = service()
        .list_customers(&pool, &CustomerFilter::default())
        .await
        .unwrap();
    let ana = list.customers.iter().find(|c| c.name.as_deref() == Some("Ana Gómez")).unwrap();
    assert_eq!(ana.phone.as_deref(), Some("0981555666"));
    assert_eq!(ana.situation.as_deref(), Some("activo, al día"));
    let luis = list.customers.iter().find(|c| c.name.as_deref() == Some("Luis")).unwrap();
    assert_eq!(luis.phone.as_deref(), Some("0983777888"));
}

#[tokio::test]
async fn single_column_sheet_defaults_to_comma() {
    let pool = migrated_pool(false).await;

    let report = service().import_csv(&pool, b"nombre\nAna\nLuis\n").await.unwrap();

    assert_eq!(report.delimiter, ",");
    assert_eq!(report.inserted, 2);
}
