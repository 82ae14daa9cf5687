mod common;

use asistencias::{
    common::{
        db_utils::{has_column, table_columns},
        error::AppError,
    },
    db::{
        schema::run_migrations, seed::ADMIN_PASSWORD, CustomerRepository, TicketRepository,
        TrackingRepository, UserRepository,
    },
    services::{
        auth::{verify_password, AuthService},
        TicketService,
    },
};

use common::{memory_pool, migrated_pool, options, TEST_BCRYPT_COST};

#[tokio::test]
async fn fresh_database_gets_full_schema_and_seeds() {
    let pool = memory_pool().await;
    let report = run_migrations(&pool, &options(true)).await.unwrap();

    assert!(report.admin_seeded);
    assert_eq!(report.passwords_migrated, 0);
    // 4 equipos + 3 herramientas + técnico, 3 posiciones, cliente y asistencia
    assert_eq!(report.demo_rows_inserted, 13);
    assert_eq!(report.indexes_ensured, 11);

    for (table, column) in [
        ("asistencias", "programada_en"),
        ("asistencias", "canal"),
        ("clientes", "tipo_valor"),
        ("tecnicos", "tracking_token"),
        ("usuarios", "updated_at"),
        ("ticket_fotos", "created_at"),
    ] {
        assert!(has_column(&pool, table, column).await.unwrap(), "{}.{}", table, column);
    }

    let (hash, rol): (String, String) =
        sqlx::query_as("SELECT password_hash, rol FROM usuarios WHERE usuario = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rol, "admin");
    assert!(verify_password(ADMIN_PASSWORD.into(), hash).await.unwrap());
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let pool = migrated_pool(true).await;
    let columns_before = table_columns(&pool, "clientes").await.unwrap();

    let second = run_migrations(&pool, &options(true)).await.unwrap();

    assert!(second.is_noop(), "{:?}", second);
    assert_eq!(table_columns(&pool, "clientes").await.unwrap(), columns_before);

    let equipos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipos")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(equipos, 4);
}

#[tokio::test]
async fn legacy_database_is_upgraded_in_place() {
    let pool = memory_pool().await;

    // Esquema de una instalación vieja: texto plano y estados sucios
    sqlx::query(
        "CREATE TABLE usuarios (id INTEGER PRIMARY KEY AUTOINCREMENT, usuario TEXT UNIQUE NOT NULL, contrasena TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO usuarios (usuario, contrasena) VALUES ('pepe', 'secreto')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE asistencias (id INTEGER PRIMARY KEY AUTOINCREMENT, cliente TEXT, fecha TEXT, estado TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO asistencias (cliente, fecha, estado) VALUES
            ('Ana', '2024-01-01 10:00:00', 'Resuelto '),
            ('Luis', '2024-01-02 10:00:00', NULL),
            ('Eva', '2024-01-03 10:00:00', 'cerrado'),
            ('Juan', '2024-01-04 10:00:00', 'en_progreso'),
            ('Pia', '2024-01-05 10:00:00', 'En Proceso'),
            ('Teo', '2024-01-06 10:00:00', 'archivado')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let report = run_migrations(&pool, &options(false)).await.unwrap();

    assert!(!report.admin_seeded);
    assert_eq!(report.passwords_migrated, 1);
    assert_eq!(report.statuses_normalized, 5);
    assert!(report.columns_added.contains(&"usuarios.password_hash".to_string()));
    assert!(report.columns_added.contains(&"asistencias.programada_en".to_string()));
    assert_eq!(report.demo_rows_inserted, 0);

    let (hash, plain): (String, Option<String>) =
        sqlx::query_as("SELECT password_hash, contrasena FROM usuarios WHERE usuario = 'pepe'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(verify_password("secreto".into(), hash).await.unwrap());
    assert_eq!(plain.as_deref().unwrap_or(""), "");

    let statuses: Vec<String> = sqlx::query_scalar("SELECT estado FROM asistencias ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    // Los sinónimos conocidos se conservan; lo irreconocible queda pendiente
    assert_eq!(
        statuses,
        ["resuelto", "pendiente", "resuelto", "en_progreso", "en_progreso", "pendiente"]
    );

    let channels: Vec<String> = sqlx::query_scalar("SELECT DISTINCT canal FROM asistencias")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(channels, ["web"]);

    let created_at: Option<String> =
        sqlx::query_scalar("SELECT created_at FROM usuarios WHERE usuario = 'pepe'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(created_at.is_some());

    assert!(run_migrations(&pool, &options(false)).await.unwrap().is_noop());
}

fn auth_service(pool: &sqlx::SqlitePool) -> AuthService {
    AuthService::new(
        UserRepository::new(pool.clone()),
        "secreto-de-prueba".into(),
        TEST_BCRYPT_COST,
        pool.clone(),
    )
}

#[tokio::test]
async fn werkzeug_hashes_still_log_in_and_move_to_bcrypt() {
    let pool = memory_pool().await;

    // Usuarios escritos por el panel anterior
    sqlx::query(
        "CREATE TABLE usuarios (id INTEGER PRIMARY KEY AUTOINCREMENT, usuario TEXT UNIQUE NOT NULL,
                                contrasena TEXT, password_hash TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO usuarios (usuario, contrasena, password_hash) VALUES (?, '', ?), (?, '', ?)")
        .bind("admin")
        .bind("pbkdf2:sha256:1000$Xy7kP2qL$9c297fac7e201c759fbbbe03ad37c9f15d2ac21cc20bdd60fe70ea7672fc14c1")
        .bind("ana")
        .bind(
            "scrypt:1024:8:1$Qm3vT9wZ$857c5fa63bcb4d58f9137f0227a3eb3080a2f9111915e11eda7bd1f89a4738fc6b\
             b5c815392b365546cf99dde0ead8182c260960dd56d67c858941c96f6f1687",
        )
        .execute(&pool)
        .await
        .unwrap();

    let report = run_migrations(&pool, &options(false)).await.unwrap();
    assert!(!report.admin_seeded);
    assert_eq!(report.passwords_migrated, 0);

    let auth = auth_service(&pool);
    assert!(matches!(
        auth.login_user("admin", "otra", false).await,
        Err(AppError::InvalidCredentials)
    ));
    auth.login_user("admin", ADMIN_PASSWORD, false).await.unwrap();
    auth.login_user("ana", "fibra123", true).await.unwrap();

    let hashes: Vec<String> = sqlx::query_scalar("SELECT password_hash FROM usuarios ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    for hash in &hashes {
        assert!(hash.starts_with("$2"), "{}", hash);
        assert!(verify_password(ADMIN_PASSWORD.into(), hash.clone()).await.unwrap());
    }

    // Ya con bcrypt
    auth.login_user("admin", ADMIN_PASSWORD, false).await.unwrap();
}

#[tokio::test]
async fn reschedule_reports_missing_schedule_column() {
    let pool = memory_pool().await;

    // Tabla de una instalación sin migrar: no tiene `programada_en`
    sqlx::query(
        "CREATE TABLE asistencias (id INTEGER PRIMARY KEY AUTOINCREMENT, cliente TEXT, fecha TEXT, estado TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO asistencias (cliente, fecha, estado) VALUES ('Ana', '2024-01-01 10:00:00', 'pendiente')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let service = TicketService::new(
        TicketRepository::new(),
        CustomerRepository::new(),
        TrackingRepository::new(),
    );
    let err = service.reschedule(&pool, 1, Some("2024-02-01T09:00")).await.unwrap_err();

    match err {
        AppError::MissingColumn { table, column } => {
            assert_eq!(table, "asistencias");
            assert_eq!(column, "programada_en");
        }
        other => panic!("error inesperado: {:?}", other),
    }
}
