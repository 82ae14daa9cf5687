mod common;

use std::path::Path;

use asistencias::{
    build_router,
    config::{AppConfig, AppState},
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

use common::{migrated_pool, TEST_BCRYPT_COST};

fn test_config(upload_dir: &Path) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "secreto-de-prueba".into(),
        bind_addr: "127.0.0.1:0".into(),
        upload_dir: upload_dir.to_path_buf(),
        fonts_dir: upload_dir.join("fonts"),
        seed_demo: true,
        bcrypt_cost: TEST_BCRYPT_COST,
    }
}

async fn app() -> (Router, SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = migrated_pool(true).await;
    let state = AppState::from_pool(pool, test_config(dir.path())).unwrap();
    let pool = state.db_pool.clone();
    (build_router(state), pool, dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": "admin", "password": "fibra123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let (app, _pool, _dir) = app().await;
    let response = app.oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let (app, _pool, _dir) = app().await;

    let (status, body) = send(&app, get("/api/customers", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, get("/api/customers", Some("no-es-un-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let english = Request::builder()
        .uri("/api/tickets")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, english).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing or invalid session.");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (app, _pool, _dir) = app().await;
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": "admin", "password": "otra" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login_and_me() {
    let (app, _pool, _dir) = app().await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "username": "maria", "password": "clave1", "email": "maria@spynet.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/auth/register", None, json!({ "username": "maria", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": "maria", "password": "clave1", "remember": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, me) = send(&app, get("/api/users/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "maria");
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn forgot_password_replaces_the_credential() {
    let (app, _pool, _dir) = app().await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "username": "admin", "newPassword": "nueva", "confirmPassword": "otra" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "username": "admin", "newPassword": "nueva", "confirmPassword": "nueva" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/auth/login", None, json!({ "username": "admin", "password": "nueva" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn lists_seeded_customers_with_a_session() {
    let (app, _pool, _dir) = app().await;
    let token = login(&app).await;

    let (status, body) = send(&app, get("/api/customers", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["customers"][0]["name"], "Cliente Demo");
}

#[tokio::test]
async fn gps_ping_validates_and_records() {
    let (app, pool, _dir) = app().await;

    let (status, _) = send(&app, get("/gps", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/gps?tecnico_id=1&lat=abc&lng=-57.6", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/gps?tecnico_id=1&lat=-25.30&lng=-57.60&battery=80", None)).await;
    assert_eq!(status, StatusCode::OK);

    let form = Request::builder()
        .method("POST")
        .uri("/gps")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("tecnico_id=1&lat=-25.31&lng=-57.61"))
        .unwrap();
    let (status, _) = send(&app, form).await;
    assert_eq!(status, StatusCode::OK);

    // 3 posiciones de demo + 2 pings; solo el primero trae datos de track
    let positions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tecnico_pos WHERE tecnico_id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(positions, 5);
    let tracks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tecnico_tracks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tracks, 1);

    let (lat, lng): (f64, f64) = sqlx::query_as("SELECT lat, lng FROM tecnicos WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((lat, lng), (-25.31, -57.61));
}

#[tokio::test]
async fn ticket_lifecycle_and_agenda() {
    let (app, _pool, _dir) = app().await;
    let token = login(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/tickets",
            Some(&token),
            json!({ "customer": "Ramona Benítez", "status": "terminado" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, ticket) = send(
        &app,
        json_request(
            "POST",
            "/api/tickets",
            Some(&token),
            json!({
                "customer": "Ramona Benítez",
                "problem": "Sin señal",
                "scheduledLocal": "2030-05-10T09:30",
                "technicianId": 1
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{ticket}");
    assert_eq!(ticket["pppoe"], "ramonabenitez@spynet.com");
    assert_eq!(ticket["kind"], "Soporte");
    assert_eq!(ticket["priority"], "Media");
    assert_eq!(ticket["channel"], "web");
    assert_eq!(ticket["status"], "pendiente");
    assert_eq!(ticket["scheduledAt"], "2030-05-10 09:30");
    let id = ticket["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        json_request("PUT", &format!("/api/tickets/{id}/status"), Some(&token), json!({ "status": "cerrado" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(
        &app,
        json_request("PUT", &format!("/api/tickets/{id}/status"), Some(&token), json!({ "status": "en_progreso" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "en_progreso");

    let (status, agenda) = send(&app, get("/api/agenda?dia=2030-05-10", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agenda["prevDay"], "2030-05-09");
    assert_eq!(agenda["nextDay"], "2030-05-11");
    assert_eq!(agenda["events"].as_array().unwrap().len(), 1);
    assert_eq!(agenda["events"][0]["linkedTechnician"], "Juan");
    assert!(agenda.get("warning").is_none());

    let (status, filtered) =
        send(&app, get("/api/agenda?dia=2030-05-10&estado=resuelto", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(filtered["events"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, get("/api/agenda?dia=10/05/2030", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = send(&app, get("/api/tickets", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn equipment_usage_resolves_item_type() {
    let (app, _pool, _dir) = app().await;
    let token = login(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/equipment/usage",
            Some(&token),
            json!({ "itemId": 2, "technician": "Juan", "service": "Instalación" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/equipment/usage", Some(&token), json!({ "itemId": 999, "technician": "Juan" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, overview) = send(&app, get("/api/equipment", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["stats"]["total"], 7);
    assert_eq!(overview["stats"]["inUse"], 1);
    assert_eq!(overview["stats"]["available"], 6);
    assert_eq!(overview["history"][0]["itemName"], "ONU");
    assert_eq!(overview["history"][0]["itemType"], "equipo");
}

#[tokio::test]
async fn pdf_without_fonts_is_a_server_error() {
    let (app, _pool, _dir) = app().await;
    let token = login(&app).await;

    let (status, body) = send(&app, get("/api/reports/tickets.pdf", Some(&token))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn word_report_downloads_as_docx() {
    let (app, _pool, _dir) = app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/reports/tickets.docx", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"PK"));

    let (status, _) = send(&app, get("/api/reports/tickets.docx", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn agenda_rejects_malformed_day_and_status() {
    let (app, _pool, _dir) = app().await;
    let token = login(&app).await;

    for uri in ["/api/agenda?dia=2030-13-40", "/api/agenda?dia=ma%C3%B1ana"] {
        let (status, body) = send(&app, get(uri, Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("AAAA-MM-DD"), "{body}");
    }

    let unknown_status = get("/api/agenda?dia=2030-05-10&estado=cerrado", Some(&token));
    let (status, _) = send(&app, unknown_status).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Un técnico no numérico se ignora
    let text_technician = get("/api/agenda?dia=2030-05-10&tecnico_id=juan", Some(&token));
    let (status, _) = send(&app, text_technician).await;
    assert_eq!(status, StatusCode::OK);
}
