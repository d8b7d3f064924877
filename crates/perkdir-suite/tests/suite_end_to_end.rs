use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path as FsPath, PathBuf};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use perkdir_config::{
    HarnessConfig, ENV_API_BASE_URL, ENV_CLEANUP_SHELL, ENV_DATABASE_URI, ENV_DEBOUNCE_MS,
};
use perkdir_fixture::FixtureError;
use perkdir_suite::{run_suite, ScenarioOutcome};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
struct MockDb {
    perks: Vec<Value>,
    deleted_ids: Vec<String>,
    registered_emails: Vec<String>,
    next_id: usize,
    reject_registration: bool,
    hide_listings: bool,
}

type SharedDb = Arc<Mutex<MockDb>>;

async fn register(State(db): State<SharedDb>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut db = db.lock().expect("db lock");
    if db.reject_registration {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "registration disabled" })),
        );
    }
    let email = body["email"].as_str().unwrap_or_default().to_owned();
    db.registered_emails.push(email.clone());
    (
        StatusCode::CREATED,
        Json(json!({
            "token": "token-e2e",
            "user": { "_id": "u-1", "name": body["name"], "email": email }
        })),
    )
}

async fn create_perk(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !headers.contains_key("authorization") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing bearer token" })),
        );
    }
    let mut db = db.lock().expect("db lock");
    let duplicate = db.perks.iter().any(|perk| {
        perk["title"] == body["title"] && perk["merchant"] == body["merchant"]
    });
    if duplicate {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "perk already exists" })),
        );
    }
    db.next_id += 1;
    let mut record = body;
    record["_id"] = json!(format!("p-{}", db.next_id));
    db.perks.push(record.clone());
    (StatusCode::CREATED, Json(json!({ "perk": record })))
}

async fn list_perks(
    State(db): State<SharedDb>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let db = db.lock().expect("db lock");
    if db.hide_listings {
        return Json(json!({ "perks": [] }));
    }
    let name = params.get("name").map(|value| value.to_lowercase());
    let merchant = params.get("merchant");
    let matches: Vec<Value> = db
        .perks
        .iter()
        .filter(|perk| {
            let title = perk["title"].as_str().unwrap_or_default().to_lowercase();
            let perk_merchant = perk["merchant"].as_str().unwrap_or_default();
            let name_ok = name
                .as_deref()
                .map(|needle| title.contains(needle))
                .unwrap_or(true);
            let merchant_ok = merchant
                .map(|wanted| perk_merchant == wanted)
                .unwrap_or(true);
            name_ok && merchant_ok
        })
        .cloned()
        .collect();
    Json(json!({ "perks": matches }))
}

async fn list_all_perks(State(db): State<SharedDb>) -> Json<Value> {
    let db = db.lock().expect("db lock");
    Json(Value::Array(db.perks.clone()))
}

async fn delete_perk(State(db): State<SharedDb>, Path(id): Path<String>) -> StatusCode {
    let mut db = db.lock().expect("db lock");
    db.perks
        .retain(|perk| perk["_id"].as_str() != Some(id.as_str()));
    db.deleted_ids.push(id);
    StatusCode::NO_CONTENT
}

async fn spawn_mock_api(db: SharedDb) -> (String, oneshot::Sender<()>) {
    let app = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/perks", post(create_perk).get(list_perks))
        .route("/api/perks/all", get(list_all_perks))
        .route("/api/perks/{id}", delete(delete_perk))
        .with_state(db);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock api listener");
    let address: SocketAddr = listener.local_addr().expect("mock api local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("run mock api");
    });
    (format!("http://{address}/api"), shutdown_tx)
}

fn write_fake_shell(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("fake-admin-shell.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake shell");
    let mut permissions = fs::metadata(&path).expect("fake shell metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod fake shell");
    path
}

fn config_for(base_url: &str, shell: &FsPath) -> HarnessConfig {
    let base_url = base_url.to_owned();
    let shell = shell.to_string_lossy().into_owned();
    HarnessConfig::from_lookup(move |name| match name {
        ENV_DATABASE_URI => Some("mongodb://db/test".to_owned()),
        ENV_API_BASE_URL => Some(base_url.clone()),
        ENV_CLEANUP_SHELL => Some(shell.clone()),
        ENV_DEBOUNCE_MS => Some("25".to_owned()),
        _ => None,
    })
    .expect("config")
}

#[tokio::test]
async fn the_full_suite_passes_and_cleans_up_after_itself() {
    let db: SharedDb = Arc::default();
    let (base_url, shutdown_tx) = spawn_mock_api(db.clone()).await;
    let dir = TempDir::new().expect("tempdir");
    let capture = dir.path().join("captured-script.js");
    let shell = write_fake_shell(&dir, &format!("cat > {}\nexit 0", capture.display()));

    let report = run_suite(&config_for(&base_url, &shell))
        .await
        .expect("suite runs");

    assert!(report.succeeded(), "report: {report:?}");
    assert_eq!(report.outcomes.len(), 2);
    for (name, outcome) in &report.outcomes {
        assert_eq!(outcome, &ScenarioOutcome::Passed, "scenario {name}");
    }

    let db = db.lock().expect("db lock");
    assert!(
        db.perks.is_empty(),
        "teardown must drain every seeded record: {:?}",
        db.perks
    );
    assert_eq!(db.deleted_ids.len(), 1);

    let email = db.registered_emails.first().expect("one registration");
    let script = fs::read_to_string(&capture).expect("captured cleanup script");
    assert!(script.contains("deleteOne"), "script: {script}");
    assert!(
        script.contains(&email.to_lowercase()),
        "cleanup must target the run's identity: {script}"
    );

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn scenarios_are_inconclusive_when_the_store_lists_nothing() {
    let db: SharedDb = Arc::default();
    db.lock().expect("db lock").hide_listings = true;
    let (base_url, shutdown_tx) = spawn_mock_api(db.clone()).await;
    let dir = TempDir::new().expect("tempdir");
    let shell = write_fake_shell(&dir, "cat >/dev/null\nexit 0");

    let report = run_suite(&config_for(&base_url, &shell))
        .await
        .expect("suite runs");

    assert!(report.succeeded(), "skips are not failures: {report:?}");
    for (name, outcome) in &report.outcomes {
        assert!(
            matches!(outcome, ScenarioOutcome::Skipped(_)),
            "scenario {name} should be inconclusive, got {outcome:?}"
        );
    }

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn a_failing_identity_removal_is_reported_as_teardown_failure() {
    let db: SharedDb = Arc::default();
    let (base_url, shutdown_tx) = spawn_mock_api(db.clone()).await;
    let dir = TempDir::new().expect("tempdir");
    let shell = write_fake_shell(&dir, "cat >/dev/null\nexit 1");

    let report = run_suite(&config_for(&base_url, &shell))
        .await
        .expect("suite runs");

    assert!(!report.succeeded());
    assert!(matches!(
        report.teardown_error,
        Some(FixtureError::TeardownFailure(_))
    ));
    // Scenario results are unaffected by the late teardown failure.
    assert_eq!(report.outcomes.len(), 2);
    for (_, outcome) in &report.outcomes {
        assert_eq!(outcome, &ScenarioOutcome::Passed);
    }
    // Record cleanup was still attempted before the identity step failed.
    assert_eq!(db.lock().expect("db lock").deleted_ids.len(), 1);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn rejected_registration_aborts_the_suite() {
    let db: SharedDb = Arc::default();
    db.lock().expect("db lock").reject_registration = true;
    let (base_url, shutdown_tx) = spawn_mock_api(db.clone()).await;
    let dir = TempDir::new().expect("tempdir");
    let shell = write_fake_shell(&dir, "cat >/dev/null\nexit 0");

    let error = run_suite(&config_for(&base_url, &shell))
        .await
        .expect_err("registration failure is fatal");
    assert!(matches!(error, FixtureError::Registration(_)));

    let _ = shutdown_tx.send(());
}
