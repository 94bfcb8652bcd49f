//! Store and evaluation-flow integration tests
//!
//! These run against a real PostgreSQL database: set DATABASE_URL to a
//! disposable test database and run with `cargo test -- --ignored`.
//! Migrations are applied on first connect; tests share the database, so a
//! lock serializes them and each test works on its own rows.
//!
//! Covered here:
//! - marking a triggered alert read twice is an idempotent no-op
//! - rules owned by another user surface as not-found, never as data
//! - appending the same forecast date twice leaves a single entry
//! - a breached humidity rule sends exactly one email and logs exactly one
//!   triggered alert, with the repeat firing suppressed by the cooldown

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{routing, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use meteowatch::error::AppError;
use meteowatch::external::{MailClient, WeatherClient};
use meteowatch::services::alert_rules::{
    AlertCondition, AlertMetric, AlertRuleService, CreateAlertRuleInput, Severity,
    UpdateAlertRuleInput,
};
use meteowatch::services::evaluation::{Clock, EvaluationService};
use meteowatch::services::snapshots::{NewForecastDay, NewSnapshot, SnapshotStore};
use meteowatch::services::triggered::{NewTriggeredAlert, TriggeredAlertService};

static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .expect("set DATABASE_URL to a disposable test database");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("failed to connect to the test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

async fn insert_user(pool: &PgPool, verified: bool, city: Option<&str>) -> Uuid {
    let email = format!("user-{}@example.com", Uuid::new_v4().simple());
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (username, email, password_hash, city, is_verified)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind("tester")
    .bind(&email)
    .bind("not-a-real-hash")
    .bind(city)
    .bind(verified)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
#[ignore]
async fn marking_a_triggered_alert_read_twice_is_idempotent() {
    let _guard = DB_LOCK.lock().await;
    let pool = test_pool().await;

    // Unverified so the evaluation sweep never picks this user up
    let user_id = insert_user(&pool, false, Some("Agadir")).await;
    let service = TriggeredAlertService::new(pool.clone());

    let alert_id = service
        .record(NewTriggeredAlert {
            user_id,
            rule_id: Uuid::new_v4(),
            city: "Agadir".to_string(),
            metric: AlertMetric::Temperature,
            value: Decimal::from(32),
        })
        .await
        .unwrap();

    let first = service.mark_read(user_id, alert_id).await.unwrap();
    assert!(first.is_read);

    // Second marking succeeds and returns the record unchanged
    let second = service.mark_read(user_id, alert_id).await.unwrap();
    assert!(second.is_read);
    assert_eq!(second.id, first.id);
    assert_eq!(second.triggered_at, first.triggered_at);

    let alerts = service.list_for_user(user_id, false).await.unwrap();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
#[ignore]
async fn rules_owned_by_another_user_surface_as_not_found() {
    let _guard = DB_LOCK.lock().await;
    let pool = test_pool().await;

    let owner = insert_user(&pool, false, None).await;
    let stranger = insert_user(&pool, false, None).await;
    let rules = AlertRuleService::new(pool.clone());

    let rule = rules
        .create(
            owner,
            CreateAlertRuleInput {
                metric: AlertMetric::Temperature,
                description: "heat watch".to_string(),
                condition: Some(AlertCondition::Gt),
                value: Some(Decimal::from(30)),
                threshold_min: None,
                threshold_max: None,
                severity: Severity::Warning,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        rules.get(stranger, rule.id).await,
        Err(AppError::NotFound(_))
    ));

    let update = UpdateAlertRuleInput {
        metric: None,
        description: Some("hijacked".to_string()),
        condition: None,
        value: None,
        threshold_min: None,
        threshold_max: None,
        severity: None,
        is_active: None,
    };
    assert!(matches!(
        rules.update(stranger, rule.id, update).await,
        Err(AppError::NotFound(_))
    ));

    assert!(matches!(
        rules.delete(stranger, rule.id).await,
        Err(AppError::NotFound(_))
    ));

    // The owner still sees the untouched rule
    let kept = rules.get(owner, rule.id).await.unwrap();
    assert_eq!(kept.description, "heat watch");
}

#[tokio::test]
#[ignore]
async fn appending_the_same_forecast_date_twice_is_a_noop() {
    let _guard = DB_LOCK.lock().await;
    let pool = test_pool().await;
    let store = SnapshotStore::new(pool.clone());

    let city = format!("Testville-{}", Uuid::new_v4().simple());
    let snapshot = NewSnapshot {
        city_name: city.clone(),
        country: "MA".to_string(),
        latitude: Decimal::new(340209, 4),
        longitude: Decimal::new(-68416, 4),
        snapshot_date: date(2026, 9, 1),
        temperature: Decimal::from(24),
        feels_like: Decimal::from(25),
        humidity: 50,
        pressure: 1013,
        wind_speed: Decimal::new(35, 1),
        wind_direction: 180,
        condition: "Clear".to_string(),
        icon: "01d".to_string(),
        rain_1h_mm: None,
        snow_1h_mm: None,
        cloud_coverage: 10,
        air_quality_index: Some(2),
        uv_index: None,
        provider_alerts: serde_json::json!([]),
    };

    let snapshot_id = store.insert(&snapshot, &[]).await.unwrap().unwrap();

    // A second insert for the same city is swallowed by the unique index
    assert!(store.insert(&snapshot, &[]).await.unwrap().is_none());

    let day = NewForecastDay {
        forecast_date: date(2026, 9, 7),
        temperature: Decimal::from(26),
        temp_min: Decimal::from(20),
        temp_max: Decimal::from(29),
        condition: "Clear".to_string(),
        icon: "01d".to_string(),
        humidity: 45,
        wind_speed: Decimal::new(40, 1),
        rain_mm: None,
        snow_mm: None,
        cloud_coverage: 5,
    };

    assert!(store.append_forecast_day(snapshot_id, &day).await.unwrap());
    assert!(!store.append_forecast_day(snapshot_id, &day).await.unwrap());

    let days = store.forecast_days(snapshot_id).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].forecast_date, date(2026, 9, 7));
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Current-conditions endpoint reporting 15% humidity in Agadir
async fn spawn_weather_stub() -> String {
    let router = Router::new().route(
        "/data/2.5/weather",
        routing::get(|| async {
            Json(serde_json::json!({
                "coord": {"lat": 30.4278, "lon": -9.5981},
                "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}],
                "main": {
                    "temp": 24.0,
                    "feels_like": 24.5,
                    "temp_min": 22.0,
                    "temp_max": 26.0,
                    "pressure": 1015,
                    "humidity": 15
                },
                "wind": {"speed": 3.5, "deg": 200},
                "clouds": {"all": 0},
                "dt": 1788508800,
                "sys": {"country": "MA"},
                "name": "Agadir"
            }))
        }),
    );
    spawn_stub(router).await
}

/// Mail endpoint counting accepted sends
async fn spawn_mail_stub() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/v1/messages",
        routing::post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"id": "msg-1"}))
            }
        }),
    );
    (spawn_stub(router).await, hits)
}

#[tokio::test]
#[ignore]
async fn humidity_breach_sends_one_email_and_logs_one_alert() {
    let _guard = DB_LOCK.lock().await;
    let pool = test_pool().await;

    // The sweep walks every active rule and verified user, so start clean
    sqlx::query("TRUNCATE users, alert_rules, triggered_alerts, alert_cooldowns CASCADE")
        .execute(&pool)
        .await
        .unwrap();

    let user_id = insert_user(&pool, true, Some("Agadir")).await;
    let rules = AlertRuleService::new(pool.clone());
    let rule = rules
        .create(
            user_id,
            CreateAlertRuleInput {
                metric: AlertMetric::Humidity,
                description: "dry air watch".to_string(),
                condition: Some(AlertCondition::Lt),
                value: Some(Decimal::from(20)),
                threshold_min: None,
                threshold_max: None,
                severity: Severity::Warning,
                is_active: Some(true),
            },
        )
        .await
        .unwrap();

    let weather_url = spawn_weather_stub().await;
    let (mail_url, mail_hits) = spawn_mail_stub().await;

    let service = EvaluationService::new(
        pool.clone(),
        WeatherClient::with_base_url("test-key".to_string(), weather_url),
        MailClient::new(
            mail_url,
            "test-key".to_string(),
            "alerts@meteowatch.example".to_string(),
        ),
        Arc::new(FixedClock(Utc::now())),
        720,
        None,
    );

    let summary = service.run_sweep().await.unwrap();
    assert_eq!(summary.rules, 1);
    assert_eq!(summary.recipients, 1);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.emails_sent, 1);
    assert_eq!(mail_hits.load(Ordering::SeqCst), 1);

    let triggered = TriggeredAlertService::new(pool.clone());
    let alerts = triggered.list_for_user(user_id, false).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric, AlertMetric::Humidity);
    assert_eq!(alerts[0].value, Decimal::from(15));
    assert_eq!(alerts[0].rule_id, rule.id);
    assert_eq!(alerts[0].city, "Agadir");

    // The same still-true condition inside the cooldown fires nothing new
    let summary = service.run_sweep().await.unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.suppressed, 1);
    assert_eq!(summary.emails_sent, 0);
    assert_eq!(mail_hits.load(Ordering::SeqCst), 1);

    let alerts = triggered.list_for_user(user_id, false).await.unwrap();
    assert_eq!(alerts.len(), 1);
}
