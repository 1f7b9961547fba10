//! Live-warehouse integration tests.
//!
//! These exercise the gateway against a real MySQL server and are ignored by
//! default. Point them at a disposable server and run them single-threaded
//! (every test drops and recreates the `spark_dwh` database):
//!
//! ```text
//! SPARK_ETL_TEST_DB_HOST=127.0.0.1 \
//! SPARK_ETL_TEST_DB_PASSWORD=... \
//! cargo test --test warehouse_integration -- --ignored --test-threads=1
//! ```

use spark_dwh_etl::config::{AnalystConfig, DatabaseConfig};
use spark_dwh_etl::db::{DbGateway, InsertOutcome, MaskIdStore};
use spark_dwh_etl::load::insert_user_data;
use spark_dwh_etl::models::{ApiProfile, ApiUser, SanitizedUser};
use spark_dwh_etl::schema::{sensitive_city_ids, users_raw};
use spark_dwh_etl::transform::sanitize_users;

fn test_gateway() -> DbGateway {
    let mut config = DatabaseConfig::default();
    if let Ok(host) = std::env::var("SPARK_ETL_TEST_DB_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("SPARK_ETL_TEST_DB_PORT") {
        config.port = port.parse().expect("SPARK_ETL_TEST_DB_PORT must be a port number");
    }
    if let Ok(password) = std::env::var("SPARK_ETL_TEST_DB_PASSWORD") {
        config.password = password;
    }
    config.max_retries = 2;
    config.retry_delay_secs = 1;
    config.availability_max_retries = 2;
    DbGateway::new(config, AnalystConfig::default())
}

async fn fresh_warehouse() -> DbGateway {
    let mut gateway = test_gateway();
    gateway
        .wait_until_available()
        .await
        .expect("test database server should be reachable");
    gateway
        .init_schema(true)
        .await
        .expect("schema initialisation should succeed");
    gateway
}

async fn count_rows(gateway: &mut DbGateway, table: &str) -> u64 {
    let (_, rows) = gateway
        .query(&format!("SELECT COUNT(*) FROM {table}"), Vec::new())
        .await
        .expect("count query should succeed");
    rows[0]
        .get_opt::<u64, _>(0)
        .and_then(std::result::Result::ok)
        .expect("count should be numeric")
}

fn sanitized_user(id: &str, country: &str) -> SanitizedUser {
    SanitizedUser {
        id: Some(id.to_string()),
        created_at: Some("2021-11-23T10:00:00Z".to_string()),
        updated_at: None,
        city_id: Some(1),
        country: Some(country.to_string()),
        zipcode_id: Some(1),
        email_domain: Some("x.com".to_string()),
        birth_date: Some("1990-01-01".to_string()),
        gender: Some("female".to_string()),
        is_smoking: Some("false".to_string()),
        profession_id: Some(1),
        income: Some("52000".to_string()),
    }
}

#[tokio::test]
#[ignore = "requires a live MySQL server"]
async fn mask_id_get_or_create_is_idempotent() {
    let mut gateway = fresh_warehouse().await;

    let first = gateway
        .get_or_create_mask_id(sensitive_city_ids::TABLE, sensitive_city_ids::CITY, "Berlin")
        .await
        .expect("first lookup should succeed");
    let second = gateway
        .get_or_create_mask_id(sensitive_city_ids::TABLE, sensitive_city_ids::CITY, "Berlin")
        .await
        .expect("second lookup should succeed");

    assert_eq!(first, second);
    assert_eq!(count_rows(&mut gateway, sensitive_city_ids::TABLE).await, 1);
    gateway.close().await.expect("close should succeed");
}

#[tokio::test]
#[ignore = "requires a live MySQL server"]
async fn distinct_values_get_distinct_mask_ids() {
    let mut gateway = fresh_warehouse().await;

    let berlin = gateway
        .get_or_create_mask_id(sensitive_city_ids::TABLE, sensitive_city_ids::CITY, "Berlin")
        .await
        .expect("lookup should succeed");
    let hamburg = gateway
        .get_or_create_mask_id(sensitive_city_ids::TABLE, sensitive_city_ids::CITY, "Hamburg")
        .await
        .expect("lookup should succeed");

    assert_ne!(berlin, hamburg);
    assert_eq!(count_rows(&mut gateway, sensitive_city_ids::TABLE).await, 2);
    gateway.close().await.expect("close should succeed");
}

#[tokio::test]
#[ignore = "requires a live MySQL server"]
async fn insert_record_with_fail_if_exists_never_duplicates() {
    let mut gateway = fresh_warehouse().await;

    let record = [
        ("created_at", Some("2021-11-23T10:00:00Z".to_string())),
        ("receiver_id", Some("2".to_string())),
        ("id", Some("7".to_string())),
        ("sender_id", Some("3".to_string())),
        ("last_updated_at", Some("2021-11-23 10:00:00".to_string())),
    ];
    let first = gateway
        .insert_record("messages_raw", &record, true)
        .await
        .expect("first insert should succeed");
    assert_eq!(first, InsertOutcome::Inserted);

    // Same record content, new stamp: still a duplicate.
    let mut restamped = record.clone();
    restamped[4].1 = Some("2021-11-24 09:00:00".to_string());
    let second = gateway
        .insert_record("messages_raw", &restamped, true)
        .await
        .expect("second insert should succeed");
    assert_eq!(second, InsertOutcome::SkippedExisting);

    assert_eq!(count_rows(&mut gateway, "messages_raw").await, 1);
    gateway.close().await.expect("close should succeed");
}

#[tokio::test]
#[ignore = "requires a live MySQL server"]
async fn end_to_end_masking_scenario() {
    let mut gateway = fresh_warehouse().await;

    let raw = ApiUser {
        id: Some("1".to_string()),
        city: Some("Berlin".to_string()),
        zip_code: Some("10115".to_string()),
        email: Some("a@x.com".to_string()),
        profile: Some(ApiProfile {
            profession: Some("Engineer".to_string()),
            ..ApiProfile::default()
        }),
        ..ApiUser::default()
    };

    let sanitized = sanitize_users(&mut gateway, vec![raw])
        .await
        .expect("sanitize should succeed");
    assert_eq!(sanitized[0].city_id, Some(1));
    assert_eq!(sanitized[0].zipcode_id, Some(1));
    assert_eq!(sanitized[0].profession_id, Some(1));
    assert_eq!(sanitized[0].email_domain.as_deref(), Some("x.com"));

    let report = insert_user_data(&mut gateway, &sanitized).await;
    assert!(report.succeeded());
    assert_eq!(report.inserted, 1);

    let (_, rows) = gateway
        .fetch_records(
            users_raw::TABLE,
            None,
            &[(users_raw::USER_ID, Some("1".to_string()))],
        )
        .await
        .expect("fetch should succeed");
    assert_eq!(rows.len(), 1);
    let email: Option<String> = rows[0]
        .get_opt(users_raw::EMAIL)
        .and_then(std::result::Result::ok);
    let city_id: Option<String> = rows[0]
        .get_opt(users_raw::CITY_ID)
        .and_then(std::result::Result::ok);
    assert_eq!(email.as_deref(), Some("x.com"));
    assert_eq!(city_id.as_deref(), Some("1"));
    gateway.close().await.expect("close should succeed");
}

#[tokio::test]
#[ignore = "requires a live MySQL server"]
async fn loader_reports_failure_but_persists_valid_records() {
    let mut gateway = fresh_warehouse().await;

    let mut users: Vec<SanitizedUser> = (1..=5)
        .map(|n| sanitized_user(&n.to_string(), "Germany"))
        .collect();
    // Oversized value for a VARCHAR(255) column makes this record fail.
    users.push(sanitized_user("6", &"x".repeat(300)));

    let report = insert_user_data(&mut gateway, &users).await;
    assert!(!report.succeeded());
    assert_eq!(report.failed, 1);
    assert_eq!(report.inserted, 5);
    assert_eq!(count_rows(&mut gateway, users_raw::TABLE).await, 5);
    gateway.close().await.expect("close should succeed");
}
