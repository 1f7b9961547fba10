use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use spark_dwh_etl::db::MaskIdStore;
use spark_dwh_etl::error::Result;
use spark_dwh_etl::models::{ApiProfile, ApiSubscription, ApiUser};
use spark_dwh_etl::transform::{derive_subscriptions, sanitize_users};

/// In-memory mask-ID store mirroring the lookup-table contract: one entry per
/// distinct value per table, IDs assigned in insertion order starting at 1.
#[derive(Default)]
struct InMemoryMaskStore {
    tables: HashMap<String, Vec<String>>,
}

#[async_trait]
impl MaskIdStore for InMemoryMaskStore {
    async fn get_or_create_mask_id(
        &mut self,
        table: &str,
        _column: &str,
        value: &str,
    ) -> Result<u64> {
        let values = self.tables.entry(table.to_string()).or_default();
        if let Some(position) = values.iter().position(|v| v == value) {
            Ok((position + 1) as u64)
        } else {
            values.push(value.to_string());
            Ok(values.len() as u64)
        }
    }
}

fn user(id: &str, city: Option<&str>, zipcode: Option<&str>, profession: Option<&str>) -> ApiUser {
    ApiUser {
        id: Some(id.to_string()),
        city: city.map(str::to_string),
        zip_code: zipcode.map(str::to_string),
        profile: Some(ApiProfile {
            profession: profession.map(str::to_string),
            ..ApiProfile::default()
        }),
        ..ApiUser::default()
    }
}

#[tokio::test]
async fn sanitize_masks_all_three_dimensions_on_a_fresh_store() {
    let mut store = InMemoryMaskStore::default();
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

    let sanitized = sanitize_users(&mut store, vec![raw])
        .await
        .expect("sanitize should succeed");
    assert_eq!(sanitized.len(), 1);
    let user = &sanitized[0];
    assert_eq!(user.city_id, Some(1));
    assert_eq!(user.zipcode_id, Some(1));
    assert_eq!(user.profession_id, Some(1));
    assert_eq!(user.email_domain.as_deref(), Some("x.com"));
}

#[tokio::test]
async fn sanitize_is_stable_for_repeated_values_and_distinct_for_new_ones() {
    let mut store = InMemoryMaskStore::default();
    let users = vec![
        user("1", Some("Berlin"), Some("10115"), Some("Engineer")),
        user("2", Some("Berlin"), Some("80331"), Some("Baker")),
        user("3", Some("Hamburg"), Some("10115"), Some("Engineer")),
    ];

    let sanitized = sanitize_users(&mut store, users)
        .await
        .expect("sanitize should succeed");

    // Repeated raw values resolve to the same surrogate ID.
    assert_eq!(sanitized[0].city_id, sanitized[1].city_id);
    assert_eq!(sanitized[0].zipcode_id, sanitized[2].zipcode_id);
    assert_eq!(sanitized[0].profession_id, sanitized[2].profession_id);

    // Distinct raw values in the same dimension get distinct IDs.
    assert_ne!(sanitized[0].city_id, sanitized[2].city_id);
    assert_ne!(sanitized[0].zipcode_id, sanitized[1].zipcode_id);
    assert_ne!(sanitized[0].profession_id, sanitized[1].profession_id);
}

#[tokio::test]
async fn sanitize_preserves_input_order() {
    let mut store = InMemoryMaskStore::default();
    let users = vec![
        user("10", Some("Berlin"), None, None),
        user("11", None, None, None),
        user("12", Some("Hamburg"), None, None),
    ];

    let sanitized = sanitize_users(&mut store, users)
        .await
        .expect("sanitize should succeed");
    let ids: Vec<Option<&str>> = sanitized.iter().map(|u| u.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("10"), Some("11"), Some("12")]);
}

#[tokio::test]
async fn sanitize_leaves_absent_and_empty_dimensions_unmasked() {
    let mut store = InMemoryMaskStore::default();
    let mut blank = user("1", Some(""), None, None);
    blank.profile = None;
    blank.email = Some("not-an-address".to_string());

    let sanitized = sanitize_users(&mut store, vec![blank])
        .await
        .expect("sanitize should succeed");
    let user = &sanitized[0];
    assert_eq!(user.city_id, None);
    assert_eq!(user.zipcode_id, None);
    assert_eq!(user.profession_id, None);
    assert_eq!(user.email_domain, None);
    assert!(store.tables.is_empty());
}

#[tokio::test]
async fn sanitize_passes_profile_attributes_through() {
    let mut store = InMemoryMaskStore::default();
    let raw = ApiUser {
        id: Some("1".to_string()),
        profile: Some(ApiProfile {
            gender: Some("female".to_string()),
            is_smoking: Some(json!(false)),
            profession: None,
            income: Some(json!(52000.5)),
        }),
        ..ApiUser::default()
    };

    let sanitized = sanitize_users(&mut store, vec![raw])
        .await
        .expect("sanitize should succeed");
    let user = &sanitized[0];
    assert_eq!(user.gender.as_deref(), Some("female"));
    assert_eq!(user.is_smoking.as_deref(), Some("false"));
    assert_eq!(user.income.as_deref(), Some("52000.5"));
}

#[test]
fn subscription_derivation_yields_one_record_per_entry() {
    let mut parent = user("42", None, None, None);
    parent.subscription = Some(vec![
        ApiSubscription {
            created_at: Some("2021-01-01".to_string()),
            start_date: Some("2021-01-02".to_string()),
            end_date: Some("2021-06-01".to_string()),
            status: Some("Active".to_string()),
            amount: Some(json!("9.99")),
        },
        ApiSubscription {
            status: Some("Expired".to_string()),
            amount: Some(json!(19.99)),
            ..ApiSubscription::default()
        },
    ]);

    let subscriptions = derive_subscriptions(&[parent]);
    assert_eq!(subscriptions.len(), 2);
    assert!(subscriptions
        .iter()
        .all(|s| s.user_id.as_deref() == Some("42")));
    assert_eq!(subscriptions[0].amount.as_deref(), Some("9.99"));
    assert_eq!(subscriptions[1].amount.as_deref(), Some("19.99"));
}

#[test]
fn subscription_derivation_skips_users_without_entries() {
    let absent = user("1", None, None, None);
    let mut empty = user("2", None, None, None);
    empty.subscription = Some(Vec::new());

    assert!(derive_subscriptions(&[absent, empty]).is_empty());
}
