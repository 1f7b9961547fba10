//! Data models for the ETL pipeline
//!
//! This module contains the record types flowing through the pipeline: the
//! raw collections deserialized from the mock API, the sanitized user form
//! produced by PII masking, and the subscription records derived from the
//! users' embedded subscription lists.

use serde::{Deserialize, Serialize};

/// A user record as returned by the users endpoint.
///
/// Direct identifiers present in the API payload (`firstName`, `lastName`,
/// `address`) are never deserialized; they end at the HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiUser {
    /// External user identifier
    pub id: Option<String>,
    /// Record creation timestamp
    pub created_at: Option<String>,
    /// Record update timestamp
    pub updated_at: Option<String>,
    /// Raw city name (masked during sanitization)
    pub city: Option<String>,
    /// Raw zipcode (masked during sanitization)
    pub zip_code: Option<String>,
    /// Country name
    pub country: Option<String>,
    /// Raw email address (reduced to its domain during sanitization)
    pub email: Option<String>,
    /// Birth date
    pub birth_date: Option<String>,
    /// Nested profile attributes
    pub profile: Option<ApiProfile>,
    /// Embedded subscription entries
    pub subscription: Option<Vec<ApiSubscription>>,
}

/// Profile sub-object embedded in a user record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiProfile {
    /// Gender
    pub gender: Option<String>,
    /// Smoking flag; the API is loose about the JSON type here
    pub is_smoking: Option<serde_json::Value>,
    /// Raw profession (masked during sanitization)
    pub profession: Option<String>,
    /// Income; the API is loose about the JSON type here
    pub income: Option<serde_json::Value>,
}

/// A subscription entry embedded in a user record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSubscription {
    /// Subscription creation timestamp
    pub created_at: Option<String>,
    /// Subscription start date
    pub start_date: Option<String>,
    /// Subscription end date
    pub end_date: Option<String>,
    /// Subscription status
    pub status: Option<String>,
    /// Subscription amount; the API is loose about the JSON type here
    pub amount: Option<serde_json::Value>,
}

/// A message record as returned by the messages endpoint.
///
/// The message body is sensitive and is never deserialized.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiMessage {
    /// Message identifier
    pub id: Option<String>,
    /// Message creation timestamp
    pub created_at: Option<String>,
    /// Receiving user identifier
    pub receiver_id: Option<String>,
    /// Sending user identifier
    pub sender_id: Option<String>,
}

/// A user record after PII masking.
///
/// The three indirect-identifier dimensions hold surrogate IDs obtained from
/// the restricted lookup tables, or nothing when the raw field was absent or
/// empty; the email is reduced to its domain. Direct identifiers are not
/// representable in this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedUser {
    /// External user identifier
    pub id: Option<String>,
    /// Record creation timestamp
    pub created_at: Option<String>,
    /// Record update timestamp
    pub updated_at: Option<String>,
    /// Surrogate city ID
    pub city_id: Option<u64>,
    /// Country name
    pub country: Option<String>,
    /// Surrogate zipcode ID
    pub zipcode_id: Option<u64>,
    /// Email domain (the part after the first `@`)
    pub email_domain: Option<String>,
    /// Birth date
    pub birth_date: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Smoking flag, stringified
    pub is_smoking: Option<String>,
    /// Surrogate profession ID
    pub profession_id: Option<u64>,
    /// Income, stringified
    pub income: Option<String>,
}

/// A subscription record derived from a user's embedded subscription list,
/// tagged with the parent user's identifier. Materialized only for the
/// duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    /// Parent user identifier
    pub user_id: Option<String>,
    /// Subscription creation timestamp
    pub created_at: Option<String>,
    /// Subscription start date
    pub start_date: Option<String>,
    /// Subscription end date
    pub end_date: Option<String>,
    /// Subscription status
    pub status: Option<String>,
    /// Subscription amount, stringified
    pub amount: Option<String>,
}

/// Render a loosely-typed JSON value as the text stored in the warehouse.
///
/// Strings pass through without quoting, scalars use their JSON rendering,
/// and nulls map to absent.
#[must_use]
pub fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Current UTC time in the text form stamped into `last_updated_at`
#[must_use]
pub fn timestamp_text() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}
