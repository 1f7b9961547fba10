//! Cleaning and transformation of the data coming from the API
//!
//! The PII handling lives here: direct identifiers are dropped, the indirect
//! identifier dimensions (city, zipcode, profession) are swapped for
//! surrogate IDs from the restricted lookup tables, and emails are reduced to
//! their domain. Subscription records are also derived here by flattening the
//! users' embedded subscription lists.

use tracing::debug;

use crate::db::MaskIdStore;
use crate::error::Result;
use crate::models::{json_text, ApiUser, SanitizedUser, SubscriptionRecord};
use crate::schema::{sensitive_city_ids, sensitive_profession_ids, sensitive_zipcode_ids};

/// Mask the PII held in a batch of raw user records.
///
/// Output order matches input order one-to-one. Each present, non-empty
/// `city`, `zipCode` and `profile.profession` value is replaced by its
/// surrogate ID from the corresponding lookup table, assigned lazily on
/// first encounter.
pub async fn sanitize_users<S: MaskIdStore + Send>(
    store: &mut S,
    users: Vec<ApiUser>,
) -> Result<Vec<SanitizedUser>> {
    let mut sanitized = Vec::with_capacity(users.len());
    for user in users {
        sanitized.push(sanitize_user(store, user).await?);
    }
    debug!(count = sanitized.len(), "Sanitized user batch");
    Ok(sanitized)
}

async fn sanitize_user<S: MaskIdStore + Send>(
    store: &mut S,
    user: ApiUser,
) -> Result<SanitizedUser> {
    let city_id = match user.city.as_deref().filter(|value| !value.is_empty()) {
        Some(city) => Some(
            store
                .get_or_create_mask_id(sensitive_city_ids::TABLE, sensitive_city_ids::CITY, city)
                .await?,
        ),
        None => None,
    };

    let zipcode_id = match user.zip_code.as_deref().filter(|value| !value.is_empty()) {
        Some(zipcode) => Some(
            store
                .get_or_create_mask_id(
                    sensitive_zipcode_ids::TABLE,
                    sensitive_zipcode_ids::ZIPCODE,
                    zipcode,
                )
                .await?,
        ),
        None => None,
    };

    let profile = user.profile.unwrap_or_default();
    let profession_id = match profile.profession.as_deref().filter(|value| !value.is_empty()) {
        Some(profession) => Some(
            store
                .get_or_create_mask_id(
                    sensitive_profession_ids::TABLE,
                    sensitive_profession_ids::PROFESSION,
                    profession,
                )
                .await?,
        ),
        None => None,
    };

    Ok(SanitizedUser {
        id: user.id,
        created_at: user.created_at,
        updated_at: user.updated_at,
        city_id,
        country: user.country,
        zipcode_id,
        email_domain: email_domain(user.email.as_deref()),
        birth_date: user.birth_date,
        gender: profile.gender,
        is_smoking: profile.is_smoking.as_ref().and_then(json_text),
        profession_id,
        income: profile.income.as_ref().and_then(json_text),
    })
}

/// Reduce an email address to its domain: the segment after the first `@`.
/// Addresses without an `@` yield nothing.
fn email_domain(email: Option<&str>) -> Option<String> {
    let email = email?;
    if email.contains('@') {
        email.split('@').nth(1).map(str::to_string)
    } else {
        None
    }
}

/// Flatten the embedded subscription lists of a raw user batch, tagging each
/// entry with its parent user's identifier. A user with N embedded
/// subscriptions yields exactly N records; absent or empty lists yield none.
#[must_use]
pub fn derive_subscriptions(users: &[ApiUser]) -> Vec<SubscriptionRecord> {
    let mut all_subscriptions = Vec::new();
    for user in users {
        if let Some(subscriptions) = &user.subscription {
            for subscription in subscriptions {
                all_subscriptions.push(SubscriptionRecord {
                    user_id: user.id.clone(),
                    created_at: subscription.created_at.clone(),
                    start_date: subscription.start_date.clone(),
                    end_date: subscription.end_date.clone(),
                    status: subscription.status.clone(),
                    amount: subscription.amount.as_ref().and_then(json_text),
                });
            }
        }
    }
    all_subscriptions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_domain_extraction() {
        assert_eq!(email_domain(Some("a@x.com")), Some("x.com".to_string()));
        assert_eq!(email_domain(Some("no-at-sign")), None);
        assert_eq!(email_domain(None), None);
    }

    #[test]
    fn test_email_domain_takes_segment_after_first_at() {
        assert_eq!(email_domain(Some("a@b@c")), Some("b".to_string()));
        assert_eq!(email_domain(Some("trailing@")), Some(String::new()));
    }
}
