//! Record mappers and batch loaders
//!
//! Reshapes the pipeline's typed records into flat all-text warehouse rows,
//! stamps `last_updated_at`, and drives per-record inserts through the
//! gateway. Per-record failures are logged and counted; a single bad record
//! never aborts the batch.

use tracing::{info, warn};

use crate::db::{DbGateway, InsertOutcome};
use crate::metrics;
use crate::models::{timestamp_text, ApiMessage, SanitizedUser, SubscriptionRecord};
use crate::schema::{self, messages_raw, subscriptions_raw, users_raw};

/// A flat warehouse row: ordered column/value pairs, `None` meaning NULL
pub type TableRow = Vec<(&'static str, Option<String>)>;

/// Aggregate outcome of loading one batch into one table
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Destination table
    pub table: &'static str,
    /// Records that reached the insert loop
    pub total: usize,
    /// Rows newly written
    pub inserted: usize,
    /// Rows skipped because an identical row already existed
    pub skipped: usize,
    /// Records rejected by the PII guard before the insert loop
    pub rejected: usize,
    /// Records whose insert failed
    pub failed: usize,
}

impl LoadReport {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            total: 0,
            inserted: 0,
            skipped: 0,
            rejected: 0,
            failed: 0,
        }
    }

    /// True iff no record in the batch failed to insert
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Map a sanitized user to its `users_raw` row
#[must_use]
pub fn user_row(user: &SanitizedUser) -> TableRow {
    vec![
        (users_raw::USER_ID, user.id.clone()),
        (users_raw::CREATED_AT, user.created_at.clone()),
        (users_raw::UPDATED_AT, user.updated_at.clone()),
        (users_raw::CITY_ID, user.city_id.map(|id| id.to_string())),
        (users_raw::COUNTRY, user.country.clone()),
        (users_raw::ZIPCODE_ID, user.zipcode_id.map(|id| id.to_string())),
        (users_raw::EMAIL, user.email_domain.clone()),
        (users_raw::BIRTH_DATE, user.birth_date.clone()),
        (users_raw::GENDER, user.gender.clone()),
        (users_raw::IS_SMOKING, user.is_smoking.clone()),
        (
            users_raw::PROFESSION_ID,
            user.profession_id.map(|id| id.to_string()),
        ),
        (users_raw::INCOME, user.income.clone()),
    ]
}

/// Map a derived subscription to its `subscriptions_raw` row
#[must_use]
pub fn subscription_row(subscription: &SubscriptionRecord) -> TableRow {
    vec![
        (subscriptions_raw::USER_ID, subscription.user_id.clone()),
        (subscriptions_raw::CREATED_AT, subscription.created_at.clone()),
        (subscriptions_raw::START_DATE, subscription.start_date.clone()),
        (subscriptions_raw::END_DATE, subscription.end_date.clone()),
        (subscriptions_raw::STATUS, subscription.status.clone()),
        (subscriptions_raw::AMOUNT, subscription.amount.clone()),
    ]
}

/// Map a message to its `messages_raw` row. The message body is not part of
/// the model and can never reach the warehouse.
#[must_use]
pub fn message_row(message: &ApiMessage) -> TableRow {
    vec![
        (messages_raw::ID, message.id.clone()),
        (messages_raw::CREATED_AT, message.created_at.clone()),
        (messages_raw::RECEIVER_ID, message.receiver_id.clone()),
        (messages_raw::SENDER_ID, message.sender_id.clone()),
    ]
}

/// Check that the masked dimension columns of a user row hold surrogate IDs
/// rather than raw values. Absent and empty values pass; a present value must
/// be all digits.
#[must_use]
pub fn pii_cleared(row: &TableRow) -> bool {
    let masked_columns = [
        users_raw::CITY_ID,
        users_raw::ZIPCODE_ID,
        users_raw::PROFESSION_ID,
    ];
    row.iter().all(|(column, value)| {
        if masked_columns.contains(column) {
            value
                .as_ref()
                .map_or(true, |v| v.is_empty() || v.chars().all(|c| c.is_ascii_digit()))
        } else {
            true
        }
    })
}

/// Insert sanitized user records into `users_raw`.
///
/// Rows still carrying raw PII in a masked dimension are rejected up front
/// and never reach the warehouse; rejections are counted separately from
/// insert failures.
pub async fn insert_user_data(gateway: &mut DbGateway, users: &[SanitizedUser]) -> LoadReport {
    let mut rejected = 0;
    let rows: Vec<TableRow> = users
        .iter()
        .map(user_row)
        .filter(|row| {
            if pii_cleared(row) {
                true
            } else {
                warn!("PII values not removed from data record, skipping insert");
                rejected += 1;
                false
            }
        })
        .collect();
    let mut report = insert_data(gateway, users_raw::TABLE, rows).await;
    report.rejected = rejected;
    report
}

/// Insert derived subscription records into `subscriptions_raw`
pub async fn insert_subscription_data(
    gateway: &mut DbGateway,
    subscriptions: &[SubscriptionRecord],
) -> LoadReport {
    let rows = subscriptions.iter().map(subscription_row).collect();
    insert_data(gateway, subscriptions_raw::TABLE, rows).await
}

/// Insert message records into `messages_raw`
pub async fn insert_message_data(gateway: &mut DbGateway, messages: &[ApiMessage]) -> LoadReport {
    let rows = messages.iter().map(message_row).collect();
    insert_data(gateway, messages_raw::TABLE, rows).await
}

async fn insert_data(gateway: &mut DbGateway, table: &'static str, rows: Vec<TableRow>) -> LoadReport {
    let mut report = LoadReport::new(table);
    report.total = rows.len();
    info!(table, total = rows.len(), "Inserting records");

    for (index, mut row) in rows.into_iter().enumerate() {
        row.push((schema::LAST_UPDATED_AT, Some(timestamp_text())));
        match gateway.insert_record(table, &row, true).await {
            Ok(InsertOutcome::Inserted) => report.inserted += 1,
            Ok(InsertOutcome::SkippedExisting) => report.skipped += 1,
            Err(err) => {
                warn!(table, record = index, error = %err, "Failed to insert record");
                report.failed += 1;
            }
        }
    }

    metrics::record_load(&report);
    info!(
        table,
        total = report.total,
        inserted = report.inserted,
        skipped = report.skipped,
        failed = report.failed,
        "Finished inserting records"
    );
    report
}
