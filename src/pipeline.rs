//! Pipeline orchestration
//!
//! Runs the whole ETL as a fixed linear sequence: wait for the database,
//! initialise the schema, fetch the API collections, derive subscriptions,
//! sanitize users, load the three tables, create the monitoring views. Barring
//! a fatal startup failure the run always completes; the returned summary is
//! the feedback signal.

use std::path::Path;

use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::db::DbGateway;
use crate::error::Result;
use crate::load::{self, LoadReport};
use crate::metrics;
use crate::models::{ApiMessage, ApiUser};
use crate::transform;
use crate::views;

/// End-of-run record counts, the pipeline's only feedback signal
#[derive(Debug)]
pub struct PipelineSummary {
    /// Outcome of the users load
    pub users: LoadReport,
    /// Outcome of the subscriptions load
    pub subscriptions: LoadReport,
    /// Outcome of the messages load
    pub messages: LoadReport,
    /// Number of monitoring views created
    pub views_created: usize,
}

impl PipelineSummary {
    /// True iff every table loaded without insert failures
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.users.succeeded() && self.subscriptions.succeeded() && self.messages.succeeded()
    }
}

/// Run the full pipeline.
///
/// Database unavailability at startup is fatal and surfaces as an error; a
/// failed API fetch is logged and the run continues with an empty batch; a
/// failing table load only produces a warning and does not block the other
/// tables.
pub async fn run(config: &AppConfig, drop_existing: bool) -> Result<PipelineSummary> {
    let api = ApiClient::new(config.api.clone())?;
    let mut gateway = DbGateway::new(config.database.clone(), config.analyst.clone());

    info!("Checking if database server is up");
    gateway.wait_until_available().await?;

    gateway.init_schema(drop_existing).await?;

    let users: Vec<ApiUser> = match api.fetch_users().await {
        Ok(users) => {
            metrics::record_fetch("users", users.len());
            users
        }
        Err(err) => {
            error!(error = %err, "Failed to fetch users, continuing with an empty batch");
            metrics::record_fetch_error("users");
            Vec::new()
        }
    };
    let messages: Vec<ApiMessage> = match api.fetch_messages().await {
        Ok(messages) => {
            metrics::record_fetch("messages", messages.len());
            messages
        }
        Err(err) => {
            error!(error = %err, "Failed to fetch messages, continuing with an empty batch");
            metrics::record_fetch_error("messages");
            Vec::new()
        }
    };

    // Subscriptions are derived from the raw users before sanitization; the
    // embedded lists carry no PII of their own.
    let subscriptions = transform::derive_subscriptions(&users);

    let sanitized_users = transform::sanitize_users(&mut gateway, users).await?;

    let user_report = load::insert_user_data(&mut gateway, &sanitized_users).await;
    if !user_report.succeeded() {
        warn!("One or more records could not be inserted successfully into the users table");
    }
    let subscription_report = load::insert_subscription_data(&mut gateway, &subscriptions).await;
    if !subscription_report.succeeded() {
        warn!("One or more records could not be inserted successfully into the subscriptions table");
    }
    let message_report = load::insert_message_data(&mut gateway, &messages).await;
    if !message_report.succeeded() {
        warn!("One or more records could not be inserted successfully into the messages table");
    }

    info!("Creating monitoring views");
    let views_created =
        views::create_monitoring_views(&mut gateway, Path::new(&config.views.query_dir)).await?;

    gateway.close().await?;

    let summary = PipelineSummary {
        users: user_report,
        subscriptions: subscription_report,
        messages: message_report,
        views_created,
    };
    info!(
        users_inserted = summary.users.inserted,
        subscriptions_inserted = summary.subscriptions.inserted,
        messages_inserted = summary.messages.inserted,
        views_created = summary.views_created,
        "All data ingested"
    );
    Ok(summary)
}
