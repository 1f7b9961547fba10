//! Warehouse database gateway
//!
//! Owns the single live MySQL connection used by the pipeline and builds and
//! executes every statement the other components need: parameterized selects
//! and inserts, the get-or-create mask-ID primitive, view creation and schema
//! initialisation. The connection has an explicit lifecycle: opened by
//! [`DbGateway::connect`] (with a bounded retry loop) and released by
//! [`DbGateway::close`].

use std::time::Duration;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Row, Value};
use tracing::{debug, info, warn};

use crate::config::{AnalystConfig, DatabaseConfig};
use crate::error::{EtlError, Result};
use crate::models::timestamp_text;
use crate::schema;

/// Identity allowed to run schema initialisation and mask-ID operations
pub const PRIVILEGED_USER: &str = "root";

/// A column/value pair used both as an insert field and as an equality
/// constraint. `None` stands for SQL NULL.
pub type ColumnValue<'a> = (&'a str, Option<String>);

/// Outcome of an insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// An identical row (ignoring `last_updated_at`) already existed
    SkippedExisting,
}

/// Source of surrogate mask IDs for sensitive dimension values.
///
/// The gateway is the production implementation; tests substitute an
/// in-memory store so the sanitizer can be exercised without a warehouse.
#[async_trait]
pub trait MaskIdStore {
    /// Return the surrogate ID for `value` in the given dimension table,
    /// assigning a fresh one when the value has not been seen before.
    async fn get_or_create_mask_id(&mut self, table: &str, column: &str, value: &str)
        -> Result<u64>;
}

/// Gateway to the warehouse database
pub struct DbGateway {
    config: DatabaseConfig,
    analyst: AnalystConfig,
    conn: Option<Conn>,
}

impl DbGateway {
    /// Create a gateway; no connection is opened until [`Self::connect`]
    #[must_use]
    pub fn new(config: DatabaseConfig, analyst: AnalystConfig) -> Self {
        Self {
            config,
            analyst,
            conn: None,
        }
    }

    fn build_opts(&self, database: Option<&str>) -> Opts {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(self.config.host.clone())
            .tcp_port(self.config.port)
            .user(Some(self.config.username.clone()))
            .db_name(database.map(str::to_string));
        if !self.config.password.is_empty() {
            builder = builder.pass(Some(self.config.password.clone()));
        }
        Opts::from(builder)
    }

    /// Open the connection, optionally selecting a database.
    ///
    /// A call while already connected is a no-op. Each failed attempt is
    /// logged and retried after a fixed delay until the configured retry
    /// budget is exhausted.
    pub async fn connect(&mut self, database: Option<&str>) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        self.connect_with_retries(database, self.config.max_retries)
            .await
    }

    async fn connect_with_retries(
        &mut self,
        database: Option<&str>,
        max_retries: u32,
    ) -> Result<()> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match Conn::new(self.build_opts(database)).await {
                Ok(conn) => {
                    debug!(
                        host = %self.config.host,
                        port = self.config.port,
                        database = database.unwrap_or("<none>"),
                        "Connected to database server"
                    );
                    self.conn = Some(conn);
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt = attempts, error = %err, "Cannot connect to database, retrying");
                    if attempts >= max_retries {
                        return Err(EtlError::Connectivity {
                            host: self.config.host.clone(),
                            port: self.config.port,
                            attempts,
                        });
                    }
                    tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                }
            }
        }
    }

    /// Startup probe for a database server that may still be booting.
    ///
    /// Uses its own, larger retry budget and releases the probe connection
    /// again so the pipeline starts from a clean state.
    pub async fn wait_until_available(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        info!("Attempting to connect to database server");
        self.connect_with_retries(None, self.config.availability_max_retries)
            .await?;
        info!("Successfully connected to database server");
        self.close().await
    }

    /// Release the connection. Safe to call when not connected.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }

    /// True when a live connection is held
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn conn_mut(&mut self) -> Result<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| EtlError::Other("Database connection has not been opened".to_string()))
    }

    /// Execute one statement that returns no rows.
    ///
    /// Runs under autocommit; there are no multi-statement transactions.
    /// Returns the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: Vec<Value>) -> Result<u64> {
        let conn = self.conn_mut()?;
        if params.is_empty() {
            conn.query_drop(sql).await?;
        } else {
            conn.exec_drop(sql, params).await?;
        }
        Ok(conn.affected_rows())
    }

    /// Execute one statement and collect its result set, returning the
    /// column names alongside the rows.
    pub async fn query(&mut self, sql: &str, params: Vec<Value>) -> Result<(Vec<String>, Vec<Row>)> {
        let conn = self.conn_mut()?;
        if params.is_empty() {
            let mut result = conn.query_iter(sql).await?;
            let columns = column_names(result.columns().as_deref());
            let rows = result.collect().await?;
            Ok((columns, rows))
        } else {
            let mut result = conn.exec_iter(sql, params).await?;
            let columns = column_names(result.columns().as_deref());
            let rows = result.collect().await?;
            Ok((columns, rows))
        }
    }

    /// Fetch rows from a table, optionally restricted to the given columns
    /// and to an equality-AND constraint set.
    pub async fn fetch_records(
        &mut self,
        table: &str,
        fields: Option<&[&str]>,
        constraints: &[ColumnValue<'_>],
    ) -> Result<(Vec<String>, Vec<Row>)> {
        let (sql, params) = build_select(table, fields, constraints);
        self.query(&sql, params).await
    }

    /// Insert one record into a table.
    ///
    /// With `fail_if_exists`, a row matching every field except
    /// `last_updated_at` short-circuits the insert; the duplicate is reported
    /// as [`InsertOutcome::SkippedExisting`], not as an error.
    pub async fn insert_record(
        &mut self,
        table: &str,
        record: &[ColumnValue<'_>],
        fail_if_exists: bool,
    ) -> Result<InsertOutcome> {
        if fail_if_exists {
            let fields: Vec<&str> = record.iter().map(|(column, _)| *column).collect();
            let constraints: Vec<ColumnValue<'_>> = record
                .iter()
                .filter(|(column, _)| *column != schema::LAST_UPDATED_AT)
                .cloned()
                .collect();
            let (_, existing) = self
                .fetch_records(table, Some(&fields), &constraints)
                .await?;
            if !existing.is_empty() {
                debug!(table, "Record already exists, skipping insert");
                return Ok(InsertOutcome::SkippedExisting);
            }
        }
        let (sql, params) = build_insert(table, record);
        self.execute(&sql, params).await?;
        Ok(InsertOutcome::Inserted)
    }

    /// Create or replace a view from a stored query
    pub async fn create_view(&mut self, name: &str, query: &str) -> Result<()> {
        let sql = format!(
            "CREATE OR REPLACE VIEW {name} AS ({})",
            query.trim().trim_end_matches(';')
        );
        self.execute(&sql, Vec::new()).await?;
        Ok(())
    }

    /// Initialise the warehouse: database, tables and the restricted analyst
    /// account with access to the non-sensitive tables only.
    ///
    /// Privileged; a gateway configured with any other identity is rejected.
    /// With `drop_if_exists`, all prior warehouse objects are removed first.
    pub async fn init_schema(&mut self, drop_if_exists: bool) -> Result<()> {
        self.ensure_privileged("Schema initialisation")?;
        self.connect(None).await?;

        if drop_if_exists {
            warn!("Dropping existing warehouse database and analyst account");
            let analyst = quote_literal(&self.analyst.username);
            self.execute(&format!("DROP USER IF EXISTS '{analyst}'"), Vec::new())
                .await?;
            self.execute(
                &format!("DROP DATABASE IF EXISTS {}", schema::WAREHOUSE_DB),
                Vec::new(),
            )
            .await?;
        }

        self.execute(
            &format!("CREATE DATABASE IF NOT EXISTS {}", schema::WAREHOUSE_DB),
            Vec::new(),
        )
        .await?;
        self.execute(&format!("USE {}", schema::WAREHOUSE_DB), Vec::new())
            .await?;

        for ddl in schema::CREATE_TABLE_STATEMENTS {
            self.execute(ddl, Vec::new()).await?;
        }

        let analyst = quote_literal(&self.analyst.username);
        let analyst_password = quote_literal(&self.analyst.password);
        self.execute(
            &format!("CREATE USER IF NOT EXISTS '{analyst}' IDENTIFIED BY '{analyst_password}'"),
            Vec::new(),
        )
        .await?;
        for table in schema::ANALYST_TABLES {
            self.execute(
                &format!(
                    "GRANT SELECT, INSERT, UPDATE, DELETE ON {}.{table} TO '{analyst}'",
                    schema::WAREHOUSE_DB
                ),
                Vec::new(),
            )
            .await?;
        }

        info!("Warehouse schema initialized");
        Ok(())
    }

    fn ensure_privileged(&self, operation: &str) -> Result<()> {
        if self.config.username == PRIVILEGED_USER {
            Ok(())
        } else {
            Err(EtlError::Privilege(format!(
                "{operation} requires the '{PRIVILEGED_USER}' identity, but the gateway is configured as '{}'",
                self.config.username
            )))
        }
    }
}

#[async_trait]
impl MaskIdStore for DbGateway {
    /// Fetch-then-insert-then-refetch against the restricted lookup table.
    ///
    /// Not atomic: two concurrent callers racing on the same new value could
    /// both insert. The pipeline runs fully sequentially, which is what makes
    /// this safe; any concurrent caller must serialize access per dimension
    /// table.
    async fn get_or_create_mask_id(
        &mut self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<u64> {
        self.ensure_privileged("Mask-ID lookup")?;

        let constraints = [(column, Some(value.to_string()))];
        let (_, mut rows) = self.fetch_records(table, Some(&["id"]), &constraints).await?;

        if rows.is_empty() {
            let record = [
                (column, Some(value.to_string())),
                (schema::LAST_UPDATED_AT, Some(timestamp_text())),
            ];
            self.insert_record(table, &record, true).await?;
            let (_, refetched) = self.fetch_records(table, Some(&["id"]), &constraints).await?;
            rows = refetched;
        }

        let row = rows
            .first()
            .ok_or_else(|| EtlError::Other(format!("Mask table {table} has no row for inserted value")))?;
        let id = row
            .get_opt::<u64, _>(0)
            .ok_or_else(|| EtlError::Other(format!("Mask table {table} returned no id column")))?
            .map_err(|err| EtlError::Other(format!("Mask id has unexpected type: {err}")))?;
        Ok(id)
    }
}

fn column_names(columns: Option<&[mysql_async::Column]>) -> Vec<String> {
    columns
        .map(|cols| cols.iter().map(|c| c.name_str().to_string()).collect())
        .unwrap_or_default()
}

/// Build a parameterized SELECT with an equality-AND WHERE clause.
/// `None` constraint values translate to `IS NULL`.
fn build_select(
    table: &str,
    fields: Option<&[&str]>,
    constraints: &[ColumnValue<'_>],
) -> (String, Vec<Value>) {
    let columns = fields.map_or_else(|| "*".to_string(), |f| f.join(", "));
    let mut sql = format!("SELECT {columns} FROM {table}");
    let mut params = Vec::new();

    if !constraints.is_empty() {
        let clauses: Vec<String> = constraints
            .iter()
            .map(|(column, value)| match value {
                Some(v) => {
                    params.push(Value::from(v.clone()));
                    format!("{column} = ?")
                }
                None => format!("{column} IS NULL"),
            })
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    (sql, params)
}

/// Build a parameterized column-list INSERT
fn build_insert(table: &str, record: &[ColumnValue<'_>]) -> (String, Vec<Value>) {
    let columns: Vec<&str> = record.iter().map(|(column, _)| *column).collect();
    let placeholders = vec!["?"; record.len()].join(", ");
    let params: Vec<Value> = record
        .iter()
        .map(|(_, value)| value.clone().map_or(Value::NULL, Value::from))
        .collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    (sql, params)
}

fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_select_without_constraints() {
        let (sql, params) = build_select("users_raw", None, &[]);
        assert_eq!(sql, "SELECT * FROM users_raw");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_select_with_fields_and_constraints() {
        let constraints = [
            ("city", Some("Berlin".to_string())),
            ("country", None),
        ];
        let (sql, params) = build_select("sensitive_city_ids", Some(&["id"]), &constraints);
        assert_eq!(
            sql,
            "SELECT id FROM sensitive_city_ids WHERE city = ? AND country IS NULL"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_build_insert_binds_null_for_absent_values() {
        let record = [
            ("user_id", Some("1".to_string())),
            ("email", None),
            ("last_updated_at", Some("2021-11-23 10:00:00".to_string())),
        ];
        let (sql, params) = build_insert("users_raw", &record);
        assert_eq!(
            sql,
            "INSERT INTO users_raw (user_id, email, last_updated_at) VALUES (?, ?, ?)"
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params[1], Value::NULL);
    }

    #[test]
    fn test_quote_literal_doubles_single_quotes() {
        assert_eq!(quote_literal("pa'ss"), "pa''ss");
        assert_eq!(quote_literal("analyst"), "analyst");
    }

    #[test]
    fn test_privilege_check_rejects_non_root() {
        let mut config = DatabaseConfig::default();
        config.username = "analyst".to_string();
        let gateway = DbGateway::new(config, AnalystConfig::default());
        let result = gateway.ensure_privileged("Schema initialisation");
        assert!(matches!(result, Err(EtlError::Privilege(_))));
    }

    #[test]
    fn test_privilege_check_accepts_root() {
        let gateway = DbGateway::new(DatabaseConfig::default(), AnalystConfig::default());
        assert!(gateway.ensure_privileged("Schema initialisation").is_ok());
    }
}
