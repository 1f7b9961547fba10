//! Metrics collection
//!
//! Counter names and recording helpers for the pipeline's feedback signal:
//! records fetched, inserted, skipped, rejected and failed per table, fetch
//! errors per collection, and views created.

use metrics::counter;

use crate::load::LoadReport;

/// Records fetched from the API, labelled by collection
pub const RECORDS_FETCHED_TOTAL: &str = "spark_etl_records_fetched_total";
/// Fetch attempts that errored, labelled by collection
pub const FETCH_ERRORS_TOTAL: &str = "spark_etl_fetch_errors_total";
/// Rows newly inserted, labelled by table
pub const RECORDS_INSERTED_TOTAL: &str = "spark_etl_records_inserted_total";
/// Rows skipped as already existing, labelled by table
pub const RECORDS_SKIPPED_TOTAL: &str = "spark_etl_records_skipped_total";
/// Records rejected by the PII guard, labelled by table
pub const RECORDS_REJECTED_TOTAL: &str = "spark_etl_records_rejected_total";
/// Records whose insert failed, labelled by table
pub const RECORDS_FAILED_TOTAL: &str = "spark_etl_records_failed_total";
/// Monitoring views created
pub const VIEWS_CREATED_TOTAL: &str = "spark_etl_views_created_total";

/// Record a successful collection fetch
pub fn record_fetch(collection: &'static str, count: usize) {
    counter!(RECORDS_FETCHED_TOTAL, "collection" => collection).increment(count as u64);
}

/// Record a failed collection fetch
pub fn record_fetch_error(collection: &'static str) {
    counter!(FETCH_ERRORS_TOTAL, "collection" => collection).increment(1);
}

/// Record the outcome of one table load
pub fn record_load(report: &LoadReport) {
    counter!(RECORDS_INSERTED_TOTAL, "table" => report.table).increment(report.inserted as u64);
    counter!(RECORDS_SKIPPED_TOTAL, "table" => report.table).increment(report.skipped as u64);
    counter!(RECORDS_REJECTED_TOTAL, "table" => report.table).increment(report.rejected as u64);
    counter!(RECORDS_FAILED_TOTAL, "table" => report.table).increment(report.failed as u64);
}

/// Record the number of monitoring views created in a run
pub fn record_views_created(count: usize) {
    counter!(VIEWS_CREATED_TOTAL).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_names_carry_the_crate_prefix() {
        for name in [
            RECORDS_FETCHED_TOTAL,
            FETCH_ERRORS_TOTAL,
            RECORDS_INSERTED_TOTAL,
            RECORDS_SKIPPED_TOTAL,
            RECORDS_REJECTED_TOTAL,
            RECORDS_FAILED_TOTAL,
            VIEWS_CREATED_TOTAL,
        ] {
            assert!(name.starts_with("spark_etl_"));
        }
    }

    #[test]
    fn test_recording_without_a_recorder_is_a_noop() {
        // With no global recorder installed these must not panic.
        record_fetch("users", 3);
        record_fetch_error("messages");
        record_views_created(2);
    }
}
