//! Monitoring view creation
//!
//! Each `.sql` file in the configured query directory defines one view used
//! for data-quality checks; the view name is the file's base name. Sample
//! definitions ship under `sql/monitoring/`.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::db::DbGateway;
use crate::error::Result;
use crate::metrics;

/// Create one view per query file found in `query_dir`, returning the number
/// of views created. A missing directory is logged and yields zero views.
pub async fn create_monitoring_views(gateway: &mut DbGateway, query_dir: &Path) -> Result<usize> {
    if !query_dir.is_dir() {
        warn!(
            dir = %query_dir.display(),
            "Monitoring query directory not found, no views created"
        );
        return Ok(0);
    }

    let mut created = 0;
    for (view_name, file) in discover_view_files(query_dir)? {
        let query = std::fs::read_to_string(&file)?;
        gateway.create_view(&view_name, &query).await?;
        info!(view = %view_name, file = %file.display(), "Created monitoring view");
        created += 1;
    }

    metrics::record_views_created(created);
    Ok(created)
}

/// List the `.sql` files in a directory as (view name, path) pairs, sorted by
/// file name for a stable creation order.
fn discover_view_files(query_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(query_dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == "sql")
        })
        .collect();
    files.sort();

    let mut views = Vec::with_capacity(files.len());
    for file in files {
        match file.file_stem().and_then(|stem| stem.to_str()) {
            Some(view_name) => views.push((view_name.to_string(), file.clone())),
            None => warn!(file = %file.display(), "Skipping query file with unusable name"),
        }
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_view_files_sorted_by_name() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("users_row_counts.sql"), "SELECT 1").expect("write");
        fs::write(dir.path().join("messages_daily_counts.sql"), "SELECT 2").expect("write");
        fs::write(dir.path().join("README.md"), "not a query").expect("write");

        let views = discover_view_files(dir.path()).expect("discovery should succeed");
        let names: Vec<&str> = views.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["messages_daily_counts", "users_row_counts"]);
    }

    #[test]
    fn test_discover_view_files_empty_directory() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let views = discover_view_files(dir.path()).expect("discovery should succeed");
        assert!(views.is_empty());
    }
}
