use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Outcome of one cleanup sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes the intermediate files a plan produced.
///
/// Every path is attempted in order. A failed delete is logged and recorded;
/// it never stops the sweep and nothing already deleted is restored.
pub async fn cleanup<P: AsRef<Path>>(paths: &[P]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted intermediate file: {}", path.display());
                report.removed.push(path.to_path_buf());
            }
            Err(e) => {
                warn!("Error deleting intermediate file {}: {}", path.display(), e);
                report.failed.push((path.to_path_buf(), e.to_string()));
            }
        }
    }

    report
}
