#![deny(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use time::{macros::format_description, OffsetDateTime};

use crate::error::ContextError;

/// Everything which depends on the moment the run was started: the timestamp and the paths of the
/// artifacts named after it. It is built once at startup and handed to whoever needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub started_at: OffsetDateTime,
    /// The start of the run formatted as `YYYYmmdd_HHMMSS`.
    pub timestamp: String,
    pub output_directory: PathBuf,
    pub images_directory: PathBuf,
    pub pdf_path: PathBuf,
    pub log_path: PathBuf,
}

impl RunConfiguration {
    /// Creates the configuration of a run starting now, in local time when the local offset can
    /// be determined and in UTC otherwise.
    pub fn new(output_root: &Path) -> Result<Self, ContextError> {
        let started_at = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self::started_at(output_root, started_at)
    }

    pub fn started_at(output_root: &Path, started_at: OffsetDateTime) -> Result<Self, ContextError> {
        let timestamp = started_at
            .format(format_description!(
                "[year][month][day]_[hour][minute][second]"
            ))
            .map_err(|error| ContextError::with_error("Unable to format the run timestamp", &error))?;
        let output_directory = output_root.join(format!("output_{}", timestamp));

        Ok(RunConfiguration {
            started_at,
            images_directory: output_directory.join("images"),
            pdf_path: output_directory.join("contacts.pdf"),
            log_path: output_root
                .join("logs")
                .join(format!("font_scanner_{}.log", timestamp)),
            output_directory,
            timestamp,
        })
    }

    /// Creates the run directory with its images subdirectory.
    pub fn create_directories(&self) -> Result<(), ContextError> {
        std::fs::create_dir_all(&self.images_directory).map_err(|error| {
            ContextError::with_error(
                format!("Unable to create the directory {:?}", self.images_directory),
                &error,
            )
        })?;
        log::debug!("Created the output directory {:?}", self.output_directory);

        Ok(())
    }

    /// Where the picture of the record with the given 1-based index is downloaded to.
    pub fn image_path(&self, record_index: usize) -> PathBuf {
        self.images_directory
            .join(format!("person_{}.jpg", record_index))
    }
}
