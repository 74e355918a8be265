pub mod balance;
pub mod completions;
pub mod expense;
pub mod init;
pub mod notify;
pub mod person;
pub mod schedule;
pub mod settle;
pub mod tasks;

use crate::output::{OutputMode, fail};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use wg_core::config::{self, ConfigError, HouseConfig, Settings};
use wg_core::error::ErrorCode;
use wg_core::schedule::Rotation;

/// An opened house: config, validated settings, and a migrated database.
pub struct House {
    pub config: HouseConfig,
    pub settings: Settings,
    pub conn: Connection,
}

impl House {
    pub const fn rotation(&self) -> Rotation {
        Rotation::new(self.settings.epoch)
    }

    /// `date` when given, else today in the configured timezone.
    pub fn day(&self, date: Option<NaiveDate>) -> NaiveDate {
        date.unwrap_or_else(|| self.settings.today())
    }
}

/// Locate `.wg/` from `project_root` upwards and open everything in it.
///
/// # Errors
///
/// Renders and returns an error when no house exists or its config is
/// invalid.
pub fn open_house(project_root: &Path, output: OutputMode) -> anyhow::Result<House> {
    let Some(dir) = config::find_house_dir(project_root) else {
        return Err(fail(
            output,
            ErrorCode::NotInitialized,
            format!("no {} directory found", config::HOUSE_DIR),
        ));
    };

    let config = config::load_house_config(&dir).map_err(|e| config_failure(output, &e))?;
    let settings = config::resolve_settings(&config).map_err(|e| config_failure(output, &e))?;

    let conn = wg_core::db::open_house_db(&dir.join(config::DB_FILE))
        .map_err(|e| fail(output, ErrorCode::StorageFailure, format!("{e:#}")))?;

    tracing::debug!(dir = %dir.display(), "opened house");
    Ok(House {
        config,
        settings,
        conn,
    })
}

pub fn config_failure(output: OutputMode, error: &ConfigError) -> anyhow::Error {
    fail(output, error.code(), error.to_string())
}

/// Parse a `YYYY-MM-DD` argument.
///
/// # Errors
///
/// Returns a message clap can show for malformed dates.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not a date; expected YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso() {
        assert_eq!(
            parse_date("2024-01-07"),
            Ok(NaiveDate::from_ymd_opt(2024, 1, 7).expect("valid date"))
        );
        assert!(parse_date("07/01/2024").is_err());
    }

    #[test]
    fn open_house_without_init_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(open_house(dir.path(), OutputMode::Json).is_err());
    }
}
