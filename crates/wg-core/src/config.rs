use crate::error::ErrorCode;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Directory holding the house database and config, relative to the house root.
pub const HOUSE_DIR: &str = ".wg";
/// SQLite database file name inside [`HOUSE_DIR`].
pub const DB_FILE: &str = "house.db";
/// TOML config file name inside [`HOUSE_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Template written by `wg init`.
pub const DEFAULT_CONFIG_TOML: &str = "[schedule]\n\
    epoch = \"2024-01-07\"\n\
    timezone = \"Europe/Berlin\"\n\
    weeks_ahead = 4\n\
    \n\
    [notify]\n\
    api_base = \"https://api.telegram.org\"\n\
    force_weekly = false\n";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Rotation anchor, `YYYY-MM-DD`. Should be a Sunday.
    #[serde(default = "default_epoch")]
    pub epoch: String,
    /// IANA name used to decide which calendar day "today" is.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// How many weeks `wg schedule` shows by default.
    #[serde(default = "default_weeks_ahead")]
    pub weeks_ahead: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            timezone: default_timezone(),
            weeks_ahead: default_weeks_ahead(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Ping everyone on the weekly run, even people without a task.
    #[serde(default)]
    pub force_weekly: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            bot_token: None,
            force_weekly: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid epoch date '{value}': expected YYYY-MM-DD")]
    InvalidEpoch { value: String },

    #[error("unknown timezone '{value}': {reason}")]
    UnknownTimezone { value: String, reason: String },

    #[error("no chat bot token configured")]
    MissingBotToken,
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingBotToken => ErrorCode::MissingBotToken,
            _ => ErrorCode::ConfigParseError,
        }
    }
}

/// Validated calendar settings injected into the scheduler and notifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Rotation anchor, always a Sunday.
    pub epoch: NaiveDate,
    pub timezone: Tz,
    pub weeks_ahead: u32,
}

impl Settings {
    /// The current calendar day in the configured timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today_at(Utc::now())
    }

    /// The calendar day `now` falls on in the configured timezone.
    #[must_use]
    pub fn today_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}

/// Path of the `.wg` directory under `house_root`.
#[must_use]
pub fn house_dir(house_root: &Path) -> PathBuf {
    house_root.join(HOUSE_DIR)
}

/// Walk up from `start` looking for a `.wg` directory.
#[must_use]
pub fn find_house_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(HOUSE_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load `config.toml` from a `.wg` directory, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_house_config(house_dir: &Path) -> Result<HouseConfig, ConfigError> {
    let path = house_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(HouseConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    toml::from_str::<HouseConfig>(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Resolve calendar settings from config plus `WG_EPOCH_DATE` / `WG_TIMEZONE`.
///
/// # Errors
///
/// Returns an error for an unparseable epoch or an unknown timezone. A valid
/// epoch that is not a Sunday is corrected, not rejected.
pub fn resolve_settings(config: &HouseConfig) -> Result<Settings, ConfigError> {
    let env_epoch = env::var("WG_EPOCH_DATE").ok().filter(|v| !v.trim().is_empty());
    let env_timezone = env::var("WG_TIMEZONE").ok().filter(|v| !v.trim().is_empty());
    resolve_settings_inner(&config.schedule, env_epoch, env_timezone)
}

fn resolve_settings_inner(
    schedule: &ScheduleConfig,
    env_epoch: Option<String>,
    env_timezone: Option<String>,
) -> Result<Settings, ConfigError> {
    let raw_epoch = env_epoch.unwrap_or_else(|| schedule.epoch.clone());
    let parsed = NaiveDate::parse_from_str(raw_epoch.trim(), "%Y-%m-%d").map_err(|_| {
        ConfigError::InvalidEpoch {
            value: raw_epoch.clone(),
        }
    })?;
    let epoch = align_epoch(parsed);
    if epoch != parsed {
        tracing::warn!(
            configured = %parsed,
            adjusted = %epoch,
            "epoch date is not a Sunday; using the preceding Sunday"
        );
    }

    let raw_timezone = env_timezone.unwrap_or_else(|| schedule.timezone.clone());
    let timezone = raw_timezone
        .trim()
        .parse::<Tz>()
        .map_err(|e| ConfigError::UnknownTimezone {
            value: raw_timezone.clone(),
            reason: e.to_string(),
        })?;

    tracing::debug!(%epoch, timezone = %timezone, "resolved schedule settings");

    Ok(Settings {
        epoch,
        timezone,
        weeks_ahead: schedule.weeks_ahead.max(1),
    })
}

/// Move `date` back to the Sunday on or before it.
#[must_use]
pub fn align_epoch(date: NaiveDate) -> NaiveDate {
    crate::schedule::sunday_on_or_before(date)
}

/// Resolve the chat bot token: `WG_BOT_TOKEN` wins over `[notify].bot_token`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingBotToken`] when neither is set.
pub fn bot_token(config: &HouseConfig) -> Result<String, ConfigError> {
    env::var("WG_BOT_TOKEN")
        .ok()
        .or_else(|| config.notify.bot_token.clone())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::MissingBotToken)
}

fn default_epoch() -> String {
    "2024-01-07".to_string()
}

fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

const fn default_weeks_ahead() -> u32 {
    4
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_house_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.schedule.epoch, "2024-01-07");
        assert_eq!(cfg.schedule.timezone, "Europe/Berlin");
        assert_eq!(cfg.schedule.weeks_ahead, 4);
        assert_eq!(cfg.notify.api_base, "https://api.telegram.org");
        assert!(cfg.notify.bot_token.is_none());
        assert!(!cfg.notify.force_weekly);
    }

    #[test]
    fn default_template_parses_to_defaults() {
        let cfg: HouseConfig = toml::from_str(DEFAULT_CONFIG_TOML).expect("template parses");
        let settings = resolve_settings_inner(&cfg.schedule, None, None).expect("resolve");
        assert_eq!(settings.epoch, date(2024, 1, 7));
        assert_eq!(settings.timezone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[schedule]\ntimezone = \"UTC\"\n",
        )
        .expect("write config");

        let cfg = load_house_config(dir.path()).expect("load");
        assert_eq!(cfg.schedule.timezone, "UTC");
        assert_eq!(cfg.schedule.epoch, "2024-01-07");
        assert_eq!(cfg.notify.api_base, "https://api.telegram.org");
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE), "[schedule\nepoch = ").expect("write");
        let err = load_house_config(dir.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }

    #[test]
    fn non_sunday_epoch_is_moved_to_preceding_sunday() {
        // 2024-01-10 is a Wednesday.
        let schedule = ScheduleConfig {
            epoch: "2024-01-10".to_string(),
            ..ScheduleConfig::default()
        };
        let settings = resolve_settings_inner(&schedule, None, None).expect("resolve");
        assert_eq!(settings.epoch, date(2024, 1, 7));
        assert_eq!(settings.epoch.weekday(), Weekday::Sun);
    }

    #[test]
    fn align_epoch_keeps_sundays() {
        assert_eq!(align_epoch(date(2024, 1, 7)), date(2024, 1, 7));
        assert_eq!(align_epoch(date(2024, 1, 13)), date(2024, 1, 7));
        assert_eq!(align_epoch(date(2024, 1, 1)), date(2023, 12, 31));
    }

    #[test]
    fn env_values_override_config() {
        let settings = resolve_settings_inner(
            &ScheduleConfig::default(),
            Some("2023-01-01".to_string()),
            Some("America/New_York".to_string()),
        )
        .expect("resolve");
        assert_eq!(settings.epoch, date(2023, 1, 1));
        assert_eq!(settings.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn invalid_epoch_is_fatal() {
        let schedule = ScheduleConfig {
            epoch: "next sunday".to_string(),
            ..ScheduleConfig::default()
        };
        let err = resolve_settings_inner(&schedule, None, None).expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidEpoch { .. }));
    }

    #[test]
    fn unknown_timezone_is_fatal() {
        let schedule = ScheduleConfig {
            timezone: "Mars/Olympus".to_string(),
            ..ScheduleConfig::default()
        };
        let err = resolve_settings_inner(&schedule, None, None).expect_err("should fail");
        assert!(matches!(err, ConfigError::UnknownTimezone { .. }));
    }

    #[test]
    fn today_follows_configured_timezone() {
        let settings = Settings {
            epoch: date(2024, 1, 7),
            timezone: chrono_tz::Europe::Berlin,
            weeks_ahead: 4,
        };
        // 23:30 UTC on Saturday is already Sunday in Berlin.
        let now = Utc.with_ymd_and_hms(2024, 1, 13, 23, 30, 0).single().expect("valid");
        assert_eq!(settings.today_at(now), date(2024, 1, 14));

        let utc = Settings {
            timezone: chrono_tz::UTC,
            ..settings
        };
        assert_eq!(utc.today_at(now), date(2024, 1, 13));
    }

    #[test]
    fn find_house_dir_walks_up() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(HOUSE_DIR)).expect("create .wg");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("create nested");

        let found = find_house_dir(&nested).expect("should find .wg");
        assert_eq!(found, dir.path().join(HOUSE_DIR));
    }
}
