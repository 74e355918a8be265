use crate::output::{OutputMode, pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wg_core::config::{self, CONFIG_FILE, DB_FILE, DEFAULT_CONFIG_TOML};
use wg_core::db::{self, migrations};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.toml with the default template.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    house_dir: String,
    config_written: bool,
    schema_version: u32,
}

const GITIGNORE: &str = "house.db\nhouse.db-wal\nhouse.db-shm\n";

/// Execute `wg init`. Creates:
///
/// ```text
/// .wg/
///   config.toml   (default schedule and notify settings)
///   house.db      (SQLite store, migrated to the latest schema)
///   .gitignore
/// ```
///
/// Re-running is safe: the database is only migrated, and an existing config
/// is kept unless `--force` is given.
///
/// # Errors
///
/// Returns an error if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, quiet: bool, project_root: &Path) -> Result<()> {
    let house_dir = config::house_dir(project_root);
    std::fs::create_dir_all(&house_dir)
        .with_context(|| format!("create {}", house_dir.display()))?;

    let config_path = house_dir.join(CONFIG_FILE);
    let config_written = args.force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("write config {}", config_path.display()))?;
    }

    let gitignore_path = house_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, GITIGNORE)
            .with_context(|| format!("write {}", gitignore_path.display()))?;
    }

    let conn = db::open_house_db(&house_dir.join(DB_FILE))?;
    let schema_version = migrations::current_schema_version(&conn)?;
    tracing::info!(schema_version, "house initialized");

    let result = InitOutput {
        ok: true,
        house_dir: house_dir.display().to_string(),
        config_written,
        schema_version,
    };

    render(output, &result, |r, w| {
        writeln!(w, "✓ Initialized {}", r.house_dir)?;
        if quiet {
            return Ok(());
        }
        pretty_kv(w, "Config", if r.config_written { "written" } else { "kept" })?;
        pretty_kv(w, "Schema", format!("v{}", r.schema_version))?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  wg person add Alice")?;
        writeln!(w, "  wg schedule")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_config_and_db() {
        let dir = tempfile::tempdir().expect("temp dir");
        run_init(&InitArgs { force: false }, OutputMode::Json, true, dir.path()).expect("init");

        let house = dir.path().join(".wg");
        assert!(house.join(CONFIG_FILE).exists());
        assert!(house.join(DB_FILE).exists());
        assert!(house.join(".gitignore").exists());
    }

    #[test]
    fn init_keeps_existing_config_unless_forced() {
        let dir = tempfile::tempdir().expect("temp dir");
        let house = dir.path().join(".wg");
        std::fs::create_dir_all(&house).expect("mkdir");
        std::fs::write(house.join(CONFIG_FILE), "[schedule]\ntimezone = \"UTC\"\n").expect("write");

        run_init(&InitArgs { force: false }, OutputMode::Json, true, dir.path()).expect("init");
        let kept = std::fs::read_to_string(house.join(CONFIG_FILE)).expect("read");
        assert!(kept.contains("UTC"));

        run_init(&InitArgs { force: true }, OutputMode::Json, true, dir.path()).expect("reinit");
        let reset = std::fs::read_to_string(house.join(CONFIG_FILE)).expect("read");
        assert_eq!(reset, DEFAULT_CONFIG_TOML);
    }
}
