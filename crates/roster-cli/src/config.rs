// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use roster_app::TableKind;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "roster.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            export: Export::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub start_tab: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Export {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

const EXAMPLE_TEMPLATE: &str = r#"# roster config
# Place this file at: {path}

version = 1

[storage]
# Optional. Defaults to the platform data dir, e.g. ~/.local/share/roster/roster.db
# db_path = "/absolute/path/to/roster.db"

[ui]
# Tab shown at launch: clients, agents, or resources
start_tab = "clients"

[export]
# Directory that receives resources.json
dir = "."

[log]
# EnvFilter directive; ROSTER_LOG overrides it
level = "{level}"
# file = "/absolute/path/to/{log_file}"
"#;

impl Config {
    /// `ROSTER_CONFIG_PATH`, else `<config dir>/roster/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(explicit) = env::var_os("ROSTER_CONFIG_PATH") {
            return Ok(PathBuf::from(explicit));
        }

        let Some(config_dir) = dirs::config_dir() else {
            bail!("no config directory on this platform; set ROSTER_CONFIG_PATH and retry");
        };
        let roster_dir = config_dir.join(roster_db::APP_NAME);
        fs::create_dir_all(&roster_dir)
            .with_context(|| format!("create {}", roster_dir.display()))?;
        Ok(roster_dir.join("config.toml"))
    }

    /// A missing file means defaults. Anything present must declare
    /// `version = 1` and pass validation.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => {
                return Err(error).with_context(|| format!("read config {}", path.display()));
            }
        };
        let table: toml::Table = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        match table.get("version").and_then(toml::Value::as_integer) {
            Some(CONFIG_VERSION) => {}
            Some(other) => bail!(
                "unsupported config version {other} in {}; rewrite it for version = {CONFIG_VERSION}",
                path.display()
            ),
            None => bail!(
                "config {} has no version; add `version = 1` at the top and group settings \
                 under [storage], [ui], [export], and [log]",
                path.display()
            ),
        }

        let config: Config = toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let shown = path.display();
        if let Some(db_path) = &self.storage.db_path {
            roster_db::validate_db_path(db_path)
                .with_context(|| format!("storage.db_path in {shown}"))?;
        }
        if let Some(tab) = self.ui.start_tab.as_deref()
            && TableKind::parse(tab).is_none()
        {
            bail!("ui.start_tab in {shown} is {tab:?}; use clients, agents, or resources");
        }
        if self.export.dir.as_deref().is_some_and(is_blank) {
            bail!("export.dir in {shown} is blank -- name a directory or delete the key");
        }
        if self.log.level.as_deref().is_some_and(is_blank) {
            bail!("log.level in {shown} is blank -- use a directive such as info or debug");
        }
        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        self.storage
            .db_path
            .as_ref()
            .map_or_else(roster_db::default_db_path, |path| Ok(PathBuf::from(path)))
    }

    pub fn start_tab(&self) -> TableKind {
        self.ui
            .start_tab
            .as_deref()
            .and_then(TableKind::parse)
            .unwrap_or(TableKind::Clients)
    }

    pub fn export_dir(&self) -> PathBuf {
        PathBuf::from(self.export.dir.as_deref().unwrap_or("."))
    }

    /// Filter directive for the log subscriber; `ROSTER_LOG` wins over the
    /// config file.
    pub fn log_filter(&self) -> String {
        if let Ok(directive) = env::var("ROSTER_LOG")
            && !is_blank(&directive)
        {
            return directive;
        }
        self.log
            .level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned())
    }

    /// Log file next to the default database unless `[log].file` says otherwise.
    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let db_path = roster_db::default_db_path()?;
        Ok(db_path.with_file_name(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        EXAMPLE_TEMPLATE
            .replace("{path}", &path.display().to_string())
            .replace("{level}", DEFAULT_LOG_LEVEL)
            .replace("{log_file}", LOG_FILE_NAME)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use roster_app::TableKind;
    use std::ffi::OsStr;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes env mutation across tests and restores the variable on drop.
    struct EnvVar {
        key: &'static str,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvVar {
        fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // SAFETY: ENV_LOCK serializes every env mutation in this module.
            unsafe { std::env::set_var(key, value) };
            Self { key, _lock: lock }
        }

        fn unset(key: &'static str) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // SAFETY: ENV_LOCK serializes every env mutation in this module.
            unsafe { std::env::remove_var(key) };
            Self { key, _lock: lock }
        }
    }

    impl Drop for EnvVar {
        fn drop(&mut self) {
            // SAFETY: the lock is still held while the guard drops.
            unsafe { std::env::remove_var(self.key) };
        }
    }

    fn load_str(content: &str) -> Result<(tempfile::TempDir, Config)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        let config = Config::load(&path)?;
        Ok((temp, config))
    }

    fn load_error(content: &str) -> String {
        match load_str(content) {
            Ok((_, config)) => panic!("config loaded unexpectedly: {config:?}"),
            Err(error) => format!("{error:#}"),
        }
    }

    #[test]
    fn absent_file_falls_back_to_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("absent.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.start_tab(), TableKind::Clients);
        assert_eq!(config.export_dir(), PathBuf::from("."));
        Ok(())
    }

    #[test]
    fn full_config_is_honoured() -> Result<()> {
        let (_temp, config) = load_str(
            r#"
            version = 1
            [ui]
            start_tab = "resources"
            [export]
            dir = "/srv/exports"
            [log]
            level = "debug"
            file = "/var/log/roster-test.log"
            "#,
        )?;
        assert_eq!(config.start_tab(), TableKind::Resources);
        assert_eq!(config.export_dir(), PathBuf::from("/srv/exports"));
        assert_eq!(config.log_path()?, PathBuf::from("/var/log/roster-test.log"));
        Ok(())
    }

    #[test]
    fn version_gate_explains_the_fix() {
        let message = load_error("[ui]\nstart_tab = \"agents\"\n");
        assert!(message.contains("version = 1"), "{message}");
        assert!(message.contains("[storage], [ui], [export], and [log]"), "{message}");

        let message = load_error("version = 2\n");
        assert!(message.contains("unsupported config version 2"), "{message}");
    }

    #[test]
    fn invalid_values_name_the_offending_key() {
        assert!(load_error("{{not toml").contains("parse TOML config"));
        assert!(load_error("version = 1\n[ui]\nstart_tab = \"vendors\"\n").contains("ui.start_tab"));
        assert!(load_error("version = 1\n[export]\ndir = \"  \"\n").contains("export.dir"));
        assert!(load_error("version = 1\n[log]\nlevel = \"\"\n").contains("log.level"));

        let message =
            load_error("version = 1\n[storage]\ndb_path = \"https://evil.example/roster.db\"\n");
        assert!(message.contains("storage.db_path"), "{message}");
        assert!(message.contains("looks like a URI"), "{message}");
    }

    #[test]
    fn config_path_env_override_wins() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let wanted = temp.path().join("elsewhere.toml");
        let _env = EnvVar::set("ROSTER_CONFIG_PATH", &wanted);
        assert_eq!(Config::default_path()?, wanted);
        Ok(())
    }

    #[test]
    fn configured_db_path_beats_env_override() -> Result<()> {
        let _env = EnvVar::set("ROSTER_DB_PATH", "/from/env.db");
        let (_temp, config) =
            load_str("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn env_db_path_applies_when_unconfigured() -> Result<()> {
        let _env = EnvVar::set("ROSTER_DB_PATH", "/from/env-only.db");
        let (_temp, config) = load_str("version = 1\n")?;
        assert_eq!(config.db_path()?, PathBuf::from("/from/env-only.db"));
        assert_eq!(config.log_path()?, PathBuf::from("/from/roster.log"));
        Ok(())
    }

    #[test]
    fn log_filter_falls_back_to_config_level() -> Result<()> {
        let _env = EnvVar::unset("ROSTER_LOG");
        let (_temp, config) = load_str("version = 1\n[log]\nlevel = \"warn\"\n")?;
        assert_eq!(config.log_filter(), "warn");
        assert_eq!(Config::default().log_filter(), "info");
        Ok(())
    }

    #[test]
    fn log_filter_env_override_wins() -> Result<()> {
        let _env = EnvVar::set("ROSTER_LOG", "roster_db=debug");
        let (_temp, config) = load_str("version = 1\n[log]\nlevel = \"warn\"\n")?;
        assert_eq!(config.log_filter(), "roster_db=debug");
        Ok(())
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        for section in ["version = 1", "[storage]", "[ui]", "[export]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }
        assert!(example.contains(&path.display().to_string()));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.start_tab(), TableKind::Clients);
        assert_eq!(config.export_dir(), PathBuf::from("."));
        Ok(())
    }
}
