// Path: crates/corenet-config/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # corenet-config
//!
//! An INI-like configuration loader with directory overlays. A logical
//! config name `N` is materialized from `<configs_dir>/N.cfg`, then every
//! `*.cfg` file under `<configs_dir>/N.d/` is applied in alphabetical
//! order, each one able to override or remove keys set by an earlier file.

mod parser;

pub use corenet_types::ConfigValue;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded, hash-table-backed configuration store.
///
/// Keys are normalized `section:key` composites with dashes converted to
/// underscores, so `debug-config` and `debug_config` read the same entry.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: HashMap<String, ConfigValue>,
    /// The directory `N.cfg` was loaded from, used to resolve path-typed
    /// accessors relative to the config rather than the process cwd.
    base_dir: PathBuf,
}

fn normalize_key(section: &str, key: &str) -> String {
    format!("{}:{}", section, key.replace('-', "_"))
}

impl Config {
    /// Loads the logical config `name` from `configs_dir`, applying
    /// `<name>.d/*.cfg` overlays in alphabetical order.
    pub fn open(configs_dir: &Path, name: &str) -> Result<Config, ConfigError> {
        let base_path = configs_dir.join(format!("{name}.cfg"));
        let mut cfg = Config {
            entries: HashMap::new(),
            base_dir: configs_dir.to_path_buf(),
        };

        if base_path.exists() {
            cfg.apply_file(&base_path)?;
        }

        let overlay_dir = configs_dir.join(format!("{name}.d"));
        if overlay_dir.is_dir() {
            let mut overlays: Vec<PathBuf> = std::fs::read_dir(&overlay_dir)
                .map_err(|e| ConfigError::Io {
                    path: overlay_dir.clone(),
                    source: e,
                })?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().map(|e| e == "cfg").unwrap_or(false))
                .collect();
            overlays.sort();
            for overlay in overlays {
                cfg.apply_file(&overlay)?;
            }
        }

        Ok(cfg)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        for (section, key, raw) in parser::parse(&contents) {
            let composite = normalize_key(&section, &key);
            match raw {
                None => {
                    self.entries.remove(&composite);
                }
                Some(value) => {
                    self.entries.insert(composite, value);
                }
            }
        }
        Ok(())
    }

    /// Directly inserts a value, bypassing the parser. Primarily useful in
    /// tests and for programmatically-constructed overlays.
    pub fn set(&mut self, section: &str, key: &str, value: ConfigValue) {
        self.entries.insert(normalize_key(section, key), value);
    }

    pub fn get_item(&self, section: &str, key: &str) -> Option<&ConfigValue> {
        self.entries.get(&normalize_key(section, key))
    }

    pub fn get_item_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get_item(section, key) {
            Some(v) => v.as_bool().unwrap_or_else(|| {
                tracing::error!(target: "config", section, key, "expected bool, using default");
                default
            }),
            None => default,
        }
    }

    pub fn get_item_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.get_item(section, key) {
            Some(v) => v.as_int().unwrap_or_else(|| {
                tracing::error!(target: "config", section, key, "expected int, using default");
                default
            }),
            None => default,
        }
    }

    pub fn get_item_str<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        match self.get_item(section, key) {
            Some(v) => v.as_str().unwrap_or_else(|| {
                tracing::error!(target: "config", section, key, "expected string, using default");
                default
            }),
            None => default,
        }
    }

    pub fn get_item_array(&self, section: &str, key: &str) -> Vec<String> {
        match self.get_item(section, key) {
            Some(v) => v.as_array().map(|s| s.to_vec()).unwrap_or_else(|| {
                tracing::error!(target: "config", section, key, "expected array, using empty default");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// Resolves a path-typed value relative to the directory `N.cfg` was
    /// loaded from. Absolute values pass through unchanged.
    pub fn get_item_path(&self, section: &str, key: &str, default: &Path) -> PathBuf {
        match self.get_item(section, key).and_then(|v| v.as_str()) {
            Some(raw) => {
                let p = Path::new(raw);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    self.base_dir.join(p)
                }
            }
            None => default.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn overlay_order_and_removal() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("base.cfg"), "[s]\nk = 1\n").expect("write base");
        let overlay_dir = dir.path().join("base.d");
        fs::create_dir(&overlay_dir).expect("mkdir");
        fs::write(overlay_dir.join("10-over.cfg"), "[s]\nk = 2\n").expect("write overlay1");
        fs::write(overlay_dir.join("20-clear.cfg"), "[s]\nk =\n").expect("write overlay2");

        let cfg = Config::open(dir.path(), "base").expect("open");
        assert_eq!(cfg.get_item_int("s", "k", 7), 7);
    }

    #[test]
    fn dash_and_underscore_are_the_same_key() {
        let mut cfg = Config::default();
        cfg.set("general", "debug_config", ConfigValue::Bool(true));
        assert!(cfg.get_item_bool("general", "debug-config", false));
    }

    #[test]
    fn missing_key_returns_default() {
        let cfg = Config::default();
        assert_eq!(cfg.get_item_int("x", "y", 42), 42);
    }
}
