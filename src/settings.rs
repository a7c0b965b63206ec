//! Runtime settings, read with the `config` crate.
//!
//! Sources are layered: built-in defaults, then an optional TOML file, then
//! `KEEPSAKE_*` environment variables (e.g. `KEEPSAKE_KEY_ORDER=sorted`).

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

/// How record fields contribute to a structural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOrder {
    /// Field order is part of identity: `{a, b}` and `{b, a}` are different values.
    #[default]
    Insertion,
    /// Fields are sorted by name before keying, so field order does not matter.
    Sorted,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub key_order: KeyOrder,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_order: KeyOrder::Insertion,
            log_filter: String::from("info"),
        }
    }
}

impl Settings {
    /// Load settings, with `path` being an optional TOML file. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("key_order", "insertion")?
            .set_default("log_filter", "info")?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix("KEEPSAKE"))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
