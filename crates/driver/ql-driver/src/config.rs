//! Driver configuration files

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// What a successful compilation produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum EmitKind {
    /// Relocatable object file for the host
    #[default]
    #[display("object")]
    Object,
    /// Cranelift IR text
    #[display("clif")]
    Clif,
    /// Backend-neutral LIR text
    #[display("lir")]
    Lir,
}

/// Settings for one compilation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Name of the emitted module
    pub module_name: String,

    /// Output format
    pub emit: EmitKind,

    /// Record the AST rendering before resolution
    pub dump_ast: bool,

    /// Record the symbol table before resolution
    pub dump_symbols: bool,

    /// Record the AST annotated with its scopes after resolution
    pub dump_scopes: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            module_name: "mainmodule".to_owned(),
            emit: EmitKind::default(),
            dump_ast: false,
            dump_symbols: false,
            dump_scopes: false,
        }
    }
}

impl DriverConfig {
    /// Parse a configuration from TOML text
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse driver configuration")
    }

    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration: {}", path.display()))
    }

    /// Write this configuration to `path`
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write configuration: {}", path.display()))
    }
}
