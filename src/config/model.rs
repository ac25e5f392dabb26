// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::security::SecurityPolicy;
use crate::types::CommandSpec;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [security]
/// blocked_commands = ["shutdown"]
///
/// [profile.web]
/// name = "Web projects"
///
/// [profile.web.command.install]
/// name = "npm install"
/// executable = "npm"
/// arguments = "install"
/// iteration_enabled = true
///
/// [profile.web.command.install.env]
/// NODE_ENV = "development"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub security: SecurityPolicy,

    /// Keyed by profile id.
    #[serde(default)]
    pub profile: BTreeMap<String, ProfileConfig>,
}

/// `[profile.<id>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    /// Display name; falls back to the profile id.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Keyed by command id.
    #[serde(default)]
    pub command: BTreeMap<String, CommandConfig>,
}

impl ProfileConfig {
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(id)
    }
}

/// `[profile.<id>.command.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Display name; falls back to the command id.
    #[serde(default)]
    pub name: Option<String>,

    pub executable: String,

    #[serde(default)]
    pub arguments: String,

    /// Default directory for single runs; `.` when unset.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub iteration_enabled: bool,

    #[serde(default)]
    pub require_confirmation: bool,
}

impl CommandConfig {
    /// Build the runtime command definition for this entry.
    pub fn to_spec(&self, id: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(id, self.name.as_deref().unwrap_or(id), &self.executable);
        spec.arguments = self.arguments.clone();
        spec.working_directory = self
            .working_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        spec.shell = self.shell.clone();
        spec.environment = self.env.clone();
        spec.iteration_enabled = self.iteration_enabled;
        spec.require_confirmation = self.require_confirmation;
        spec
    }
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (or the
/// loader helpers), so holders can rely on non-empty ids and executables.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    security: SecurityPolicy,
    profiles: BTreeMap<String, ProfileConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        security: SecurityPolicy,
        profiles: BTreeMap<String, ProfileConfig>,
    ) -> Self {
        Self { security, profiles }
    }

    pub fn security(&self) -> &SecurityPolicy {
        &self.security
    }

    pub fn profiles(&self) -> &BTreeMap<String, ProfileConfig> {
        &self.profiles
    }
}
