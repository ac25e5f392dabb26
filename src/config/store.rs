// src/config/store.rs

//! Resolving `(profile, command)` pairs to command definitions.

use chrono::{DateTime, Utc};

use crate::config::model::{ConfigFile, ProfileConfig};
use crate::errors::{CmdrunError, Result};
use crate::types::CommandSpec;

/// Source of command definitions.
pub trait CommandLookup {
    fn lookup(&self, profile_id: &str, command_id: &str) -> Result<CommandSpec>;
}

/// Read-only profile catalogue backed by a loaded config file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    config: ConfigFile,
    loaded_at: DateTime<Utc>,
}

impl ProfileStore {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            loaded_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn profiles(&self) -> impl Iterator<Item = (&str, &ProfileConfig)> {
        self.config
            .profiles()
            .iter()
            .map(|(id, profile)| (id.as_str(), profile))
    }
}

impl CommandLookup for ProfileStore {
    fn lookup(&self, profile_id: &str, command_id: &str) -> Result<CommandSpec> {
        let profile = self
            .config
            .profiles()
            .get(profile_id)
            .ok_or_else(|| CmdrunError::ProfileNotFound(profile_id.to_string()))?;

        let command = profile
            .command
            .get(command_id)
            .ok_or_else(|| CmdrunError::CommandNotFound {
                profile: profile_id.to_string(),
                command: command_id.to_string(),
            })?;

        let mut spec = command.to_spec(command_id);
        spec.created_at = self.loaded_at;
        spec.updated_at = self.loaded_at;
        Ok(spec)
    }
}
