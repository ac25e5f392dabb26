// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CmdrunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CmdrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.security, raw.profile))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_security(cfg)?;
    validate_profiles(cfg)?;
    Ok(())
}

fn validate_security(cfg: &RawConfigFile) -> Result<()> {
    if cfg.security.max_execution_time_secs == 0 {
        return Err(CmdrunError::ConfigError(
            "[security].max_execution_time_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.security.dangerous_patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(CmdrunError::ConfigError(
            "[security].dangerous_patterns must not contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_profiles(cfg: &RawConfigFile) -> Result<()> {
    for (profile_id, profile) in cfg.profile.iter() {
        if profile_id.trim().is_empty() {
            return Err(CmdrunError::ConfigError(
                "profile ids must not be empty".to_string(),
            ));
        }

        for (command_id, command) in profile.command.iter() {
            if command_id.trim().is_empty() {
                return Err(CmdrunError::ConfigError(format!(
                    "profile '{profile_id}' has a command with an empty id"
                )));
            }

            if command.executable.trim().is_empty() {
                return Err(CmdrunError::ConfigError(format!(
                    "command '{command_id}' in profile '{profile_id}' has an empty `executable`"
                )));
            }
        }
    }

    Ok(())
}
