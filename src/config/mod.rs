// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: `RawConfigFile` to `ConfigFile` checks.
//! - `store.rs`: resolving profile/command ids to `CommandSpec`s.

pub mod loader;
pub mod model;
pub mod store;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{CommandConfig, ConfigFile, ProfileConfig, RawConfigFile};
pub use store::{CommandLookup, ProfileStore};
