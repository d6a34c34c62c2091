//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `saju.toml`, `saju.yaml`/`saju.yml`, or `saju.json`,
//! searched in `./` then `~/.config/saju/`. Every section has defaults, so a
//! missing file is a valid configuration.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in the raw
//! file before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{CredentialsConfig, GeminiConfig, NotifyConfig, SajuConfig, ServerConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
