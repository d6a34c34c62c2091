use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::SajuConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["saju.toml", "saju.yaml", "saju.yml", "saju.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SajuConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Load config from `explicit` when given, else from the standard locations.
///
/// Search order without an explicit path:
/// 1. `./saju.{toml,yaml,yml,json}`
/// 2. `~/.config/saju/saju.{toml,yaml,yml,json}`
///
/// A missing or unreadable file yields `SajuConfig::default()`. Env
/// overrides are applied on top either way.
pub fn discover_and_load(explicit: Option<&Path>) -> SajuConfig {
    let path = explicit.map(Path::to_path_buf).or_else(find_config_file);
    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                SajuConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            SajuConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Apply process-level overrides that take precedence over the file.
///
/// `SAJU_PORT` wins over `PORT` (the variable hosting platforms inject);
/// `SAJU_WEBHOOK_URL` wins over `NOTIFY_WEBHOOK_URL`.
pub fn apply_env_overrides(config: &mut SajuConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(bind) = get("SAJU_BIND") {
        config.server.bind = bind;
    }
    for name in ["PORT", "SAJU_PORT"] {
        if let Some(raw) = get(name) {
            match raw.trim().parse::<u16>() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(var = name, value = %raw, "ignoring non-numeric port override"),
            }
        }
    }
    for name in ["NOTIFY_WEBHOOK_URL", "SAJU_WEBHOOK_URL"] {
        if let Some(url) = get(name) {
            config.notify.webhook_url = Some(url.trim().to_string());
        }
    }
}

/// Returns the user-global config directory (`~/.config/saju/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "saju").map(|d| d.config_dir().to_path_buf())
}

/// First existing standard config file, if any.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> Result<SajuConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse("toml", e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}
