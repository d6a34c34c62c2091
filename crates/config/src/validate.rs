//! Semantic checks on a loaded configuration.
//!
//! Parsing already guarantees the shape; this catches values that parse but
//! cannot work (unparseable URLs, zero timeouts, absurd slot counts).

use crate::schema::SajuConfig;

/// Upper bound on auxiliary credential slots scanned at startup.
pub const MAX_AUX_SLOTS: u32 = 100;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "url", "timeout", "credentials", "security"
    pub category: &'static str,
    /// Dotted path, e.g. "notify.webhook_url"
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &SajuConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_url(&mut result, "gemini.base_url", &config.gemini.base_url);
    if let Some(ref hook) = config.notify.webhook_url {
        check_url(&mut result, "notify.webhook_url", hook);
        if hook.starts_with("http://") {
            result.push(
                Severity::Warning,
                "security",
                "notify.webhook_url",
                "webhook is plain http; operator messages travel unencrypted",
            );
        }
    }

    if config.gemini.attempt_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "timeout",
            "gemini.attempt_timeout_secs",
            "must be greater than zero",
        );
    }
    if config.notify.timeout_secs == 0 {
        result.push(
            Severity::Error,
            "timeout",
            "notify.timeout_secs",
            "must be greater than zero",
        );
    }

    if config.credentials.primary_env.trim().is_empty() {
        result.push(
            Severity::Error,
            "credentials",
            "credentials.primary_env",
            "environment variable name must not be empty",
        );
    }
    if config.credentials.aux_slots > MAX_AUX_SLOTS {
        result.push(
            Severity::Warning,
            "credentials",
            "credentials.aux_slots",
            format!(
                "{} slots requested, only the first {MAX_AUX_SLOTS} are scanned",
                config.credentials.aux_slots
            ),
        );
    }

    result
}

fn check_url(result: &mut ValidationResult, path: &str, raw: &str) {
    match url::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {},
        Ok(u) => result.push(
            Severity::Error,
            "url",
            path,
            format!("unsupported scheme `{}`", u.scheme()),
        ),
        Err(e) => result.push(Severity::Error, "url", path, format!("invalid URL: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_clean() {
        let result = validate(&SajuConfig::default());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn bad_webhook_is_an_error() {
        let mut cfg = SajuConfig::default();
        cfg.notify.webhook_url = Some("not a url".into());
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "notify.webhook_url");
    }

    #[test]
    fn plain_http_webhook_warns() {
        let mut cfg = SajuConfig::default();
        cfg.notify.webhook_url = Some("http://hooks.internal/x".into());
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn zero_timeouts_and_slot_bound() {
        let mut cfg = SajuConfig::default();
        cfg.gemini.attempt_timeout_secs = 0;
        cfg.credentials.aux_slots = 500;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn non_http_scheme_rejected() {
        let mut cfg = SajuConfig::default();
        cfg.gemini.base_url = "ftp://example.com".into();
        let result = validate(&cfg);
        assert!(result.diagnostics[0].message.contains("ftp"));
    }
}
