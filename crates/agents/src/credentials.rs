//! Ordered, deduplicated API key set assembled once at startup.

use {
    saju_config::{CredentialsConfig, validate::MAX_AUX_SLOTS},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

/// One API key plus the slot (env var) it was read from.
///
/// `Debug` shows the slot only.
#[derive(Debug, Clone)]
pub struct Credential {
    slot: String,
    secret: Secret<String>,
}

impl Credential {
    pub fn new(slot: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            secret: Secret::new(secret.into()),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

/// Credentials in first-seen order with no duplicate values.
///
/// An empty set is valid: dispatch against it fails without any network
/// call.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    items: Vec<Credential>,
}

impl CredentialSet {
    /// Read the primary slot then `{primary}_1 ..= {primary}_{aux_slots}`.
    pub fn from_env(config: &CredentialsConfig) -> Self {
        Self::load(config, |name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn load(config: &CredentialsConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut set = Self::default();
        for slot in slot_names(config) {
            if let Some(value) = lookup(&slot) {
                set.insert(slot, &value);
            }
        }

        if set.is_empty() {
            warn!(
                primary = %config.primary_env,
                "no API credentials found; every request will fail"
            );
        } else {
            info!(count = set.len(), "loaded API credentials");
        }
        set
    }

    /// Build from explicit `(slot, value)` pairs, applying the same
    /// trimming and deduplication as the env loader.
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: AsRef<str>,
    {
        let mut set = Self::default();
        for (slot, value) in pairs {
            set.insert(slot.into(), value.as_ref());
        }
        set
    }

    fn insert(&mut self, slot: String, raw: &str) -> bool {
        let value = raw.trim();
        if value.is_empty() {
            return false;
        }
        if let Some(existing) = self.items.iter().find(|c| c.expose() == value) {
            debug!(slot = %slot, same_as = %existing.slot, "skipping duplicate credential");
            return false;
        }
        self.items.push(Credential::new(slot, value));
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Credential> {
        self.items.get(index)
    }
}

/// Env var names scanned, in priority order.
pub fn slot_names(config: &CredentialsConfig) -> Vec<String> {
    let primary = config.primary_env.trim();
    let aux = config.aux_slots.min(MAX_AUX_SLOTS);
    std::iter::once(primary.to_string())
        .chain((1..=aux).map(|n| format!("{primary}_{n}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn slots(set: &CredentialSet) -> Vec<&str> {
        set.iter().map(Credential::slot).collect()
    }

    #[test]
    fn primary_first_then_numbered_ascending() {
        let set = CredentialSet::load(
            &CredentialsConfig::default(),
            lookup(&[
                ("GEMINI_API_KEY_2", "k2"),
                ("GEMINI_API_KEY", "k0"),
                ("GEMINI_API_KEY_10", "k10"),
                ("GEMINI_API_KEY_1", "k1"),
            ]),
        );
        assert_eq!(
            slots(&set),
            ["GEMINI_API_KEY", "GEMINI_API_KEY_1", "GEMINI_API_KEY_2", "GEMINI_API_KEY_10"]
        );
    }

    #[test]
    fn duplicates_and_blanks_are_skipped() {
        let set = CredentialSet::load(
            &CredentialsConfig::default(),
            lookup(&[
                ("GEMINI_API_KEY", "same"),
                ("GEMINI_API_KEY_1", "  "),
                ("GEMINI_API_KEY_2", " same "),
                ("GEMINI_API_KEY_3", "other"),
            ]),
        );
        assert_eq!(slots(&set), ["GEMINI_API_KEY", "GEMINI_API_KEY_3"]);
        assert_eq!(set.get(0).unwrap().expose(), "same");
    }

    #[test]
    fn slots_beyond_the_bound_are_ignored() {
        let config = CredentialsConfig {
            primary_env: "KEY".into(),
            aux_slots: 2,
        };
        let set = CredentialSet::load(&config, lookup(&[("KEY_3", "late"), ("KEY_2", "ok")]));
        assert_eq!(slots(&set), ["KEY_2"]);
        assert_eq!(slot_names(&config), ["KEY", "KEY_1", "KEY_2"]);
    }

    #[test]
    fn empty_environment_is_a_valid_empty_set() {
        let set = CredentialSet::load(&CredentialsConfig::default(), |_| None);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let set = CredentialSet::from_pairs([("GEMINI_API_KEY", "super-secret-value")]);
        let rendered = format!("{set:?}");
        assert!(rendered.contains("GEMINI_API_KEY"));
        assert!(!rendered.contains("super-secret-value"));
    }
}
