//! `saju doctor`: config validation, credential audit and optional backend
//! probe.
//!
//! Runs a series of checks and prints a structured report with `[ok]`,
//! `[warn]`, `[fail]`, `[skip]`, or `[info]` status indicators per item.
//! Key values are never printed; only slot names and counts.

use std::path::Path;

use {
    anyhow::Result,
    saju_agents::{
        CredentialSet, ModelCandidates, credentials::slot_names, providers::GeminiClientFactory,
    },
    saju_config::{SajuConfig, Severity, validate},
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Per-check result used to build the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Skip => DIM,
            Self::Info => CYAN,
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }
}

// ── Printing ────────────────────────────────────────────────────────────────

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
            match item.status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(
    explicit: Option<&Path>,
    config: &SajuConfig,
    probe: bool,
) -> Result<()> {
    eprintln!("{BOLD}saju doctor{RESET}");
    eprintln!("{BOLD}==========={RESET}\n");

    let credentials = CredentialSet::from_env(&config.credentials);
    let models = ModelCandidates::default();

    let mut sections = vec![
        check_config_file(explicit),
        check_config_values(config),
        check_credentials(config, &credentials),
        check_notify(config),
        list_models(&models),
    ];

    if probe {
        sections.push(probe_backend(config, &credentials, &models).await);
    }

    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

// ── 1. Config file ──────────────────────────────────────────────────────────

fn check_config_file(explicit: Option<&Path>) -> Section {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(saju_config::find_config_file);

    let Some(path) = path else {
        let mut section = Section::new("Config (defaults)");
        section.push(Status::Info, "No config file found, running on defaults");
        return section;
    };

    let mut section = Section::new(format!("Config ({})", path.display()));
    match saju_config::load_config(&path) {
        Ok(_) => section.push(Status::Ok, "Config file parsed"),
        // The server falls back to defaults here, which is rarely intended.
        Err(e) => section.push(Status::Fail, format!("Config file unusable: {e}")),
    }
    section
}

// ── 2. Config values ────────────────────────────────────────────────────────

fn check_config_values(config: &SajuConfig) -> Section {
    let mut section = Section::new("Settings");
    section.push(
        Status::Info,
        format!("Listening on {}:{}", config.server.bind, config.server.port),
    );
    section.push(
        Status::Info,
        format!(
            "Attempt timeout {}s, max output tokens {}",
            config.gemini.attempt_timeout_secs, config.gemini.max_output_tokens
        ),
    );

    let result = validate::validate(config);
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "No validation issues");
    }
    for d in &result.diagnostics {
        let msg = if d.path.is_empty() {
            d.message.clone()
        } else {
            format!("{}: {}", d.path, d.message)
        };
        section.push(d.severity.into(), msg);
    }
    section
}

// ── 3. Credentials ──────────────────────────────────────────────────────────

fn check_credentials(config: &SajuConfig, credentials: &CredentialSet) -> Section {
    let slots = slot_names(&config.credentials);
    let mut section = Section::new("Credentials");
    section.push(
        Status::Info,
        format!(
            "Scanning {} slot(s): {} .. {}",
            slots.len(),
            slots.first().map(String::as_str).unwrap_or_default(),
            slots.last().map(String::as_str).unwrap_or_default(),
        ),
    );

    if credentials.is_empty() {
        section.push(
            Status::Fail,
            format!(
                "No API keys found; set {} (every request will fail)",
                config.credentials.primary_env
            ),
        );
        return section;
    }

    let names: Vec<&str> = credentials.iter().map(|c| c.slot()).collect();
    section.push(
        Status::Ok,
        format!("{} key(s) loaded from {}", credentials.len(), names.join(", ")),
    );
    if credentials.len() == 1 {
        section.push(
            Status::Info,
            "Only one key: rate limits on it cannot be routed around",
        );
    }
    section
}

// ── 4. Notifications ────────────────────────────────────────────────────────

fn check_notify(config: &SajuConfig) -> Section {
    let mut section = Section::new("Notifications");
    match config.notify.webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            let host = url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "?".into());
            section.push(Status::Ok, format!("Webhook enabled ({host})"));
            let per_attempt = if config.notify.attempt_failures {
                "on"
            } else {
                "off"
            };
            section.push(Status::Info, format!("Per-attempt failure messages {per_attempt}"));
        },
        _ => section.push(Status::Skip, "No webhook configured"),
    }
    section
}

// ── 5. Models ───────────────────────────────────────────────────────────────

fn list_models(models: &ModelCandidates) -> Section {
    let mut section = Section::new("Model fallback order");
    for (rank, model) in models.iter().enumerate() {
        section.push(Status::Info, format!("{}. {model}", rank + 1));
    }
    section
}

// ── 6. Backend probe ────────────────────────────────────────────────────────

async fn probe_backend(
    config: &SajuConfig,
    credentials: &CredentialSet,
    models: &ModelCandidates,
) -> Section {
    let mut section = Section::new("Backend probe");
    if credentials.is_empty() {
        section.push(Status::Skip, "No keys to probe");
        return section;
    }

    let factory = GeminiClientFactory::from_config(&config.gemini);
    for credential in credentials.iter() {
        let slot = credential.slot();
        let client = match factory.build(credential) {
            Ok(client) => client,
            Err(e) => {
                section.push(Status::Fail, format!("{slot}: {e}"));
                continue;
            },
        };

        match client.list_models().await {
            Ok(available) => {
                let missing: Vec<&str> = models
                    .iter()
                    .filter(|m| !available.iter().any(|a| a.model_id() == *m))
                    .collect();
                if missing.is_empty() {
                    section.push(Status::Ok, format!("{slot}: all candidates available"));
                } else {
                    section.push(
                        Status::Warn,
                        format!("{slot}: not visible to this key: {}", missing.join(", ")),
                    );
                }
            },
            Err(e) => section.push(Status::Fail, format!("{slot}: [{}] {e}", e.kind())),
        }
    }
    section
}
