/// Operational event emitted during one dispatch.
///
/// Credential positions are zero-based here and rendered one-based; secrets
/// never reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A request entered the dispatcher.
    Started { credentials: usize, models: usize },
    /// The single successful attempt of a request.
    Succeeded {
        credential: usize,
        model: String,
        attempts: usize,
    },
    /// One (credential, model) attempt failed; only sent when enabled.
    AttemptFailed {
        credential: usize,
        model: String,
        kind: &'static str,
        detail: String,
    },
    /// No attempt succeeded (exhaustion or cancellation).
    Failed {
        attempts: usize,
        kind: &'static str,
        detail: String,
    },
}

/// Longest error detail carried into a message.
const MAX_DETAIL_CHARS: usize = 300;

impl NotificationEvent {
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Started { .. } => "start",
            Self::Succeeded { .. } => "success",
            Self::AttemptFailed { .. } => "attempt_failure",
            Self::Failed { .. } => "failure",
        }
    }

    /// Render the text posted to the notification channel.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Started {
                credentials,
                models,
            } => format!("🔔 analyze request received ({credentials} key(s), {models} model(s))"),
            Self::Succeeded {
                credential,
                model,
                attempts,
            } => format!(
                "✅ answered by {model} with key #{} after {attempts} attempt(s)",
                credential + 1
            ),
            Self::AttemptFailed {
                credential,
                model,
                kind,
                detail,
            } => format!(
                "⚠️ key #{} / {model} failed [{kind}]: {}",
                credential + 1,
                truncate(detail)
            ),
            Self::Failed {
                attempts,
                kind,
                detail,
            } => format!(
                "🚨 all attempts failed after {attempts} attempt(s) [{kind}]: {}",
                truncate(detail)
            ),
        }
    }
}

fn truncate(detail: &str) -> String {
    if detail.chars().count() <= MAX_DETAIL_CHARS {
        return detail.to_string();
    }
    let mut cut: String = detail.chars().take(MAX_DETAIL_CHARS).collect();
    cut.push('…');
    cut
}
