//! Credential × model fallback dispatch.
//!
//! `FallbackDispatcher` walks the credential set in order and, under each
//! credential, the model candidates in order, making exactly one generation
//! call per pair. The first success ends the scan. Every individual failure
//! is recorded and the scan moves on; only exhaustion (or cancellation)
//! produces a [`DispatchResult::Failure`].

use std::{sync::Arc, time::Duration};

use {
    saju_config::SajuConfig,
    saju_notify::{NotificationEvent, Notifier},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    backend::{ClientFactory, GenerationBackend},
    credentials::CredentialSet,
    error::AttemptError,
    models::ModelCandidates,
};

/// Tunables for one dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Upper bound on a single generation call.
    pub attempt_timeout: Duration,
    /// Notify on every failed attempt, not only start/success/failure.
    pub notify_attempt_failures: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(60),
            notify_attempt_failures: false,
        }
    }
}

impl DispatchOptions {
    pub fn from_config(config: &SajuConfig) -> Self {
        Self {
            attempt_timeout: config.gemini.attempt_timeout(),
            notify_attempt_failures: config.notify.attempt_failures,
        }
    }
}

/// Outcome of one dispatch. Exactly one variant holds per request.
///
/// `attempts` counts every (credential, model) pair recorded, including
/// pairs skipped because the credential's client could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Success {
        text: String,
        credential: usize,
        model: String,
        attempts: usize,
    },
    Failure {
        last_error: AttemptError,
        attempts: usize,
    },
}

impl DispatchResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }
}

/// One (credential, model) pair as it played out during a dispatch.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub credential: usize,
    pub model: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(AttemptError),
}

impl std::fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Succeeded => write!(f, "#{}/{}:ok", self.credential + 1, self.model),
            AttemptOutcome::Failed(err) => {
                write!(f, "#{}/{}:{}", self.credential + 1, self.model, err.kind())
            },
        }
    }
}

/// Sequential, exhaustive credential × model scan.
///
/// Holds only read-only shared inputs, so one instance serves concurrent
/// requests and repeated dispatches see no state from earlier ones.
pub struct FallbackDispatcher {
    credentials: Arc<CredentialSet>,
    models: Arc<ModelCandidates>,
    factory: Arc<dyn ClientFactory>,
    notifier: Arc<dyn Notifier>,
    options: DispatchOptions,
}

impl FallbackDispatcher {
    pub fn new(
        credentials: Arc<CredentialSet>,
        models: Arc<ModelCandidates>,
        factory: Arc<dyn ClientFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            credentials,
            models,
            factory,
            notifier,
            options: DispatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn models(&self) -> &ModelCandidates {
        &self.models
    }

    /// Run one dispatch for `prompt`.
    ///
    /// Cancelling `cancel` drops the in-flight call and stops the scan; the
    /// result is then a failure carrying [`AttemptError::Cancelled`].
    pub async fn dispatch(&self, prompt: &str, cancel: &CancellationToken) -> DispatchResult {
        let mut trail: Vec<AttemptRecord> =
            Vec::with_capacity(self.credentials.len() * self.models.len());
        let mut last_error = AttemptError::NoCredentials;

        self.notifier.notify(NotificationEvent::Started {
            credentials: self.credentials.len(),
            models: self.models.len(),
        });

        if self.credentials.is_empty() {
            warn!("dispatch requested with an empty credential set");
        }

        'credentials: for (index, credential) in self.credentials.iter().enumerate() {
            if cancel.is_cancelled() {
                last_error = AttemptError::Cancelled;
                break;
            }

            let client = match self.factory.connect(credential) {
                Ok(client) => client,
                Err(err) => {
                    warn!(
                        credential = index,
                        slot = credential.slot(),
                        error = %err,
                        "client construction failed, skipping credential"
                    );
                    for model in self.models.iter() {
                        self.record_failure(&mut trail, index, model, err.clone());
                    }
                    last_error = err;
                    continue;
                },
            };

            for model in self.models.iter() {
                match self.attempt(client.as_ref(), model, prompt, cancel).await {
                    Ok(text) => {
                        trail.push(AttemptRecord {
                            credential: index,
                            model: model.to_string(),
                            outcome: AttemptOutcome::Succeeded,
                        });
                        let attempts = trail.len();
                        info!(
                            credential = index,
                            model,
                            attempts,
                            trail = %render_trail(&trail),
                            "dispatch succeeded"
                        );
                        self.notifier.notify(NotificationEvent::Succeeded {
                            credential: index,
                            model: model.to_string(),
                            attempts,
                        });
                        return DispatchResult::Success {
                            text,
                            credential: index,
                            model: model.to_string(),
                            attempts,
                        };
                    },
                    Err(AttemptError::Cancelled) => {
                        trail.push(AttemptRecord {
                            credential: index,
                            model: model.to_string(),
                            outcome: AttemptOutcome::Failed(AttemptError::Cancelled),
                        });
                        last_error = AttemptError::Cancelled;
                        break 'credentials;
                    },
                    Err(err) => {
                        self.record_failure(&mut trail, index, model, err.clone());
                        last_error = err;
                    },
                }
            }
        }

        let attempts = trail.len();
        let kind = last_error.kind();
        warn!(
            attempts,
            kind = %kind,
            error = %last_error,
            trail = %render_trail(&trail),
            "dispatch failed"
        );
        self.notifier.notify(NotificationEvent::Failed {
            attempts,
            kind: kind.as_str(),
            detail: last_error.to_string(),
        });
        DispatchResult::Failure {
            last_error,
            attempts,
        }
    }

    /// One generation call bounded by the attempt timeout and `cancel`.
    async fn attempt(
        &self,
        client: &dyn GenerationBackend,
        model: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AttemptError> {
        let timeout = self.options.attempt_timeout;
        let call = tokio::time::timeout(timeout, client.generate(model, prompt));

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AttemptError::Cancelled),
            outcome = call => outcome,
        };

        match outcome {
            Err(_elapsed) => Err(AttemptError::Timeout(timeout)),
            Ok(Ok(text)) if text.trim().is_empty() => Err(AttemptError::EmptyResponse),
            Ok(result) => result,
        }
    }

    fn record_failure(
        &self,
        trail: &mut Vec<AttemptRecord>,
        credential: usize,
        model: &str,
        err: AttemptError,
    ) {
        let kind = err.kind();
        debug!(credential, model, kind = %kind, error = %err, "attempt failed");

        if self.options.notify_attempt_failures {
            self.notifier.notify(NotificationEvent::AttemptFailed {
                credential,
                model: model.to_string(),
                kind: kind.as_str(),
                detail: err.to_string(),
            });
        }
        trail.push(AttemptRecord {
            credential,
            model: model.to_string(),
            outcome: AttemptOutcome::Failed(err),
        });
    }
}

fn render_trail(trail: &[AttemptRecord]) -> String {
    trail
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
