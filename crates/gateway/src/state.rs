use std::{sync::Arc, time::Duration};

use {
    saju_agents::{
        CredentialSet, DispatchOptions, FallbackDispatcher, ModelCandidates,
        providers::GeminiClientFactory,
    },
    saju_config::{NotifyConfig, SajuConfig},
    saju_notify::{DEFAULT_QUEUE_CAPACITY, NoopNotifier, Notifier, WebhookNotifier},
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

/// Process-wide state shared by every request handler.
pub struct GatewayState {
    pub dispatcher: FallbackDispatcher,
    pub version: String,
}

impl GatewayState {
    pub fn new(dispatcher: FallbackDispatcher) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

/// Build the production dispatcher: credentials from the environment, the
/// default model list and the Gemini backend.
pub fn build_dispatcher(config: &SajuConfig, notifier: Arc<dyn Notifier>) -> FallbackDispatcher {
    let credentials = CredentialSet::from_env(&config.credentials);
    FallbackDispatcher::new(
        Arc::new(credentials),
        Arc::new(ModelCandidates::default()),
        Arc::new(GeminiClientFactory::from_config(&config.gemini)),
        notifier,
    )
    .with_options(DispatchOptions::from_config(config))
}

/// The configured notifier plus its delivery worker, if one was started.
pub struct NotifierHandle {
    pub notifier: Arc<dyn Notifier>,
    worker: Option<JoinHandle<()>>,
}

impl NotifierHandle {
    /// Start a webhook notifier when a URL is configured. A notifier that
    /// cannot be started degrades to a no-op; notifications are never
    /// required for serving.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let Some(url) = config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            debug!("no notification webhook configured");
            return Self::noop();
        };

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        match WebhookNotifier::spawn(url, timeout, DEFAULT_QUEUE_CAPACITY) {
            Ok((notifier, worker)) => {
                info!(
                    attempt_failures = config.attempt_failures,
                    "notification webhook enabled"
                );
                Self {
                    notifier: Arc::new(notifier),
                    worker: Some(worker),
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to start notification webhook, notifications disabled");
                Self::noop()
            },
        }
    }

    pub fn noop() -> Self {
        Self {
            notifier: Arc::new(NoopNotifier),
            worker: None,
        }
    }

    /// Let queued notifications go out, waiting at most `grace`.
    ///
    /// Every other clone of the notifier (the dispatcher's) must already be
    /// dropped, or the worker keeps waiting for more messages.
    pub async fn drain(self, grace: Duration) {
        drop(self.notifier);
        let Some(worker) = self.worker else {
            return;
        };
        if tokio::time::timeout(grace, worker).await.is_err() {
            warn!("notification queue not drained before shutdown");
        }
    }
}
