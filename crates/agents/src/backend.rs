use std::sync::Arc;

use async_trait::async_trait;

use crate::{credentials::Credential, error::AttemptError};

/// A client handle bound to one credential.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// One generation call. No retries happen inside.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AttemptError>;
}

/// Builds a [`GenerationBackend`] per credential.
///
/// Construction is local (no network); a failure skips the whole
/// credential.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn GenerationBackend>, AttemptError>;
}
