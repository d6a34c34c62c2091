//! Generation dispatch: credential loading, model candidates, the Gemini
//! backend and the credential × model fallback scan.

pub mod backend;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod providers;

pub use {
    backend::{ClientFactory, GenerationBackend},
    credentials::{Credential, CredentialSet},
    dispatch::{AttemptOutcome, AttemptRecord, DispatchOptions, DispatchResult, FallbackDispatcher},
    error::{AttemptError, FailureKind},
    models::{DEFAULT_MODEL_CANDIDATES, ModelCandidates},
};
