//! HTTP front for the fashion-fortune service.
//!
//! Serves the single-page UI, `POST /analyze` (one fallback dispatch per
//! request) and `GET /health`.

pub mod prompt;
pub mod server;
pub mod state;

pub use {
    server::{build_gateway_app, start_gateway},
    state::{GatewayState, NotifierHandle, build_dispatcher},
};
