//! Core orchestration for probing x402 payment-gated endpoints.
//!
//! A probe session works against a catalog of advertised endpoints.
//! For each endpoint the flow is: resolve which user inputs its schema
//! asks for, collect them if any, issue the request through a
//! payment-capable HTTP client (which transparently settles 402
//! challenges), and classify the terminal outcome: success with an
//! optional settlement receipt, a payment-protocol failure, or a
//! transport/security failure.
//!
//! # Modules
//!
//! - [`balance`] - Polled, display-formatted balance for the connected identity
//! - [`catalog`] - Startup load of the endpoint catalog document
//! - [`config`] - Environment-derived configuration
//! - [`executor`] - One end-to-end request attempt and outcome classification
//! - [`schema`] - Resolution of user-collectible input fields
//! - [`session`] - Per-endpoint interaction state machine and outcome table
//! - [`telemetry`] - Tracing subscriber setup for embedding binaries and tests

pub mod balance;
pub mod catalog;
pub mod config;
pub mod executor;
pub mod schema;
pub mod session;
pub mod telemetry;

pub use executor::{
    FailureClass, FetchFailure, PaidFetch, ProbeRequest, ProbeResponse, RequestExecutor,
    RequestOutcome,
};
pub use schema::ResolvedInputs;
pub use session::{InteractionController, InteractionState, SubmitOutcome, TriggerOutcome};
