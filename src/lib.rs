//! Bank Term Deposit Predictor Library
//!
//! Serves a single-page form that collects bank-client attributes, runs
//! them through a pre-trained classifier and reports whether the client is
//! likely to subscribe to a term deposit.

pub mod assembler;
pub mod config;
pub mod form;
pub mod metrics;
pub mod models;
pub mod presenter;
pub mod schema;
pub mod server;
pub mod types;

pub use assembler::RequestAssembler;
pub use config::AppConfig;
pub use models::inference::InferenceEngine;
pub use schema::FeatureSchema;
pub use types::{ClientRecord, FieldValue, Label, PredictionOutcome};
