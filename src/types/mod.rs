//! Type definitions for prediction requests and outcomes

pub mod prediction;
pub mod record;

pub use prediction::{Label, PredictionOutcome};
pub use record::{ClientRecord, FieldValue};
