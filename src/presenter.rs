//! Result presentation: turns prediction outcomes into user-facing messages

use crate::types::prediction::PredictionOutcome;
use serde::Serialize;

/// Visual style of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Error,
    Info,
    Warning,
    Caption,
}

impl MessageKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            MessageKind::Success => "msg msg-success",
            MessageKind::Error => "msg msg-error",
            MessageKind::Info => "msg msg-info",
            MessageKind::Warning => "msg msg-warning",
            MessageKind::Caption => "msg msg-caption",
        }
    }
}

/// A message shown below the form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Generic warning for any failure caught while predicting
    pub fn failure(error: &anyhow::Error) -> Self {
        Self::new(MessageKind::Warning, format!("An error occurred: {:#}", error))
    }
}

pub const SUBSCRIBE_TEXT: &str = "The client is likely to subscribe to a term deposit.";
pub const DECLINE_TEXT: &str = "The client is not likely to subscribe.";
pub const MODEL_NOTE: &str = "Note: This prediction is made using a pre-trained machine learning model.";

/// Format a probability as a percentage with two decimals
pub fn format_percentage(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Messages describing a successful prediction
pub fn present(outcome: &PredictionOutcome) -> Vec<Message> {
    let mut messages = Vec::with_capacity(4);

    if outcome.is_yes() {
        messages.push(Message::new(MessageKind::Success, SUBSCRIBE_TEXT));
    } else {
        messages.push(Message::new(MessageKind::Error, DECLINE_TEXT));
    }

    if let Some(p) = outcome.probability_yes {
        messages.push(Message::new(
            MessageKind::Info,
            format!("Probability of 'yes': {}", format_percentage(p)),
        ));
    }

    if !outcome.zero_filled.is_empty() {
        messages.push(Message::new(
            MessageKind::Caption,
            format!(
                "Columns not provided and filled with 0: {}",
                outcome.zero_filled.join(", ")
            ),
        ));
    }

    messages.push(Message::new(MessageKind::Caption, MODEL_NOTE));
    messages
}

/// Messages for a prediction attempt, successful or not
pub fn present_result(result: &anyhow::Result<PredictionOutcome>) -> Vec<Message> {
    match result {
        Ok(outcome) => present(outcome),
        Err(e) => vec![Message::failure(e)],
    }
}
