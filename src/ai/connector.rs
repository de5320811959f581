// src/ai/connector.rs
use serde_json::Value;

use crate::capture::ByteSequence;
use crate::error::Result;
use crate::mode::Mode;

/// One prediction call: the image plus whatever the mode asks for.
#[derive(Debug, Clone, Copy)]
pub struct PredictRequest<'a> {
    pub mode: Mode,
    pub image: &'a ByteSequence,
    pub question: Option<&'a str>,
}

/// Trait defining the interface for remote inference
pub trait InferenceConnector: Send + Sync {
    /// Send the image to the mode's endpoint and return the parsed JSON body
    fn predict(&self, request: &PredictRequest<'_>) -> Result<Value>;
}
