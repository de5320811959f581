// src/ai/mod.rs
pub mod connector;
pub mod endpoint_client;

pub use connector::{InferenceConnector, PredictRequest};
pub use endpoint_client::EndpointClient;
