// src/lib.rs
//! Image-to-remote-inference pipeline for the COVA assistance services.
//!
//! An [`ImageSource`] produces an [`ImageHandle`], the [`ImageSerializer`]
//! turns it into raw bytes, an [`EndpointClient`] posts them to the endpoint
//! for the selected [`Mode`], and a [`Session`] tracks the request state.

pub mod ai;
pub mod capture;
pub mod config;
pub mod error;
pub mod mode;
pub mod session;

pub use ai::{EndpointClient, InferenceConnector, PredictRequest};
#[cfg(feature = "desktop")]
pub use capture::DesktopSource;
pub use capture::{ByteSequence, ImageHandle, ImageSerializer, ImageSource, PathSource};
pub use config::{AcquisitionConfig, Deployment, EndpointMap, ServiceConfig};
pub use error::{AssistError, ErrorKind, Result, ValidationReason};
pub use mode::Mode;
pub use session::{CancelHandle, Failure, Prediction, ProcessOutcome, RequestResult, RequestState, Session};
