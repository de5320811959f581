// src/session.rs
//! Per-screen request controller.
//!
//! A [`Session`] owns the selected mode, the question text, the current image
//! and the request state. `process` runs one request at a time: while a
//! request is in flight further calls are ignored, and an outcome is only
//! written back if the image it was computed for is still the current one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use serde_json::{json, Value};

use crate::ai::{InferenceConnector, PredictRequest};
use crate::capture::{ImageHandle, ImageSerializer, ImageSource};
use crate::error::{AssistError, ErrorKind, Result, ValidationReason};
use crate::mode::Mode;

/// Successful prediction, annotated with timing.
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub mode: Mode,
    /// Server payload with `responseTimeMs` added when it is a JSON object.
    pub payload: Value,
    pub response_time_ms: u64,
    /// Processing device reported by the server, if any.
    pub device: Option<String>,
    pub completed_at: DateTime<Local>,
}

/// Known response shapes.
#[derive(Debug, PartialEq)]
pub enum Prediction<'a> {
    /// Free-text `result` from the walking or VQA models.
    Answer(&'a str),
    Json(&'a Value),
}

impl RequestResult {
    pub fn new(mode: Mode, mut payload: Value, elapsed: Duration) -> Self {
        let response_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let device = payload
            .get("device")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(object) = payload.as_object_mut() {
            object.insert("responseTimeMs".to_string(), json!(response_time_ms));
        }

        Self {
            mode,
            payload,
            response_time_ms,
            device,
            completed_at: Local::now(),
        }
    }

    pub fn prediction(&self) -> Prediction<'_> {
        if self.mode.answers_in_text() {
            if let Some(text) = self.payload.get("result").and_then(Value::as_str) {
                return Prediction::Answer(text);
            }
        }
        Prediction::Json(&self.payload)
    }

    pub fn response_time_secs(&self) -> f64 {
        self.response_time_ms as f64 / 1000.0
    }
}

/// Displayable failure kept in the request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    fn from_request(err: &AssistError) -> Self {
        let message = match err {
            AssistError::Validation(reason) => reason.to_string(),
            other => format!("Failed to process image: {}", other),
        };
        Self { kind: err.kind(), message }
    }

    fn from_acquisition(err: &AssistError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Succeeded(RequestResult),
    Failed(Failure),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn result(&self) -> Option<&RequestResult> {
        match self {
            RequestState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            RequestState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// What a call to [`Session::process`] did.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// A request was already in flight; nothing happened.
    Ignored,
    /// The request was cancelled; the session is back to idle.
    Cancelled,
    /// The image changed while the request was in flight; its outcome was dropped.
    Discarded,
    /// The request finished and the session moved to this state.
    Completed(RequestState),
}

/// Cancels the in-flight request of the session it came from.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner {
    mode: Mode,
    question: String,
    image: Option<ImageHandle>,
    state: RequestState,
    in_flight: bool,
    // Bumped on every acquisition so late outcomes for an old image are dropped.
    generation: u64,
}

pub struct Session<C> {
    connector: C,
    serializer: ImageSerializer,
    inner: Mutex<Inner>,
    cancel: CancelHandle,
}

impl<C: InferenceConnector> Session<C> {
    pub fn new(connector: C, serializer: ImageSerializer) -> Self {
        Self {
            connector,
            serializer,
            inner: Mutex::new(Inner {
                mode: Mode::Atm,
                question: String::new(),
                image: None,
                state: RequestState::Idle,
                in_flight: false,
                generation: 0,
            }),
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        self.set_mode(mode);
        self
    }

    pub fn with_question(self, question: impl Into<String>) -> Self {
        self.set_question(question);
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn set_mode(&self, mode: Mode) {
        self.lock().mode = mode;
    }

    pub fn question(&self) -> String {
        self.lock().question.clone()
    }

    pub fn set_question(&self, question: impl Into<String>) {
        self.lock().question = question.into();
    }

    pub fn image(&self) -> Option<ImageHandle> {
        self.lock().image.clone()
    }

    pub fn state(&self) -> RequestState {
        self.lock().state.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn capture<S: ImageSource + ?Sized>(&self, source: &mut S) -> bool {
        self.acquire(source.capture())
    }

    pub fn select<S: ImageSource + ?Sized>(&self, source: &mut S) -> bool {
        self.acquire(source.select())
    }

    pub fn set_image(&self, handle: ImageHandle) {
        self.acquire(Ok(handle));
    }

    /// Applies the outcome of an acquisition. Returns whether a new image was set.
    pub fn acquire(&self, acquired: Result<ImageHandle>) -> bool {
        let mut inner = self.lock();
        match acquired {
            Ok(handle) => {
                info!("Image acquired: {}", handle);
                inner.image = Some(handle);
                inner.state = RequestState::Idle;
                inner.generation += 1;
                true
            }
            Err(AssistError::Cancelled) => {
                debug!("Image acquisition cancelled");
                if matches!(inner.state, RequestState::Failed(_)) {
                    inner.state = RequestState::Idle;
                }
                false
            }
            Err(err) => {
                error!("Error acquiring image: {}", err);
                inner.state = RequestState::Failed(Failure::from_acquisition(&err));
                false
            }
        }
    }

    /// Sends the current image to the endpoint for the current mode.
    ///
    /// Blocks while the image is read and while the request is in flight.
    pub fn process(&self) -> ProcessOutcome {
        let (mode, question, image, generation) = {
            let mut inner = self.lock();
            if inner.in_flight {
                debug!("Ignoring process request: one is already in flight");
                return ProcessOutcome::Ignored;
            }

            let Some(image) = inner.image.clone() else {
                return Self::reject(&mut inner, ValidationReason::MissingImage);
            };
            if inner.mode.requires_question() && inner.question.trim().is_empty() {
                return Self::reject(&mut inner, ValidationReason::MissingQuestion);
            }

            inner.in_flight = true;
            inner.state = RequestState::Loading;
            self.cancel.reset();
            (inner.mode, inner.question.clone(), image, inner.generation)
        };

        let started = Instant::now();
        let outcome = self.run(mode, &question, &image);
        let elapsed = started.elapsed();

        let mut inner = self.lock();
        inner.in_flight = false;

        if inner.generation != generation {
            info!("Image replaced during the {} request; dropping its outcome", mode);
            return ProcessOutcome::Discarded;
        }

        if let Err(AssistError::Cancelled) = outcome {
            info!("{} request cancelled", mode);
            inner.state = RequestState::Idle;
            return ProcessOutcome::Cancelled;
        }

        inner.state = match outcome {
            Ok(payload) => {
                let result = RequestResult::new(mode, payload, elapsed);
                info!("{} prediction completed in {} ms", mode, result.response_time_ms);
                RequestState::Succeeded(result)
            }
            Err(err) => {
                error!("Error processing image: {}", err);
                RequestState::Failed(Failure::from_request(&err))
            }
        };
        ProcessOutcome::Completed(inner.state.clone())
    }

    fn run(&self, mode: Mode, question: &str, image: &ImageHandle) -> Result<Value> {
        // Cancellation wins over whatever the suspended step produced, errors included.
        let bytes = self.serializer.to_bytes(image);
        if self.cancel.is_cancelled() {
            return Err(AssistError::Cancelled);
        }
        let bytes = bytes?;

        let request = PredictRequest {
            mode,
            image: &bytes,
            question: mode.accepts_question().then_some(question),
        };
        let payload = self.connector.predict(&request);

        if self.cancel.is_cancelled() {
            return Err(AssistError::Cancelled);
        }
        payload
    }

    fn reject(inner: &mut Inner, reason: ValidationReason) -> ProcessOutcome {
        warn!("Not processing: {}", reason);
        inner.state = RequestState::Failed(Failure::from_request(&AssistError::Validation(reason)));
        ProcessOutcome::Completed(inner.state.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
