// src/capture/serializer.rs
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use log::{debug, info};
use reqwest::blocking::Client;
use serde::Serialize;

use super::handle::{ImageHandle, Location};
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::error::{AssistError, Result};

/// Raw image bytes, serialized on the wire as a JSON array of integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ByteSequence(Vec<u8>);

impl ByteSequence {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteSequence {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Reads the full contents behind an [`ImageHandle`].
pub struct ImageSerializer {
    client: Client,
}

impl ImageSerializer {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// `timeout` bounds reads of remote (`http(s)://`) handles.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn to_bytes(&self, handle: &ImageHandle) -> Result<ByteSequence> {
        let bytes = match handle.location()? {
            Location::File(path) => {
                debug!("Reading image file {}", path.display());
                std::fs::read(&path).map_err(|e| AssistError::read_failure(handle, e))?
            }
            Location::Remote(url) => self.fetch(handle, url)?,
            Location::Inline { payload } => general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| AssistError::read_failure(handle, e))?,
        };

        info!("Read {} bytes from {}", bytes.len(), handle);
        Ok(ByteSequence(bytes))
    }

    fn fetch(&self, handle: &ImageHandle, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading image from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AssistError::read_failure(handle, e))?;

        if !response.status().is_success() {
            return Err(AssistError::read_failure(handle, format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().map_err(|e| AssistError::read_failure(handle, e))?;
        Ok(bytes.to_vec())
    }
}
