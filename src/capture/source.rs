// src/capture/source.rs
use super::handle::ImageHandle;
use crate::error::Result;

/// Platform capability that produces images for a session.
///
/// Implementations may prompt the user (for a permission or a file choice) and
/// must tolerate being called repeatedly. A dismissed prompt is reported as
/// [`AssistError::Cancelled`](crate::error::AssistError::Cancelled).
pub trait ImageSource {
    /// Take a new picture.
    fn capture(&mut self) -> Result<ImageHandle>;

    /// Pick an existing picture.
    fn select(&mut self) -> Result<ImageHandle>;
}

/// Headless source that always hands out the same image.
pub struct PathSource {
    handle: ImageHandle,
}

impl PathSource {
    pub fn new(handle: ImageHandle) -> Self {
        Self { handle }
    }
}

impl ImageSource for PathSource {
    fn capture(&mut self) -> Result<ImageHandle> {
        Ok(self.handle.clone())
    }

    fn select(&mut self) -> Result<ImageHandle> {
        Ok(self.handle.clone())
    }
}
