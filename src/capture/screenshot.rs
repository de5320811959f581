// src/capture/screenshot.rs
use image::DynamicImage;
use log::{info, warn};
use screenshots::Screen;

use super::compress::CaptureStore;
use super::handle::ImageHandle;
use super::source::ImageSource;
use crate::config::AcquisitionConfig;
use crate::error::{AssistError, Result};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// Desktop stand-in for the phone camera and gallery: screen grabs and a file dialog.
///
/// The JPEG behind the last acquired handle lives as long as the source.
pub struct DesktopSource {
    store: CaptureStore,
}

impl DesktopSource {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self {
            store: CaptureStore::new(config),
        }
    }

    fn capture_primary_screen(&self) -> Result<DynamicImage> {
        let screens = Screen::all().map_err(capture_error)?;
        // Use the primary screen (first one)
        let screen = screens
            .first()
            .ok_or_else(|| AssistError::Unknown("No screens found".to_string()))?;
        let shot = screen.capture().map_err(capture_error)?;

        let width = shot.width() as u32;
        let height = shot.height() as u32;
        let rgba = image::RgbaImage::from_raw(width, height, shot.as_raw().to_vec())
            .ok_or_else(|| AssistError::Unknown("Failed to create image from raw data".to_string()))?;

        info!("Screen captured: {}x{}", width, height);
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl Default for DesktopSource {
    fn default() -> Self {
        Self::new(AcquisitionConfig::default())
    }
}

impl ImageSource for DesktopSource {
    fn capture(&mut self) -> Result<ImageHandle> {
        info!("Capturing primary screen");
        let image = self.capture_primary_screen()?;
        self.store.save(&image, "capture")
    }

    fn select(&mut self) -> Result<ImageHandle> {
        info!("Opening image picker");
        let path = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
            .ok_or(AssistError::Cancelled)?;

        info!("Selected {}", path.display());
        self.store.recompress(&path)
    }
}

// Screen recording permission failures only surface as error text.
fn capture_error(err: impl std::fmt::Display) -> AssistError {
    let message = err.to_string();
    if message.to_lowercase().contains("permission") {
        warn!("Screen capture refused: {}", message);
        AssistError::PermissionDenied("Screen capture permission is required to use this feature".to_string())
    } else {
        AssistError::Unknown(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn permission_failures_are_recognised() {
        let err = capture_error("Permission denied by the window server");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let err = capture_error("display connection lost");
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.to_string().contains("display connection lost"));
    }
}
