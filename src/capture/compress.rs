// src/capture/compress.rs
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageError};
use log::{debug, info};

use super::handle::ImageHandle;
use crate::config::AcquisitionConfig;
use crate::error::{AssistError, Result};

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// JPEG files written for acquired images.
///
/// Only the most recent file is kept: saving a new image removes the previous
/// one, and dropping the store removes the last.
pub struct CaptureStore {
    config: AcquisitionConfig,
    current: Option<PathBuf>,
}

impl CaptureStore {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self { config, current: None }
    }

    /// Writes `image` as a JPEG at the configured quality and returns a handle to it.
    pub fn save(&mut self, image: &DynamicImage, prefix: &str) -> Result<ImageHandle> {
        let path = write_jpeg(image, &self.config, prefix)?;
        if let Some(previous) = self.current.replace(path.clone()) {
            discard(&previous);
        }
        Ok(ImageHandle::from_path(&path))
    }

    /// Re-encodes a user-selected file with the fixed acquisition quality.
    pub fn recompress(&mut self, path: &Path) -> Result<ImageHandle> {
        let image = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                AssistError::PermissionDenied(format!(
                    "Media library permission is required to read {}",
                    path.display()
                ))
            }
            other => AssistError::Unknown(format!("Failed to load {}: {}", path.display(), other)),
        })?;
        self.save(&image, "selected")
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl Drop for CaptureStore {
    fn drop(&mut self) {
        if let Some(path) = self.current.take() {
            discard(&path);
        }
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}

fn write_jpeg(image: &DynamicImage, config: &AcquisitionConfig, prefix: &str) -> Result<PathBuf> {
    let file_name = format!(
        "{}-{}-{}.jpg",
        prefix,
        Local::now().format("%Y%m%d-%H%M%S%3f"),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    );
    let path = config.output_dir.join(file_name);

    let rgb = image.to_rgb8();
    let file = File::create(&path).map_err(|e| AssistError::Unknown(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, config.jpeg_quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| AssistError::Unknown(format!("failed to encode JPEG: {}", e)))?;
    writer
        .flush()
        .map_err(|e| AssistError::Unknown(format!("{}: {}", path.display(), e)))?;

    info!("Saved {}x{} image to {}", rgb.width(), rgb.height(), path.display());
    Ok(path)
}
