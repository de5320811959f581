// src/capture/handle.rs
use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{AssistError, Result};

/// Reference to a locally available image, kept as the URI the acquisition produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle(String);

/// Where the bytes behind a handle actually live.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Location<'a> {
    File(PathBuf),
    Remote(&'a str),
    Inline { payload: &'a str },
}

impl ImageHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn location(&self) -> Result<Location<'_>> {
        let uri = self.0.trim();
        if let Some(rest) = uri.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| AssistError::read_failure(self, "malformed data URI"))?;
            if !meta.ends_with(";base64") {
                return Err(AssistError::read_failure(self, "only base64 data URIs are supported"));
            }
            return Ok(Location::Inline { payload });
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(Location::Remote(uri));
        }
        if uri.starts_with("file://") {
            let path = Url::parse(uri)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| AssistError::read_failure(self, "invalid file URI"))?;
            return Ok(Location::File(path));
        }
        if uri.is_empty() {
            return Err(AssistError::read_failure(self, "empty image reference"));
        }
        Ok(Location::File(PathBuf::from(uri)))
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inline images can be megabytes long; keep logs readable.
        if self.0.starts_with("data:") && self.0.len() > 48 {
            write!(f, "{}...", &self.0[..self.0.char_indices().nth(48).map_or(self.0.len(), |(i, _)| i)])
        } else {
            f.write_str(&self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_uri_forms() {
        assert_eq!(
            ImageHandle::new("/tmp/a.jpg").location().unwrap(),
            Location::File(PathBuf::from("/tmp/a.jpg"))
        );
        assert_eq!(
            ImageHandle::new("https://example.com/a.jpg").location().unwrap(),
            Location::Remote("https://example.com/a.jpg")
        );
        assert_eq!(
            ImageHandle::new("data:image/png;base64,AQID").location().unwrap(),
            Location::Inline { payload: "AQID" }
        );
    }

    #[cfg(unix)]
    #[test]
    fn file_uris_are_decoded() {
        let handle = ImageHandle::new("file:///tmp/my%20photo.jpg");
        assert_eq!(handle.location().unwrap(), Location::File(PathBuf::from("/tmp/my photo.jpg")));
    }

    #[test]
    fn rejects_unusable_references() {
        assert!(ImageHandle::new("").location().is_err());
        assert!(ImageHandle::new("data:image/png,rawtext").location().is_err());
        assert!(ImageHandle::new("data:nocomma").location().is_err());
    }

    #[test]
    fn long_inline_handles_are_shortened_for_display() {
        let handle = ImageHandle::new(format!("data:image/png;base64,{}", "A".repeat(500)));
        let shown = handle.to_string();
        assert!(shown.ends_with("..."));
        assert!(shown.len() < 60);
    }
}
