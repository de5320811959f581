// src/capture/mod.rs
pub mod compress;
pub mod handle;
#[cfg(feature = "desktop")]
pub mod screenshot;
pub mod serializer;
pub mod source;

pub use handle::ImageHandle;
#[cfg(feature = "desktop")]
pub use screenshot::DesktopSource;
pub use serializer::{ByteSequence, ImageSerializer};
pub use source::{ImageSource, PathSource};
