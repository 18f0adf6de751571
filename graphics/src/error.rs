//! Graphics error types.

use std::fmt;

use crate::format::TextureFormat;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to create the device, adapter or swap chain.
    InitializationFailed(String),
    /// Failed to create a texture, view or staging resource.
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// The swap chain could not be resized because back-buffer references
    /// are still alive. Carries the number of outstanding references.
    SwapChainBusy(usize),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// The format cannot be used for the requested operation.
    UnsupportedFormat(TextureFormat),
    /// The presentation surface was lost and needs to be recreated.
    SurfaceLost,
    /// An internal error occurred.
    Internal(String),
}

impl GraphicsError {
    /// Whether the error leaves the owning surface unusable.
    ///
    /// Fatal errors put a [`SurfaceManager`](crate::SurfaceManager) into the
    /// lost state; only [`SurfaceManager::shutdown`](crate::SurfaceManager::shutdown)
    /// remains valid afterwards.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidParameter(_) | Self::UnsupportedFormat(_) => false,
            Self::InitializationFailed(_)
            | Self::ResourceCreationFailed(_)
            | Self::OutOfMemory
            | Self::DeviceLost
            | Self::SwapChainBusy(_)
            | Self::SurfaceLost
            | Self::Internal(_) => true,
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::SwapChainBusy(count) => {
                write!(f, "swap chain busy: {count} back-buffer reference(s) still alive")
            }
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::UnsupportedFormat(format) => write!(f, "unsupported format: {format}"),
            Self::SurfaceLost => write!(f, "surface lost, needs recreation"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");

        let err = GraphicsError::UnsupportedFormat(TextureFormat::BC1_UNORM);
        assert_eq!(err.to_string(), "unsupported format: BC1_UNORM");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(GraphicsError::DeviceLost.is_fatal());
        assert!(GraphicsError::SwapChainBusy(2).is_fatal());
        assert!(GraphicsError::SurfaceLost.is_fatal());
        assert!(!GraphicsError::InvalidParameter("zero width".into()).is_fatal());
        assert!(!GraphicsError::UnsupportedFormat(TextureFormat::NV12).is_fatal());
    }
}
