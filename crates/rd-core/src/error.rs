use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    SizeMismatch { expected: usize, actual: usize },
    UpscaleUnsupported,
    Aborted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {expected}, got {actual}")
            }
            Self::UpscaleUnsupported => write!(f, "upscale is not supported"),
            Self::Aborted => write!(f, "downscale aborted"),
        }
    }
}

impl std::error::Error for Error {}
