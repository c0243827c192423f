use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SniffError {
    /// The source failed the readable capability check.
    #[error("input is not a readable stream")]
    NotReadable,
    /// There is no Tokio runtime to drive the source on.
    #[error("no async runtime to drive the stream")]
    NoRuntime,
    /// The detection task went away without reporting a result.
    #[error("detection ended before a result was reported")]
    Detached,
}

impl From<SniffError> for io::Error {
    fn from(error: SniffError) -> Self {
        let kind = match error {
            SniffError::NotReadable => io::ErrorKind::InvalidInput,
            SniffError::NoRuntime => io::ErrorKind::Unsupported,
            SniffError::Detached => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, error)
    }
}
