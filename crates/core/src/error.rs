/// Result alias that carries the custom [`SoundPainterError`] type.
pub type Result<T> = std::result::Result<T, SoundPainterError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SoundPainterError {
    /// Free-form message for failures that do not deserve their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A caller handed over arguments the operation cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The FFT backend rejected its buffers.
    #[error("fft failure: {0}")]
    Fft(#[from] realfft::FftError),
    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// A state slot was declared twice.
    #[error("slot `{0}` is already declared")]
    DuplicateSlot(String),
    /// A state slot was used without being declared first.
    #[error("slot `{0}` has not been declared")]
    UnknownSlot(String),
    /// A written value does not satisfy the slot's declared syntax.
    #[error("value `{value}` does not match syntax `{syntax}` of slot `{key}`")]
    SyntaxMismatch {
        key: String,
        syntax: &'static str,
        value: String,
    },
    /// A lock guarding shared audio state was poisoned by a panicking thread.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// The audio capture device could not be opened or started.
    #[error("audio capture failed: {0}")]
    Capture(String),
}

impl SoundPainterError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SoundPainterError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SoundPainterError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
