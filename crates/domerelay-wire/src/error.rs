/// Errors that can occur while decoding relay frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The frame contained no characters.
    #[error("empty frame")]
    Empty,

    /// The leading token is not a known keyword or tag.
    #[error("unknown tag {0:?}")]
    UnknownTag(String),

    /// The tag is known but its fields are missing or invalid.
    #[error("malformed '{tag}' frame: {reason}")]
    MalformedFrame { tag: char, reason: String },

    /// The frame exceeds the configured maximum length.
    #[error("frame too long ({len} bytes, max {max})")]
    FrameTooLong { len: usize, max: usize },

    /// A value cannot be carried in a frame.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl WireError {
    pub(crate) fn malformed(tag: char, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            tag,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
