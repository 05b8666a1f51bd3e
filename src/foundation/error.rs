use std::fmt;

/// Result alias used throughout the crate.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Remote operation category, used to collapse collaborator failures into one message each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteOp {
    /// Image edit (restyle the composed thumbnail).
    Edit,
    /// Background generation from text.
    Generate,
    /// Coach chat.
    Chat,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Edit => "image edit returned no result, try again",
            Self::Generate => "background generation returned no result, try again",
            Self::Chat => "coach did not answer, try again",
        };
        f.write_str(msg)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ForgeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("remote error: {0}")]
    Remote(RemoteOp),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("busy: another operation is still running")]
    Busy,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForgeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
