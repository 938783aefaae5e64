//! Error types for Tally

use thiserror::Error;

/// Message shown to the user whenever the AI could not reliably read the source
pub const UNREADABLE_MESSAGE: &str =
    "No se pudo leer correctamente la información del recibo. Por favor, sube imágenes más claras.";

#[derive(Error, Debug)]
pub enum Error {
    /// The AI response could not be decoded as structured data at all
    #[error("Failed to parse AI response as JSON: {cause} | Raw: {raw}")]
    MalformedResponse { raw: String, cause: String },

    /// The model reported it could not read the input, or validation rejected it
    #[error("{0}")]
    UnreadableInput(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("User {user_id} is not a member of group {group_id}")]
    NotAMember { group_id: String, user_id: String },

    /// Request-level input problems (empty text, wrong media type, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic provider failure (empty reply, API error body)
    #[error("AI provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// How an error should surface at an API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Contract break or infrastructure failure (5xx class)
    Internal,
    /// The user can fix it by retrying with better input (4xx class)
    UserInput,
    NotFound,
    Forbidden,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnreadableInput(_) | Self::InvalidInput(_) => ErrorKind::UserInput,
            Self::GroupNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotAMember { .. } => ErrorKind::Forbidden,
            Self::MalformedResponse { .. }
            | Self::Provider(_)
            | Self::Database(_)
            | Self::Pool(_)
            | Self::Io(_)
            | Self::Http(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::InvalidData(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for the uniform "could not read" rejection
    pub(crate) fn unreadable() -> Self {
        Self::UnreadableInput(UNREADABLE_MESSAGE.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
