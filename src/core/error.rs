use thiserror::Error;

/// Message used when the service fails without a usable `detail`.
pub const GENERIC_FAILURE: &str = "Failed to fetch response.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Non-success status or transport failure. The message is the service's
    /// `detail` when it sent one.
    #[error("{0}")]
    RequestFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Recovered locally by the history normalizer; never shown to the user.
    #[error("Unparseable history record: {0}")]
    HistoryRecordUnparseable(String),
}

impl ChatError {
    /// Body of the inline error entry appended in place of a reply.
    pub fn transcript_message(&self) -> String {
        format!("Error: {self}")
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChatError::MalformedResponse(e.to_string())
        } else {
            ChatError::RequestFailed(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    File(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential store I/O error: {0}")]
    Io(String),

    #[error("Credential store is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Cannot read attachment {path}: {message}")]
    Read { path: String, message: String },

    #[error("Attachment path has no file name: {0}")]
    NoFileName(String),
}
