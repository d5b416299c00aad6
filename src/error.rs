use thiserror::Error;

#[derive(Error, Debug)]
pub enum BibError {
    // Transport taxonomy, classified in `remote::error`
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no connection: {0}")]
    Offline(String),

    #[error("not authorized")]
    Unauthorized,

    #[error("access forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decoding(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    // Preconditions, raised before any request is sent
    #[error("record has no identifier; create it before updating")]
    MissingIdentifier,

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl BibError {
    /// Message shown to the user in place of the raw error.
    pub fn user_message(&self) -> String {
        match self {
            BibError::InvalidRequest(_) => "Invalid request URL.".to_string(),
            BibError::Offline(_) => {
                "No internet connection. Check your network and try again.".to_string()
            }
            BibError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            BibError::Forbidden => "You don't have permission to do that.".to_string(),
            BibError::NotFound(what) => format!("Not found: {what}"),
            BibError::Server { status, .. } => {
                format!("The server had a problem ({status}). Please try again later.")
            }
            BibError::Decoding(_) => "The server sent a response we couldn't read.".to_string(),
            BibError::Transport(detail) => format!("Network error: {detail}"),
            BibError::Api(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for errors raised locally before any request was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(self, BibError::MissingIdentifier | BibError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, BibError>;
