use thiserror::Error;

/// Fatal session-level errors.
///
/// Stage-local failures in the translation pipeline are not represented here;
/// they are logged and handled per-utterance without touching session status.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("no input device found: {0}")]
    DeviceNotFound(String),

    #[error("input device unsupported: {0}")]
    DeviceUnsupported(String),

    #[error("session setup failed: {0}")]
    Setup(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("streaming service exception [{code}]: {message}")]
    ServiceException { code: String, message: String },

    #[error("audio processing error: {0}")]
    AudioProcessing(String),
}

impl SessionError {
    /// Message shown to the end user. Device failures get a specific,
    /// actionable message; transport failures get a generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::PermissionDenied(_) => {
                "Microphone access was denied. Grant microphone permission and try again."
                    .to_string()
            }
            SessionError::DeviceNotFound(_) => {
                "No microphone was found. Connect an input device and try again.".to_string()
            }
            SessionError::DeviceUnsupported(_) => {
                "The microphone does not support a usable audio format.".to_string()
            }
            SessionError::ServiceException { code, .. } => {
                format!("The transcription service reported an error ({code}). Please restart the session.")
            }
            _ => "The connection was lost. Please restart the session.".to_string(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
