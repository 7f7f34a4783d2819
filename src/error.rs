use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShootError {
    // Input validation
    #[error("You can only upload up to {max} reference images.")]
    Capacity { max: usize },
    #[error("File {} is too large. Limit is {}MB.", .name, .limit_bytes / (1024 * 1024))]
    FileTooLarge { name: String, limit_bytes: usize },
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    // Preconditions
    #[error("Please upload at least one reference image.")]
    NoImages,
    #[error("Please select at least one option (Style, Expression, Background) or enter a prompt.")]
    NoConfiguration,
    #[error("Please describe the adjustment you want for this refinement.")]
    EmptyRefinement,
    #[error("There is no generated result to refine yet.")]
    NoResult,
    #[error("A generation is already in progress.")]
    Busy,
    #[error("The generation was cancelled before it finished.")]
    Cancelled,

    // Credentials
    #[error("{0} is not defined in environment variables.")]
    MissingCredentials(String),

    // Remote service
    #[error("Service error: {0}")]
    Service(String),
    #[error("Service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("No image data found in response. The model may have refused the request or generated text instead.")]
    NoImageProduced,
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ShootError {
    /// Every error except a missing credential leaves the session usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ShootError::MissingCredentials(_))
    }

    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ShootError::Capacity { .. } | ShootError::FileTooLarge { .. } | ShootError::InvalidImage(_)
        )
    }
}

impl From<std::io::Error> for ShootError {
    fn from(err: std::io::Error) -> Self {
        ShootError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ShootError {
    fn from(err: serde_json::Error) -> Self {
        ShootError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShootError>;
