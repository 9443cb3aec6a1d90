/// Errors surfaced by a `StackDescriptionProvider` before classification.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Service error ocurred: {message}.")]
    ServiceError {
        code: Option<String>,
        message: String,
    },

    #[error("Stack {0} not found")]
    StackNotFound(String),

    #[error("Unknown error ocurred: {0}.")]
    UnknownError(String),
}

impl ProviderError {
    pub fn service(code: Option<&str>, message: impl Into<String>) -> Self {
        return Self::ServiceError {
            code: code.map(String::from),
            message: message.into(),
        };
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ServiceError { code, .. } => code.as_deref(),
            Self::StackNotFound(_) | Self::UnknownError(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ServiceError { message, .. } => message.as_str(),
            Self::StackNotFound(stack_name) => stack_name.as_str(),
            Self::UnknownError(message) => message.as_str(),
        }
    }
}

/// Failure kinds a caller of `BackendOutputResolver::resolve` can branch on.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unable to retrieve stack metadata: {0}")]
    MetadataRetrievalError(String),

    #[error("Stack metadata failed validation: {0}")]
    SchemaValidationError(String),

    #[error("Stack does not exist: {0}")]
    NoStackFound(String),

    #[error("Invalid or expired credentials: {0}")]
    CredentialsError(String),

    #[error("Access denied: {0}")]
    AccessDeniedError(String),

    #[error("Deployment ({deployment_type}) is currently in progress for stack {stack_name}")]
    DeploymentInProgressError {
        stack_name: String,
        deployment_type: String,
    },

    #[error("No outputs found for stack {0}")]
    NoOutputsFoundError(String),

    #[error(transparent)]
    ProviderError(#[from] ProviderError),
}
