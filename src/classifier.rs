//! Maps provider errors onto the resolver's error taxonomy.
//!
//! Rules are checked in order and the first match wins, so the credentials
//! and access-denied rules sit ahead of the stack-not-found rule. Errors no
//! rule claims are passed through as `Error::ProviderError`.

use crate::error::{Error, ProviderError};

const CREDENTIALS_ERROR_CODES: &[&str] = &[
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "InvalidSignatureException",
];

const CREDENTIALS_ERROR_MESSAGES: &[&str] = &[
    "security token included in the request is expired",
    "no credentials in the property bag",
    "failed to load credentials",
    "no providers in chain provided credentials",
];

const ACCESS_DENIED_ERROR_CODES: &[&str] = &["AccessDenied", "AccessDeniedException"];

const ACCESS_DENIED_ERROR_MESSAGES: &[&str] = &["is not authorized to perform"];

pub struct ClassificationRule {
    pub name: &'static str,
    pub matches: fn(&ProviderError) -> bool,
    pub into_error: fn(&ProviderError) -> Error,
}

pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        return Self {
            rules: vec![
                ClassificationRule {
                    name: "credentials",
                    matches: is_credentials_error,
                    into_error: |error| Error::CredentialsError(error.message().to_string()),
                },
                ClassificationRule {
                    name: "access-denied",
                    matches: is_access_denied_error,
                    into_error: |error| Error::AccessDeniedError(error.message().to_string()),
                },
                ClassificationRule {
                    name: "stack-not-found",
                    matches: is_stack_not_found_error,
                    into_error: |error| Error::NoStackFound(error.message().to_string()),
                },
            ],
        };
    }
}

impl ErrorClassifier {
    /// Adds a rule that is checked before every rule already registered.
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.insert(0, rule);
        return self;
    }

    pub fn classify(&self, error: ProviderError) -> Error {
        let rule = self.rules.iter().find(|rule| (rule.matches)(&error));

        match rule {
            Some(rule) => {
                tracing::debug!(rule = rule.name, %error, "classified provider error");
                (rule.into_error)(&error)
            }
            None => Error::ProviderError(error),
        }
    }
}

fn message_contains_any(error: &ProviderError, needles: &[&str]) -> bool {
    let message = error.message().to_lowercase();
    return needles.iter().any(|needle| message.contains(needle));
}

fn code_is_any(error: &ProviderError, codes: &[&str]) -> bool {
    match error.code() {
        Some(code) => codes.contains(&code),
        None => false,
    }
}

fn is_credentials_error(error: &ProviderError) -> bool {
    return code_is_any(error, CREDENTIALS_ERROR_CODES)
        || message_contains_any(error, CREDENTIALS_ERROR_MESSAGES);
}

fn is_access_denied_error(error: &ProviderError) -> bool {
    return code_is_any(error, ACCESS_DENIED_ERROR_CODES)
        || message_contains_any(error, ACCESS_DENIED_ERROR_MESSAGES);
}

// CloudFormation reports a missing stack as a generic `ValidationError`, so
// the message shape is the only signal besides our own `StackNotFound`.
fn is_stack_not_found_error(error: &ProviderError) -> bool {
    match error {
        ProviderError::StackNotFound(_) => true,
        ProviderError::ServiceError { code, message } => {
            let is_validation_error = match code.as_deref() {
                Some(code) => code == "ValidationError",
                None => true,
            };
            is_validation_error
                && message.starts_with("Stack with id")
                && message.ends_with("does not exist")
        }
        ProviderError::UnknownError(_) => false,
    }
}
