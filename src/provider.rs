use async_trait::async_trait;

use crate::error::ProviderError;
use crate::identifier::StackHandle;

/// A single output as reported by the stack description. Either half may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl RawOutput {
    pub fn new(key: &str, value: &str) -> Self {
        return Self {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackTag {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackDescription {
    /// `None` when the stack reports no outputs at all.
    pub outputs: Option<Vec<RawOutput>>,
    pub status: String,
    pub tags: Vec<StackTag>,
}

impl StackDescription {
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        return self
            .tags
            .iter()
            .find(|tag| tag.key.as_deref() == Some(key))
            .and_then(|tag| tag.value.as_deref());
    }
}

/// Remote state the resolver reads from. Implemented over CloudFormation by
/// `CloudFormationProvider`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackDescriptionProvider: Send + Sync {
    /// Raw template metadata for the stack, `None` if the template has none.
    async fn get_stack_metadata_blob(
        &self,
        handle: &StackHandle,
    ) -> Result<Option<String>, ProviderError>;

    async fn get_stack_outputs_and_status(
        &self,
        handle: &StackHandle,
    ) -> Result<StackDescription, ProviderError>;
}
