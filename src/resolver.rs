//! Reconstructs a backend's output groups from its stack.
//!
//! The template metadata declares which stack outputs belong to which output
//! group; the stack description carries the output values. Both are fetched
//! fresh on every call and joined by output key.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::ErrorClassifier;
use crate::error::Error;
use crate::identifier::StackHandle;
use crate::metadata::{self, Metadata};
use crate::provider::{RawOutput, StackDescription, StackDescriptionProvider};

pub const DEPLOYMENT_TYPE_TAG: &str = "amplify:deployment-type";
pub const DEFAULT_DEPLOYMENT_TYPE: &str = "unknown";
const IN_PROGRESS_STATUS_SUFFIX: &str = "_IN_PROGRESS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOutputGroup {
    pub version: String,
    pub payload: IndexMap<String, String>,
}

pub type BackendOutput = IndexMap<String, ResolvedOutputGroup>;

pub struct BackendOutputResolver {
    provider: Arc<dyn StackDescriptionProvider>,
    classifier: ErrorClassifier,
}

impl BackendOutputResolver {
    pub fn new(provider: Arc<dyn StackDescriptionProvider>) -> Self {
        return Self {
            provider,
            classifier: ErrorClassifier::default(),
        };
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        return self;
    }

    pub async fn resolve(&self, handle: &StackHandle) -> Result<BackendOutput, Error> {
        let metadata = self.fetch_metadata(handle).await?;
        tracing::debug!(stack = %handle, groups = metadata.len(), "fetched stack metadata");

        let description = match self.provider.get_stack_outputs_and_status(handle).await {
            Ok(description) => description,
            Err(error) => return Err(self.classifier.classify(error)),
        };
        tracing::debug!(stack = %handle, status = %description.status, "fetched stack description");

        let outputs = checked_outputs(handle, &description)?;
        let outputs = flatten_outputs(outputs);

        return Ok(assemble(&metadata, &outputs));
    }

    async fn fetch_metadata(&self, handle: &StackHandle) -> Result<Metadata, Error> {
        let blob = match self.provider.get_stack_metadata_blob(handle).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                return Err(Error::MetadataRetrievalError(format!(
                    "stack {} has no template metadata",
                    handle
                )))
            }
            Err(error) => return Err(self.classifier.classify(error)),
        };

        return metadata::parse(&blob);
    }
}

// An in-progress stack may transiently report no outputs, so the status is
// checked before the outputs are.
fn checked_outputs<'a>(
    handle: &StackHandle,
    description: &'a StackDescription,
) -> Result<&'a [RawOutput], Error> {
    if description.status.ends_with(IN_PROGRESS_STATUS_SUFFIX) {
        let deployment_type = description
            .tag_value(DEPLOYMENT_TYPE_TAG)
            .unwrap_or(DEFAULT_DEPLOYMENT_TYPE);

        return Err(Error::DeploymentInProgressError {
            stack_name: handle.to_string(),
            deployment_type: deployment_type.to_string(),
        });
    }

    match &description.outputs {
        Some(outputs) => Ok(outputs.as_slice()),
        None => Err(Error::NoOutputsFoundError(handle.to_string())),
    }
}

fn flatten_outputs(outputs: &[RawOutput]) -> HashMap<&str, &str> {
    return outputs
        .iter()
        .filter_map(|output| match (output.key.as_deref(), output.value.as_deref()) {
            (Some(key), Some(value)) => Some((key, value)),
            _ => {
                tracing::warn!(?output, "skipping stack output without key or value");
                None
            }
        })
        .collect();
}

fn assemble(metadata: &Metadata, outputs: &HashMap<&str, &str>) -> BackendOutput {
    return metadata
        .iter()
        .map(|(group, entry)| {
            let payload = entry
                .stack_output_names
                .iter()
                .filter_map(|name| match outputs.get(name.as_str()) {
                    Some(value) if !value.is_empty() => Some((name.clone(), value.to_string())),
                    _ => None,
                })
                .collect();

            let resolved = ResolvedOutputGroup {
                version: entry.version.clone(),
                payload,
            };
            (group.clone(), resolved)
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{BackendOutputResolver, ResolvedOutputGroup};
    use crate::classifier::{ClassificationRule, ErrorClassifier};
    use crate::error::{Error, ProviderError};
    use crate::identifier::StackHandle;
    use crate::provider::{MockStackDescriptionProvider, RawOutput, StackDescription, StackTag};

    const API_METADATA: &str =
        r#"{ "api": { "version": "1", "stackOutputNames": ["ApiUrl", "ApiId"] } }"#;

    fn complete(outputs: Option<Vec<RawOutput>>) -> StackDescription {
        return StackDescription {
            outputs,
            status: String::from("UPDATE_COMPLETE"),
            tags: vec![],
        };
    }

    fn provider(blob: &str, description: StackDescription) -> MockStackDescriptionProvider {
        let blob = blob.to_string();
        let mut provider = MockStackDescriptionProvider::new();
        provider
            .expect_get_stack_metadata_blob()
            .returning(move |_| Ok(Some(blob.clone())));
        provider
            .expect_get_stack_outputs_and_status()
            .returning(move |_| Ok(description.clone()));
        return provider;
    }

    async fn resolve(provider: MockStackDescriptionProvider) -> Result<super::BackendOutput, Error> {
        let resolver = BackendOutputResolver::new(Arc::new(provider));
        return resolver.resolve(&StackHandle::new("my-stack")).await;
    }

    fn group(version: &str, payload: &[(&str, &str)]) -> ResolvedOutputGroup {
        return ResolvedOutputGroup {
            version: version.to_string(),
            payload: payload
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        };
    }

    #[tokio::test]
    async fn drops_empty_output_values() {
        let description = complete(Some(vec![
            RawOutput::new("ApiUrl", "https://x"),
            RawOutput::new("ApiId", ""),
        ]));

        let result = resolve(provider(API_METADATA, description)).await.unwrap();

        let mut expected = IndexMap::new();
        expected.insert(String::from("api"), group("1", &[("ApiUrl", "https://x")]));
        assert_eq!(expected, result);
    }

    #[tokio::test]
    async fn excludes_names_missing_from_outputs() {
        let description = complete(Some(vec![RawOutput::new("ApiId", "abc123")]));

        let result = resolve(provider(API_METADATA, description)).await.unwrap();

        assert_eq!(&group("1", &[("ApiId", "abc123")]), result.get("api").unwrap());
    }

    #[tokio::test]
    async fn keeps_groups_with_no_resolvable_outputs() {
        let description = complete(Some(vec![RawOutput::new("Unrelated", "value")]));

        let result = resolve(provider(API_METADATA, description)).await.unwrap();

        assert_eq!(&group("1", &[]), result.get("api").unwrap());
    }

    #[tokio::test]
    async fn skips_outputs_without_key_or_value() {
        let description = complete(Some(vec![
            RawOutput {
                key: None,
                value: Some(String::from("orphan")),
            },
            RawOutput {
                key: Some(String::from("ApiId")),
                value: None,
            },
            RawOutput::new("ApiUrl", "https://x"),
        ]));

        let result = resolve(provider(API_METADATA, description)).await.unwrap();

        assert_eq!(&group("1", &[("ApiUrl", "https://x")]), result.get("api").unwrap());
    }

    #[tokio::test]
    async fn preserves_metadata_and_declared_name_order() {
        let blob = r#"{
            "storage": { "version": "1", "stackOutputNames": ["BucketName", "Region"] },
            "auth": { "version": "2", "stackOutputNames": ["UserPoolId", "ClientId"] }
        }"#;
        let description = complete(Some(vec![
            RawOutput::new("ClientId", "client"),
            RawOutput::new("Region", "eu-west-1"),
            RawOutput::new("UserPoolId", "pool"),
            RawOutput::new("BucketName", "bucket"),
        ]));

        let result = resolve(provider(blob, description)).await.unwrap();

        assert_eq!(vec!["storage", "auth"], result.keys().collect::<Vec<_>>());
        assert_eq!(
            vec!["UserPoolId", "ClientId"],
            result.get("auth").unwrap().payload.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            vec!["BucketName", "Region"],
            result.get("storage").unwrap().payload.keys().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn repeated_resolves_are_identical() {
        let description = complete(Some(vec![
            RawOutput::new("ApiUrl", "https://x"),
            RawOutput::new("ApiId", "abc123"),
        ]));
        let resolver =
            BackendOutputResolver::new(Arc::new(provider(API_METADATA, description)));
        let handle = StackHandle::new("my-stack");

        let first = resolver.resolve(&handle).await.unwrap();
        let second = resolver.resolve(&handle).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn in_progress_stack_fails_even_with_outputs() {
        let description = StackDescription {
            outputs: Some(vec![RawOutput::new("ApiUrl", "https://x")]),
            status: String::from("UPDATE_IN_PROGRESS"),
            tags: vec![StackTag {
                key: Some(String::from("amplify:deployment-type")),
                value: Some(String::from("sandbox")),
            }],
        };

        let result = resolve(provider(API_METADATA, description)).await;

        assert_eq!(
            Error::DeploymentInProgressError {
                stack_name: String::from("my-stack"),
                deployment_type: String::from("sandbox"),
            },
            result.err().unwrap()
        );
    }

    #[tokio::test]
    async fn in_progress_takes_precedence_over_missing_outputs() {
        let description = StackDescription {
            outputs: None,
            status: String::from("CREATE_IN_PROGRESS"),
            tags: vec![],
        };

        let result = resolve(provider(API_METADATA, description)).await;

        assert_eq!(
            Error::DeploymentInProgressError {
                stack_name: String::from("my-stack"),
                deployment_type: String::from("unknown"),
            },
            result.err().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_outputs_fail() {
        let result = resolve(provider(API_METADATA, complete(None))).await;

        assert_eq!(
            Error::NoOutputsFoundError(String::from("my-stack")),
            result.err().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_metadata_skips_outputs_fetch() {
        let mut provider = MockStackDescriptionProvider::new();
        provider
            .expect_get_stack_metadata_blob()
            .times(1)
            .returning(|_| Ok(None));
        provider.expect_get_stack_outputs_and_status().times(0);

        match resolve(provider).await.err().unwrap() {
            Error::MetadataRetrievalError(_) => {}
            other => panic!("Expected `MetadataRetrievalError`, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_metadata_entry_fails_the_whole_call() {
        let blob = r#"{
            "api": { "version": "1", "stackOutputNames": ["ApiUrl"] },
            "auth": { "stackOutputNames": ["UserPoolId"] }
        }"#;
        let mut provider = MockStackDescriptionProvider::new();
        let blob = blob.to_string();
        provider
            .expect_get_stack_metadata_blob()
            .returning(move |_| Ok(Some(blob.clone())));
        provider.expect_get_stack_outputs_and_status().times(0);

        match resolve(provider).await.err().unwrap() {
            Error::SchemaValidationError(_) => {}
            other => panic!("Expected `SchemaValidationError`, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn classifies_metadata_fetch_errors() {
        let mut provider = MockStackDescriptionProvider::new();
        provider.expect_get_stack_metadata_blob().returning(|_| {
            Err(ProviderError::service(
                Some("ValidationError"),
                "Stack with id my-stack does not exist",
            ))
        });

        match resolve(provider).await.err().unwrap() {
            Error::NoStackFound(_) => {}
            other => panic!("Expected `NoStackFound`, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn classifies_outputs_fetch_errors() {
        let mut provider = MockStackDescriptionProvider::new();
        let blob = API_METADATA.to_string();
        provider
            .expect_get_stack_metadata_blob()
            .returning(move |_| Ok(Some(blob.clone())));
        provider
            .expect_get_stack_outputs_and_status()
            .returning(|_| Err(ProviderError::service(Some("AccessDeniedException"), "denied")));

        assert_eq!(
            Error::AccessDeniedError(String::from("denied")),
            resolve(provider).await.err().unwrap()
        );
    }

    #[tokio::test]
    async fn uses_custom_classifier_rules() {
        let mut provider = MockStackDescriptionProvider::new();
        provider
            .expect_get_stack_metadata_blob()
            .returning(|_| Err(ProviderError::service(Some("Throttling"), "Rate exceeded")));
        let classifier = ErrorClassifier::default().with_rule(ClassificationRule {
            name: "throttling",
            matches: |error| error.code() == Some("Throttling"),
            into_error: |error| Error::AccessDeniedError(error.message().to_string()),
        });
        let resolver = BackendOutputResolver::new(Arc::new(provider)).with_classifier(classifier);

        assert_eq!(
            Error::AccessDeniedError(String::from("Rate exceeded")),
            resolver.resolve(&StackHandle::new("my-stack")).await.err().unwrap()
        );
    }

    #[tokio::test]
    async fn unclassified_errors_pass_through() {
        let error = ProviderError::UnknownError(String::from("dispatch failure"));
        let returned = error.clone();
        let mut provider = MockStackDescriptionProvider::new();
        provider
            .expect_get_stack_metadata_blob()
            .returning(move |_| Err(returned.clone()));

        assert_eq!(
            Error::ProviderError(error),
            resolve(provider).await.err().unwrap()
        );
    }
}
