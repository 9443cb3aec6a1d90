use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_cloudformation::model::Stack;
use aws_sdk_cloudformation::types::SdkError;
use aws_sdk_cloudformation::Region;

use crate::error::ProviderError;
use crate::identifier::StackHandle;
use crate::provider::{RawOutput, StackDescription, StackDescriptionProvider, StackTag};

const FALLBACK_REGION: &str = "us-east-1";

/// `StackDescriptionProvider` backed by the CloudFormation API.
pub struct CloudFormationProvider {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationProvider {
    pub async fn new(region: Option<&str>) -> Self {
        let region = region.map(|region| Region::new(region.to_string()));
        let region_provider = RegionProviderChain::first_try(region)
            .or_default_provider()
            .or_else(Region::new(FALLBACK_REGION));

        let sdk_config = aws_config::from_env().region(region_provider).load().await;

        return Self::from_sdk_config(&sdk_config);
    }

    pub fn from_sdk_config(sdk_config: &aws_types::SdkConfig) -> Self {
        let client = aws_sdk_cloudformation::Client::new(sdk_config);

        return Self { client };
    }
}

#[async_trait]
impl StackDescriptionProvider for CloudFormationProvider {
    async fn get_stack_metadata_blob(
        &self,
        handle: &StackHandle,
    ) -> Result<Option<String>, ProviderError> {
        let result = self
            .client
            .get_template_summary()
            .stack_name(handle.as_str())
            .send()
            .await;

        let result = match result {
            Ok(data) => data,
            Err(SdkError::ServiceError { err, .. }) => {
                return Err(ProviderError::service(
                    err.code(),
                    err.message().unwrap_or_default(),
                ));
            }
            Err(err) => return Err(ProviderError::UnknownError(err.to_string())),
        };

        return Ok(result.metadata().map(String::from));
    }

    async fn get_stack_outputs_and_status(
        &self,
        handle: &StackHandle,
    ) -> Result<StackDescription, ProviderError> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(handle.as_str())
            .send()
            .await;

        let result = match result {
            Ok(data) => data,
            Err(SdkError::ServiceError { err, .. }) => {
                return Err(ProviderError::service(
                    err.code(),
                    err.message().unwrap_or_default(),
                ));
            }
            Err(err) => return Err(ProviderError::UnknownError(err.to_string())),
        };

        return describe_first(handle, result.stacks().unwrap_or_default());
    }
}

fn describe_first(
    handle: &StackHandle,
    stacks: &[Stack],
) -> Result<StackDescription, ProviderError> {
    match stacks.first() {
        Some(stack) => Ok(describe(stack)),
        None => Err(ProviderError::StackNotFound(handle.to_string())),
    }
}

fn describe(stack: &Stack) -> StackDescription {
    let outputs = stack.outputs().map(|outputs| {
        outputs
            .iter()
            .map(|output| RawOutput {
                key: output.output_key().map(String::from),
                value: output.output_value().map(String::from),
            })
            .collect()
    });

    let tags = stack
        .tags()
        .unwrap_or_default()
        .iter()
        .map(|tag| StackTag {
            key: tag.key().map(String::from),
            value: tag.value().map(String::from),
        })
        .collect();

    let status = match stack.stack_status() {
        Some(status) => status.as_str().to_string(),
        None => String::new(),
    };

    return StackDescription {
        outputs,
        status,
        tags,
    };
}
