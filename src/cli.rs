use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Error;
use crate::identifier::{BackendIdentifier, DeploymentType, StackHandle};

#[derive(Parser)]
#[command(name = "backend-output-fetcher")]
#[command(version)]
#[command(about = "Fetch backend outputs of deployed CFN stacks", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every backend listed in the config file and write its outputs
    Fetch(FetchArgs),

    /// Print the backend output of a single stack
    Show(ShowArgs),
}

#[derive(Args)]
pub struct FetchArgs {
    /// Path to the config file
    #[arg(short, long, default_value = "./config.yaml", env = "BACKEND_OUTPUT_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Name of the deployed stack
    #[arg(long, conflicts_with_all = ["namespace", "name", "deployment_type"])]
    pub stack_name: Option<String>,

    /// Application namespace of the backend
    #[arg(long, requires_all = ["name", "deployment_type"])]
    pub namespace: Option<String>,

    /// Backend name, e.g. the branch name
    #[arg(long, requires = "namespace")]
    pub name: Option<String>,

    #[arg(long, value_enum, requires = "namespace")]
    pub deployment_type: Option<DeploymentType>,

    /// AWS region, defaults to the region of the active AWS profile
    #[arg(short, long, env = "AWS_REGION")]
    pub region: Option<String>,
}

impl ShowArgs {
    pub fn stack_handle(&self) -> Option<StackHandle> {
        if let Some(stack_name) = &self.stack_name {
            return Some(StackHandle::new(stack_name.clone()));
        }

        match (&self.namespace, &self.name, self.deployment_type) {
            (Some(namespace), Some(name), Some(deployment_type)) => Some(
                BackendIdentifier {
                    namespace: namespace.clone(),
                    name: name.clone(),
                    deployment_type,
                }
                .to_stack_handle(),
            ),
            _ => None,
        }
    }
}

/// What the user can do about a failed resolve.
pub fn remediation(error: &Error) -> &'static str {
    match error {
        Error::MetadataRetrievalError(_) => {
            "Make sure the stack was deployed by a version of the tooling that records output metadata."
        }
        Error::SchemaValidationError(_) => {
            "The stack metadata is malformed. Redeploy the backend to regenerate it."
        }
        Error::NoStackFound(_) => {
            "Check the stack name and region, and make sure the backend has been deployed."
        }
        Error::CredentialsError(_) => {
            "Refresh your AWS credentials, e.g. by running `aws sso login` or updating your profile."
        }
        Error::AccessDeniedError(_) => {
            "Make sure your AWS credentials allow cloudformation:DescribeStacks and cloudformation:GetTemplateSummary."
        }
        Error::DeploymentInProgressError { .. } => {
            "Wait for the deployment to finish and try again."
        }
        Error::NoOutputsFoundError(_) => {
            "The stack has no outputs yet. Make sure the last deployment succeeded."
        }
        Error::ProviderError(_) => "Re-run with `-vv` for more details.",
    }
}
