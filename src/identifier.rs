//! Resolution of backend identifiers to CloudFormation stack names.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

const STACK_NAME_PREFIX: &str = "amplify";
const MAX_SEGMENT_LENGTH: usize = 20;
const HASH_LENGTH: usize = 10;

/// Canonical name of a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackHandle(String);

impl StackHandle {
    pub fn new(stack_name: impl Into<String>) -> Self {
        return Self(stack_name.into());
    }

    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    Sandbox,
    Branch,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Sandbox => "sandbox",
            DeploymentType::Branch => "branch",
        }
    }
}

/// Identifies a backend by application namespace, name and deployment type
/// instead of by its stack name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendIdentifier {
    pub namespace: String,
    pub name: String,
    pub deployment_type: DeploymentType,
}

impl BackendIdentifier {
    pub fn to_stack_handle(&self) -> StackHandle {
        let hash = Sha512::digest(format!("{}-{}", self.namespace, self.name).as_bytes());
        let hash = hex::encode(hash);
        let namespace = sanitize(&self.namespace);
        let name = sanitize(&self.name);

        let stack_name = [
            STACK_NAME_PREFIX,
            namespace.as_str(),
            name.as_str(),
            self.deployment_type.as_str(),
            &hash[..HASH_LENGTH],
        ]
        .join("-");

        return StackHandle::new(stack_name);
    }
}

fn sanitize(segment: &str) -> String {
    return segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_SEGMENT_LENGTH)
        .collect();
}
