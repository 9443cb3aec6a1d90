//! Fetches the outputs of deployed CloudFormation backends.
//!
//! A backend's template metadata groups its stack outputs into named,
//! versioned output groups. [`BackendOutputResolver`] reads that metadata
//! and the stack's current outputs and joins the two into a
//! [`BackendOutput`].

pub mod classifier;
pub mod cli;
pub mod cloudformation;
pub mod config;
pub mod error;
pub mod identifier;
pub mod metadata;
pub mod provider;
pub mod resolver;
pub mod writer;

pub use error::{Error, ProviderError};
pub use identifier::{BackendIdentifier, DeploymentType, StackHandle};
pub use provider::StackDescriptionProvider;
pub use resolver::{BackendOutput, BackendOutputResolver, ResolvedOutputGroup};
