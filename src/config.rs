use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path, path::PathBuf};
use validator::{Validate, ValidationError};

use crate::identifier::{BackendIdentifier, StackHandle};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfigFile {
    pub location: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_stack_reference"))]
pub struct ConfigEntry {
    pub stack_name: Option<String>,

    pub backend: Option<BackendIdentifier>,

    pub region: Option<String>,

    #[validate(custom = "validate_json_file")]
    pub json: ConfigFile,

    #[validate(custom = "validate_typescript_file")]
    pub typescript: Option<ConfigFile>,
}

impl ConfigEntry {
    /// Only valid on an entry that passed validation.
    pub fn stack_handle(&self) -> Option<StackHandle> {
        match (&self.stack_name, &self.backend) {
            (Some(stack_name), None) => Some(StackHandle::new(stack_name.clone())),
            (None, Some(backend)) => Some(backend.to_stack_handle()),
            _ => None,
        }
    }
}

pub type Config = Vec<ConfigEntry>;

pub fn parse(path: &Path) -> Result<Config, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let config: Config = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    for config_entry in &config {
        match config_entry.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }
    }

    tracing::debug!(path = %path.display(), entries = config.len(), "parsed config");
    return Ok(config);
}

fn validate_stack_reference(config_entry: &ConfigEntry) -> Result<(), ValidationError> {
    match (&config_entry.stack_name, &config_entry.backend) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        (Some(_), Some(_)) => Err(ValidationError::new(
            "Only one of `stack_name` and `backend` can be provided",
        )),
        (None, None) => Err(ValidationError::new(
            "One of `stack_name` or `backend` has to be provided",
        )),
    }
}

fn validate_extension(
    file: &ConfigFile,
    expected: &str,
    message: &'static str,
) -> Result<(), ValidationError> {
    let file_extension = match file.location.extension() {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the file location",
            ))
        }
    };
    if file_extension != expected {
        return Err(ValidationError::new(message));
    }

    return Ok(());
}

fn validate_json_file(json_file: &ConfigFile) -> Result<(), ValidationError> {
    return validate_extension(
        json_file,
        "json",
        "The JSON file location has to end with `.json`",
    );
}

fn validate_typescript_file(typescript_file: &ConfigFile) -> Result<(), ValidationError> {
    return validate_extension(
        typescript_file,
        "ts",
        "The TypeScript file location has to end with `.ts`",
    );
}
