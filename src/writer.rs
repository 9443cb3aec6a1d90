use std::fs::{self};
use std::path::{Path, PathBuf};

use crate::config::ConfigEntry;
use crate::resolver::BackendOutput;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to serialize backend output: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unable to write {path}: {source}")]
    WriteError {
        path: String,
        source: std::io::Error,
    },
}

/// Writes the JSON file and, if configured, the TypeScript declaration.
///
/// Both files are staged next to their targets first and only moved into
/// place once every file was staged, so a failed write leaves the previous
/// pair untouched.
pub fn write(config_entry: &ConfigEntry, backend_output: &BackendOutput) -> Result<(), Error> {
    let mut files = vec![(config_entry.json.location.as_path(), to_json(backend_output)?)];
    if let Some(typescript) = &config_entry.typescript {
        files.push((typescript.location.as_path(), to_typings(backend_output)));
    }

    let mut staged: Vec<(PathBuf, &Path)> = vec![];
    for (path, contents) in files {
        match stage_file(path, contents) {
            Ok(staged_path) => staged.push((staged_path, path)),
            Err(error) => {
                for (staged_path, _) in &staged {
                    let _ = fs::remove_file(staged_path);
                }
                return Err(error);
            }
        }
    }

    for (staged_path, path) in staged {
        tracing::info!(path = %path.display(), "writing backend output");
        fs::rename(&staged_path, path).map_err(|source| Error::WriteError {
            path: path.display().to_string(),
            source,
        })?;
    }

    return Ok(());
}

pub fn to_json(backend_output: &BackendOutput) -> Result<String, Error> {
    return Ok(serde_json::to_string_pretty(backend_output)?);
}

fn to_typings(backend_output: &BackendOutput) -> String {
    let contents = backend_output
        .iter()
        .fold(String::from(""), |mut acc, (group, resolved)| {
            let payload = resolved
                .payload
                .keys()
                .fold(String::from(""), |mut acc, output_key| {
                    acc.push_str(&format!("{}: string; ", quote(output_key)));
                    return acc;
                });
            let type_entry = format!(
                "  {}: {{ version: string; payload: {{ {}}} }};\n",
                quote(group),
                payload
            );

            acc.push_str(&type_entry);
            return acc;
        });

    return format!(
        "declare const backendOutput: {{\n{}}};\nexport default backendOutput;\n",
        contents
    );
}

fn stage_file(path: &Path, contents: String) -> Result<PathBuf, Error> {
    let file_name = match path.file_name() {
        Some(file_name) => file_name.to_string_lossy().to_string(),
        None => String::from("backend-output"),
    };
    let staged_path = path.with_file_name(format!(".{}.tmp", file_name));

    return fs::write(&staged_path, contents)
        .map(|_| staged_path)
        .map_err(|source| Error::WriteError {
            path: path.display().to_string(),
            source,
        });
}

// Keys that are not plain identifiers (e.g. `amplify:storage`) need quoting.
fn quote(key: &str) -> String {
    let is_identifier = key.chars().enumerate().all(|(index, c)| {
        c == '_' || c == '$' || c.is_ascii_alphabetic() || (index > 0 && c.is_ascii_digit())
    });

    if is_identifier && !key.is_empty() {
        return key.to_string();
    }

    return format!("{:?}", key);
}
