//! Shared utilities for command handlers

use crate::config::FileFormat;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::models::{ModelFile, Models};
use crate::output::{OutputWriter, Problem};
use anyhow::Context;
use retort_core::Value;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read and resolve a model file
pub fn load_models(path: &Path) -> Result<Models> {
    let _timer = Timer::with_details("load_models", &path.display().to_string());
    let models = ModelFile::from_path(path)?.resolve()?;
    debug!(path = %path.display(), classes = models.classes.len(), "Models loaded");
    Ok(models)
}

/// Read input data from a file, or JSON from stdin when no file is given
pub fn read_input(input: Option<&Path>) -> Result<Value> {
    let (content, format) = match input {
        Some(path) => {
            if !path.exists() {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read input file {}", path.display()))?;
            (content, FileFormat::of(path))
        }
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Cannot read input from stdin")?;
            (content, FileFormat::Json)
        }
    };
    parse_input(&content, format)
}

/// Parse input data of the given format into a dynamic value
pub fn parse_input(content: &str, format: FileFormat) -> Result<Value> {
    let data: serde_json::Value = format.parse(content)?;
    debug!(format = ?format, bytes = content.len(), "Input parsed");
    Ok(Value::from_json(&data))
}

/// Report the problems of a failed morphing and turn it into a CLI error
pub fn report_failure(output: &mut OutputWriter, headline: &str, error: retort_core::Error) -> Error {
    let problems = Problem::of(&error);
    tracing::warn!(problems = problems.len(), "{}", headline);
    let reported = output
        .error(&format!("✗ {}", headline))
        .and_then(|()| output.problems(&problems));
    match reported {
        Ok(()) => Error::Core(error),
        Err(err) => err,
    }
}
