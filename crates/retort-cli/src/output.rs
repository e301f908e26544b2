//! Output formatting and writing utilities
//!
//! Morphed values are printed in their display form for humans and as
//! JSON or YAML data otherwise. Runtime errors are broken down into
//! their leaf problems with the path to each failing value.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use retort_core::Value;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Trait for formatting serializable output
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
        }
    }
}

/// One failing value of a runtime error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Path to the failing value, e.g. `$.items[2].price`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Problem {
    /// Leaf problems of an error. Build-time errors have no path.
    pub fn of(error: &retort_core::Error) -> Vec<Problem> {
        match error {
            retort_core::Error::Load(err) => err
                .flatten()
                .into_iter()
                .map(|leaf| Problem {
                    path: (!leaf.trail.is_empty()).then(|| leaf.trail.to_string()),
                    message: leaf.kind.to_string(),
                })
                .collect(),
            retort_core::Error::Dump(err) => err
                .flatten()
                .into_iter()
                .map(|leaf| Problem {
                    path: (!leaf.trail.is_empty()).then(|| leaf.trail.to_string()),
                    message: leaf.kind.to_string(),
                })
                .collect(),
            other => vec![Problem {
                path: None,
                message: other.to_string(),
            }],
        }
    }
}

/// JSON form of a morphed value; values with no JSON form fall back to
/// their display string
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value.to_json() {
        Ok(json) => json,
        Err(err) => {
            debug!("Value has no JSON form ({}), using its display form", err);
            serde_json::Value::String(value.to_string())
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self::with_writer(format, use_color, quiet, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            quiet,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        debug!("Output info: {}", message);

        if self.quiet || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write an error message
    pub fn error(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.red().to_string())
        } else {
            self.writeln(&format!("ERROR: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = self.format.format(value)?;
        trace!("Outputting data: {}", formatted);

        // YAML output already ends with a newline
        if self.format == OutputFormat::Yaml {
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Write a morphed value: its display form for humans, data otherwise
    pub fn value(&mut self, value: &Value) -> Result<()> {
        if self.is_human() {
            self.writeln(&value.to_string())
        } else {
            self.data(&value_to_json(value))
        }
    }

    /// Report the leaf problems of an error
    pub fn problems(&mut self, problems: &[Problem]) -> Result<()> {
        if !self.is_human() {
            return self.data(&serde_json::json!({ "errors": problems }));
        }
        for problem in problems {
            match &problem.path {
                Some(path) => self.error(&format!("  ✗ {}: {}", path, problem.message))?,
                None => self.error(&format!("  ✗ {}", problem.message))?,
            }
        }
        Ok(())
    }

    /// Save data to a file, as YAML for `.yaml`/`.yml` paths and pretty JSON
    /// otherwise
    pub fn save(&mut self, path: &Path, data: &serde_json::Value) -> Result<()> {
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::to_string(data)?,
            _ => serde_json::to_string_pretty(data)?,
        };
        std::fs::write(path, content)?;
        self.success(&format!("✓ Output saved to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retort_core::morphing::TrailElement;
    use retort_core::LoadError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (OutputWriter::with_writer(format, false, quiet, Box::new(buffer.clone())), buffer)
    }

    fn nested_error() -> retort_core::Error {
        let price = LoadError::msg("bad price")
            .at(TrailElement::key("price"))
            .at(TrailElement::Index(2))
            .at(TrailElement::key("items"));
        let title = LoadError::msg("bad title").at(TrailElement::key("title"));
        retort_core::Error::from(LoadError::aggregate("Errors while loading", vec![price, title]))
    }

    #[test]
    fn test_problems_of_aggregate() {
        let problems = Problem::of(&nested_error());
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].path.as_deref(), Some("$.items[2].price"));
        assert_eq!(problems[0].message, "bad price");
        assert_eq!(problems[1].path.as_deref(), Some("$.title"));
    }

    #[test]
    fn test_problems_of_build_error() {
        let error = retort_core::Error::ProviderNotFound {
            request: "loader for type Book".to_string(),
            notes: Vec::new(),
        };
        let problems = Problem::of(&error);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].path, None);
    }

    #[test]
    fn test_human_messages() {
        let (mut output, buffer) = writer(OutputFormat::Human, false);
        output.info("loading").unwrap();
        output.success("done").unwrap();
        output.section("Result").unwrap();
        output.problems(&Problem::of(&nested_error())).unwrap();

        let text = buffer.contents();
        assert!(text.contains("INFO: loading"));
        assert!(text.contains("done"));
        assert!(text.contains("=== Result ==="));
        assert!(text.contains("ERROR:   ✗ $.items[2].price: bad price"));
    }

    #[test]
    fn test_quiet_suppresses_info() {
        let (mut output, buffer) = writer(OutputFormat::Human, true);
        output.info("loading").unwrap();
        output.success("done").unwrap();
        output.error("failed").unwrap();
        assert_eq!(buffer.contents(), "ERROR: failed\n");
    }

    #[test]
    fn test_machine_formats_only_carry_data() {
        let (mut output, buffer) = writer(OutputFormat::Json, false);
        output.info("loading").unwrap();
        output.value(&Value::Int(3)).unwrap();
        assert_eq!(buffer.contents(), "3\n");

        let (mut output, buffer) = writer(OutputFormat::Json, false);
        output.problems(&Problem::of(&nested_error())).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(parsed["errors"][1]["path"], "$.title");
    }

    #[test]
    fn test_yaml_data() {
        let (mut output, buffer) = writer(OutputFormat::Yaml, false);
        output.data(&serde_json::json!({"title": "F451"})).unwrap();
        assert_eq!(buffer.contents(), "title: F451\n");
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yaml");
        let (mut output, _) = writer(OutputFormat::Human, true);
        output.save(&path, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: 1\n");
    }
}
