//! Load, dump and roundtrip command handlers

use super::utils::{load_models, read_input, report_failure};
use crate::cli::MorphArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{value_to_json, OutputWriter};
use retort_core::{Retort, TypeExpr, Value};
use tracing::{debug, info, instrument};

/// Models, engine and input shared by the morphing commands
struct Morph {
    retort: Retort,
    ty: TypeExpr,
    data: Value,
}

impl Morph {
    fn prepare(args: &MorphArgs, config: &Config) -> Result<Self> {
        let models = load_models(&args.models)?;
        let ty = models.parse_type(&args.type_expr)?;
        let retort = models.retort(config.retort_config(&args.engine));
        let data = read_input(args.input.as_deref())?;
        debug!(type_expr = %ty, "Input ready");
        Ok(Morph { retort, ty, data })
    }

    fn load(&self, output: &mut OutputWriter) -> Result<Value> {
        let _timer = Timer::with_details("load", &self.ty.to_string());
        self.retort
            .load(&self.data, self.ty.clone())
            .map_err(|err| report_failure(output, &format!("Cannot load {}", self.ty), err))
    }

    fn dump(&self, value: &Value, output: &mut OutputWriter) -> Result<Value> {
        let _timer = Timer::with_details("dump", &self.ty.to_string());
        self.retort
            .dump(value, self.ty.clone())
            .map_err(|err| report_failure(output, &format!("Cannot dump {}", self.ty), err))
    }
}

/// Handle the load command
#[instrument(skip(config, output), fields(type_expr = %args.type_expr))]
pub fn handle_load(args: MorphArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let morph = Morph::prepare(&args, config)?;
    let value = morph.load(output)?;
    info!("Input loaded");

    output.success(&format!("✓ Loaded {}", morph.ty))?;
    output.section("Loaded Value")?;
    output.value(&value)?;

    if let Some(path) = &args.output_file {
        output.save(path, &value_to_json(&value))?;
    }
    Ok(())
}

/// Handle the dump command
#[instrument(skip(config, output), fields(type_expr = %args.type_expr))]
pub fn handle_dump(args: MorphArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let morph = Morph::prepare(&args, config)?;
    let value = morph.load(output)?;
    let dumped = morph.dump(&value, output)?;
    info!("Input loaded and dumped");

    let data = value_to_json(&dumped);
    output.section("Dumped Data")?;
    output.data(&data)?;

    if let Some(path) = &args.output_file {
        output.save(path, &data)?;
    }
    Ok(())
}

/// Handle the roundtrip command
#[instrument(skip(config, output), fields(type_expr = %args.type_expr))]
pub fn handle_roundtrip(args: MorphArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let morph = Morph::prepare(&args, config)?;
    let value = morph.load(output)?;
    let dumped = morph.dump(&value, output)?;
    let unchanged = dumped == morph.data;
    info!(unchanged, "Round trip finished");

    if output.format() != crate::cli::OutputFormat::Human {
        output.data(&serde_json::json!({
            "type": morph.ty.to_string(),
            "unchanged": unchanged,
            "dumped": value_to_json(&dumped),
        }))?;
    }
    if let Some(path) = &args.output_file {
        output.save(path, &value_to_json(&dumped))?;
    }

    if unchanged {
        return output.success(&format!("✓ {} survived the round trip unchanged", morph.ty));
    }
    output.warning(&format!("⚠ Dumping the loaded {} changed the data", morph.ty))?;
    output.section("Input")?;
    output.value(&morph.data)?;
    output.section("Dumped")?;
    output.value(&dumped)?;
    Err(Error::other(format!("round trip of {} changed the data", morph.ty)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{EngineArgs, OutputFormat};
    use std::io::Write;
    use std::path::{Path, PathBuf};

    const MODELS: &str = r#"
models:
  - name: Event
    fields:
      - { name: event_name, type: str }
      - { name: count, type: int, default: 1 }
    name_mapping:
      name_style: camelCase
"#;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn args(dir: &Path, input: &str, lax: bool) -> MorphArgs {
        MorphArgs {
            models: write_file(dir, "models.yaml", MODELS),
            type_expr: "Event".to_string(),
            input: Some(write_file(dir, "input.json", input)),
            output_file: Some(dir.join("out.json")),
            engine: EngineArgs {
                lax,
                debug_trail: None,
            },
        }
    }

    fn quiet_output() -> OutputWriter {
        OutputWriter::with_writer(OutputFormat::Json, false, true, Box::new(std::io::sink()))
    }

    fn saved(dir: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(dir.join("out.json")).unwrap()).unwrap()
    }

    #[test]
    fn test_dump_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), r#"{"eventName": "launch"}"#, false);
        handle_dump(args, &Config::default(), &mut quiet_output()).unwrap();
        assert_eq!(saved(dir.path()), serde_json::json!({"eventName": "launch", "count": 1}));
    }

    #[test]
    fn test_roundtrip_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), r#"{"eventName": "launch", "count": 3}"#, false);
        handle_roundtrip(args, &Config::default(), &mut quiet_output()).unwrap();
    }

    #[test]
    fn test_roundtrip_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), r#"{"eventName": "launch", "count": "3"}"#, true);
        let err = handle_roundtrip(args, &Config::default(), &mut quiet_output()).unwrap_err();
        assert!(matches!(err, Error::Other { .. }));
        assert_eq!(saved(dir.path())["count"], 3);
    }

    #[test]
    fn test_load_failure_is_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), r#"{"eventName": 5}"#, false);
        let err = handle_load(args, &Config::default(), &mut quiet_output()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
