//! Convert command handler

use super::utils::{load_models, read_input, report_failure};
use crate::cli::{ConvertArgs, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::{value_to_json, OutputWriter};
use tracing::{debug, info, instrument};

/// Handle the convert command
///
/// The input is loaded as the source type, converted, then dumped as the
/// destination type for machine-readable output and `--save-to`.
#[instrument(skip(config, output), fields(from = %args.from, to = %args.to))]
pub fn handle_convert(args: ConvertArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let models = load_models(&args.models)?;
    let src = models.parse_type(&args.from)?;
    let dst = models.parse_type(&args.to)?;
    let retort = models.retort(config.retort_config(&args.engine));

    let converter = {
        let _timer = Timer::with_details("build_converter", &format!("{} -> {}", src, dst));
        retort
            .get_converter(src.clone(), dst.clone())
            .map_err(|err| report_failure(output, &format!("Cannot convert {} to {}", src, dst), err))?
    };
    debug!("Converter ready");

    let data = read_input(args.input.as_deref())?;
    let source = retort
        .load(&data, src.clone())
        .map_err(|err| report_failure(output, &format!("Cannot load {}", src), err))?;
    let converted = converter
        .convert(&source)
        .map_err(|err| report_failure(output, &format!("Cannot convert {} to {}", src, dst), err.into()))?;
    info!("Value converted");

    output.success(&format!("✓ Converted {} to {}", src, dst))?;
    output.section("Converted Value")?;
    let needs_data = output.format() != OutputFormat::Human || args.output_file.is_some();
    if !needs_data {
        return output.value(&converted);
    }

    let dumped = retort
        .dump(&converted, dst.clone())
        .map_err(|err| report_failure(output, &format!("Cannot dump {}", dst), err))?;
    let data = value_to_json(&dumped);
    if output.format() == OutputFormat::Human {
        output.value(&converted)?;
    } else {
        output.data(&data)?;
    }
    if let Some(path) = &args.output_file {
        output.save(path, &data)?;
    }
    Ok(())
}
