//! Check command handler

use super::utils::load_models;
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{OutputWriter, Problem};
use retort_core::{Retort, TypeExpr};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Outcome of building the callables of one type
#[derive(Debug, Serialize)]
pub struct CheckReport {
    #[serde(rename = "type")]
    pub type_name: String,
    pub loader: Vec<Problem>,
    pub dumper: Vec<Problem>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.loader.is_empty() && self.dumper.is_empty()
    }
}

fn problems<T>(built: retort_core::Result<T>) -> Vec<Problem> {
    match built {
        Ok(_) => Vec::new(),
        Err(err) => Problem::of(&err),
    }
}

/// Build a loader and a dumper for `ty`
pub fn check_type(retort: &Retort, type_name: String, ty: TypeExpr) -> CheckReport {
    CheckReport {
        loader: problems(retort.get_loader(ty.clone())),
        dumper: problems(retort.get_dumper(ty)),
        type_name,
    }
}

/// Handle the check command
#[instrument(skip(config, output), fields(models = %args.models.display()))]
pub fn handle_check(args: CheckArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::new("check_command");
    output.info(&format!("Checking models in {}", args.models.display()))?;

    let models = load_models(&args.models)?;
    let retort = models.retort(config.retort_config(&args.engine));

    let targets: Vec<(String, TypeExpr)> = if args.types.is_empty() {
        models
            .classes
            .iter()
            .map(|class| (class.name().to_string(), TypeExpr::from(class)))
            .collect()
    } else {
        args.types
            .iter()
            .map(|text| Ok((text.clone(), models.parse_type(text)?)))
            .collect::<Result<_>>()?
    };

    let reports: Vec<CheckReport> = targets
        .into_iter()
        .map(|(name, ty)| check_type(&retort, name, ty))
        .collect();

    for report in &reports {
        if report.passed() {
            output.success(&format!("✓ {}", report.type_name))?;
            continue;
        }
        warn!(type_name = %report.type_name, "Check failed");
        output.error(&format!("✗ {}", report.type_name))?;
        for (side, found) in [("loader", &report.loader), ("dumper", &report.dumper)] {
            if !found.is_empty() {
                output.error(&format!("  {}:", side))?;
                output.problems(found)?;
            }
        }
    }
    if output.format() != crate::cli::OutputFormat::Human {
        output.data(&reports)?;
    }

    let failed = reports.iter().filter(|report| !report.passed()).count();
    info!(total = reports.len(), failed, "Check finished");
    if failed > 0 {
        return Err(Error::CheckFailed {
            failed,
            total: reports.len(),
        });
    }
    output.success(&format!("✓ All {} type(s) passed", reports.len()))
}
