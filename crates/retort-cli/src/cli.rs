//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Retort CLI - build loaders, dumpers and converters for declared models
///
/// Models are declared in a YAML, JSON or TOML file. Every command builds
/// its callables from a retort configured by that file and by the CLI
/// configuration.
#[derive(Parser, Debug)]
#[command(
    name = "retort",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "RETORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a loader and a dumper for every declared model
    Check(CheckArgs),

    /// Load input data as a declared type and print the model value
    Load(MorphArgs),

    /// Load input data, then dump the model value back to data
    Dump(MorphArgs),

    /// Load and dump input data, reporting whether it survived unchanged
    Roundtrip(MorphArgs),

    /// Load input data as one type and convert it into another
    Convert(ConvertArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Engine settings shared by the morphing commands
#[derive(Parser, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Accept lax input (numeric strings, int-like floats, ...)
    #[arg(long)]
    pub lax: bool,

    /// How much error trail information to collect
    #[arg(long, value_enum)]
    pub debug_trail: Option<DebugTrailArg>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the model declarations (YAML, JSON or TOML)
    #[arg(value_name = "MODELS")]
    pub models: PathBuf,

    /// Check only these types (type expressions, e.g. `list[Book]`)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the load, dump and roundtrip commands
#[derive(Parser, Debug)]
pub struct MorphArgs {
    /// Path to the model declarations (YAML, JSON or TOML)
    #[arg(value_name = "MODELS")]
    pub models: PathBuf,

    /// Type expression to load, e.g. `Book` or `list[Book]`
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub type_expr: String,

    /// Input data file (stdin if not specified)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output file path (stdout if not specified)
    #[arg(long = "save-to")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the convert command
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Path to the model declarations (YAML, JSON or TOML)
    #[arg(value_name = "MODELS")]
    pub models: PathBuf,

    /// Source type expression
    #[arg(long, value_name = "TYPE")]
    pub from: String,

    /// Destination type expression
    #[arg(long, value_name = "TYPE")]
    pub to: String,

    /// Input data file holding the source value (stdin if not specified)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output file path (stdout if not specified)
    #[arg(long = "save-to")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Error trail collection mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DebugTrailArg {
    /// Raise the first error without a trail
    Disable,
    /// Raise the first error with its trail
    First,
    /// Collect every error
    All,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl From<DebugTrailArg> for retort_core::DebugTrail {
    fn from(mode: DebugTrailArg) -> Self {
        match mode {
            DebugTrailArg::Disable => retort_core::DebugTrail::Disable,
            DebugTrailArg::First => retort_core::DebugTrail::First,
            DebugTrailArg::All => retort_core::DebugTrail::All,
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
