//! Command handlers for CLI subcommands
//!
//! Each subcommand lives in its own module; shared input handling is in
//! `utils`.

mod check;
mod completions;
mod convert;
mod morph;
mod utils;

pub use check::handle_check;
pub use completions::handle_completions;
pub use convert::handle_convert;
pub use morph::{handle_dump, handle_load, handle_roundtrip};
