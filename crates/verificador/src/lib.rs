//! Verificador: command-line front end for the verifica page checker
//!
//! ## Usage
//!
//! ```bash
//! verificador init                          # write verifica.yaml
//! verificador list                          # show scenarios
//! verificador run --url http://localhost:3000
//! verificador run --only focus-order --format json
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, InitArgs, ListArgs, OutputFormat, RunArgs};
pub use config::{CliConfig, ColorChoice, Overrides, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::{format_duration, JsonReport, JsonScenario, RunProgress, TextReport};
pub use runner::{ScenarioRunner, SUITE_NAME};
