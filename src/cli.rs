use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DefinitionFormat;
use crate::form::HiddenFieldPolicy;

/// Dynamic form engine - check, compile and evaluate form definitions
#[derive(Parser, Debug, Clone)]
#[command(name = "formwork", version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file
    #[arg(short, long, env = "FORMWORK_CONFIG", default_value = "formwork.toml")]
    pub config: PathBuf,

    /// How validation treats fields hidden by a dependency
    #[arg(long, value_enum, env = "FORMWORK_HIDDEN_FIELDS")]
    pub hidden_fields: Option<HiddenFieldPolicy>,

    /// Report keys that no field declares
    #[arg(long)]
    pub strict: bool,

    /// Directory of definition files used when a command gets no path
    #[arg(long, env = "FORMWORK_DEFINITIONS_DIR")]
    pub definitions_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Check definition files (a file, a directory, or the configured directory)
    Check {
        path: Option<PathBuf>,
    },
    /// Print the JSON Schema of the values a definition produces
    Compile {
        definition: PathBuf,
    },
    /// Print the initial (empty) values of a definition
    Defaults {
        definition: PathBuf,
    },
    /// Print hidden fields and active options for a set of values
    Evaluate {
        definition: PathBuf,
        /// JSON file with the current values
        #[arg(long)]
        values: PathBuf,
    },
    /// Validate a submission; exits with an error if it is invalid
    Validate {
        definition: PathBuf,
        /// JSON file with the submitted values
        #[arg(long)]
        values: PathBuf,
    },
    /// Rewrite a definition in another format
    Convert {
        definition: PathBuf,
        #[arg(long, value_enum)]
        to: DefinitionFormat,
    },
    /// Print the JSON Schema of the definition file format
    DefinitionSchema,
}
