use anyhow::Context;
use clap::Parser;
use formwork::cli::{Cli, Command};
use formwork::config::{self, render_definition, Settings};
use formwork::form::{compile, evaluate, FormConfig, FormDefinition, FormSchema};
use formwork::rules::ChainAdapter;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output can be piped
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    match &cli.command {
        Command::Check { path } => check(&settings, path.as_deref()),
        Command::Compile { definition } => {
            let schema = compile_file(&settings, definition)?;
            print_json(&schema.shape().to_json_schema())
        }
        Command::Defaults { definition } => {
            let schema = compile_file(&settings, definition)?;
            print_json(&schema.default_values())
        }
        Command::Evaluate { definition, values } => {
            let definition = load(definition)?;
            let values = read_values(values)?;
            print_json(&evaluate(&definition, &values))
        }
        Command::Validate { definition, values } => {
            let schema = compile_file(&settings, definition)?;
            let values = read_values(values)?;
            let report = schema.validate(&values);
            print_json(&report)?;
            if !report.is_valid() {
                anyhow::bail!("submission has {} issue(s)", report.issues().len());
            }
            Ok(())
        }
        Command::Convert { definition, to } => {
            let definition = load(definition)?;
            println!("{}", render_definition(&definition, *to)?);
            Ok(())
        }
        Command::DefinitionSchema => print_json(&schemars::schema_for!(FormConfig)),
    }
}

fn check(settings: &Settings, path: Option<&Path>) -> anyhow::Result<()> {
    let files = match path {
        Some(path) if path.is_dir() => config::definition_files(path)?,
        Some(path) => vec![path.to_path_buf()],
        None => match &settings.definitions.dir {
            Some(dir) => config::definition_files(dir)?,
            None => anyhow::bail!("no path given and definitions.dir is not configured"),
        },
    };

    let mut failed = 0;
    for file in &files {
        let result = config::load_definition(file)
            .map_err(anyhow::Error::from)
            .and_then(|definition| Ok(compile(definition, &ChainAdapter, settings.compile_options())?));
        match result {
            Ok(_) => println!("ok    {}", file.display()),
            Err(e) => {
                failed += 1;
                warn!(path = %file.display(), "definition rejected");
                println!("error {}\n{}", file.display(), e);
            }
        }
    }

    info!(checked = files.len(), failed, "check finished");
    if failed > 0 {
        anyhow::bail!("{} of {} definition(s) failed", failed, files.len());
    }
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<FormDefinition> {
    config::load_definition(path).with_context(|| format!("failed to load {}", path.display()))
}

fn compile_file(settings: &Settings, path: &Path) -> anyhow::Result<FormSchema> {
    let definition = load(path)?;
    compile(definition, &ChainAdapter, settings.compile_options())
        .with_context(|| format!("failed to compile {}", path.display()))
}

fn read_values(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
