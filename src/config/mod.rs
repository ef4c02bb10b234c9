use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod loader;

pub use loader::{
    definition_files, load_definition, load_definitions_dir, parse_definition, render_definition, DefinitionFormat,
};

use crate::cli::Cli;
use crate::form::{CompileOptions, FormDefinition, HiddenFieldPolicy};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub compiler: CompilerSettings,
    #[serde(default)]
    pub definitions: DefinitionSettings,
}

/// How definitions are compiled and submissions validated
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompilerSettings {
    #[serde(default)]
    pub hidden_fields: HiddenFieldPolicy,
    #[serde(default = "default_true")]
    pub allow_unknown_keys: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            hidden_fields: HiddenFieldPolicy::default(),
            allow_unknown_keys: true,
        }
    }
}

/// Where definition files live
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DefinitionSettings {
    /// Directory scanned for *.json, *.yaml, *.yml and *.toml definitions;
    /// relative paths are resolved against the settings file's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (config file, then env vars, then CLI flags)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let root = cli
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut settings = Self::build(File::from(cli.config.clone()).required(false), root)?;

        // Apply CLI overrides (CLI > env vars > config file)
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Load `formwork.{toml,yaml,json}` from `root`, if present
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let root = root.as_ref();
        let settings = Self::build(File::from(root.join("formwork")).required(false), root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn build<S>(file: S, root: &Path) -> Result<Self, anyhow::Error>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let s = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("FORMWORK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        if let Some(dir) = settings.definitions.dir.take() {
            settings.definitions.dir = Some(if dir.is_relative() { root.join(dir) } else { dir });
        }
        Ok(settings)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(policy) = cli.hidden_fields {
            self.compiler.hidden_fields = policy;
        }
        if cli.strict {
            self.compiler.allow_unknown_keys = false;
        }
        if let Some(dir) = &cli.definitions_dir {
            self.definitions.dir = Some(dir.clone());
        }
    }

    /// Check settings after loading; every problem is reported at once
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let mut errors = Vec::new();
        if let Some(dir) = &self.definitions.dir {
            if dir.exists() && !dir.is_dir() {
                errors.push(format!("definitions.dir '{}' is not a directory", dir.display()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Configuration validation failed:\n{}", errors.join("\n")))
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            hidden_fields: self.compiler.hidden_fields,
            allow_unknown_keys: self.compiler.allow_unknown_keys,
        }
    }

    /// Load every definition from the configured directory (none if unset)
    pub fn load_definitions(&self) -> Result<Vec<(PathBuf, FormDefinition)>, anyhow::Error> {
        match &self.definitions.dir {
            Some(dir) => Ok(load_definitions_dir(dir)?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_root(dir.path()).unwrap();
        assert_eq!(settings.compiler, CompilerSettings::default());
        assert!(settings.definitions.dir.is_none());
        assert_eq!(settings.compile_options(), CompileOptions::default());
    }

    #[test]
    fn test_file_and_relative_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("formwork.toml"),
            "[compiler]\nhidden_fields = \"skip-required\"\nallow_unknown_keys = false\n\n[definitions]\ndir = \"forms\"\n",
        )
        .unwrap();

        let settings = Settings::from_root(dir.path()).unwrap();
        assert_eq!(settings.compiler.hidden_fields, HiddenFieldPolicy::SkipRequired);
        assert!(!settings.compiler.allow_unknown_keys);
        assert_eq!(settings.definitions.dir, Some(dir.path().join("forms")));
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("custom.toml");
        std::fs::write(&config, "[compiler]\nhidden_fields = \"skip\"\n").unwrap();

        let cli = Cli::parse_from([
            "formwork",
            "--config",
            config.to_str().unwrap(),
            "--hidden-fields",
            "enforce",
            "--strict",
            "definition-schema",
        ]);
        let settings = Settings::new_with_cli(&cli).unwrap();
        assert_eq!(settings.compiler.hidden_fields, HiddenFieldPolicy::Enforce);
        assert!(!settings.compiler.allow_unknown_keys);
    }

    #[test]
    fn test_dir_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("forms"), "not a dir").unwrap();
        std::fs::write(dir.path().join("formwork.toml"), "[definitions]\ndir = \"forms\"\n").unwrap();

        let err = Settings::from_root(dir.path()).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }
}
