//! Reading and writing definition files (JSON, YAML, TOML)

use std::path::{Path, PathBuf};

use crate::error::{DefinitionError, FormError, FormResult};
use crate::form::{FormConfig, FormDefinition};

/// File format of a definition, chosen by extension
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DefinitionFormat {
    Json,
    Yaml,
    Toml,
}

impl DefinitionFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parse a definition, rejecting trees that violate the construction rules
pub fn parse_definition(content: &str, format: DefinitionFormat) -> FormResult<FormDefinition> {
    let config: FormConfig = match format {
        DefinitionFormat::Json => serde_json::from_str(content)?,
        // Conditions are written as single-key maps (`when: { notEquals: US }`), not YAML tags
        DefinitionFormat::Yaml => {
            serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(content))?
        }
        DefinitionFormat::Toml => toml::from_str(content)?,
    };
    Ok(FormDefinition::from_config(config)?)
}

/// Serialize a definition; fails for prebuilt validators and native conditions
pub fn render_definition(definition: &FormDefinition, format: DefinitionFormat) -> FormResult<String> {
    let config = definition
        .to_config()
        .map_err(|e| FormError::Definition(DefinitionError(vec![e])))?;
    let rendered = match format {
        DefinitionFormat::Json => serde_json::to_string_pretty(&config)?,
        DefinitionFormat::Yaml => {
            let mut buffer = Vec::new();
            let mut serializer = serde_yaml::Serializer::new(&mut buffer);
            serde_yaml::with::singleton_map_recursive::serialize(&config, &mut serializer)?;
            String::from_utf8_lossy(&buffer).into_owned()
        }
        DefinitionFormat::Toml => toml::to_string_pretty(&config)?,
    };
    Ok(rendered)
}

/// Load one definition file
pub fn load_definition(path: impl AsRef<Path>) -> FormResult<FormDefinition> {
    let path = path.as_ref();
    let format = DefinitionFormat::from_path(path)
        .ok_or_else(|| FormError::UnsupportedFormat(path.display().to_string()))?;
    let content = std::fs::read_to_string(path)?;
    let definition = parse_definition(&content, format)?;
    tracing::debug!(path = %path.display(), fields = definition.list_fields().len(), "loaded form definition");
    Ok(definition)
}

/// Definition files directly inside `dir`, sorted by path
pub fn definition_files(dir: impl AsRef<Path>) -> FormResult<Vec<PathBuf>> {
    let pattern = format!("{}/*", dir.as_ref().display());
    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if DefinitionFormat::from_path(&path).is_some() => files.push(path),
            Ok(path) => tracing::debug!(path = %path.display(), "skipping non-definition file"),
            Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Load every definition file in `dir`; the first invalid file aborts
pub fn load_definitions_dir(dir: impl AsRef<Path>) -> FormResult<Vec<(PathBuf, FormDefinition)>> {
    definition_files(dir)?
        .into_iter()
        .map(|path| load_definition(&path).map(|definition| (path, definition)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
id: shipping
fields:
  - key: country
    type: select
    options:
      - { label: United States, value: US }
      - { label: Canada, value: CA }
  - key: state
    type: input
    dependencies:
      - sourceField: country
        type: HIDES
        when: { notEquals: US }
"#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DefinitionFormat::from_path(Path::new("a/b.yml")), Some(DefinitionFormat::Yaml));
        assert_eq!(DefinitionFormat::from_path(Path::new("b.JSON")), Some(DefinitionFormat::Json));
        assert_eq!(DefinitionFormat::from_path(Path::new("b.txt")), None);
        assert_eq!(DefinitionFormat::from_path(Path::new("b")), None);
    }

    #[test]
    fn test_parse_yaml() {
        let definition = parse_definition(YAML, DefinitionFormat::Yaml).unwrap();
        assert_eq!(definition.id(), Some("shipping"));
        assert_eq!(definition.list_fields().len(), 2);
    }

    #[test]
    fn test_render_round_trip_through_every_format() {
        let definition = parse_definition(YAML, DefinitionFormat::Yaml).unwrap();
        for format in [DefinitionFormat::Json, DefinitionFormat::Yaml, DefinitionFormat::Toml] {
            let rendered = render_definition(&definition, format).unwrap();
            let parsed = parse_definition(&rendered, format).unwrap();
            assert_eq!(parsed, definition, "{:?}", format);
        }
    }

    #[test]
    fn test_yaml_conditions_render_as_maps() {
        let definition = parse_definition(YAML, DefinitionFormat::Yaml).unwrap();
        let rendered = render_definition(&definition, DefinitionFormat::Yaml).unwrap();
        assert!(rendered.contains("notEquals: US"), "{}", rendered);
        assert!(!rendered.contains('!'), "{}", rendered);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_definition("form.txt").unwrap_err();
        assert!(matches!(err, FormError::UnsupportedFormat(_)));
    }
}
