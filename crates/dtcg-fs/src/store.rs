//! Format-agnostic document loading and saving

use crate::{Error, NormalizedPath, Result, io};
use serde::{Serialize, de::DeserializeOwned};

/// Serialization format of a document, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Detect the format from a path's extension.
    ///
    /// - `.json`, `.tokens` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    pub fn detect(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        match extension.to_lowercase().as_str() {
            "json" | "tokens" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
        }
    }
}

/// Format-agnostic document store.
///
/// Detects the format from the file extension and handles
/// serialization/deserialization transparently.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentStore;

impl DocumentStore {
    pub fn new() -> Self {
        Self
    }

    /// Load and decode a document.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = DocumentFormat::detect(path)?;
        let content = io::read_text(path)?;
        Self::decode(path, format, &content)
    }

    /// Decode `content` as `format`, attributing errors to `path`.
    pub fn decode<T: DeserializeOwned>(
        path: &NormalizedPath,
        format: DocumentFormat,
        content: &str,
    ) -> Result<T> {
        let parse_error = |message: String| Error::DocumentParse {
            path: path.to_native(),
            format: format.name().into(),
            message,
        };
        match format {
            DocumentFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))
            }
            DocumentFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))
            }
            DocumentFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Save a document, format determined from the file extension.
    ///
    /// Uses atomic write to prevent corruption.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let format = DocumentFormat::detect(path)?;
        let serialize_error = |message: String| Error::DocumentSerialize {
            path: path.to_native(),
            format: format.name().into(),
            message,
        };

        let content = match format {
            DocumentFormat::Json => {
                serde_json::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
            }
            DocumentFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string()))?
            }
            DocumentFormat::Toml => {
                toml::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
            }
        };

        io::write_atomic(path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn detect_format_from_extension() {
        assert_eq!(
            DocumentFormat::detect(&NormalizedPath::new("a/colors.tokens")).unwrap(),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::detect(&NormalizedPath::new("theme.yml")).unwrap(),
            DocumentFormat::Yaml
        );
        assert!(DocumentFormat::detect(&NormalizedPath::new("notes.txt")).is_err());
    }

    #[test]
    fn save_then_load_json_document() {
        let dir = TempDir::new().unwrap();
        let path = NormalizedPath::new(dir.path().join("out").join("tokens.json"));
        let doc = json!({"color": {"primary": {"$value": "#fff", "$type": "color"}}});

        let store = DocumentStore::new();
        store.save(&path, &doc).unwrap();
        let loaded: Value = store.load(&path).unwrap();

        assert_eq!(loaded, doc);
    }

    #[test]
    fn yaml_documents_decode_to_json_values() {
        let path = NormalizedPath::new("theme.yaml");
        let value: Value = DocumentStore::decode(
            &path,
            DocumentFormat::Yaml,
            "size:\n  small:\n    $value: 4px\n",
        )
        .unwrap();
        assert_eq!(value["size"]["small"]["$value"], "4px");
    }
}
