use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use tower_lsp::lsp_types::InitializeParams;

/// Workspace configuration, read from an optional `ssl.toml` at the
/// workspace root. Missing or malformed files fall back to defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SslConfig {
    pub completion: CompletionConfig,
    pub diagnostics: DiagnosticsConfig,
    /// Extra directories searched for `#include` paths, on top of the
    /// including file's own directory.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub include_paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub enabled: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub fn find_workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    if let Some(folders) = &params.workspace_folders {
        for folder in folders {
            if let Ok(path) = folder.uri.to_file_path() {
                return Some(path);
            }
        }
    }

    if let Some(root_uri) = &params.root_uri
        && let Ok(path) = root_uri.to_file_path()
    {
        return Some(path);
    }

    None
}

pub async fn load_from_workspace_root(root: Option<&Path>) -> SslConfig {
    let Some(root) = root else {
        return SslConfig::default();
    };

    let path = root.join("ssl.toml");
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => match toml::from_str::<SslConfig>(&contents) {
            Ok(config) => config,
            Err(err) => {
                debug!("ignoring malformed {}: {err}", path.display());
                SslConfig::default()
            }
        },
        Err(_) => SslConfig::default(),
    }
}

fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<StringOrVec>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrVec::One(one)) => vec![one],
        Some(StringOrVec::Many(many)) => many,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let config = SslConfig::default();
        assert!(config.completion.enabled);
        assert!(config.diagnostics.enabled);
        assert!(config.include_paths.is_empty());
    }

    #[test]
    fn parses_feature_gates_and_paths() {
        let config: SslConfig = toml::from_str(
            r#"
            include_paths = ["headers", "shared/headers"]

            [diagnostics]
            enabled = false
            "#,
        )
        .expect("parse config");

        assert!(!config.diagnostics.enabled);
        assert!(config.completion.enabled);
        assert_eq!(config.include_paths, vec!["headers", "shared/headers"]);
    }

    #[test]
    fn include_paths_accept_a_single_string() {
        let config: SslConfig =
            toml::from_str(r#"include_paths = "headers""#).expect("parse config");
        assert_eq!(config.include_paths, vec!["headers"]);
    }
}
