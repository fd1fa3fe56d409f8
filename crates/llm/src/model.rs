use std::path::Path;

use snafu::{ResultExt, ensure};

use crate::provider::{EmptyModelListSnafu, ModelPayloadParseSnafu, ProviderResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl Model {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), id)
    }

    /// Names a model after its weights file, the way llama.cpp servers report it.
    pub fn from_path(path: &Path) -> Self {
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_id(id).with_description(path.display().to_string())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCatalogSource {
    ProviderApi,
    StaticFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    pub models: Vec<Model>,
    pub source: ModelCatalogSource,
    pub warning: Option<String>,
}

impl ModelCatalog {
    pub fn from_provider_api(models: Vec<Model>) -> Self {
        Self {
            models,
            source: ModelCatalogSource::ProviderApi,
            warning: None,
        }
    }

    pub fn from_static_fallback(models: Vec<Model>, warning: String) -> Self {
        Self {
            models,
            source: ModelCatalogSource::StaticFallback,
            warning: Some(warning),
        }
    }
}

/// Extracts model identifiers from an OpenAI-style `GET /models` payload.
///
/// Accepts both `{"data": [{"id": ..}]}` and llama.cpp's `{"models": [{"model": ..}]}`.
pub fn parse_model_ids(payload: &str) -> ProviderResult<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(payload).context(ModelPayloadParseSnafu {
        stage: "parse-model-response",
    })?;

    let mut ids = ["data", "models"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|list| list.as_array()))
        .flatten()
        .filter_map(|entry| {
            entry
                .get("id")
                .or_else(|| entry.get("model"))
                .and_then(|id| id.as_str())
        })
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    ids.sort();
    ids.dedup();

    ensure!(
        !ids.is_empty(),
        EmptyModelListSnafu {
            stage: "parse-model-response",
        }
    );
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::provider::ProviderError;

    #[test]
    fn model_from_path_uses_file_name() {
        let model = Model::from_path(&PathBuf::from("./models/Qwen3-8B-Q8_0.gguf"));

        assert_eq!(model.id, "Qwen3-8B-Q8_0.gguf");
        assert_eq!(model.description.as_deref(), Some("./models/Qwen3-8B-Q8_0.gguf"));
    }

    #[test]
    fn parses_openai_and_llama_cpp_model_lists() {
        let payload = r#"{
            "object": "list",
            "data": [{"id": "Qwen3-8B-Q8_0.gguf"}, {"id": " "}],
            "models": [{"model": "Qwen3-8B-Q8_0.gguf"}, {"model": "other.gguf"}]
        }"#;

        let ids = parse_model_ids(payload).unwrap();
        assert_eq!(ids, vec!["Qwen3-8B-Q8_0.gguf", "other.gguf"]);
    }

    #[test]
    fn rejects_payloads_without_models() {
        assert!(matches!(
            parse_model_ids(r#"{"data": []}"#),
            Err(ProviderError::EmptyModelList { .. })
        ));
        assert!(matches!(
            parse_model_ids("<html>"),
            Err(ProviderError::ModelPayloadParse { .. })
        ));
    }
}
