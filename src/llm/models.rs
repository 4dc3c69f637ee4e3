use serde::{Deserialize, Serialize};

/// Model identifier used when a request does not name one.
pub const DEFAULT_MODEL: &str = "bielik-1.5b-gguf";

/// Sampling parameters forwarded to the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_new_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_new_tokens: 200,
            top_p: 0.9,
        }
    }
}

/// Body of `POST /generate`.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl<'a> GenerateRequest<'a> {
    pub fn new(model: &'a str, prompt: &'a str, params: &GenerationParams) -> Self {
        Self {
            model,
            prompt,
            max_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    /// Some deployments answer `generated_text` instead of `text`.
    #[serde(alias = "generated_text")]
    pub text: String,
}

/// One entry of `GET /models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(alias = "name")]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// `GET /models` answers either a bare list or `{"models": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ModelsResponse {
    Wrapped { models: Vec<ModelInfo> },
    Bare(Vec<ModelInfo>),
}

impl ModelsResponse {
    pub fn into_models(self) -> Vec<ModelInfo> {
        match self {
            ModelsResponse::Wrapped { models } | ModelsResponse::Bare(models) => models,
        }
    }
}
