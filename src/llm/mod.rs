//! Inference collaborator, prompt planning and response parsing.

pub mod client;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod strategy;

pub use client::{endpoint_url, HttpInferenceClient, InferenceBackend, InferenceError};
pub use models::{GenerationParams, ModelInfo, DEFAULT_MODEL};
pub use parse::{parse_response, parse_single_choice, ParseStage, ParsedResponse};
pub use strategy::{
    choose_strategy, estimate_tokens, format_attributes_section, plan_prompts, PromptPlan,
    PromptStrategy, PromptUnit, StrategyOptions,
};
