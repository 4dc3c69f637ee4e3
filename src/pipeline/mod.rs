//! Gap-fill orchestration.
//!
//! One item runs as a straight sequence: normalize, detect, plan prompts,
//! call the inference backend (the only await point), parse, correct case
//! agreement, reconstruct and validate. Items of a batch share nothing but
//! read-only tables, so they run concurrently and fail independently.

pub mod schema;

pub use schema::{
    BatchStatus, EnhancementItem, EnhancementOptions, EnhancementRequest, EnhancementResponse,
    GapCount, GapCountReport, GapFill, ItemStatus, ProcessedItem, RequestError,
};

use crate::config::Config;
use crate::domain::{DomainConfig, DomainRegistry};
use crate::fill::{choices, FillChoice, FillSet};
use crate::gap::{
    detect_markers, extract_contexts, normalize_text, normalize_to_tagged, GapContext, GapMarker,
    Notation, NotationMode,
};
use crate::grammar::{apply_case_agreement, CaseCorrection};
use crate::guardrails::{self, Limits};
use crate::llm::{
    choose_strategy, parse_response, parse_single_choice, plan_prompts, GenerationParams,
    InferenceBackend, InferenceError, PromptPlan, PromptStrategy, StrategyOptions,
};
use crate::reconstruct::reconstruct;
use crate::util::preview;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;

/// Why an item produced no text. Both are fatal for that item only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// The service did not answer.
    #[error(transparent)]
    Inference(#[from] InferenceError),
    /// The service answered, but nothing usable could be read from it.
    #[error("no usable fills in model output: {preview}")]
    Parse { preview: String },
}

impl ItemError {
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Inference(_) => "inference",
            ItemError::Parse { .. } => "parse",
        }
    }
}

/// Outcome of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementResult {
    pub id: String,
    pub original_text: String,
    /// Text the markers were detected in (normalized and/or retagged).
    pub working_text: String,
    pub markers: Vec<GapMarker>,
    pub final_text: Option<String>,
    pub fills: Vec<FillChoice>,
    pub corrections: Vec<CaseCorrection>,
    pub status: ItemStatus,
    pub issues: Vec<String>,
    pub strategy: Option<PromptStrategy>,
    pub error: Option<ItemError>,
}

impl EnhancementResult {
    fn failed(
        id: &str,
        original: &str,
        working: String,
        markers: Vec<GapMarker>,
        strategy: PromptStrategy,
        error: ItemError,
    ) -> Self {
        Self {
            id: id.to_string(),
            original_text: original.to_string(),
            working_text: working,
            markers,
            final_text: None,
            fills: Vec::new(),
            corrections: Vec::new(),
            status: ItemStatus::Error,
            issues: Vec::new(),
            strategy: Some(strategy),
            error: Some(error),
        }
    }
}

impl From<EnhancementResult> for ProcessedItem {
    fn from(result: EnhancementResult) -> Self {
        let gaps = result
            .fills
            .iter()
            .map(|fill| {
                let marker = result
                    .markers
                    .iter()
                    .find(|m| m.index == fill.index)
                    .map(|m| m.literal(&result.working_text).to_string())
                    .unwrap_or_else(|| format!("[GAP:{}]", fill.index));
                GapFill {
                    index: fill.index,
                    marker,
                    choice: fill.choice.clone(),
                    alternatives: fill.alternatives.clone(),
                }
            })
            .collect();

        ProcessedItem {
            id: result.id,
            status: result.status,
            filled_text: result.final_text,
            gaps,
            corrections: result.corrections,
            issues: result.issues,
            error_kind: result.error.as_ref().map(ItemError::kind),
            error: result.error.map(|e| e.to_string()),
        }
    }
}

/// Per-request settings shared by every item of a batch.
#[derive(Debug, Clone)]
pub struct ItemContext {
    pub domain: Arc<DomainConfig>,
    pub model: String,
    pub params: GenerationParams,
    pub options: EnhancementOptions,
    pub limits: Limits,
}

pub struct Pipeline<B> {
    backend: B,
    config: Config,
    registry: Arc<DomainRegistry>,
    call_timeout: Duration,
}

impl<B: InferenceBackend> Pipeline<B> {
    pub fn new(backend: B, config: Config, registry: Arc<DomainRegistry>) -> Self {
        let call_timeout = Duration::from_secs(config.timeout_secs);
        Self {
            backend,
            config,
            registry,
            call_timeout,
        }
    }

    /// Override the per-call timeout taken from the config.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve domain, limits and generation parameters for a request.
    pub fn context_for(&self, request: &EnhancementRequest) -> Result<ItemContext, RequestError> {
        request.validate()?;
        let domain = self.registry.get(&request.domain)?;
        let limits = Limits::resolve(&self.config, &domain);
        Ok(ItemContext {
            domain,
            model: request.model.clone(),
            params: request.options.generation_params(),
            options: request.options.clone(),
            limits,
        })
    }

    /// Process every item of `request`, at most `max_concurrency` at a time.
    /// Only a malformed request is an error; item failures are reported per
    /// item.
    pub async fn process_batch(
        &self,
        request: &EnhancementRequest,
    ) -> Result<EnhancementResponse, RequestError> {
        let started = Instant::now();
        let ctx = self.context_for(request)?;
        tracing::info!(
            items = request.items.len(),
            domain = %ctx.domain.name,
            model = %ctx.model,
            "processing batch"
        );

        let items: Vec<ProcessedItem> = stream::iter(&request.items)
            .map(|item| self.process_item(item, &ctx))
            .buffered(self.config.concurrency())
            .map(ProcessedItem::from)
            .collect()
            .await;

        let status = BatchStatus::aggregate(items.iter().map(|item| &item.status));
        let processing_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            status = ?status,
            items = items.len(),
            elapsed_ms = processing_time_ms,
            "batch finished"
        );

        Ok(EnhancementResponse {
            domain: ctx.domain.name.clone(),
            model: ctx.model,
            items,
            processing_time_ms,
            status,
        })
    }

    pub async fn process_item(
        &self,
        item: &EnhancementItem,
        ctx: &ItemContext,
    ) -> EnhancementResult {
        let original = item.text_with_gaps.as_str();
        let (text, markers) = prepare_text(original, &ctx.options);

        let strategy_options = StrategyOptions {
            token_threshold: self.config.token_threshold,
            batched_max_markers: self.config.batched_max_markers,
            context_window: self.config.context_window,
            alternatives: self.alternatives_wanted(&ctx.options),
        };

        let mut fills = FillSet::new();
        let mut strategy = None;
        if !markers.is_empty() {
            let plan = plan_prompts(
                &text,
                &markers,
                item.attributes.as_ref(),
                &ctx.domain,
                &strategy_options,
            );
            tracing::debug!(
                item = %item.id,
                strategy = plan.strategy.as_str(),
                prompts = plan.units.len(),
                markers = markers.len(),
                "planned prompts"
            );
            strategy = Some(plan.strategy);

            match self.run_plan(&item.id, &plan, ctx).await {
                Ok(parsed) => fills = parsed,
                Err(error) => {
                    tracing::warn!(item = %item.id, kind = error.kind(), "item failed: {}", error);
                    return EnhancementResult::failed(
                        &item.id,
                        original,
                        text,
                        markers,
                        plan.strategy,
                        error,
                    );
                }
            }
        }

        let mut fills = align_to_markers(fills, &markers, &item.id);
        retain_known(&mut fills, &markers, &item.id);
        for fill in fills.values_mut() {
            fill.alternatives.truncate(strategy_options.alternatives);
        }

        let corrections = if self.config.enable_grammar_fix {
            apply_case_agreement(
                &text,
                &markers,
                &mut fills,
                &ctx.domain,
                self.config.context_window,
            )
        } else {
            Vec::new()
        };

        let final_text = reconstruct(&text, &markers, &choices(&fills));
        let fills: Vec<FillChoice> = fills.into_values().collect();

        let mut status = ItemStatus::Ok;
        let mut issues = Vec::new();
        let missing: Vec<String> = markers
            .iter()
            .filter(|m| !fills.iter().any(|f| f.index == m.index))
            .map(|m| m.index.to_string())
            .collect();
        if !missing.is_empty() {
            status = ItemStatus::Warning;
            issues.push(format!("No fill for gap(s) {}", missing.join(", ")));
        }

        if self.config.enable_guardrails {
            let report = guardrails::validate(
                &final_text,
                original,
                &fills,
                &ctx.domain,
                &ctx.limits,
                self.config.validation_level,
            );
            if !report.is_valid {
                status = ItemStatus::Warning;
            }
            if !report.errors.is_empty() || !report.warnings.is_empty() {
                tracing::info!(
                    item = %item.id,
                    valid = report.is_valid,
                    errors = report.errors.len(),
                    warnings = report.warnings.len(),
                    "guardrails flagged item"
                );
            }
            issues.extend(report.issues());
        }

        EnhancementResult {
            id: item.id.clone(),
            original_text: original.to_string(),
            working_text: text,
            markers,
            final_text: Some(final_text),
            fills,
            corrections,
            status,
            issues,
            strategy,
            error: None,
        }
    }

    fn alternatives_wanted(&self, options: &EnhancementOptions) -> usize {
        (options.top_n_per_gap.saturating_sub(1) as usize).min(self.config.max_alternatives)
    }

    async fn run_plan(
        &self,
        id: &str,
        plan: &PromptPlan,
        ctx: &ItemContext,
    ) -> Result<FillSet, ItemError> {
        match plan.strategy {
            PromptStrategy::Batched => {
                let mut fills = FillSet::new();
                for unit in &plan.units {
                    let raw = self.call(id, &unit.prompt, ctx).await?;
                    let parsed = parse_response(&raw).ok_or_else(|| ItemError::Parse {
                        preview: preview(&raw),
                    })?;
                    tracing::debug!(
                        item = %id,
                        stage = ?parsed.stage,
                        fills = parsed.fills.len(),
                        "parsed response"
                    );
                    fills.extend(parsed.fills);
                }
                Ok(fills)
            }
            PromptStrategy::PerGap => {
                let calls = plan.units.iter().map(|unit| async move {
                    let raw = self.call(id, &unit.prompt, ctx).await;
                    (unit.marker, raw)
                });
                let answers = join_all(calls).await;

                let mut fills = FillSet::new();
                let mut unusable = Vec::new();
                for (marker, raw) in answers {
                    let raw = raw?;
                    let Some(index) = marker else { continue };
                    match parse_single_choice(&raw, self.config.max_fill_length) {
                        Some(choice) => {
                            fills.insert(index, FillChoice::new(index, choice));
                        }
                        None => {
                            tracing::debug!(item = %id, gap = index, "unusable per-gap answer");
                            unusable.push(raw);
                        }
                    }
                }
                if fills.is_empty() {
                    let raw = unusable.first().map(String::as_str).unwrap_or_default();
                    return Err(ItemError::Parse { preview: preview(raw) });
                }
                Ok(fills)
            }
        }
    }

    /// One inference call, bounded by the call timeout.
    async fn call(
        &self,
        id: &str,
        prompt: &str,
        ctx: &ItemContext,
    ) -> Result<String, InferenceError> {
        if self.config.log_requests {
            tracing::debug!(item = %id, prompt = %prompt, "inference request");
        }
        let raw = timeout(
            self.call_timeout,
            self.backend.generate(&ctx.model, prompt, &ctx.params),
        )
        .await
        .map_err(|_| InferenceError::Timeout(self.call_timeout.as_secs()))??;
        if self.config.log_responses {
            tracing::debug!(item = %id, response = %raw, "inference response");
        }
        Ok(raw)
    }
}

/// Apply optional normalization, detect markers, and retag underscore runs
/// so prompts can refer to gaps by number.
fn prepare_text(original: &str, options: &EnhancementOptions) -> (String, Vec<GapMarker>) {
    let text = if options.normalize_text {
        normalize_text(original)
    } else {
        original.to_string()
    };
    let markers = detect_markers(&text, options.gap_notation);
    let only_underscores = !markers.is_empty()
        && markers.iter().all(|m| m.notation == Notation::Underscore)
        && detect_markers(&text, NotationMode::Tagged).is_empty();
    if only_underscores {
        return normalize_to_tagged(&text);
    }
    (text, markers)
}

/// Renumber fills that came back as list positions `1..=k` instead of gap
/// numbers: the k-th fill goes to the k-th marker in index order. Fills are
/// left alone when every index names a marker, or when the indices are not a
/// plain `1..=k` run.
fn align_to_markers(fills: FillSet, markers: &[GapMarker], id: &str) -> FillSet {
    if fills.keys().all(|index| markers.iter().any(|m| m.index == *index)) {
        return fills;
    }
    let positional = fills.keys().copied().eq(1..=fills.len() as u32);
    if !positional || fills.len() > markers.len() {
        return fills;
    }

    let mut indices: Vec<u32> = markers.iter().map(|m| m.index).collect();
    indices.sort_unstable();
    tracing::debug!(item = %id, fills = fills.len(), "mapping list positions onto gap numbers");
    fills
        .into_values()
        .zip(indices)
        .map(|(mut fill, index)| {
            fill.index = index;
            (index, fill)
        })
        .collect()
}

/// Drop fills whose index matches no detected marker.
fn retain_known(fills: &mut FillSet, markers: &[GapMarker], id: &str) {
    fills.retain(|index, _| {
        let known = markers.iter().any(|m| m.index == *index);
        if !known {
            tracing::debug!(item = %id, gap = *index, "ignoring fill for unknown gap");
        }
        known
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedMarker {
    pub index: u32,
    pub literal: String,
    pub start: usize,
    pub end: usize,
}

/// The working text of one item as the pipeline would prompt it: normalized
/// when requested, underscores retagged, with markers, contexts and strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    pub working_text: String,
    pub normalized: bool,
    pub markers: Vec<DetectedMarker>,
    pub contexts: Vec<GapContext>,
    pub strategy: PromptStrategy,
}

/// Run the pre-inference half of [`Pipeline::process_item`] on `text`.
pub fn detection_report(
    text: &str,
    options: &EnhancementOptions,
    strategy_options: &StrategyOptions,
) -> DetectionReport {
    let (working_text, markers) = prepare_text(text, options);
    let contexts = extract_contexts(&working_text, &markers, strategy_options.context_window);
    let strategy = choose_strategy(&working_text, markers.len(), strategy_options);
    let markers = markers
        .iter()
        .map(|m| DetectedMarker {
            index: m.index,
            literal: m.literal(&working_text).to_string(),
            start: m.start,
            end: m.end,
        })
        .collect();
    DetectionReport {
        working_text,
        normalized: options.normalize_text,
        markers,
        contexts,
        strategy,
    }
}

/// Count gaps per item without calling the inference service.
pub fn gap_count_report(request: &EnhancementRequest) -> GapCountReport {
    let items: Vec<GapCount> = request
        .items
        .iter()
        .map(|item| {
            let (_, markers) = prepare_text(&item.text_with_gaps, &request.options);
            GapCount {
                id: item.id.clone(),
                gap_count: markers.len(),
                has_gaps: !markers.is_empty(),
                text_length: item.text_with_gaps.chars().count(),
            }
        })
        .collect();
    let total_gaps = items.iter().map(|item| item.gap_count).sum();
    let valid = !items.is_empty() && items.iter().all(|item| item.has_gaps);
    GapCountReport {
        items,
        total_gaps,
        valid,
    }
}
