//! Pipeline orchestrator.
//!
//! Drives one prompt through the five-stage state machine
//! `idle → validating → high-level → low-level → placing → complete`,
//! with an absorbing `error` state reachable from any stage. Every stage
//! transition is persisted to the history store immediately, so an
//! externally observed pipeline is never older than its last completed
//! stage. This is the single place errors are caught and translated into
//! the taxonomy in [`crate::error`].

use crate::error::PipelineError;
use crate::history::{PipelineHistory, Storage};
use crate::model::{
    GenerationPipeline, PipelineMetadata, PipelineStage, PipelineStatus, ValidationOutcome,
};
use crate::service::{CancelToken, GenerationService, cancellable_sleep};
use crate::shapes::{
    self, DEFAULT_SHAPE_SIZE, HighLevelShape, LowLevelShape, repair_low_level_shape,
    validate_high_level_array, validate_low_level_shape,
};
use ab_core::bounds::Canvas;
use ab_core::id::ElementId;
use ab_core::model::{DesignElement, ElementKind};
use ab_core::store::ElementStore;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Pacing and retry knobs. Defaults match interactive use; tests zero the
/// delays out.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Attempts per shape before its index is marked permanently failed.
    pub retry_attempts: u32,
    /// Backoff before retry N is `backoff_base * N` (linear).
    pub backoff_base: Duration,
    /// Throttle between successful shape detail requests.
    pub inter_shape_delay: Duration,
    /// Throttle between individual adds during placing. Zero commits the
    /// whole batch in one `add_many` call; nonzero paces elements in
    /// one-by-one for hosts that re-render on every add.
    pub placement_delay: Duration,
    pub canvas: Canvas,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            backoff_base: Duration::from_secs(1),
            inter_shape_delay: Duration::from_millis(250),
            placement_delay: Duration::ZERO,
            canvas: Canvas::default(),
        }
    }
}

/// Progress snapshot published to the host UI after every transition.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,
    pub validation_status: Option<bool>,
    pub current_index: usize,
    pub total_count: usize,
}

impl Default for ProgressUpdate {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Idle,
            validation_status: None,
            current_index: 0,
            total_count: 0,
        }
    }
}

pub struct Orchestrator<G, S> {
    service: G,
    history: PipelineHistory<S>,
    config: PipelineConfig,
    progress: watch::Sender<ProgressUpdate>,
}

impl<G: GenerationService, S: Storage> Orchestrator<G, S> {
    pub fn new(service: G, history: PipelineHistory<S>, config: PipelineConfig) -> Self {
        let (progress, _) = watch::channel(ProgressUpdate::default());
        Self {
            service,
            history,
            config,
            progress,
        }
    }

    /// Subscribe to progress snapshots for this orchestrator's runs.
    pub fn progress(&self) -> watch::Receiver<ProgressUpdate> {
        self.progress.subscribe()
    }

    pub fn history(&self) -> &PipelineHistory<S> {
        &self.history
    }

    pub fn service(&self) -> &G {
        &self.service
    }

    /// Run one prompt end to end. Elements reach the store only after the
    /// placing stage fully validates them; a cancelled or failed run adds
    /// nothing. The returned record is also the last state persisted to
    /// history.
    pub async fn run(
        &self,
        prompt: &str,
        store: &mut dyn ElementStore,
        cancel: CancelToken,
    ) -> GenerationPipeline {
        let started = Instant::now();
        let mut pipeline = GenerationPipeline::new(self.history.create_id(), prompt);
        self.history.save(&pipeline).await;

        // ── validating ──
        self.enter_stage(&mut pipeline, PipelineStage::Validating, 0, 0).await;
        let verdict = match self.service.validate(prompt, &cancel).await {
            Ok(verdict) => verdict,
            Err(e) => return self.fail(pipeline, PipelineStage::Validating, e, started).await,
        };
        pipeline.stages.validation = Some(ValidationOutcome {
            accepted: verdict.accepted,
            raw_text: verdict.raw_text.clone(),
        });
        self.publish(&pipeline, Some(verdict.accepted), 0, 0);
        if !verdict.accepted {
            let reason = if verdict.raw_text.trim().is_empty() {
                "the prompt does not describe a design".to_string()
            } else {
                verdict.raw_text.clone()
            };
            return self
                .fail(pipeline, PipelineStage::Validating, PipelineError::Rejected(reason), started)
                .await;
        }
        self.history.save(&pipeline).await;

        // ── high-level ──
        self.enter_stage(&mut pipeline, PipelineStage::HighLevel, 0, 0).await;
        let plan = match self.structure_plan(prompt, &mut pipeline, &cancel).await {
            Ok(plan) => plan,
            Err(e) => return self.fail(pipeline, PipelineStage::HighLevel, e, started).await,
        };
        pipeline.stages.high_level = Some(plan.clone());
        self.history.save(&pipeline).await;

        // ── low-level ──
        let total = plan.len();
        self.enter_stage(&mut pipeline, PipelineStage::LowLevel, 0, total).await;
        let mut details: Vec<Option<LowLevelShape>> = Vec::with_capacity(total);
        for (index, shape) in plan.iter().enumerate() {
            self.publish(&pipeline, Some(true), index, total);
            match self.detail_shape(shape, prompt, &cancel).await {
                Ok(detail) => {
                    details.push(Some(detail));
                    if index + 1 < total
                        && let Err(e) = cancellable_sleep(self.config.inter_shape_delay, &cancel).await
                    {
                        return self.fail(pipeline, PipelineStage::LowLevel, e, started).await;
                    }
                }
                Err(PipelineError::Cancelled) => {
                    return self
                        .fail(pipeline, PipelineStage::LowLevel, PipelineError::Cancelled, started)
                        .await;
                }
                Err(e) => {
                    pipeline.record_error(
                        PipelineStage::LowLevel,
                        format!("shape {index} failed after retries: {e}"),
                    );
                    details.push(None);
                }
            }
            pipeline.stages.low_level = Some(details.clone());
            self.history.save(&pipeline).await;
        }
        if details.iter().all(|d| d.is_none()) {
            return self
                .fail(
                    pipeline,
                    PipelineStage::LowLevel,
                    PipelineError::StageFatal("no shape produced usable detail".into()),
                    started,
                )
                .await;
        }

        // ── placing ──
        self.enter_stage(&mut pipeline, PipelineStage::Placing, 0, total).await;
        let mut elements = Vec::new();
        let mut failed_indices = Vec::new();
        for (index, (high, low)) in plan.iter().zip(&details).enumerate() {
            let Some(low) = low else {
                failed_indices.push(index);
                continue;
            };
            // Index order preserves the plan's implied z-order
            match place_shape(high, low, &self.config.canvas) {
                Ok(element) => elements.push(element),
                Err(message) => {
                    pipeline.record_error(
                        PipelineStage::Placing,
                        format!("shape {index} could not be placed: {message}"),
                    );
                    failed_indices.push(index);
                }
            }
        }
        if elements.is_empty() {
            return self
                .fail(
                    pipeline,
                    PipelineStage::Placing,
                    PipelineError::StageFatal("no element could be placed".into()),
                    started,
                )
                .await;
        }
        if cancel.is_cancelled() {
            return self
                .fail(pipeline, PipelineStage::Placing, PipelineError::Cancelled, started)
                .await;
        }
        pipeline.stages.placed_ids =
            Some(elements.iter().map(|e| e.id.as_str().to_string()).collect());
        let placed = if self.config.placement_delay.is_zero() {
            store.add_many(elements)
        } else {
            // A cancel raised mid-pacing only skips the remaining
            // throttle; the batch is already committed.
            let mut queue = elements.into_iter();
            let mut placed = 0;
            while let Some(el) = queue.next() {
                if store.add_element(el) {
                    placed += 1;
                }
                if queue.len() > 0
                    && cancellable_sleep(self.config.placement_delay, &cancel).await.is_err()
                {
                    placed += store.add_many(queue.collect());
                    break;
                }
            }
            placed
        };

        // ── complete ──
        pipeline.stage = PipelineStage::Complete;
        pipeline.status = if failed_indices.is_empty() {
            PipelineStatus::Complete
        } else {
            PipelineStatus::Partial
        };
        pipeline.metadata = Some(PipelineMetadata {
            requested: total,
            placed,
            failed_indices,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        self.publish(&pipeline, Some(true), total, total);
        self.history.save(&pipeline).await;
        log::info!(
            "pipeline {}: placed {placed}/{total} elements in {}ms",
            pipeline.id,
            started.elapsed().as_millis()
        );
        pipeline
    }

    async fn structure_plan(
        &self,
        prompt: &str,
        pipeline: &mut GenerationPipeline,
        cancel: &CancelToken,
    ) -> crate::error::Result<Vec<HighLevelShape>> {
        let reply = self.service.structure(prompt, cancel).await?;
        let json = shapes::extract_json_array(&reply)
            .ok_or_else(|| PipelineError::Parse(format!("no shape array in: {reply}")))?;
        let parsed: Vec<HighLevelShape> = serde_json::from_str(json)
            .map_err(|e| PipelineError::Parse(e.to_string()))?;
        let (valid, dropped) = validate_high_level_array(parsed);
        for message in dropped {
            pipeline.record_error(PipelineStage::HighLevel, message);
        }
        if valid.is_empty() {
            return Err(PipelineError::StageFatal(
                "the structuring step produced no valid shapes".into(),
            ));
        }
        Ok(valid)
    }

    /// One shape's detail request with repair and bounded linear-backoff
    /// retry. The backoff sleep itself is cancellable, so an abort never
    /// waits out a multi-second delay.
    async fn detail_shape(
        &self,
        shape: &HighLevelShape,
        prompt: &str,
        cancel: &CancelToken,
    ) -> crate::error::Result<LowLevelShape> {
        let mut attempt = 1u32;
        loop {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            match self.try_detail(shape, prompt, cancel).await {
                Ok(detail) => return Ok(detail),
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) if e.is_transient() && attempt < self.config.retry_attempts => {
                    log::debug!("detail attempt {attempt} failed, retrying: {e}");
                    cancellable_sleep(self.config.backoff_base * attempt, cancel).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_detail(
        &self,
        shape: &HighLevelShape,
        prompt: &str,
        cancel: &CancelToken,
    ) -> crate::error::Result<LowLevelShape> {
        let reply = self.service.detail(shape, prompt, cancel).await?;
        let json = shapes::extract_json_object(&reply)
            .ok_or_else(|| PipelineError::Parse(format!("no settings object in: {reply}")))?;
        let parsed: LowLevelShape = serde_json::from_str(json)
            .map_err(|e| PipelineError::Parse(e.to_string()))?;
        let problems = validate_low_level_shape(&parsed);
        if problems.is_empty() {
            Ok(parsed)
        } else {
            log::debug!("repairing detail for '{}': {problems:?}", shape.shape_type);
            Ok(repair_low_level_shape(parsed))
        }
    }

    async fn enter_stage(
        &self,
        pipeline: &mut GenerationPipeline,
        stage: PipelineStage,
        index: usize,
        total: usize,
    ) {
        pipeline.stage = stage;
        let accepted = pipeline.stages.validation.as_ref().map(|v| v.accepted);
        self.publish(pipeline, accepted, index, total);
        self.history.save(pipeline).await;
    }

    fn publish(
        &self,
        pipeline: &GenerationPipeline,
        validation_status: Option<bool>,
        current_index: usize,
        total_count: usize,
    ) {
        let _ = self.progress.send(ProgressUpdate {
            stage: pipeline.stage,
            validation_status,
            current_index,
            total_count,
        });
    }

    async fn fail(
        &self,
        mut pipeline: GenerationPipeline,
        stage: PipelineStage,
        error: PipelineError,
        started: Instant,
    ) -> GenerationPipeline {
        log::warn!("pipeline {} failed during {stage:?}: {error}", pipeline.id);
        pipeline.record_error(stage, error.user_message());
        pipeline.stage = PipelineStage::Error;
        pipeline.status = PipelineStatus::Failed;
        pipeline.metadata = Some(PipelineMetadata {
            requested: pipeline
                .stages
                .high_level
                .as_ref()
                .map_or(0, |plan| plan.len()),
            placed: 0,
            failed_indices: Vec::new(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        self.publish(
            &pipeline,
            pipeline.stages.validation.as_ref().map(|v| v.accepted),
            0,
            0,
        );
        self.history.save(&pipeline).await;
        pipeline
    }
}

// ─── Placement mapping ──────────────────────────────────────────────────

/// Maps one (high-level, low-level) pair to a canvas-ready element,
/// applying defaults for still-missing visuals and clamping geometry to
/// the canvas.
fn place_shape(
    high: &HighLevelShape,
    low: &LowLevelShape,
    canvas: &Canvas,
) -> std::result::Result<DesignElement, String> {
    let shape_type = low
        .shape_type
        .as_deref()
        .unwrap_or(high.shape_type.as_str())
        .to_lowercase();

    let typography = low
        .text
        .as_ref()
        .map(|t| t.typography.clone())
        .unwrap_or_default();
    let content = low
        .text
        .as_ref()
        .map(|t| t.content.clone())
        .or_else(|| high.content.clone())
        .unwrap_or_default();

    let kind = match shape_type.as_str() {
        "rect" | "rectangle" => ElementKind::Rect,
        "circle" | "ellipse" => ElementKind::Circle,
        "text" => ElementKind::Text {
            content,
            typography,
        },
        "line" => ElementKind::Line {
            options: low.line.clone().unwrap_or_default(),
        },
        "button" => ElementKind::Button {
            label: content,
            typography,
        },
        "chat_bubble" => ElementKind::ChatBubble {
            text: content,
            typography,
            tail: true,
        },
        other => return Err(format!("unmappable shape type '{other}'")),
    };

    let scale = low.scale.unwrap_or(1.0);
    let (mut width, mut height) = match low.dimensions {
        Some(d) => (d.width * scale, d.height * scale),
        None => (
            high.width.unwrap_or(DEFAULT_SHAPE_SIZE),
            high.height.unwrap_or(DEFAULT_SHAPE_SIZE),
        ),
    };
    width = width.min(canvas.width);
    height = height.min(canvas.height);
    let (x, y) = canvas.clamp_position(high.x, high.y, width, height);

    let name = low
        .name
        .clone()
        .unwrap_or_else(|| format!("Generated {}", kind.name()));
    let mut element = DesignElement::new(ElementId::mint(&kind), name, kind)
        .with_geometry(x, y, width, height);
    element.rotation = low.rotation.unwrap_or(0.0);
    if let Some(style) = low.style.clone() {
        element.style = style;
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Dimensions, TextBlock};
    use ab_core::model::Typography;

    fn high(shape_type: &str, x: f32, y: f32) -> HighLevelShape {
        HighLevelShape {
            shape_type: shape_type.to_string(),
            x,
            y,
            width: None,
            height: None,
            content: None,
        }
    }

    #[test]
    fn placement_clamps_to_canvas() {
        let canvas = Canvas::default();
        let low = repair_low_level_shape(LowLevelShape::default());
        let element = place_shape(&high("rect", 5000.0, -50.0), &low, &canvas).unwrap();
        assert_eq!(element.x, canvas.width - element.width);
        assert_eq!(element.y, 0.0);
    }

    #[test]
    fn placement_prefers_high_level_content_hint() {
        let canvas = Canvas::default();
        let mut plan = high("text", 10.0, 10.0);
        plan.content = Some("Welcome aboard".to_string());
        let low = repair_low_level_shape(LowLevelShape {
            shape_type: Some("text".to_string()),
            ..LowLevelShape::default()
        });
        let element = place_shape(&plan, &low, &canvas).unwrap();
        match element.kind {
            ElementKind::Text { content, .. } => assert_eq!(content, "Welcome aboard"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn placement_scales_dimensions() {
        let canvas = Canvas::default();
        let low = LowLevelShape {
            name: Some("Scaled".to_string()),
            shape_type: Some("circle".to_string()),
            dimensions: Some(Dimensions {
                width: 100.0,
                height: 60.0,
            }),
            scale: Some(2.0),
            ..LowLevelShape::default()
        };
        let element = place_shape(&high("circle", 100.0, 100.0), &low, &canvas).unwrap();
        assert_eq!(element.width, 200.0);
        assert_eq!(element.height, 120.0);
    }

    #[test]
    fn placement_uses_detail_text_block_over_hint() {
        let canvas = Canvas::default();
        let mut plan = high("button", 0.0, 0.0);
        plan.content = Some("hint".to_string());
        let low = LowLevelShape {
            name: Some("CTA".to_string()),
            shape_type: Some("button".to_string()),
            text: Some(TextBlock {
                content: "Sign up".to_string(),
                typography: Typography::default(),
            }),
            dimensions: Some(Dimensions {
                width: 160.0,
                height: 48.0,
            }),
            ..LowLevelShape::default()
        };
        let element = place_shape(&plan, &low, &canvas).unwrap();
        match element.kind {
            ElementKind::Button { label, .. } => assert_eq!(label, "Sign up"),
            other => panic!("expected button, got {other:?}"),
        }
    }
}
