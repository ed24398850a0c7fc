//! Pipeline-wide quality report
//!
//! The aggregator walks an ordered [`StageRegistry`] and reads each stage's
//! stored record. Stages without a record, or whose record was never gated,
//! are reported as pending and never raise the overall severity.

use crate::errors::Result;
use crate::gates::thresholds::QualityThresholds;
use crate::gates::GateStatus;
use crate::models::{
    AssetMetrics, CaptureMetrics, PreprocessMetrics, ReconReport, StageRecord, StageStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored records of one project, one slot per pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub project_name: String,
    pub class_id: Option<u32>,
    pub capture: Option<CaptureMetrics>,
    pub preprocess: Option<PreprocessMetrics>,
    pub reconstruct: Option<ReconReport>,
    pub optimize: Option<AssetMetrics>,
}

impl PipelineMetrics {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }
}

/// Project identity, for registries over other metrics sources
pub trait ProjectSource {
    fn project_name(&self) -> &str;

    fn class_id(&self) -> Option<u32> {
        None
    }
}

impl ProjectSource for PipelineMetrics {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn class_id(&self) -> Option<u32> {
        self.class_id
    }
}

/// Looks up a stage's record in the metrics source
pub type RecordAccessor<M> = fn(&M) -> Option<&dyn StageRecord>;

fn capture_record(m: &PipelineMetrics) -> Option<&dyn StageRecord> {
    m.capture.as_ref().map(|r| r as &dyn StageRecord)
}

fn preprocess_record(m: &PipelineMetrics) -> Option<&dyn StageRecord> {
    m.preprocess.as_ref().map(|r| r as &dyn StageRecord)
}

fn reconstruct_record(m: &PipelineMetrics) -> Option<&dyn StageRecord> {
    m.reconstruct.as_ref().map(|r| r as &dyn StageRecord)
}

fn optimize_record(m: &PipelineMetrics) -> Option<&dyn StageRecord> {
    m.optimize.as_ref().map(|r| r as &dyn StageRecord)
}

struct StageEntry<M> {
    name: &'static str,
    missing_note: &'static str,
    accessor: RecordAccessor<M>,
}

/// Ordered list of pipeline stages
pub struct StageRegistry<M = PipelineMetrics> {
    stages: Vec<StageEntry<M>>,
}

impl<M> StageRegistry<M> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage; reports list stages in registration order
    pub fn register(
        mut self,
        name: &'static str,
        missing_note: &'static str,
        accessor: RecordAccessor<M>,
    ) -> Self {
        self.stages.push(StageEntry {
            name,
            missing_note,
            accessor,
        });
        self
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|s| s.name)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<M> std::fmt::Debug for StageRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl Default for StageRegistry<PipelineMetrics> {
    fn default() -> Self {
        Self::new()
            .register("capture", "Capture metrics not available", capture_record)
            .register("preprocess", "Preprocess metrics not available", preprocess_record)
            .register("reconstruct", "Reconstruction metrics not available", reconstruct_record)
            .register("optimize", "Asset metrics not available", optimize_record)
    }
}

/// Status and reasons of one stage as shown in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageQualitySummary {
    pub stage_name: String,
    pub status: StageStatus,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub project_name: String,
    pub class_id: Option<u32>,
    pub generated_at: DateTime<Utc>,
    pub stage_summaries: Vec<StageQualitySummary>,
    pub overall_status: GateStatus,
    pub overall_reasons: Vec<String>,
    pub suggestions: Vec<String>,
    pub available_stages: Vec<String>,
    pub missing_stages: Vec<String>,
}

impl QualityReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn stage(&self, name: &str) -> Option<&StageQualitySummary> {
        self.stage_summaries.iter().find(|s| s.stage_name == name)
    }
}

/// Merges stored stage verdicts into one report
#[derive(Debug)]
pub struct GateAggregator<M = PipelineMetrics> {
    registry: StageRegistry<M>,
    thresholds: QualityThresholds,
}

impl Default for GateAggregator<PipelineMetrics> {
    fn default() -> Self {
        Self::new(StageRegistry::default(), QualityThresholds::default())
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<M: ProjectSource> GateAggregator<M> {
    pub fn new(registry: StageRegistry<M>, thresholds: QualityThresholds) -> Self {
        Self {
            registry,
            thresholds,
        }
    }

    pub fn registry(&self) -> &StageRegistry<M> {
        &self.registry
    }

    pub fn evaluate_pipeline(&self, metrics: &M) -> QualityReport {
        let mut summaries = Vec::with_capacity(self.registry.len());
        let mut available = Vec::new();
        let mut missing = Vec::new();
        let mut overall = GateStatus::Pass;
        let mut overall_reasons = Vec::new();
        let mut suggestions: Vec<String> = Vec::new();

        for stage in &self.registry.stages {
            let record = (stage.accessor)(metrics);
            let (status, reasons) = match record {
                Some(r) => {
                    available.push(stage.name.to_string());
                    (r.gate_status(), r.gate_reasons().to_vec())
                }
                None => {
                    missing.push(stage.name.to_string());
                    (StageStatus::Pending, vec![stage.missing_note.to_string()])
                }
            };

            let title = title_case(stage.name);
            match status.verdict() {
                Some(GateStatus::Fail) => overall_reasons.push(format!("{} stage failed", title)),
                Some(GateStatus::Warn) => {
                    overall_reasons.push(format!("{} stage has warnings", title))
                }
                Some(GateStatus::Pass) => {}
                None => overall_reasons.push(format!("{} stage not completed", title)),
            }

            if let Some(verdict) = status.verdict() {
                overall = overall.max(verdict);
                if verdict != GateStatus::Pass {
                    for hint in record
                        .map(|r| r.suggestions(&self.thresholds))
                        .unwrap_or_default()
                    {
                        if !suggestions.contains(&hint) {
                            suggestions.push(hint);
                        }
                    }
                }
            }

            summaries.push(StageQualitySummary {
                stage_name: stage.name.to_string(),
                status,
                reasons,
            });
        }

        log::info!(
            "Quality report for '{}': {} ({} of {} stages available)",
            metrics.project_name(),
            overall,
            available.len(),
            self.registry.len()
        );

        QualityReport {
            project_name: metrics.project_name().to_string(),
            class_id: metrics.class_id(),
            generated_at: Utc::now(),
            stage_summaries: summaries,
            overall_status: overall,
            overall_reasons,
            suggestions,
            available_stages: available,
            missing_stages: missing,
        }
    }
}
