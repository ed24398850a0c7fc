//! Stage quality gates
//!
//! Each gate maps a stage's metrics snapshot to a PASS/WARN/FAIL verdict
//! with ordered reasons and remediation suggestions. Gates hold only their
//! read-only thresholds, so one gate can evaluate any number of snapshots.

pub mod asset;
pub mod capture;
pub mod preprocess;
pub mod reconstruct;
pub mod thresholds;

pub use asset::AssetGate;
pub use capture::CaptureGate;
pub use preprocess::PreprocessGate;
pub use reconstruct::ReconGate;
pub use thresholds::{
    AssetThresholds, CaptureThresholds, PreprocessThresholds, QualityThresholds, ReconThresholds,
};

use crate::assert_invariant;
use crate::errors::Result;
use crate::invariants::STATUS_NEVER_DOWNGRADES;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gate verdict, ordered by severity: `Pass < Warn < Fail`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Pass,
    Warn,
    Fail,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Pass => "pass",
            GateStatus::Warn => "warn",
            GateStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one gate evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    status: GateStatus,
    reasons: Vec<String>,
    suggestions: Vec<String>,
}

impl GateResult {
    pub fn status(&self) -> GateStatus {
        self.status
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn is_pass(&self) -> bool {
        self.status == GateStatus::Pass
    }
}

/// Escalating accumulator for the checks of a single evaluation.
///
/// The status only ever moves towards `Fail`; every raised check appends
/// its reason and suggestion in call order.
#[derive(Debug)]
pub struct Verdict {
    status: GateStatus,
    reasons: Vec<String>,
    suggestions: Vec<String>,
}

impl Default for Verdict {
    fn default() -> Self {
        Self::new()
    }
}

impl Verdict {
    pub fn new() -> Self {
        Self {
            status: GateStatus::Pass,
            reasons: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn status(&self) -> GateStatus {
        self.status
    }

    pub fn raise(
        &mut self,
        status: GateStatus,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        let before = self.status;
        self.status = self.status.max(status);
        assert_invariant!(self.status >= before, STATUS_NEVER_DOWNGRADES, "gate escalation");

        self.reasons.push(reason.into());
        self.suggestions.push(suggestion.into());
    }

    pub fn finish(self, gate: &str) -> GateResult {
        match self.status {
            GateStatus::Pass => log::info!("{} gate: pass", gate),
            status => log::warn!("{} gate: {} ({})", gate, status, self.reasons.join(", ")),
        }

        GateResult {
            status: self.status,
            reasons: self.reasons,
            suggestions: self.suggestions,
        }
    }
}

/// Serializable snapshot of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub gate: String,
    pub status: GateStatus,
    pub metrics: serde_json::Value,
    pub thresholds: serde_json::Value,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Common contract of the stage gates
pub trait QualityGate {
    type Metrics: Serialize;

    fn name(&self) -> &'static str;

    /// Evaluate a metrics snapshot. Pure: identical metrics always yield an
    /// identical result.
    fn evaluate(&self, metrics: &Self::Metrics) -> GateResult;

    /// Threshold values as echoed in reports
    fn thresholds(&self) -> serde_json::Value;

    fn get_report(&self, metrics: &Self::Metrics) -> Result<GateReport> {
        let result = self.evaluate(metrics);
        Ok(GateReport {
            gate: self.name().to_string(),
            status: result.status,
            metrics: serde_json::to_value(metrics)?,
            thresholds: self.thresholds(),
            reasons: result.reasons,
            suggestions: result.suggestions,
        })
    }
}
