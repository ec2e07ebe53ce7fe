//! Volume-trend gate: compares today's record count with a rolling baseline.

use common::{Error, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Number of historical counts the baseline is built from.
pub const BASELINE_WINDOW: usize = 5;

/// Share of the historical mean the current count must reach.
pub const DEFAULT_TOLERANCE: f64 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationVerdict {
    Valid,
    Invalid,
}

/// Historical record counts, supplied by the caller and never modified here.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendBaseline {
    counts: [u64; BASELINE_WINDOW],
    tolerance: f64,
}

impl TrendBaseline {
    pub fn new(counts: &[u64]) -> Result<Self> {
        Self::with_tolerance(counts, DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(counts: &[u64], tolerance: f64) -> Result<Self> {
        let counts: [u64; BASELINE_WINDOW] = counts.try_into().map_err(|_| {
            Error::InputUnavailable(format!(
                "trend baseline needs {} historical counts, got {}",
                BASELINE_WINDOW,
                counts.len()
            ))
        })?;

        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(Error::InvalidInput(format!(
                "trend tolerance must be a positive number, got {}",
                tolerance
            )));
        }

        Ok(Self { counts, tolerance })
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn mean(&self) -> f64 {
        self.counts.iter().map(|&c| c as f64).sum::<f64>() / BASELINE_WINDOW as f64
    }

    pub fn lower_bound(&self) -> f64 {
        self.mean() * self.tolerance
    }
}

/// Outcome of one validation, kept for reporting. The verdict alone drives
/// the branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAssessment {
    pub current_count: u64,
    pub mean: f64,
    pub lower_bound: f64,
    pub verdict: ValidationVerdict,
}

#[derive(Debug, Clone)]
pub struct TrendValidator {
    baseline: TrendBaseline,
}

impl TrendValidator {
    pub fn new(baseline: TrendBaseline) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &TrendBaseline {
        &self.baseline
    }

    /// `Valid` when the current count reaches the lower bound (inclusive).
    /// A missing count is an error, never a default verdict.
    pub fn validate(&self, current_count: Option<u64>) -> Result<ValidationVerdict> {
        self.assess(current_count).map(|a| a.verdict)
    }

    pub fn assess(&self, current_count: Option<u64>) -> Result<TrendAssessment> {
        let current_count = current_count
            .ok_or_else(|| Error::InputUnavailable("current record count".to_string()))?;

        let mean = self.baseline.mean();
        let lower_bound = self.baseline.lower_bound();
        let verdict = if current_count as f64 >= lower_bound {
            ValidationVerdict::Valid
        } else {
            ValidationVerdict::Invalid
        };

        match verdict {
            ValidationVerdict::Valid => info!(
                mean = format_args!("{:.2}", mean),
                lower_bound = format_args!("{:.2}", lower_bound),
                current_count,
                "Trend validation OK: record count within expected range"
            ),
            ValidationVerdict::Invalid => warn!(
                mean = format_args!("{:.2}", mean),
                lower_bound = format_args!("{:.2}", lower_bound),
                current_count,
                "Trend validation FAILED: significant drop in record count"
            ),
        }

        Ok(TrendAssessment {
            current_count,
            mean,
            lower_bound,
            verdict,
        })
    }
}
