//! Per-frame analysis output: measured features, form checks, grade and cues.

use formcheck_core::{Side, Timestamp};
use serde::{Deserialize, Serialize};

use crate::deadlift::DeadliftMetrics;
use crate::lunge::LungeMetrics;
use crate::plank::PlankMetrics;
use crate::pushup::PushupMetrics;
use crate::rules::ExerciseKind;
use crate::squat::SquatMetrics;

/// Overall form grade for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormGrade {
    Excellent,
    /// Kept for consumers of stored history; never produced by the engine
    Good,
    NeedsImprovement,
    Poor,
}

impl FormGrade {
    /// Number of simultaneous failing checks that grades a frame as poor
    pub const POOR_FAULT_COUNT: usize = 2;

    pub fn from_fault_count(faults: usize) -> Self {
        match faults {
            0 => FormGrade::Excellent,
            n if n < Self::POOR_FAULT_COUNT => FormGrade::NeedsImprovement,
            _ => FormGrade::Poor,
        }
    }

    pub fn is_excellent(&self) -> bool {
        matches!(self, FormGrade::Excellent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormGrade::Excellent => "excellent",
            FormGrade::Good => "good",
            FormGrade::NeedsImprovement => "needs-improvement",
            FormGrade::Poor => "poor",
        }
    }
}

/// How a check relates to the movement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Must hold on every frame
    Posture,
    /// Range of motion reached at the bottom of a rep
    Depth,
    /// Range of motion reached at the top of a rep
    Lockout,
}

/// One named pass/fail form check with the cue shown when it fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormCheck {
    pub name: &'static str,
    pub kind: CheckKind,
    pub passed: bool,
    pub cue: &'static str,
}

impl FormCheck {
    pub fn posture(name: &'static str, passed: bool, cue: &'static str) -> Self {
        Self {
            name,
            kind: CheckKind::Posture,
            passed,
            cue,
        }
    }

    pub fn depth(name: &'static str, passed: bool, cue: &'static str) -> Self {
        Self {
            name,
            kind: CheckKind::Depth,
            passed,
            cue,
        }
    }

    pub fn lockout(name: &'static str, passed: bool, cue: &'static str) -> Self {
        Self {
            name,
            kind: CheckKind::Lockout,
            passed,
            cue,
        }
    }
}

/// Measured features, one variant per exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "exercise", rename_all = "lowercase")]
pub enum ExerciseMetrics {
    Squat(SquatMetrics),
    Lunge(LungeMetrics),
    Deadlift(DeadliftMetrics),
    Plank(PlankMetrics),
    Pushup(PushupMetrics),
}

impl ExerciseMetrics {
    pub fn kind(&self) -> ExerciseKind {
        match self {
            ExerciseMetrics::Squat(_) => ExerciseKind::Squat,
            ExerciseMetrics::Lunge(_) => ExerciseKind::Lunge,
            ExerciseMetrics::Deadlift(_) => ExerciseKind::Deadlift,
            ExerciseMetrics::Plank(_) => ExerciseKind::Plank,
            ExerciseMetrics::Pushup(_) => ExerciseKind::Pushup,
        }
    }
}

/// Result of evaluating one smoothed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub exercise: ExerciseKind,
    pub timestamp: Timestamp,
    pub metrics: ExerciseMetrics,
    /// Checks as graded; range-of-motion checks include credit earned earlier in the rep
    pub checks: Vec<FormCheck>,
    pub overall_form: FormGrade,
    pub feedback: Vec<String>,
    /// Body side the evaluator measured, when it measures only one
    pub side: Option<Side>,
}

impl AnalysisResult {
    pub fn failing_checks(&self) -> impl Iterator<Item = &FormCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn check(&self, name: &str) -> Option<&FormCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Cues for every failing check in order, or the positive line when none fail.
pub fn feedback_for(checks: &[FormCheck], all_clear: &str) -> Vec<String> {
    let cues: Vec<String> = checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.cue.to_string())
        .collect();
    if cues.is_empty() {
        vec![all_clear.to_string()]
    } else {
        cues
    }
}
