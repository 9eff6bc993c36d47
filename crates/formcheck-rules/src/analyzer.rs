//! Per-session engine tying the pipeline together.
//!
//! ```text
//! raw frame -> gate/smoother -> exercise rules -> rep/hold machine -> SessionUpdate
//! ```
//!
//! All per-session state lives in one [`ExerciseAnalyzer`]; dropping or
//! resetting it discards smoother memory, latched flags, the locked side and
//! rep counters together.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use formcheck_core::{
    LandmarkFrame, LandmarkSmoother, Result, SessionId, SmoothingParams, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::hold::HoldTimer;
use crate::metrics::{feedback_for, AnalysisResult, CheckKind, FormCheck, FormGrade};
use crate::reps::{PhaseSignal, RepEvent, RepPhase, RepState};
use crate::rules::{ExerciseKind, FormEvaluator, FrameContext, RuleMemory};

/// Settings for one analysis session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub exercise: ExerciseKind,
    pub smoothing: SmoothingParams,
    pub frame_width: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            exercise: ExerciseKind::Squat,
            smoothing: SmoothingParams::default(),
            frame_width: 640.0,
        }
    }
}

/// Progress counter shown next to the form feedback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Progress {
    Reps { count: u32, phase: RepPhase },
    Hold { seconds: f64 },
}

/// Output of one processed frame
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub analysis: AnalysisResult,
    pub progress: Progress,
    pub events: Vec<RepEvent>,
    pub smoothed: LandmarkFrame,
}

/// Record handed to session logging when a session ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub exercise: ExerciseKind,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_time_secs: f64,
    pub frames_processed: u64,
    pub rep_count: u32,
    pub hold_secs: f64,
    pub final_grade: Option<FormGrade>,
}

impl SessionSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Range-of-motion credit earned during the current rep cycle
#[derive(Debug, Clone, Default, PartialEq)]
struct RangeCredit {
    earned: HashMap<&'static str, bool>,
}

impl RangeCredit {
    fn update(&mut self, check: &FormCheck, phase: RepPhase, signal: Option<&PhaseSignal>) -> bool {
        let at_top = signal.is_some_and(|s| s.at_top);
        let restart = match check.kind {
            CheckKind::Posture => return check.passed,
            // heading down again from the top
            CheckKind::Depth => phase == RepPhase::Top && !at_top,
            // climbing out of the bottom
            CheckKind::Lockout => phase == RepPhase::Transition,
        };
        let earned = self.earned.entry(check.name).or_insert(false);
        if restart {
            *earned = false;
        }
        *earned |= check.passed;
        *earned
    }
}

/// Everything that evolves frame to frame apart from the smoother
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub memory: RuleMemory,
    pub reps: RepState,
    credit: RangeCredit,
}

/// Evaluates one frame against `state` without touching it.
///
/// Returns the graded result, the state to commit and the rep events.
pub fn analyze(
    evaluator: &dyn FormEvaluator,
    ctx: &FrameContext<'_>,
    state: &SessionState,
) -> (AnalysisResult, SessionState, Vec<RepEvent>) {
    let mut next = state.clone();
    let evaluation = evaluator.evaluate(ctx, &mut next.memory);
    let now = ctx.smoothed.timestamp;

    let mut events = Vec::new();
    if let (Some(rules), Some(signal)) = (evaluator.rep_rules(), evaluation.signal.as_ref()) {
        let step = state.reps.step(signal, now, &rules);
        next.reps = step.state;
        events = step.events;
    }

    let checks: Vec<FormCheck> = evaluation
        .checks
        .iter()
        .map(|check| FormCheck {
            passed: next
                .credit
                .update(check, next.reps.phase, evaluation.signal.as_ref()),
            ..check.clone()
        })
        .collect();

    let faults = checks.iter().filter(|c| !c.passed).count();
    let result = AnalysisResult {
        exercise: evaluator.kind(),
        timestamp: now,
        metrics: evaluation.metrics,
        feedback: feedback_for(&checks, evaluator.all_clear()),
        overall_form: FormGrade::from_fault_count(faults),
        checks,
        side: evaluation.side,
    };
    (result, next, events)
}

/// Real-time form analyzer for a single exercise session
pub struct ExerciseAnalyzer {
    config: AnalyzerConfig,
    evaluator: Box<dyn FormEvaluator>,
    session_id: SessionId,
    smoother: LandmarkSmoother,
    state: SessionState,
    hold: HoldTimer,
    /// Raw frame and pre-frame state of the last update, for re-evaluation
    last_input: Option<(LandmarkFrame, SessionState)>,
    last_result: Option<AnalysisResult>,
    started_at: Option<Timestamp>,
    last_frame_at: Option<Timestamp>,
    frames: u64,
}

impl ExerciseAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_evaluator(config, config.exercise.evaluator())
    }

    /// Uses a custom strategy instead of the built-in one for `config.exercise`
    pub fn with_evaluator(config: AnalyzerConfig, evaluator: Box<dyn FormEvaluator>) -> Self {
        Self {
            config: AnalyzerConfig {
                exercise: evaluator.kind(),
                ..config
            },
            evaluator,
            session_id: SessionId::new(),
            smoother: LandmarkSmoother::new(config.smoothing),
            state: SessionState::default(),
            hold: HoldTimer::default(),
            last_input: None,
            last_result: None,
            started_at: None,
            last_frame_at: None,
            frames: 0,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.evaluator.kind()
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Marks the session start; hold time is measured from here
    pub fn start(&mut self, at: Timestamp) {
        self.started_at = Some(at);
        self.hold = HoldTimer::start(at);
        tracing::info!(session = %self.session_id.0, exercise = %self.exercise(), "session started");
    }

    /// Processes one raw frame through the full pipeline.
    pub fn process(&mut self, raw: &LandmarkFrame) -> SessionUpdate {
        if self.started_at.is_none() {
            self.start(raw.timestamp);
        }

        let smoothed = self.smoother.update(raw).clone();
        let ctx = FrameContext {
            raw,
            smoothed: &smoothed,
            frame_width: self.config.frame_width,
        };
        let (analysis, next, events) = analyze(self.evaluator.as_ref(), &ctx, &self.state);

        for event in &events {
            match event {
                RepEvent::RepCounted => {
                    tracing::info!(exercise = %self.exercise(), count = next.reps.count, "rep counted")
                }
                other => tracing::debug!(exercise = %self.exercise(), event = ?other, "phase event"),
            }
        }

        let previous = std::mem::replace(&mut self.state, next);
        self.last_input = Some((raw.clone(), previous));
        self.last_result = Some(analysis.clone());
        self.last_frame_at = Some(raw.timestamp);
        self.frames += 1;

        SessionUpdate {
            progress: self.progress_at(raw.timestamp),
            analysis,
            events,
            smoothed,
        }
    }

    fn progress_at(&mut self, now: Timestamp) -> Progress {
        match self.evaluator.rep_rules() {
            Some(_) => Progress::Reps {
                count: self.state.reps.count,
                phase: self.state.reps.phase,
            },
            None => Progress::Hold {
                seconds: self.hold.tick(now),
            },
        }
    }

    /// Re-runs the evaluator on the latest smoothed frame without changing any state.
    ///
    /// Returns the same result the last [`process`](Self::process) call produced.
    pub fn reevaluate(&self) -> Option<AnalysisResult> {
        let (raw, before) = self.last_input.as_ref()?;
        let smoothed = self.smoother.current()?;
        let ctx = FrameContext {
            raw,
            smoothed,
            frame_width: self.config.frame_width,
        };
        Some(analyze(self.evaluator.as_ref(), &ctx, before).0)
    }

    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last_result.as_ref()
    }

    pub fn rep_count(&self) -> u32 {
        self.state.reps.count
    }

    pub fn rep_state(&self) -> &RepState {
        &self.state.reps
    }

    pub fn hold_secs(&self) -> f64 {
        self.hold.held_secs()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn summary(&self) -> SessionSummary {
        let total_time_secs = match (self.started_at, self.last_frame_at) {
            (Some(start), Some(end)) => end.secs_since(start),
            _ => 0.0,
        };
        SessionSummary {
            session_id: self.session_id,
            exercise: self.exercise(),
            started_at: self.started_at.map(|t| t.to_datetime()),
            ended_at: self.last_frame_at.map(|t| t.to_datetime()),
            total_time_secs,
            frames_processed: self.frames,
            rep_count: self.state.reps.count,
            hold_secs: self.hold.held_secs(),
            final_grade: self.last_result.as_ref().map(|r| r.overall_form),
        }
    }

    /// Discards all per-session state; the next frame starts a fresh session clock.
    pub fn reset(&mut self) {
        tracing::info!(session = %self.session_id.0, exercise = %self.exercise(), "session reset");
        self.smoother.reset();
        self.state = SessionState::default();
        self.hold.reset();
        self.last_input = None;
        self.last_result = None;
        self.started_at = None;
        self.last_frame_at = None;
        self.frames = 0;
    }
}

impl Default for ExerciseAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
