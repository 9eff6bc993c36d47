//! Frame driver: the scheduling loop around one analysis session.
//!
//! Each tick pulls one landmark frame, runs it through the analyzer and
//! republishes the judgement together with overlay geometry. The only await
//! point is the source; everything downstream runs synchronously.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use formcheck_core::{Error, LandmarkFrame, Result};
use formcheck_rules::{AnalysisResult, ExerciseAnalyzer, Progress, RepEvent, SessionSummary};

use crate::config::EngineConfig;
use crate::overlay::OverlayFrame;
use crate::source::LandmarkSource;

/// Time allowed for the driver task to wind down after a stop request
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Published result of one tick
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutput {
    pub analysis: AnalysisResult,
    pub progress: Progress,
    pub events: Vec<RepEvent>,
    pub overlay: OverlayFrame,
}

type OutputCallback = Arc<dyn Fn(&FrameOutput) + Send + Sync>;

/// Session control signals accepted by a running driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Reset,
    Stop,
}

/// Drives an [`ExerciseAnalyzer`] from a landmark source
pub struct FrameDriver {
    config: EngineConfig,
    analyzer: ExerciseAnalyzer,
    callbacks: Vec<OutputCallback>,
    is_running: Arc<RwLock<bool>>,
}

impl FrameDriver {
    pub fn new(config: EngineConfig) -> Self {
        let analyzer = ExerciseAnalyzer::new(config.to_analyzer_config());
        Self {
            config,
            analyzer,
            callbacks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Add a callback invoked with every output
    pub fn on_output<F>(&mut self, callback: F)
    where
        F: Fn(&FrameOutput) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
    }

    /// Runs one frame through the pipeline and notifies callbacks
    pub fn tick(&mut self, raw: &LandmarkFrame) -> FrameOutput {
        let update = self.analyzer.process(raw);
        let overlay = OverlayFrame::for_analysis(&update.smoothed, &update.analysis, &self.config.frame);

        let output = FrameOutput {
            analysis: update.analysis,
            progress: update.progress,
            events: update.events,
            overlay,
        };

        for callback in &self.callbacks {
            callback(&output);
        }
        output
    }

    /// Start the driver on its own task, consuming frames from `source`.
    ///
    /// The task runs a session of its own; control it through the returned
    /// [`DriverHandle`], not through [`FrameDriver::reset`].
    pub async fn start_streaming<S: LandmarkSource + 'static>(
        &mut self,
        mut source: S,
    ) -> Result<DriverHandle> {
        {
            let mut running = self.is_running.write().await;
            if *running {
                return Err(Error::SessionAlreadyRunning);
            }
            source.start().await?;
            *running = true;
        }

        let driver_config = self.config.driver.clone();
        let (output_tx, _) = broadcast::channel(driver_config.output_queue_size.max(1));
        let (latest_tx, latest_rx) = watch::channel(None);
        let (control_tx, mut control_rx) = mpsc::channel(driver_config.control_queue_size.max(1));

        let mut driver = FrameDriver {
            config: self.config.clone(),
            analyzer: ExerciseAnalyzer::new(self.config.to_analyzer_config()),
            callbacks: self.callbacks.clone(),
            is_running: self.is_running.clone(),
        };
        let outputs = output_tx.clone();

        tracing::info!(exercise = %driver.analyzer.exercise(), "frame driver started");

        let task = tokio::spawn(async move {
            let stall = driver_config.stall_timeout();
            let mut pacing = driver_config.refresh_interval().map(|period| {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });

            loop {
                if !*driver.is_running.read().await {
                    break;
                }

                if let Some(interval) = pacing.as_mut() {
                    tokio::select! {
                        biased;
                        control = control_rx.recv() => {
                            if !driver.apply(control) {
                                break;
                            }
                            continue;
                        }
                        _ = interval.tick() => {}
                    }
                }

                tokio::select! {
                    biased;
                    control = control_rx.recv() => {
                        if !driver.apply(control) {
                            break;
                        }
                    }
                    next = tokio::time::timeout(stall, source.recv()) => match next {
                        Ok(Ok(frame)) => {
                            let output = driver.tick(&frame);
                            latest_tx.send_replace(Some(output.clone()));
                            // no subscribers is fine
                            let _ = output_tx.send(output);
                        }
                        Ok(Err(Error::ChannelClosed(reason))) => {
                            tracing::info!("Landmark source closed: {}", reason);
                            break;
                        }
                        Ok(Err(e)) if source.is_running() => {
                            tracing::warn!("Landmark source error, keeping last output: {}", e);
                        }
                        Ok(Err(e)) => {
                            tracing::error!("Landmark source failed: {}", e);
                            break;
                        }
                        Err(_) => {
                            tracing::debug!(
                                stall_ms = stall.as_millis() as u64,
                                "no frame from source, keeping last output"
                            );
                        }
                    },
                }
            }

            if let Err(e) = source.stop().await {
                tracing::warn!("Failed to stop landmark source: {}", e);
            }
            *driver.is_running.write().await = false;

            let summary = driver.analyzer.summary();
            tracing::info!(
                session = %summary.session_id.0,
                reps = summary.rep_count,
                frames = summary.frames_processed,
                "frame driver stopped"
            );
            driver.analyzer.reset();
            summary
        });

        Ok(DriverHandle {
            control: control_tx,
            outputs,
            latest: latest_rx,
            task,
        })
    }

    /// Returns false when the loop should end
    fn apply(&mut self, control: Option<Control>) -> bool {
        match control {
            Some(Control::Reset) => {
                self.reset();
                true
            }
            Some(Control::Stop) | None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session fed by [`FrameDriver::tick`]; streamed sessions are not visible here
    pub fn analyzer(&self) -> &ExerciseAnalyzer {
        &self.analyzer
    }

    /// Discards smoother and rep/hold state of the [`FrameDriver::tick`] session
    pub fn reset(&mut self) {
        self.analyzer.reset();
    }
}

/// Handle to a driver running on its own task
pub struct DriverHandle {
    control: mpsc::Sender<Control>,
    outputs: broadcast::Sender<FrameOutput>,
    latest: watch::Receiver<Option<FrameOutput>>,
    task: JoinHandle<SessionSummary>,
}

impl DriverHandle {
    /// Receive every output published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FrameOutput> {
        self.outputs.subscribe()
    }

    /// Most recent output; stays in place while the source stalls
    pub fn latest(&self) -> Option<FrameOutput> {
        self.latest.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<FrameOutput>> {
        self.latest.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Start a fresh session without stopping the driver
    pub async fn reset(&self) -> Result<()> {
        self.control
            .send(Control::Reset)
            .await
            .map_err(|_| Error::SessionNotRunning)
    }

    /// Stop the driver, discard session state and return what was recorded
    pub async fn stop(self) -> Result<SessionSummary> {
        // the task may already have ended on its own
        let _ = self.control.send(Control::Stop).await;
        Self::join(self.task, STOP_GRACE).await
    }

    /// Wait for the source to run dry
    pub async fn finished(self) -> Result<SessionSummary> {
        self.task
            .await
            .map_err(|e| Error::Source(format!("driver task failed: {e}")))
    }

    async fn join(task: JoinHandle<SessionSummary>, grace: Duration) -> Result<SessionSummary> {
        match tokio::time::timeout(grace, task).await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => Err(Error::Source(format!("driver task failed: {e}"))),
            Err(_) => Err(Error::Timeout {
                duration_ms: grace.as_millis() as u64,
            }),
        }
    }
}
