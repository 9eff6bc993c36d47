//! Landmark sources feeding the frame driver.
//!
//! The pose model runs outside this crate. It pushes frames through a
//! [`FrameSender`] into a [`ChannelSource`]; recorded sessions are played back
//! with [`ReplaySource`], and any `futures` stream can be wrapped in a
//! [`StreamSource`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use formcheck_core::{Error, LandmarkFrame, Result, Timestamp};

/// Trait for landmark frame producers
#[async_trait]
pub trait LandmarkSource: Send {
    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Waits for the next frame.
    ///
    /// `Error::ChannelClosed` marks a clean end of input. Any other error is
    /// treated as a dropped frame while the source still reports running.
    async fn recv(&mut self) -> Result<LandmarkFrame>;

    fn try_recv(&mut self) -> Option<LandmarkFrame>;
}

/// Producer half handed to the pose model
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<LandmarkFrame>,
}

impl FrameSender {
    pub async fn send(&self, frame: LandmarkFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::ChannelClosed("landmark source dropped".into()))
    }

    /// Sends a flat `(x, y, confidence)` model output.
    ///
    /// Malformed arrays are logged and rejected without closing the channel.
    pub async fn send_flat(&self, values: &[f32], timestamp: Timestamp) -> Result<()> {
        let frame = match LandmarkFrame::from_flat(values, timestamp) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Dropping malformed landmark frame: {}", e);
                return Err(e);
            }
        };
        self.send(frame).await
    }

    /// Non-blocking send; a full queue drops the frame
    pub fn try_send(&self, frame: LandmarkFrame) -> Result<()> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("landmark queue full, frame dropped");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::ChannelClosed("landmark source dropped".into()))
            }
        }
    }
}

/// Source fed by an external pose model through a bounded channel
pub struct ChannelSource {
    rx: mpsc::Receiver<LandmarkFrame>,
    is_running: bool,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (FrameSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            FrameSender { tx },
            Self {
                rx,
                is_running: false,
            },
        )
    }
}

#[async_trait]
impl LandmarkSource for ChannelSource {
    async fn start(&mut self) -> Result<()> {
        self.is_running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.is_running = false;
        self.rx.close();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running
    }

    async fn recv(&mut self) -> Result<LandmarkFrame> {
        if !self.is_running {
            return Err(Error::Source("Source not started".into()));
        }
        self.rx
            .recv()
            .await
            .ok_or_else(|| Error::ChannelClosed("all frame senders dropped".into()))
    }

    fn try_recv(&mut self) -> Option<LandmarkFrame> {
        if !self.is_running {
            return None;
        }
        self.rx.try_recv().ok()
    }
}

/// Plays back a recorded session
pub struct ReplaySource {
    frames: VecDeque<LandmarkFrame>,
    pacing: Option<Duration>,
    is_running: bool,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            pacing: None,
            is_running: false,
        }
    }

    /// Waits `interval` before handing out each frame
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = Some(interval);
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl LandmarkSource for ReplaySource {
    async fn start(&mut self) -> Result<()> {
        self.is_running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.is_running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running
    }

    async fn recv(&mut self) -> Result<LandmarkFrame> {
        if !self.is_running {
            return Err(Error::Source("Replay not started".into()));
        }
        if let Some(interval) = self.pacing {
            tokio::time::sleep(interval).await;
        }
        self.frames
            .pop_front()
            .ok_or_else(|| Error::ChannelClosed("replay exhausted".into()))
    }

    fn try_recv(&mut self) -> Option<LandmarkFrame> {
        if !self.is_running {
            return None;
        }
        self.frames.pop_front()
    }
}

/// Adapts any frame stream into a source
pub struct StreamSource {
    stream: Pin<Box<dyn Stream<Item = LandmarkFrame> + Send>>,
    is_running: bool,
}

impl StreamSource {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = LandmarkFrame> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
            is_running: false,
        }
    }
}

#[async_trait]
impl LandmarkSource for StreamSource {
    async fn start(&mut self) -> Result<()> {
        self.is_running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.is_running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running
    }

    async fn recv(&mut self) -> Result<LandmarkFrame> {
        if !self.is_running {
            return Err(Error::Source("Stream not started".into()));
        }
        self.stream
            .next()
            .await
            .ok_or_else(|| Error::ChannelClosed("stream ended".into()))
    }

    fn try_recv(&mut self) -> Option<LandmarkFrame> {
        None
    }
}
