//! # Formcheck Stream
//!
//! Runtime around the form-analysis engine: where frames come from, how often
//! they are processed and where the results go.
//!
//! ## Components
//!
//! - **Sources**: [`LandmarkSource`] implementations fed by a pose model
//!   ([`ChannelSource`]), a recording ([`ReplaySource`]) or any stream
//!   ([`StreamSource`])
//! - **Driver**: [`FrameDriver`] paces itself to the display refresh, tolerates
//!   stalled sources and publishes [`FrameOutput`]s to subscribers
//! - **Overlay**: gated skeleton geometry coloured by the current grade
//! - **Config**: [`EngineConfig`] loaded from file and `FORMCHECK_*` variables

pub mod config;
pub mod driver;
pub mod overlay;
pub mod source;

pub use self::config::*;
pub use driver::*;
pub use overlay::*;
pub use source::*;
