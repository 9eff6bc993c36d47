//! # Formcheck-Core
//!
//! Core types and utilities for the Formcheck real-time exercise
//! form-analysis engine: the 17-point landmark schema, confidence
//! gating, temporal smoothing and joint geometry.

pub mod error;
pub mod gate;
pub mod geometry;
pub mod smoothing;
pub mod types;

pub use error::{Error, Result};
pub use gate::*;
pub use geometry::*;
pub use smoothing::*;
pub use types::*;
