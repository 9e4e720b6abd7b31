//! Concrete detection engines.
//!
//! The predictor only depends on the [`DetectionEngine`](crate::traits::DetectionEngine)
//! and [`EngineLoader`](crate::traits::EngineLoader) traits; model backends
//! live outside this crate and plug in the same way as the engine below.

pub mod component;

pub use component::{ComponentEngine, ComponentEngineLoader, ComponentEngineParams};
