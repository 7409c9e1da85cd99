//! End-to-end orchestration: probe, motion, curve, render, assemble

pub mod engine;

pub use engine::{RampEngine, RampSummary};
