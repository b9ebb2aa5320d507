//! Role inference for hidden-role village games.
//!
//! Observed events are folded into an [`evidence::EvidenceMatrix`] of pairwise
//! log-relative-likelihoods; complete role hypotheses ([`assignment::Assignment`])
//! are scored against that matrix and ranked by [`assignment::AssignmentSearch`].
//! [`engine::Engine`] ties the pieces together for one game.

pub mod assignment;
pub mod audit;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod game;
pub mod model;

pub use engine::{Engine, EngineConfig, GameSetup};
pub use error::EngineError;
