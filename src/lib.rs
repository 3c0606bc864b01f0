pub mod actions;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod model;
pub mod permissions;
pub mod platform;
pub mod progress;
pub mod scanner;

pub use crate::config::{Config, ConfigOrigin};
pub use decision::{Decision, PhaseState, Prompter};
pub use engine::{Engine, Operation, RunSummary};
pub use error::{Error, Result};
pub use progress::{ProgressReporter, SilentReporter};
