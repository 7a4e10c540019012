#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const DRIFTER_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod config;
pub mod debug;
pub mod event;
pub mod game;
pub mod loader;
pub mod npc;
pub mod object;
pub mod output;
pub mod resource;
pub mod restriction;
pub mod serialize;
pub mod state;
pub mod sysvars;
pub mod task;
pub mod vars;

// Re-exports for convenience
pub use config::{DisplayConfig, EngineConfig, TraceConfig};
pub use debug::{Debugger, Watch, WatchClass, WatchError, WatchReport};
pub use game::{EngineError, Game, TurnReport, UNDO_DEPTH};
pub use loader::{load_game_def, parse_game_def};
pub use output::Output;
pub use resource::{ResourceLatch, ResourceSink};
pub use restriction::{RestrictionError, RestrictionOutcome, evaluate_combination};
pub use serialize::SaveError;
pub use state::{EventStatus, GameState, Posture};
pub use task::{MAX_TASK_DEPTH, TaskError};
pub use vars::{VarError, VarValue, VariableStore};
