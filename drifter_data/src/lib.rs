//! Compiled game definition for Drifter games.
//!
//! Everything in here is authored content: it is loaded once, validated, and then shared
//! read-only by every running game state and snapshot.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_game};
