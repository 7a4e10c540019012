//! Named game variables.
//!
//! User variables are declared by the game definition and live in a plain map keyed by name.
//! The store also remembers what the player most recently referred to (an object, a character,
//! a number, some text), which the computed system variables in [`crate::sysvars`] read back.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use drifter_data::{VariableDef, VariableKind};
use log::trace;
use thiserror::Error;

/// Version number reported to games that check for the interpreter through a `version`
/// variable initialized to zero.
pub const ENGINE_VERSION_NUMBER: i64 = 4046;
const VERSION_VARIABLE: &str = "version";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VarError {
    #[error("no variable named '{0}'")]
    Unknown(String),
    #[error("variable '{name}' is {existing:?}, cannot store {attempted:?}")]
    TypeChange {
        name: String,
        existing: VariableKind,
        attempted: VariableKind,
    },
    #[error("variable '{name}' has non-integer initial value '{value}'")]
    BadInitial { name: String, value: String },
    #[error("text for variable '{0}' contains a line break")]
    LineBreak(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
    Integer(i64),
    Text(String),
}

impl VarValue {
    pub fn kind(&self) -> VariableKind {
        match self {
            VarValue::Integer(_) => VariableKind::Integer,
            VarValue::Text(_) => VariableKind::Text,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            VarValue::Integer(value) => Some(*value),
            VarValue::Text(_) => None,
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Integer(value) => write!(f, "{value}"),
            VarValue::Text(text) => write!(f, "{text}"),
        }
    }
}

/// User variables plus the player's current reference context.
#[derive(Debug, Clone)]
pub struct VariableStore {
    values: HashMap<String, VarValue>,
    pub ref_character: Option<usize>,
    pub ref_object: Option<usize>,
    pub ref_number: i64,
    pub ref_text: String,
    started: Instant,
    elapsed_offset: i64,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            ref_character: None,
            ref_object: None,
            ref_number: 0,
            ref_text: String::new(),
            started: Instant::now(),
            elapsed_offset: 0,
        }
    }
}

/// The wall clock is not part of a store's value.
impl PartialEq for VariableStore {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && self.ref_character == other.ref_character
            && self.ref_object == other.ref_object
            && self.ref_number == other.ref_number
            && self.ref_text == other.ref_text
    }
}

impl VariableStore {
    /// Build a store holding every declared variable at its initial value.
    ///
    /// # Errors
    /// Fails on an integer variable whose initial text does not parse.
    pub fn from_defs(defs: &[VariableDef]) -> Result<Self, VarError> {
        let mut store = Self::default();
        for def in defs {
            let value = match def.kind {
                VariableKind::Integer => {
                    let text = def.initial.trim();
                    let parsed = if text.is_empty() {
                        0
                    } else {
                        text.parse().map_err(|_| VarError::BadInitial {
                            name: def.name.clone(),
                            value: def.initial.clone(),
                        })?
                    };
                    VarValue::Integer(parsed)
                },
                VariableKind::Text => VarValue::Text(def.initial.clone()),
            };
            store.put(&def.name, value)?;
        }
        Ok(store)
    }

    /// A user-defined variable, if one exists with this name.
    pub fn get(&self, name: &str) -> Option<&VarValue> {
        self.values.get(name)
    }

    /// Store a value, creating the variable on first use.
    ///
    /// # Errors
    /// An existing variable may never change type, and text must fit on one save-file line.
    pub fn put(&mut self, name: &str, value: VarValue) -> Result<(), VarError> {
        if let VarValue::Text(text) = &value
            && text.contains(['\n', '\r'])
        {
            return Err(VarError::LineBreak(name.to_string()));
        }
        match self.values.get_mut(name) {
            Some(existing) => {
                if existing.kind() != value.kind() {
                    return Err(VarError::TypeChange {
                        name: name.to_string(),
                        existing: existing.kind(),
                        attempted: value.kind(),
                    });
                }
                trace!("variable {name} = {value}");
                *existing = value;
            },
            None => {
                let value = match value {
                    VarValue::Integer(0) if name == VERSION_VARIABLE => VarValue::Integer(ENGINE_VERSION_NUMBER),
                    other => other,
                };
                trace!("new variable {name} = {value}");
                self.values.insert(name.to_string(), value);
            },
        }
        Ok(())
    }

    pub fn put_integer(&mut self, name: &str, value: i64) -> Result<(), VarError> {
        self.put(name, VarValue::Integer(value))
    }

    pub fn put_text(&mut self, name: &str, value: impl Into<String>) -> Result<(), VarError> {
        self.put(name, VarValue::Text(value.into()))
    }

    pub fn integer(&self, name: &str) -> Result<i64, VarError> {
        match self.values.get(name) {
            Some(VarValue::Integer(value)) => Ok(*value),
            Some(VarValue::Text(_)) => Err(VarError::TypeChange {
                name: name.to_string(),
                existing: VariableKind::Text,
                attempted: VariableKind::Integer,
            }),
            None => Err(VarError::Unknown(name.to_string())),
        }
    }

    pub fn set_ref_character(&mut self, npc: Option<usize>) {
        self.ref_character = npc;
    }

    pub fn set_ref_object(&mut self, object: Option<usize>) {
        self.ref_object = object;
    }

    pub fn set_ref_number(&mut self, number: i64) {
        self.ref_number = number;
    }

    pub fn set_ref_text(&mut self, text: impl Into<String>) {
        self.ref_text = text.into();
    }

    pub fn elapsed_seconds(&self) -> i64 {
        let running = i64::try_from(self.started.elapsed().as_secs()).unwrap_or(i64::MAX);
        running.saturating_add(self.elapsed_offset)
    }

    /// Rebase the clock so it reads `seconds` now (used after a restore).
    pub fn set_elapsed_seconds(&mut self, seconds: i64) {
        self.started = Instant::now();
        self.elapsed_offset = seconds;
    }
}
