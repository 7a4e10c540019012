//! Watchpoints.
//!
//! A watchpoint flags one entity; after each turn the flagged entities are compared between
//! the live state and the undo snapshot and any that changed are reported.

use std::fmt;

use drifter_data::GameDef;
use thiserror::Error;

use crate::state::GameState;

/// Something that can be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    Player,
    Object(usize),
    Npc(usize),
    Event(usize),
    Task(usize),
    Variable(usize),
}

/// Entity classes with per-index watchpoints, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchClass {
    Object,
    Npc,
    Event,
    Task,
    Variable,
}

impl WatchClass {
    pub const ALL: [WatchClass; 5] = [
        WatchClass::Object,
        WatchClass::Npc,
        WatchClass::Event,
        WatchClass::Task,
        WatchClass::Variable,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WatchClass::Object => "Object",
            WatchClass::Npc => "NPC",
            WatchClass::Event => "Event",
            WatchClass::Task => "Task",
            WatchClass::Variable => "Variable",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchError {
    #[error("no {} #{index} to watch (there are {count})", .class.label())]
    OutOfRange { class: WatchClass, index: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debugger {
    player: bool,
    objects: Vec<bool>,
    npcs: Vec<bool>,
    events: Vec<bool>,
    tasks: Vec<bool>,
    variables: Vec<bool>,
}

impl Debugger {
    pub fn new(def: &GameDef) -> Self {
        Self {
            player: false,
            objects: vec![false; def.objects.len()],
            npcs: vec![false; def.npcs.len()],
            events: vec![false; def.events.len()],
            tasks: vec![false; def.tasks.len()],
            variables: vec![false; def.variables.len()],
        }
    }

    /// # Errors
    /// `OutOfRange` if the index doesn't exist in this game.
    pub fn set_watch(&mut self, watch: Watch) -> Result<(), WatchError> {
        self.flag(watch, true)
    }

    /// # Errors
    /// `OutOfRange` if the index doesn't exist in this game.
    pub fn clear_watch(&mut self, watch: Watch) -> Result<(), WatchError> {
        self.flag(watch, false)
    }

    pub fn clear_all(&mut self) {
        self.player = false;
        for class in WatchClass::ALL {
            self.flags_mut(class).fill(false);
        }
    }

    pub fn watching_player(&self) -> bool {
        self.player
    }

    /// Indices watched in one class.
    pub fn watched(&self, class: WatchClass) -> Vec<usize> {
        self.flags(class)
            .iter()
            .enumerate()
            .filter_map(|(idx, on)| on.then_some(idx))
            .collect()
    }

    fn flag(&mut self, watch: Watch, on: bool) -> Result<(), WatchError> {
        let (class, index) = match watch {
            Watch::Player => {
                self.player = on;
                return Ok(());
            },
            Watch::Object(idx) => (WatchClass::Object, idx),
            Watch::Npc(idx) => (WatchClass::Npc, idx),
            Watch::Event(idx) => (WatchClass::Event, idx),
            Watch::Task(idx) => (WatchClass::Task, idx),
            Watch::Variable(idx) => (WatchClass::Variable, idx),
        };
        let flags = self.flags_mut(class);
        let count = flags.len();
        let slot = flags
            .get_mut(index)
            .ok_or(WatchError::OutOfRange { class, index, count })?;
        *slot = on;
        Ok(())
    }

    fn flags(&self, class: WatchClass) -> &[bool] {
        match class {
            WatchClass::Object => &self.objects,
            WatchClass::Npc => &self.npcs,
            WatchClass::Event => &self.events,
            WatchClass::Task => &self.tasks,
            WatchClass::Variable => &self.variables,
        }
    }

    fn flags_mut(&mut self, class: WatchClass) -> &mut Vec<bool> {
        match class {
            WatchClass::Object => &mut self.objects,
            WatchClass::Npc => &mut self.npcs,
            WatchClass::Event => &mut self.events,
            WatchClass::Task => &mut self.tasks,
            WatchClass::Variable => &mut self.variables,
        }
    }

    /// Compare watched entities between `live` and `undo`.
    ///
    /// Returns `None` when there is no undo snapshot to compare against, or when nothing
    /// watched has changed.
    pub fn check_watchpoints(&self, def: &GameDef, live: &GameState, undo: Option<&GameState>) -> Option<WatchReport> {
        let undo = undo?;
        let player = self.player && live.player != undo.player;
        let classes: Vec<(WatchClass, Vec<usize>)> = WatchClass::ALL
            .into_iter()
            .map(|class| {
                let changed: Vec<usize> = self
                    .watched(class)
                    .into_iter()
                    .filter(|&idx| differs(def, live, undo, class, idx))
                    .collect();
                (class, changed)
            })
            .filter(|(_, changed)| !changed.is_empty())
            .collect();
        if !player && classes.is_empty() {
            return None;
        }
        Some(WatchReport { player, classes })
    }
}

fn differs(def: &GameDef, live: &GameState, undo: &GameState, class: WatchClass, idx: usize) -> bool {
    match class {
        WatchClass::Object => live.objects.get(idx) != undo.objects.get(idx),
        WatchClass::Npc => live.npcs.get(idx) != undo.npcs.get(idx),
        WatchClass::Event => live.events.get(idx) != undo.events.get(idx),
        WatchClass::Task => live.tasks.get(idx) != undo.tasks.get(idx),
        WatchClass::Variable => def
            .variables
            .get(idx)
            .is_some_and(|var| live.vars.get(&var.name) != undo.vars.get(&var.name)),
    }
}

/// Watchpoints that fired on one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchReport {
    pub player: bool,
    pub classes: Vec<(WatchClass, Vec<usize>)>,
}

impl WatchReport {
    /// Changed indices for one class; empty if none.
    pub fn triggered(&self, class: WatchClass) -> &[usize] {
        self.classes
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, changed)| changed.as_slice())
            .unwrap_or_default()
    }
}

impl fmt::Display for WatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.player {
            writeln!(f, "--- Player watchpoint triggered.")?;
        }
        for (class, changed) in &self.classes {
            write!(f, "--- {} watchpoint triggered {{ ", class.label())?;
            for idx in changed {
                write!(f, "{idx} ")?;
            }
            writeln!(f, "}}.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drifter_data::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn def() -> GameDef {
        GameDef {
            rooms: vec![RoomDef::default(), RoomDef::default()],
            objects: vec![ObjectDef::default(), ObjectDef::default(), ObjectDef::default(), ObjectDef::default()],
            tasks: vec![TaskDef::default()],
            variables: vec![VariableDef {
                name: "gold".into(),
                kind: VariableKind::Integer,
                initial: "0".into(),
            }],
            ..GameDef::default()
        }
    }

    fn state(def: &GameDef) -> GameState {
        GameState::new(def, &mut StdRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn no_undo_means_no_check() {
        let def = def();
        let mut debugger = Debugger::new(&def);
        debugger.set_watch(Watch::Object(1)).unwrap();
        assert_eq!(debugger.check_watchpoints(&def, &state(&def), None), None);
    }

    #[test]
    fn reports_only_watched_changes() {
        let def = def();
        let mut debugger = Debugger::new(&def);
        debugger.set_watch(Watch::Object(1)).unwrap();
        debugger.set_watch(Watch::Object(3)).unwrap();
        debugger.set_watch(Watch::Player).unwrap();
        let undo = state(&def);
        let mut live = undo.clone();
        live.objects[1].position = Position::InRoom(0);
        live.objects[2].position = Position::InRoom(0);
        live.objects[3].seen = true;
        live.player.room = 1;

        let report = debugger.check_watchpoints(&def, &live, Some(&undo)).unwrap();
        assert_eq!(report.triggered(WatchClass::Object), [1, 3]);
        assert!(report.triggered(WatchClass::Task).is_empty());
        assert_eq!(
            report.to_string(),
            "--- Player watchpoint triggered.\n--- Object watchpoint triggered { 1 3 }.\n"
        );
    }

    #[test]
    fn variable_watch_compares_values() {
        let def = def();
        let mut debugger = Debugger::new(&def);
        debugger.set_watch(Watch::Variable(0)).unwrap();
        let undo = state(&def);
        let mut live = undo.clone();
        assert_eq!(debugger.check_watchpoints(&def, &live, Some(&undo)), None);
        live.vars.put_integer("gold", 10).unwrap();
        let report = debugger.check_watchpoints(&def, &live, Some(&undo)).unwrap();
        assert_eq!(report.triggered(WatchClass::Variable), [0]);
    }

    #[test]
    fn out_of_range_watch_is_rejected() {
        let def = def();
        let mut debugger = Debugger::new(&def);
        assert_eq!(
            debugger.set_watch(Watch::Task(4)),
            Err(WatchError::OutOfRange {
                class: WatchClass::Task,
                index: 4,
                count: 1
            })
        );
    }

    #[test]
    fn clear_all_resets_every_class() {
        let def = def();
        let mut debugger = Debugger::new(&def);
        debugger.set_watch(Watch::Player).unwrap();
        debugger.set_watch(Watch::Object(0)).unwrap();
        debugger.set_watch(Watch::Task(0)).unwrap();
        debugger.clear_watch(Watch::Object(0)).unwrap();
        assert_eq!(debugger.watched(WatchClass::Task), [0]);
        debugger.clear_all();
        assert!(!debugger.watching_player());
        assert!(debugger.watched(WatchClass::Task).is_empty());
    }
}
