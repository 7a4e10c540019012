//! Mutable game state.
//!
//! `GameState` owns one record per authored room, object, task, event and NPC. The counts are
//! fixed at creation from the `GameDef` and never change; only field values do. A snapshot is
//! simply a `clone()`: nothing in here is shared, so an undo copy can never observe later
//! changes to the live state (or the other way around).

use drifter_data::{Character, CharacterSelector, EventStarter, GameDef, ObjectPlacement, Openness, Position};
use rand::Rng;
use serde::{Deserialize, Serialize};
use variantly::Variantly;

use crate::config::DisplayConfig;
use crate::resource::ResourceLatch;
use crate::vars::{VarError, VariableStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomState {
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectState {
    pub position: Position,
    pub openness: Openness,
    /// Current state, 1-based; 0 for stateless objects.
    pub state: i32,
    pub seen: bool,
    pub unmoved: bool,
    /// Static objects that no event has relocated are found through their authored room list.
    pub static_unmoved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    pub done: bool,
    pub scored: bool,
}

/// Where an event is in its lifecycle. Codes match the save file encoding (plus one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Variantly)]
pub enum EventStatus {
    Waiting = 1,
    Running = 2,
    Awaiting = 3,
    Finished = 4,
    Paused = 5,
}

impl EventStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(EventStatus::Waiting),
            2 => Some(EventStatus::Running),
            3 => Some(EventStatus::Awaiting),
            4 => Some(EventStatus::Finished),
            5 => Some(EventStatus::Paused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    pub status: EventStatus,
    pub time: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Variantly)]
pub enum Posture {
    #[default]
    Standing,
    Sitting,
    Lying,
}

impl Posture {
    pub fn code(self) -> i32 {
        match self {
            Posture::Standing => 0,
            Posture::Sitting => 1,
            Posture::Lying => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Posture::Standing),
            1 => Some(Posture::Sitting),
            2 => Some(Posture::Lying),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcState {
    /// Current room, `None` while hidden.
    pub location: Option<usize>,
    pub posture: Posture,
    /// Object the NPC is standing, sitting or lying on.
    pub parent: Option<usize>,
    pub seen: bool,
    /// One counter per authored walk: `<= 0` inactive, otherwise ticks left in the walk.
    pub walksteps: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub room: usize,
    pub posture: Posture,
    pub parent: Option<usize>,
}

/// Which objects and NPCs the current command referred to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub objects: Vec<bool>,
    /// Objects picked up by a multiple reference ("all", "everything").
    pub multiple: Vec<bool>,
    pub npcs: Vec<bool>,
}

impl References {
    fn sized(objects: usize, npcs: usize) -> Self {
        Self {
            objects: vec![false; objects],
            multiple: vec![false; objects],
            npcs: vec![false; npcs],
        }
    }

    pub fn clear(&mut self) {
        self.objects.fill(false);
        self.multiple.fill(false);
        self.npcs.fill(false);
    }

    pub fn has_multiple(&self) -> bool {
        self.multiple.iter().any(|flag| *flag)
    }
}

/// The aggregate root of everything that changes while a game is played.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub rooms: Vec<RoomState>,
    pub objects: Vec<ObjectState>,
    pub tasks: Vec<TaskState>,
    pub events: Vec<EventState>,
    pub npcs: Vec<NpcState>,
    pub vars: VariableStore,
    pub player: PlayerState,
    pub score: i64,
    pub turns: u32,
    pub is_running: bool,
    pub has_completed: bool,
    pub display: DisplayConfig,
    pub resources: ResourceLatch,
    pub references: References,
}

impl GameState {
    /// Build the opening state of a game.
    ///
    /// # Errors
    /// Fails if a declared variable cannot hold its initial value.
    pub fn new<R: Rng>(def: &GameDef, rng: &mut R) -> Result<Self, VarError> {
        let objects = def
            .objects
            .iter()
            .map(|obj| {
                let (position, static_unmoved) = match obj.placement {
                    ObjectPlacement::Static { .. } => (Position::Hidden, true),
                    ObjectPlacement::StaticPartOf(owner) => (Position::PartOf(owner), false),
                    ObjectPlacement::Dynamic { initial } => (initial, false),
                };
                ObjectState {
                    position,
                    openness: obj.openable,
                    state: if obj.is_stateful() { obj.initial_state } else { 0 },
                    seen: false,
                    unmoved: true,
                    static_unmoved,
                }
            })
            .collect();

        let events = def
            .events
            .iter()
            .map(|event| match event.starter {
                EventStarter::Immediate => EventState {
                    status: EventStatus::Waiting,
                    time: 0,
                },
                EventStarter::Random { low, high } => EventState {
                    status: EventStatus::Waiting,
                    time: random_between(rng, low, high),
                },
                EventStarter::AfterTask(_) => EventState {
                    status: EventStatus::Awaiting,
                    time: 0,
                },
            })
            .collect();

        let npcs = def
            .npcs
            .iter()
            .map(|npc| NpcState {
                location: npc.start_room,
                posture: Posture::Standing,
                parent: None,
                seen: false,
                walksteps: vec![0; npc.walks.len()],
            })
            .collect();

        Ok(Self {
            rooms: vec![RoomState::default(); def.rooms.len()],
            objects,
            tasks: vec![TaskState::default(); def.tasks.len()],
            events,
            npcs,
            vars: VariableStore::from_defs(&def.variables)?,
            player: PlayerState {
                room: def.player.start_room,
                ..PlayerState::default()
            },
            score: 0,
            turns: 0,
            is_running: true,
            has_completed: false,
            display: DisplayConfig::default(),
            resources: ResourceLatch::default(),
            references: References::sized(def.objects.len(), def.npcs.len()),
        })
    }

    /// Room a character is in, `None` for a hidden NPC.
    pub fn character_room(&self, character: Character) -> Option<usize> {
        match character {
            Character::Player => Some(self.player.room),
            Character::Npc(npc) => self.npcs.get(npc).and_then(|state| state.location),
        }
    }

    /// Turn an authored character selector into a concrete character. A "referenced"
    /// selector with nobody referenced resolves to `None`.
    pub fn resolve_character(&self, selector: CharacterSelector) -> Option<Character> {
        match selector {
            CharacterSelector::Player => Some(Character::Player),
            CharacterSelector::Npc(npc) => Some(Character::Npc(npc)),
            CharacterSelector::Referenced => self.vars.ref_character.map(Character::Npc),
        }
    }

    /// Mark an object as the one the current command refers to.
    pub fn refer_to_object(&mut self, object: usize) {
        if let Some(flag) = self.references.objects.get_mut(object) {
            *flag = true;
        }
        self.vars.set_ref_object(Some(object));
    }

    /// Add an object to the current multiple reference.
    pub fn refer_to_multiple(&mut self, object: usize) {
        if let Some(flag) = self.references.multiple.get_mut(object) {
            *flag = true;
        }
    }

    pub fn refer_to_npc(&mut self, npc: usize) {
        if let Some(flag) = self.references.npcs.get_mut(npc) {
            *flag = true;
        }
        self.vars.set_ref_character(Some(npc));
    }

    /// Objects a "referenced object" action applies to: the multiple reference if one is
    /// active, otherwise the single referenced object.
    pub fn referenced_objects(&self) -> Vec<usize> {
        if self.references.has_multiple() {
            self.references
                .multiple
                .iter()
                .enumerate()
                .filter_map(|(idx, flag)| flag.then_some(idx))
                .collect()
        } else {
            self.vars.ref_object.into_iter().collect()
        }
    }
}

/// Inclusive random pick that tolerates reversed bounds.
pub(crate) fn random_between<R: Rng>(rng: &mut R, low: i32, high: i32) -> i32 {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    if low == high { low } else { rng.random_range(low..=high) }
}
