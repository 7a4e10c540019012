//! The turn driver.
//!
//! `Game` owns everything a running game needs: the shared definition, the live state, a
//! short history of undo points, the output buffer and the engine's RNG. Task, event and NPC
//! behavior are implemented as further `impl Game` blocks in their own modules.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Arc;

use drifter_data::{GameDef, ValidationError, validate_game};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::debug::{Debugger, Watch, WatchError, WatchReport};
use crate::output::Output;
use crate::resource::ResourceSink;
use crate::serialize::{self, SaveError};
use crate::state::GameState;
use crate::sysvars;
use crate::task::TaskError;
use crate::vars::{VarError, VarValue};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("game data failed validation with {} problem(s): {}", .0.len(), first_problem(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Variable(#[from] VarError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Handled turns that can be stepped back through.
pub const UNDO_DEPTH: usize = 16;

fn first_problem(errors: &[ValidationError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

/// What happened during one call to [`Game::turn`].
#[derive(Debug, Default)]
pub struct TurnReport {
    /// Whether the command was handled and the world advanced.
    pub handled: bool,
    /// A task chain that was cut short; the turn still counts.
    pub aborted: Option<TaskError>,
    pub score_change: i64,
    pub watch: Option<WatchReport>,
}

/// A game in progress.
#[derive(Debug)]
pub struct Game {
    pub(crate) def: Arc<GameDef>,
    pub(crate) state: GameState,
    pub(crate) undo: VecDeque<GameState>,
    pub(crate) output: Output,
    pub(crate) config: EngineConfig,
    pub(crate) rng: StdRng,
    pub(crate) task_depth: usize,
    pub(crate) debugger: Option<Debugger>,
}

impl Game {
    /// Validate a game definition and set up its opening turn.
    ///
    /// # Errors
    /// `Validation` with every problem found, or `Variable` if a variable's initial value
    /// doesn't fit its type.
    pub fn create(def: Arc<GameDef>, config: EngineConfig) -> Result<Self, EngineError> {
        let problems = validate_game(&def);
        if !problems.is_empty() {
            for problem in &problems {
                warn!("invalid game data: {problem}");
            }
            return Err(EngineError::Validation(problems));
        }

        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut state = GameState::new(&def, &mut rng)?;
        state.display = config.display;

        let mut game = Self {
            def,
            state,
            undo: VecDeque::new(),
            output: Output::default(),
            config,
            rng,
            task_depth: 0,
            debugger: None,
        };
        game.setup_initial_walks();
        game.tick_events();
        game.tick_npcs();
        game.update_seen();
        game.mark_visited();
        info!(
            "created game \"{}\" ({} rooms, {} objects, {} tasks, {} events, {} NPCs)",
            game.def.header.name,
            game.def.rooms.len(),
            game.def.objects.len(),
            game.def.tasks.len(),
            game.def.events.len(),
            game.def.npcs.len()
        );
        Ok(game)
    }

    /// Play one turn.
    ///
    /// `command` does the player's action, usually by running one or more tasks, and
    /// reports whether anything handled it. A handled command advances the world: the turn
    /// counter, events and NPCs all move on and the pre-turn state becomes the newest undo point.
    /// An unhandled command leaves the world exactly as it was apart from its own changes.
    pub fn turn<F>(&mut self, command: F) -> TurnReport
    where
        F: FnOnce(&mut Game) -> Result<bool, TaskError>,
    {
        let snapshot = self.state.clone();
        self.task_depth = 0;
        let mut report = TurnReport::default();
        match command(self) {
            Ok(handled) => report.handled = handled,
            Err(err) => {
                warn!("turn {}: command aborted: {err}", self.state.turns + 1);
                report.handled = true;
                report.aborted = Some(err);
            },
        }
        self.task_depth = 0;
        self.state.references.clear();
        if !report.handled {
            return report;
        }

        self.state.turns += 1;
        if self.state.is_running {
            self.tick_events();
            self.tick_npcs();
        }
        self.update_seen();
        self.mark_visited();

        report.score_change = self.state.score - snapshot.score;
        if self.state.display.notify_score_change && report.score_change != 0 {
            let direction = if report.score_change > 0 { "increased" } else { "decreased" };
            self.output.print_line(&format!(
                "(Your score has {direction} by {})",
                report.score_change.abs()
            ));
        }
        if self.undo.len() == UNDO_DEPTH {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
        report.watch = self.check_watchpoints();
        report
    }

    /// Step back to the state before the last handled turn; repeated calls keep going back,
    /// up to [`UNDO_DEPTH`] turns. Display preferences stay as they are now and any playing
    /// sound is stopped.
    pub fn undo(&mut self) -> bool {
        let Some(mut previous) = self.undo.pop_back() else {
            return false;
        };
        previous.display = self.state.display;
        previous.resources = self.state.resources.clone();
        previous.resources.silence();
        self.state = previous;
        info!("undid to turn {}", self.state.turns);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Write the live state in save-file format.
    ///
    /// # Errors
    /// Any I/O failure from `writer`.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), SaveError> {
        serialize::save_game(&self.def, &self.state, writer, self.config.trace.serializer)?;
        info!("saved game at turn {}", self.state.turns);
        Ok(())
    }

    /// Restore a saved game. On any error the live state is untouched.
    ///
    /// # Errors
    /// Truncated or malformed input, or a save from a different game.
    pub fn load<R: BufRead>(&mut self, reader: &mut R) -> Result<(), SaveError> {
        match serialize::load_game(&self.def, &mut self.state, reader, self.config.trace.serializer) {
            Ok(()) => {
                self.undo.clear();
                info!("restored game at turn {}", self.state.turns);
                Ok(())
            },
            Err(err) => {
                warn!("refusing to restore save: {err}");
                Err(err)
            },
        }
    }

    /// Look up a user or system variable.
    ///
    /// # Errors
    /// `Unknown` if no variable has this name.
    pub fn variable(&self, name: &str) -> Result<VarValue, VarError> {
        sysvars::lookup(&self.def, &self.state, name)
    }

    /// Turn on watchpoint checking. Calling it again keeps existing watches.
    pub fn attach_debugger(&mut self) -> &mut Debugger {
        let def = &self.def;
        self.debugger.get_or_insert_with(|| Debugger::new(def))
    }

    pub fn debugger(&self) -> Option<&Debugger> {
        self.debugger.as_ref()
    }

    /// # Errors
    /// `OutOfRange` if the watched index doesn't exist.
    pub fn set_watch(&mut self, watch: Watch) -> Result<(), WatchError> {
        self.attach_debugger().set_watch(watch)
    }

    /// # Errors
    /// `OutOfRange` if the watched index doesn't exist.
    pub fn clear_watch(&mut self, watch: Watch) -> Result<(), WatchError> {
        self.attach_debugger().clear_watch(watch)
    }

    /// Compare watched entities between the live state and the undo point. `None` when no
    /// debugger is attached, nothing changed, or there is no undo point yet.
    pub fn check_watchpoints(&self) -> Option<WatchReport> {
        self.debugger
            .as_ref()
            .and_then(|debugger| debugger.check_watchpoints(&self.def, &self.state, self.undo.back()))
    }

    /// Send pending sound and graphic changes to the front end.
    pub fn sync_resources(&mut self, sink: &mut dyn ResourceSink) {
        self.state.resources.sync(sink);
    }

    pub fn def(&self) -> &GameDef {
        &self.def
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for hosts that resolve player references and the like.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// The most recent undo point.
    pub fn undo_state(&self) -> Option<&GameState> {
        self.undo.back()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Drain the visible text printed so far.
    pub fn take_output(&mut self) -> String {
        self.output.take()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn task_depth(&self) -> usize {
        self.task_depth
    }

    /// Describe the player's current room.
    pub fn look(&mut self) {
        self.print_room_description(self.state.player.room);
        self.print_event_look_text();
    }

    fn mark_visited(&mut self) {
        if let Some(room) = self.state.rooms.get_mut(self.state.player.room) {
            room.visited = true;
        }
    }
}
