//! Task execution.
//!
//! Running a task checks its restrictions, marks it done, prints its texts and applies its
//! actions. Actions can run other tasks, so execution is recursive; the depth is capped to
//! stop authored redirect loops from running away.

use std::sync::Arc;

use drifter_data::{
    Character, CharacterDestination, GameEnding, HintDef, MoveSelector, ObjectDef, ObjectDestination, Openness, Position,
    SetTaskMode, StateTest, TaskAction, TaskDef, VariableChange, VariableKind,
};
use log::{error, trace, warn};
use rand::Rng;
use thiserror::Error;

use crate::game::Game;
use crate::restriction::{RestrictionError, RestrictionEvaluator, RestrictionOutcome};
use crate::state::Posture;
use crate::sysvars;
use crate::vars::{VarError, VarValue};

/// Deepest allowed nesting of task runs.
pub const MAX_TASK_DEPTH: usize = 128;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task #{task} exceeded the nesting limit of {MAX_TASK_DEPTH}; likely a task redirect loop")]
    RecursionLimit { task: usize },
    #[error("task #{0} does not exist")]
    OutOfRange(usize),
    #[error(transparent)]
    Restriction(#[from] RestrictionError),
    #[error(transparent)]
    Variable(#[from] VarError),
}

impl Game {
    /// Run a task forwards or backwards.
    ///
    /// Returns `true` when the task handled the command (it ran, or it printed a refusal) and
    /// `false` when it did not apply and the caller should try something else.
    ///
    /// # Errors
    /// `RecursionLimit` aborts the whole chain of nested task runs; variable type errors mean
    /// the game data is inconsistent.
    pub fn run_task(&mut self, task: usize, forwards: bool) -> Result<bool, TaskError> {
        if task >= self.def.tasks.len() {
            return Err(TaskError::OutOfRange(task));
        }
        if self.task_depth >= MAX_TASK_DEPTH {
            warn!("task #{task} aborted at nesting depth {}: likely an authored loop", self.task_depth);
            return Err(TaskError::RecursionLimit { task });
        }
        self.task_depth += 1;
        let result = self.run_task_body(task, forwards);
        self.task_depth -= 1;
        result
    }

    /// Run a task whose forward or reverse command text matches `input` exactly (ignoring
    /// case and surrounding spaces) and that is allowed in the player's room.
    ///
    /// The first matching task whose restrictions pass is run and ends the search. Only when
    /// no such task exists does a matching task that fails with a message get to print it.
    ///
    /// # Errors
    /// As for [`Game::run_task`].
    pub fn run_command(&mut self, input: &str) -> Result<bool, TaskError> {
        let wanted = input.trim().to_lowercase();
        let matches = |commands: &[String]| commands.iter().any(|cmd| cmd.trim().to_lowercase() == wanted);
        let def = Arc::clone(&self.def);

        let mut restricted = Vec::new();
        for (task, task_def) in def.tasks.iter().enumerate() {
            if !self.task_can_run_in_room(task) {
                continue;
            }
            for (forwards, commands) in [(true, &task_def.commands), (false, &task_def.reverse_commands)] {
                if !matches(commands) {
                    continue;
                }
                if self.restriction_outcome(task).is_some_and(|outcome| outcome.passed) {
                    return self.run_task(task, forwards);
                }
                restricted.push(task);
            }
        }

        for task in restricted {
            let outcome = self.restriction_outcome(task);
            if let Some(message) = outcome.and_then(|outcome| outcome.fail_message(&def.tasks[task])) {
                if self.config.trace.tasks {
                    trace!("task #{task} refuses \"{wanted}\"");
                }
                self.output.print_line(message);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Hints for the tasks the player could usefully run right now, in task order.
    pub fn hints(&self) -> impl Iterator<Item = (usize, &HintDef)> + '_ {
        self.def.tasks.iter().enumerate().filter_map(move |(task, task_def)| {
            let hint = task_def.hint.as_ref()?;
            let open = task_def.repeatable || !self.state.tasks[task].done;
            let runnable = open
                && self.task_can_run_in_room(task)
                && self.restriction_outcome(task).is_some_and(|outcome| outcome.passed);
            runnable.then_some((task, hint))
        })
    }

    fn restriction_outcome(&self, task: usize) -> Option<RestrictionOutcome> {
        match self.check_restrictions(task) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                error!("task #{task}: {err}");
                None
            },
        }
    }

    fn run_task_body(&mut self, task: usize, forwards: bool) -> Result<bool, TaskError> {
        let def = Arc::clone(&self.def);
        let task_def = &def.tasks[task];
        if self.config.trace.tasks {
            trace!("running task #{task} forwards={forwards} depth={}", self.task_depth);
        }

        if !forwards {
            return Ok(self.reverse_task(task, task_def));
        }

        let outcome = match self.check_restrictions(task) {
            Ok(outcome) => outcome,
            Err(TaskError::Restriction(err)) => {
                error!("task #{task}: {err}");
                return Ok(false);
            },
            Err(err) => return Err(err),
        };
        if !outcome.passed {
            return Ok(match outcome.fail_message(task_def) {
                Some(message) => {
                    self.output.print_line(message);
                    true
                },
                None => false,
            });
        }

        if self.state.tasks[task].done && !task_def.repeatable {
            if task_def.repeat_text.is_empty() {
                return Ok(false);
            }
            self.output.print_line(&task_def.repeat_text);
            return Ok(true);
        }

        self.state.tasks[task].done = true;
        self.output.print_line(&task_def.completion_text);
        if let Some(resource) = &task_def.resource {
            self.state.resources.handle(resource);
        }

        let was_suppressed = self.output.is_suppressed();
        let result = self.run_actions(task, task_def);
        if result.is_ok() {
            self.start_walks_for_task(task);
            if !self.state.is_running {
                self.output.set_suppressed(true);
            }
            if let Some(room) = task_def.show_room {
                self.print_room_description(room);
            }
            self.output.print_line(&task_def.additional_text);
        }
        self.output.set_suppressed(was_suppressed);
        result.map(|()| true)
    }

    /// Every action runs, even after one of them ends the game; later output is produced
    /// but kept out of the visible buffer.
    fn run_actions(&mut self, task: usize, task_def: &TaskDef) -> Result<(), TaskError> {
        for action in &task_def.actions {
            if !self.state.is_running {
                self.output.set_suppressed(true);
            }
            if self.config.trace.tasks {
                trace!("task #{task} action {action:?}");
            }
            self.run_action(task, task_def, action)?;
        }
        Ok(())
    }

    /// Evaluate a task's restrictions against the live state without running it.
    ///
    /// # Errors
    /// `OutOfRange` for a bad index, `Restriction` for a malformed combination.
    pub fn check_restrictions(&self, task: usize) -> Result<RestrictionOutcome, TaskError> {
        let task_def = self.def.tasks.get(task).ok_or(TaskError::OutOfRange(task))?;
        let evaluator = RestrictionEvaluator::new(&self.def, &self.state, self.config.trace.restrictions);
        Ok(evaluator.evaluate(task_def)?)
    }

    fn reverse_task(&mut self, task: usize, task_def: &TaskDef) -> bool {
        if !task_def.reversible || !self.state.tasks[task].done {
            return false;
        }
        self.state.tasks[task].done = false;
        if task_def.reverse_text.is_empty() {
            false
        } else {
            self.output.print_line(&task_def.reverse_text);
            true
        }
    }

    fn run_action(&mut self, task: usize, task_def: &TaskDef, action: &TaskAction) -> Result<(), TaskError> {
        match action {
            TaskAction::MoveObject { object, destination } => {
                let targets: Vec<usize> = match object {
                    MoveSelector::AllHeldByPlayer => self.objects_at(Position::HeldByPlayer),
                    MoveSelector::AllWornByPlayer => self.objects_at(Position::WornByPlayer),
                    MoveSelector::Referenced => self.state.referenced_objects(),
                    MoveSelector::Object(obj) => vec![*obj],
                };
                for obj in targets {
                    self.move_object(obj, *destination, false);
                }
            },
            TaskAction::MoveCharacter { character, destination } => {
                if let Some(character) = self.state.resolve_character(*character) {
                    self.move_character(character, *destination);
                }
            },
            TaskAction::ChangeObjectStatus { object, status } => self.change_object_status(*object, *status),
            TaskAction::ChangeVariable { variable, change } => self.change_variable(variable, change)?,
            TaskAction::ChangeScore(points) => self.change_score(task, task_def, *points),
            TaskAction::SetTask { task: target, mode } => match mode {
                SetTaskMode::Set => {
                    if let Some(state) = self.state.tasks.get_mut(*target) {
                        state.done = true;
                    }
                },
                SetTaskMode::Execute => {
                    self.run_task(*target, true)?;
                },
                SetTaskMode::Unset => {
                    self.run_task(*target, false)?;
                },
            },
            TaskAction::EndGame(ending) => self.end_game(*ending),
        }
        Ok(())
    }

    fn objects_at(&self, position: Position) -> Vec<usize> {
        self.state
            .objects
            .iter()
            .enumerate()
            .filter_map(|(idx, obj)| (obj.position == position).then_some(idx))
            .collect()
    }

    /// Move an object to an authored destination. Static scenery only leaves its room list
    /// when `relocate_static` is set (event moves); otherwise its placement is ignored.
    pub(crate) fn move_object(&mut self, obj: usize, destination: ObjectDestination, relocate_static: bool) {
        let Some(state) = self.state.objects.get(obj) else {
            return;
        };
        if state.static_unmoved && !relocate_static {
            warn!("ignoring task move of static object #{obj}");
            return;
        }
        let position = match destination {
            ObjectDestination::Hidden => Position::Hidden,
            ObjectDestination::Room(room) => Position::InRoom(room),
            ObjectDestination::RoomGroup(group) => match self.random_group_room(group) {
                Some(room) => Position::InRoom(room),
                None => Position::Hidden,
            },
            ObjectDestination::Into(container) => Position::InObject(container),
            ObjectDestination::Onto(surface) => Position::OnObject(surface),
            ObjectDestination::HeldBy(who) => match self.state.resolve_character(who) {
                Some(Character::Player) => Position::HeldByPlayer,
                Some(Character::Npc(npc)) => Position::HeldByNpc(npc),
                None => return,
            },
            ObjectDestination::WornBy(who) => match self.state.resolve_character(who) {
                Some(Character::Player) => Position::WornByPlayer,
                Some(Character::Npc(npc)) => Position::WornByNpc(npc),
                None => return,
            },
            ObjectDestination::SameRoomAs(who) => match self.state.resolve_character(who) {
                Some(character) => self
                    .state
                    .character_room(character)
                    .map_or(Position::Hidden, Position::InRoom),
                None => return,
            },
        };
        if relocate_static {
            self.state.objects[obj].static_unmoved = false;
        }
        if self.config.trace.objects {
            trace!("object #{obj} -> {position:?}");
        }
        self.state.place_object(obj, position);
    }

    fn move_character(&mut self, character: Character, destination: CharacterDestination) {
        let current_room = self.state.character_room(character);
        let (room, posture, parent) = match destination {
            CharacterDestination::Hidden => (None, Posture::Standing, None),
            CharacterDestination::Room(room) => (Some(room), Posture::Standing, None),
            CharacterDestination::RoomGroup(group) => (self.random_group_room(group), Posture::Standing, None),
            CharacterDestination::SameRoomAs(other) => {
                let Some(other) = self.state.resolve_character(other) else {
                    return;
                };
                (self.state.character_room(other), Posture::Standing, None)
            },
            CharacterDestination::StandingOn(obj) => (current_room, Posture::Standing, Some(obj)),
            CharacterDestination::SittingOn(obj) => (current_room, Posture::Sitting, Some(obj)),
            CharacterDestination::LyingOn(obj) => (current_room, Posture::Lying, Some(obj)),
        };
        match character {
            Character::Player => {
                // The player can't be hidden; keep them where they are.
                let Some(room) = room else {
                    return;
                };
                let player = &mut self.state.player;
                player.room = room;
                player.posture = posture;
                player.parent = parent;
            },
            Character::Npc(npc) => {
                if let Some(state) = self.state.npcs.get_mut(npc) {
                    state.location = room;
                    state.posture = posture;
                    state.parent = parent;
                }
            },
        }
    }

    fn change_object_status(&mut self, obj: usize, status: StateTest) {
        let openable = self.def.objects.get(obj).is_some_and(ObjectDef::is_openable);
        let Some(state) = self.state.objects.get_mut(obj) else {
            return;
        };
        match status {
            StateTest::Open if openable => state.openness = Openness::Open,
            StateTest::Closed if openable => state.openness = Openness::Closed,
            StateTest::Locked if openable => state.openness = Openness::Locked,
            StateTest::State(value) => state.state = value,
            _ => warn!("object #{obj} is not openable; status change {status:?} ignored"),
        }
    }

    fn change_variable(&mut self, name: &str, change: &VariableChange) -> Result<(), VarError> {
        let integer_of = |game: &Game, var: &str| -> Result<i64, VarError> {
            match sysvars::lookup(&game.def, &game.state, var)? {
                VarValue::Integer(value) => Ok(value),
                VarValue::Text(_) => Err(VarError::TypeChange {
                    name: var.to_string(),
                    existing: VariableKind::Text,
                    attempted: VariableKind::Integer,
                }),
            }
        };
        if self.state.vars.get(name).is_none() {
            return Err(VarError::Unknown(name.to_string()));
        }
        let value = match change {
            VariableChange::Set(value) => VarValue::Integer(*value),
            VariableChange::Add(delta) => VarValue::Integer(self.state.vars.integer(name)?.saturating_add(*delta)),
            VariableChange::Random { low, high } => {
                let (low, high) = if low <= high { (*low, *high) } else { (*high, *low) };
                VarValue::Integer(self.rng.random_range(low..=high))
            },
            VariableChange::SetFromReferenced => VarValue::Integer(self.state.vars.ref_number),
            VariableChange::SetFromVariable(other) => VarValue::Integer(integer_of(self, other)?),
            VariableChange::AddVariable(other) => {
                VarValue::Integer(self.state.vars.integer(name)?.saturating_add(integer_of(self, other)?))
            },
            VariableChange::SetText(text) => VarValue::Text(text.clone()),
            VariableChange::SetTextFromReferenced => VarValue::Text(self.state.vars.ref_text.clone()),
        };
        if self.config.trace.variables {
            trace!("variable {name} <- {value}");
        }
        self.state.vars.put(name, value)
    }

    /// Positive awards count once per task unless the task allows rescoring; penalties
    /// always apply.
    fn change_score(&mut self, task: usize, task_def: &TaskDef, points: i64) {
        if points > 0 {
            let scored = &mut self.state.tasks[task].scored;
            if *scored && !task_def.rescore {
                return;
            }
            *scored = true;
        }
        self.state.score += points;
    }

    fn end_game(&mut self, ending: GameEnding) {
        match ending {
            GameEnding::Win => {
                self.output.print_line("*** You have won ***");
                self.state.has_completed = true;
            },
            GameEnding::Lose => self.output.print_line("*** You have lost ***"),
            GameEnding::Neutral => {},
        }
        self.state.is_running = false;
    }

    pub(crate) fn random_group_room(&mut self, group: usize) -> Option<usize> {
        let rooms = &self.def.room_groups.get(group)?.rooms;
        if rooms.is_empty() {
            return None;
        }
        let pick = self.rng.random_range(0..rooms.len());
        Some(rooms[pick])
    }

    pub(crate) fn print_room_description(&mut self, room: usize) {
        let Some(room_def) = self.def.rooms.get(room) else {
            return;
        };
        self.output.print_line(&room_def.short);
        self.output.print_line(&room_def.long);
    }

    /// Whether a task may run with the player in their current room.
    pub fn task_can_run_in_room(&self, task: usize) -> bool {
        self.def
            .tasks
            .get(task)
            .is_some_and(|t| t.rooms.contains(self.state.player.room))
    }
}
