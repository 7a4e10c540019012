//! Timed events.
//!
//! Each event runs a small state machine, ticked once per turn:
//!
//! | status   | on tick                                                                 |
//! |----------|-------------------------------------------------------------------------|
//! | Waiting  | count down; at zero start the event                                     |
//! | Running  | starter task undone: Awaiting; pause condition: Paused; else count down |
//! | Awaiting | starter task done: start the event                                      |
//! | Finished | starter task undone: Awaiting                                           |
//! | Paused   | resume condition met: Running                                           |
//!
//! An event that moves into Running from Waiting or Paused is ticked a second time in the
//! same turn so its timer lines up with events that were already running.

use std::sync::Arc;

use drifter_data::{EventDef, EventStarter, RestartType, TaskCondition};
use log::{trace, warn};

use crate::game::Game;
use crate::state::{EventStatus, random_between};
use crate::task::TaskError;

impl Game {
    /// Advance every event by one turn.
    pub fn tick_events(&mut self) {
        for event in 0..self.def.events.len() {
            let before = self.state.events[event].status;
            if let Err(err) = self.tick_event(event) {
                warn!("event #{event}: {err}");
            }
            let after = self.state.events[event].status;
            if matches!(before, EventStatus::Waiting | EventStatus::Paused) && after == EventStatus::Running {
                if self.config.trace.events {
                    trace!("event #{event} entered Running this turn; ticking again");
                }
                if let Err(err) = self.tick_event(event) {
                    warn!("event #{event}: {err}");
                }
            }
        }
    }

    /// Advance one event by a single tick.
    ///
    /// # Errors
    /// Only an affected task run by a finishing event can fail.
    pub fn tick_event(&mut self, event: usize) -> Result<(), TaskError> {
        let def = Arc::clone(&self.def);
        let Some(event_def) = def.events.get(event) else {
            return Ok(());
        };
        let status = self.state.events[event].status;
        if self.config.trace.events {
            trace!(
                "event #{event} \"{}\" tick: {status:?} time {}",
                event_def.short, self.state.events[event].time
            );
        }

        match status {
            EventStatus::Waiting => {
                if self.state.events[event].time > 0 {
                    self.state.events[event].time -= 1;
                }
                if self.state.events[event].time <= 0 {
                    self.start_event(event, event_def);
                    if self.state.events[event].time <= 0 {
                        self.finish_event(event, event_def)?;
                    }
                }
            },
            EventStatus::Running => {
                if !self.starter_done(event_def) {
                    self.set_event(event, EventStatus::Awaiting, 0);
                } else if self.should_pause(event_def) {
                    self.state.events[event].status = EventStatus::Paused;
                } else {
                    self.state.events[event].time -= 1;
                    self.show_notifications(event, event_def);
                    if self.state.events[event].time <= 0 {
                        self.finish_event(event, event_def)?;
                    }
                }
            },
            EventStatus::Awaiting => {
                if self.starter_done(event_def) {
                    self.start_event(event, event_def);
                    if self.should_pause(event_def) {
                        self.state.events[event].status = EventStatus::Paused;
                    } else if self.state.events[event].time <= 0 {
                        self.finish_event(event, event_def)?;
                    }
                }
            },
            EventStatus::Finished => {
                if !self.starter_done(event_def) {
                    self.set_event(event, EventStatus::Awaiting, 0);
                }
            },
            EventStatus::Paused => {
                if !self.should_pause(event_def) {
                    self.state.events[event].status = EventStatus::Running;
                }
            },
        }
        Ok(())
    }

    /// Whether the player's room is one the event can be seen from.
    pub fn event_visible(&self, event: usize) -> bool {
        self.def
            .events
            .get(event)
            .is_some_and(|e| e.rooms.contains(self.state.player.room))
    }

    /// Print the "look" texts of running events visible from the player's room.
    pub(crate) fn print_event_look_text(&mut self) {
        let def = Arc::clone(&self.def);
        for (event, event_def) in def.events.iter().enumerate() {
            if self.state.events[event].status == EventStatus::Running && self.event_visible(event) {
                self.output.print_line(&event_def.look_text);
            }
        }
    }

    fn set_event(&mut self, event: usize, status: EventStatus, time: i32) {
        let state = &mut self.state.events[event];
        state.status = status;
        state.time = time;
    }

    /// Events without a starter task behave as if it were always done.
    fn starter_done(&self, event_def: &EventDef) -> bool {
        match event_def.starter {
            EventStarter::AfterTask(task) => self.state.tasks.get(task).is_some_and(|t| t.done),
            EventStarter::Immediate | EventStarter::Random { .. } => true,
        }
    }

    fn condition_met(&self, condition: Option<TaskCondition>) -> bool {
        condition.is_some_and(|c| self.state.tasks.get(c.task).is_some_and(|t| t.done == c.completed))
    }

    /// Paused while the pauser is satisfied and the resumer isn't.
    fn should_pause(&self, event_def: &EventDef) -> bool {
        self.condition_met(event_def.pauser) && !self.condition_met(event_def.resumer)
    }

    fn start_event(&mut self, event: usize, event_def: &EventDef) {
        if self.config.trace.events {
            trace!("event #{event} starting");
        }
        if let Some(start_move) = event_def.start_move {
            self.move_object(start_move.object, start_move.destination, true);
        }
        if self.event_visible(event) {
            self.output.print_line(&event_def.start_text);
            if let Some(resource) = &event_def.start_resource {
                self.state.resources.handle(resource);
            }
        }
        let time = random_between(&mut self.rng, event_def.time1, event_def.time2);
        self.set_event(event, EventStatus::Running, time);
    }

    fn show_notifications(&mut self, event: usize, event_def: &EventDef) {
        if !self.event_visible(event) {
            return;
        }
        let time = self.state.events[event].time;
        for note in event_def.notifications.iter().filter(|note| note.at == time) {
            self.output.print_line(&note.text);
            if let Some(resource) = &note.resource {
                self.state.resources.handle(resource);
            }
        }
    }

    fn finish_event(&mut self, event: usize, event_def: &EventDef) -> Result<(), TaskError> {
        if self.config.trace.events {
            trace!("event #{event} finishing, restart {:?}", event_def.restart);
        }
        if self.event_visible(event) {
            self.output.print_line(&event_def.finish_text);
            if let Some(resource) = &event_def.finish_resource {
                self.state.resources.handle(resource);
            }
        }
        for finish_move in &event_def.finish_moves {
            self.move_object(finish_move.object, finish_move.destination, true);
        }

        let affected = match event_def.affected_task {
            Some(affected) if self.task_can_run_in_room(affected.task) => {
                self.run_task(affected.task, affected.forwards).map(|_| ())
            },
            _ => Ok(()),
        };

        match event_def.restart {
            RestartType::Never => self.set_event(event, EventStatus::Finished, 0),
            RestartType::Immediately if self.def.header.version.is_legacy() => {
                // Older data skips the start actions and resumes one tick short.
                let time = random_between(&mut self.rng, event_def.time1, event_def.time2) - 1;
                self.set_event(event, EventStatus::Running, time);
            },
            RestartType::Immediately => self.start_event(event, event_def),
            RestartType::AfterDelay => match event_def.starter {
                EventStarter::AfterTask(_) => self.set_event(event, EventStatus::Awaiting, 0),
                EventStarter::Random { low, high } => {
                    let time = random_between(&mut self.rng, low, high);
                    self.set_event(event, EventStatus::Waiting, time);
                },
                EventStarter::Immediate => self.set_event(event, EventStatus::Waiting, 0),
            },
        }
        affected
    }
}
