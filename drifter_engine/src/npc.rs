//! NPC walks.
//!
//! An NPC's walks each keep a countdown in `NpcState::walksteps`. A counter starts at the
//! walk's total duration and counts down to zero; which leg the NPC is on follows from how
//! far the counter has run. Only one walk per NPC moves each turn, the last active one.

use std::sync::Arc;

use drifter_data::{Character, Direction, WalkDef, WalkDestination};
use log::{info, trace, warn};

use crate::game::Game;
use crate::state::Posture;

/// Leg index a walk is on for a given counter, and whether the counter is at the very start
/// of that leg (the tick on which a room-group destination is picked).
pub fn walk_leg(walk: &WalkDef, counter: i32) -> Option<(usize, bool)> {
    if counter <= 0 {
        return None;
    }
    let mut threshold: i32 = 0;
    for (leg, step) in walk.legs.iter().enumerate().rev() {
        threshold = threshold.saturating_add(step.duration);
        if counter <= threshold {
            return Some((leg, counter == threshold));
        }
    }
    None
}

fn leave_phrase(direction: Direction) -> String {
    match direction {
        Direction::Up => "up".into(),
        Direction::Down => "down".into(),
        Direction::In => "inside".into(),
        Direction::Out => "outside".into(),
        other => format!("to the {}", other.name()),
    }
}

fn enter_phrase(direction: Direction) -> String {
    match direction {
        Direction::Up => "from above".into(),
        Direction::Down => "from below".into(),
        Direction::In => "from inside".into(),
        Direction::Out => "from outside".into(),
        other => format!("from the {}", other.name()),
    }
}

fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Game {
    /// Advance NPC walks by one turn.
    pub fn tick_npcs(&mut self) {
        let def = Arc::clone(&self.def);
        for (npc, npc_def) in def.npcs.iter().enumerate() {
            for (walk, walk_def) in npc_def.walks.iter().enumerate().rev() {
                let steps = self.state.npcs[npc].walksteps[walk];
                if steps <= 0 {
                    continue;
                }
                if let Some(task) = walk_def.start_task
                    && !self.state.tasks.get(task).is_some_and(|t| t.done)
                {
                    if self.config.trace.npcs {
                        trace!("npc #{npc} walk {walk}: start task #{task} undone, stopping");
                    }
                    self.state.npcs[npc].walksteps[walk] = 0;
                    continue;
                }

                let steps = steps - 1;
                self.state.npcs[npc].walksteps[walk] = steps;
                if steps == 0 {
                    if !walk_def.looping {
                        if self.config.trace.npcs {
                            trace!("npc #{npc} walk {walk} finished");
                        }
                        break;
                    }
                    self.state.npcs[npc].walksteps[walk] = walk_def.total_duration();
                }
                self.tick_walk(npc, walk);
                break;
            }
        }
    }

    /// Begin a walk from its first leg and take that leg's first step.
    pub fn start_walk(&mut self, npc: usize, walk: usize) {
        let Some(walk_def) = self.def.npcs.get(npc).and_then(|n| n.walks.get(walk)) else {
            return;
        };
        self.state.npcs[npc].walksteps[walk] = walk_def.total_duration();
        if self.config.trace.npcs {
            trace!("npc #{npc} walk {walk} started");
        }
        self.tick_walk(npc, walk);
    }

    /// Start every walk that waits on `task`.
    pub(crate) fn start_walks_for_task(&mut self, task: usize) {
        let def = Arc::clone(&self.def);
        for (npc, npc_def) in def.npcs.iter().enumerate() {
            for (walk, walk_def) in npc_def.walks.iter().enumerate() {
                if walk_def.start_task == Some(task) {
                    self.start_walk(npc, walk);
                }
            }
        }
    }

    pub(crate) fn setup_initial_walks(&mut self) {
        let def = Arc::clone(&self.def);
        for (npc, npc_def) in def.npcs.iter().enumerate() {
            for (walk, walk_def) in npc_def.walks.iter().enumerate() {
                if walk_def.start_task.is_none() {
                    self.start_walk(npc, walk);
                }
            }
        }
    }

    fn tick_walk(&mut self, npc: usize, walk: usize) {
        let def = Arc::clone(&self.def);
        let walk_def = &def.npcs[npc].walks[walk];

        if let Some(stop) = walk_def.stopping_task
            && self.state.tasks.get(stop.task).is_some_and(|t| t.done == stop.completed)
        {
            self.state.npcs[npc].walksteps[walk] = 0;
            return;
        }

        let counter = self.state.npcs[npc].walksteps[walk];
        let Some((leg, at_leg_start)) = walk_leg(walk_def, counter) else {
            return;
        };
        let destination = match walk_def.legs[leg].destination {
            WalkDestination::Hidden => None,
            WalkDestination::FollowPlayer => Some(self.state.player.room),
            WalkDestination::Room(room) => Some(room),
            WalkDestination::RoomGroup(group) => {
                if !at_leg_start {
                    return;
                }
                let Some(room) = self.random_group_room(group) else {
                    return;
                };
                Some(room)
            },
        };
        if self.config.trace.npcs {
            trace!("npc #{npc} walk {walk} counter {counter}: leg {leg} -> {destination:?}");
        }
        if self.state.npcs[npc].location != destination {
            self.move_npc(npc, walk, destination);
        }
    }

    fn move_npc(&mut self, npc: usize, walk: usize, destination: Option<usize>) {
        let def = Arc::clone(&self.def);
        let npc_def = &def.npcs[npc];
        let origin = self.state.npcs[npc].location;
        let player_room = self.state.player.room;
        let name = capitalized(&npc_def.full_name());

        if npc_def.show_enter_exit && origin == Some(player_room) {
            let direction = destination.and_then(|dest| def.rooms[player_room].exit_to(dest));
            match direction {
                Some(dir) => self
                    .output
                    .print_line(&format!("{name} {} {}.", npc_def.leave_text, leave_phrase(dir))),
                None => self.output.print_line(&format!("{name} {}.", npc_def.leave_text)),
            }
        }

        let state = &mut self.state.npcs[npc];
        state.location = destination;
        state.posture = Posture::Standing;
        state.parent = None;

        if npc_def.show_enter_exit && destination == Some(player_room) {
            let direction = origin.and_then(|from| def.rooms[player_room].exit_to(from));
            match direction {
                Some(dir) => self
                    .output
                    .print_line(&format!("{name} {} {}.", npc_def.enter_text, enter_phrase(dir))),
                None => self.output.print_line(&format!("{name} {}.", npc_def.enter_text)),
            }
        }

        let Some(room) = destination else {
            return;
        };
        let walk_def = &npc_def.walks[walk];
        if let Some(meet) = walk_def.meet_character
            && let Some(character) = self.state.resolve_character(meet.character)
            && character != Character::Npc(npc)
            && self.state.character_room(character) == Some(room)
        {
            info!("npc #{npc} met {character:?} in room #{room}");
            if let Err(err) = self.run_task(meet.task, true) {
                warn!("npc #{npc} meeting task #{}: {err}", meet.task);
            }
        }
        if let Some(meet) = walk_def.meet_object
            && self.state.indirectly_in_room(&def, meet.object, room)
        {
            info!("npc #{npc} found object #{} in room #{room}", meet.object);
            if let Err(err) = self.run_task(meet.task, true) {
                warn!("npc #{npc} meeting task #{}: {err}", meet.task);
            }
        }
    }

    /// Mark NPCs and objects the player can currently see.
    pub(crate) fn update_seen(&mut self) {
        let room = self.state.player.room;
        for npc in &mut self.state.npcs {
            if npc.location == Some(room) {
                npc.seen = true;
            }
        }
        for obj in 0..self.state.objects.len() {
            if self.state.visible_to_player(&self.def, obj) {
                self.state.objects[obj].seen = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use drifter_data::*;

    fn leg(destination: WalkDestination, duration: i32) -> WalkLeg {
        WalkLeg { destination, duration }
    }

    fn rooms() -> Vec<RoomDef> {
        vec![
            RoomDef {
                short: "Kitchen".into(),
                exits: vec![ExitDef {
                    direction: Direction::North,
                    destination: 1,
                }],
                ..RoomDef::default()
            },
            RoomDef {
                short: "Pantry".into(),
                exits: vec![ExitDef {
                    direction: Direction::South,
                    destination: 0,
                }],
                ..RoomDef::default()
            },
        ]
    }

    fn game(walk: WalkDef) -> Game {
        let def = GameDef {
            rooms: rooms(),
            tasks: vec![TaskDef {
                commands: vec!["whistle".into()],
                ..TaskDef::default()
            }],
            npcs: vec![NpcDef {
                prefix: "the".into(),
                name: "cook".into(),
                start_room: Some(0),
                show_enter_exit: true,
                enter_text: "enters".into(),
                leave_text: "leaves".into(),
                walks: vec![walk],
                ..NpcDef::default()
            }],
            ..GameDef::default()
        };
        let config = EngineConfig {
            random_seed: Some(3),
            ..EngineConfig::default()
        };
        Game::create(Arc::new(def), config).unwrap()
    }

    #[test]
    fn leg_lookup_counts_from_the_end() {
        let walk = WalkDef {
            legs: vec![leg(WalkDestination::Room(0), 2), leg(WalkDestination::Room(1), 3)],
            ..WalkDef::default()
        };
        assert_eq!(walk_leg(&walk, 5), Some((0, true)));
        assert_eq!(walk_leg(&walk, 4), Some((0, false)));
        assert_eq!(walk_leg(&walk, 3), Some((1, true)));
        assert_eq!(walk_leg(&walk, 1), Some((1, false)));
        assert_eq!(walk_leg(&walk, 0), None);
        assert_eq!(walk_leg(&walk, 6), None);
    }

    #[test]
    fn huge_leg_durations_saturate() {
        let walk = WalkDef {
            legs: vec![leg(WalkDestination::Hidden, i32::MAX), leg(WalkDestination::Hidden, 5)],
            ..WalkDef::default()
        };
        assert_eq!(walk.total_duration(), i32::MAX);
        assert_eq!(walk_leg(&walk, 6), Some((0, false)));
        assert_eq!(walk_leg(&walk, i32::MAX), Some((0, true)));
    }

    #[test]
    fn walk_moves_with_narration() {
        let mut game = game(WalkDef {
            legs: vec![leg(WalkDestination::Room(0), 1), leg(WalkDestination::Room(1), 2)],
            ..WalkDef::default()
        });
        // Setup started the walk (counter 3, leg 0) and ticked once (counter 2, leg 1).
        assert_eq!(game.state().npcs[0].walksteps[0], 2);
        assert_eq!(game.state().npcs[0].location, Some(1));
        assert!(game.take_output().contains("The cook leaves to the north."));

        game.tick_npcs();
        assert_eq!(game.state().npcs[0].walksteps[0], 1);
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].walksteps[0], 0);
        assert_eq!(game.state().npcs[0].location, Some(1));
    }

    #[test]
    fn entering_the_player_room_is_narrated() {
        let mut game = game(WalkDef {
            looping: true,
            legs: vec![leg(WalkDestination::Room(1), 1), leg(WalkDestination::Room(0), 1)],
            ..WalkDef::default()
        });
        game.take_output();
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].location, Some(1));
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].location, Some(0));
        assert!(game.take_output().contains("The cook enters from the north."));
    }

    #[test]
    fn start_task_gates_walk() {
        let mut game = game(WalkDef {
            start_task: Some(0),
            legs: vec![leg(WalkDestination::Hidden, 3)],
            ..WalkDef::default()
        });
        assert_eq!(game.state().npcs[0].walksteps[0], 0);
        assert_eq!(game.state().npcs[0].location, Some(0));

        game.run_task(0, true).unwrap();
        assert_eq!(game.state().npcs[0].walksteps[0], 3);
        assert_eq!(game.state().npcs[0].location, None);

        game.state_mut().tasks[0].done = false;
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].walksteps[0], 0);
    }

    #[test]
    fn stopping_task_ends_walk() {
        let mut game = game(WalkDef {
            stopping_task: Some(TaskCondition { task: 0, completed: true }),
            looping: true,
            legs: vec![leg(WalkDestination::Room(1), 4)],
            ..WalkDef::default()
        });
        assert!(game.state().npcs[0].walksteps[0] > 0);
        game.state_mut().tasks[0].done = true;
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].walksteps[0], 0);
    }

    #[test]
    fn meeting_the_player_runs_task() {
        let mut game = game(WalkDef {
            looping: true,
            legs: vec![leg(WalkDestination::Room(1), 1), leg(WalkDestination::Room(0), 1)],
            meet_character: Some(MeetCharacter {
                character: CharacterSelector::Player,
                task: 0,
            }),
            ..WalkDef::default()
        });
        // Setup walked the cook out to the pantry and back into the kitchen.
        assert_eq!(game.state().npcs[0].location, Some(0));
        assert!(game.state().tasks[0].done);
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].location, Some(1));
    }

    #[test]
    fn seen_flags_follow_player_room() {
        let mut game = game(WalkDef {
            legs: vec![leg(WalkDestination::Hidden, 5)],
            ..WalkDef::default()
        });
        assert!(!game.state().npcs[0].seen);
        game.state_mut().npcs[0].location = Some(0);
        game.update_seen();
        assert!(game.state().npcs[0].seen);
    }
}
