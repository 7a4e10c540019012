use std::sync::Arc;

use drifter_data::*;
use drifter_engine::npc::walk_leg;
use drifter_engine::{EngineConfig, Game};

fn game(walk: WalkDef) -> Game {
    let def = GameDef {
        header: HeaderDef {
            name: "Walks".into(),
            ..HeaderDef::default()
        },
        rooms: (0..4)
            .map(|n| RoomDef {
                short: format!("Room {n}"),
                ..RoomDef::default()
            })
            .collect(),
        room_groups: vec![RoomGroupDef {
            name: "wing".into(),
            rooms: vec![1, 2, 3],
        }],
        npcs: vec![NpcDef {
            name: "guard".into(),
            start_room: Some(0),
            walks: vec![walk],
            ..NpcDef::default()
        }],
        ..GameDef::default()
    };
    let config = EngineConfig {
        random_seed: Some(99),
        ..EngineConfig::default()
    };
    Game::create(Arc::new(def), config).unwrap()
}

fn steps(game: &Game) -> i32 {
    game.state().npcs[0].walksteps[0]
}

#[test]
fn looping_single_leg_rerolls_once_per_cycle() {
    let walk = WalkDef {
        looping: true,
        legs: vec![WalkLeg {
            destination: WalkDestination::RoomGroup(0),
            duration: 5,
        }],
        ..WalkDef::default()
    };
    let mut game = game(walk.clone());

    // Setup started the walk at 5 and ticked it once.
    let mut seen = vec![steps(&game)];
    for _ in 0..11 {
        game.tick_npcs();
        seen.push(steps(&game));
    }
    assert_eq!(seen, [4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3]);

    let rerolls: Vec<bool> = seen
        .iter()
        .map(|&counter| walk_leg(&walk, counter).is_some_and(|(_, at_start)| at_start))
        .collect();
    assert_eq!(rerolls.iter().filter(|r| **r).count(), 2);
    assert!(rerolls[4] && rerolls[9]);
}

#[test]
fn room_group_destination_holds_for_whole_leg() {
    let mut game = game(WalkDef {
        looping: true,
        legs: vec![WalkLeg {
            destination: WalkDestination::RoomGroup(0),
            duration: 5,
        }],
        ..WalkDef::default()
    });
    let first = game.state().npcs[0].location;
    assert!(matches!(first, Some(1..=3)));
    for _ in 0..3 {
        game.tick_npcs();
        assert_eq!(game.state().npcs[0].location, first);
    }
}

#[test]
fn follow_player_tracks_current_room() {
    let mut game = game(WalkDef {
        looping: true,
        legs: vec![WalkLeg {
            destination: WalkDestination::FollowPlayer,
            duration: 2,
        }],
        ..WalkDef::default()
    });
    assert_eq!(game.state().npcs[0].location, Some(0));
    game.state_mut().player.room = 2;
    game.tick_npcs();
    assert_eq!(game.state().npcs[0].location, Some(2));
}

#[test]
fn later_walk_takes_priority() {
    let def = GameDef {
        header: HeaderDef {
            name: "Walks".into(),
            ..HeaderDef::default()
        },
        rooms: vec![RoomDef::default(), RoomDef::default(), RoomDef::default()],
        npcs: vec![NpcDef {
            name: "guard".into(),
            start_room: Some(0),
            walks: vec![
                WalkDef {
                    looping: true,
                    legs: vec![WalkLeg {
                        destination: WalkDestination::Room(1),
                        duration: 4,
                    }],
                    ..WalkDef::default()
                },
                WalkDef {
                    looping: true,
                    legs: vec![WalkLeg {
                        destination: WalkDestination::Room(2),
                        duration: 4,
                    }],
                    ..WalkDef::default()
                },
            ],
            ..NpcDef::default()
        }],
        ..GameDef::default()
    };
    let mut game = Game::create(Arc::new(def), EngineConfig::default()).unwrap();
    game.tick_npcs();
    let npc = &game.state().npcs[0];
    assert_eq!(npc.location, Some(2));
    // The first walk was started but has not advanced since.
    assert_eq!(npc.walksteps, [4, 2]);
}
