use std::io::{BufReader, Cursor};
use std::sync::Arc;

use drifter_data::*;
use drifter_engine::{EngineConfig, Game, SaveError};

fn def(name: &str) -> GameDef {
    GameDef {
        header: HeaderDef {
            name: name.into(),
            ..HeaderDef::default()
        },
        rooms: vec![
            RoomDef {
                short: "Dock".into(),
                ..RoomDef::default()
            },
            RoomDef {
                short: "Boat".into(),
                ..RoomDef::default()
            },
        ],
        objects: vec![
            ObjectDef {
                short: "crate".into(),
                placement: ObjectPlacement::Dynamic {
                    initial: Position::InRoom(0),
                },
                container: true,
                openable: Openness::Closed,
                ..ObjectDef::default()
            },
            ObjectDef {
                short: "rope".into(),
                placement: ObjectPlacement::Dynamic {
                    initial: Position::InObject(0),
                },
                states: vec!["coiled".into(), "knotted".into()],
                initial_state: 1,
                ..ObjectDef::default()
            },
        ],
        tasks: vec![TaskDef {
            commands: vec!["board".into()],
            actions: vec![
                TaskAction::ChangeObjectStatus {
                    object: 0,
                    status: StateTest::Open,
                },
                TaskAction::MoveObject {
                    object: MoveSelector::Object(1),
                    destination: ObjectDestination::HeldBy(CharacterSelector::Player),
                },
                TaskAction::ChangeObjectStatus {
                    object: 1,
                    status: StateTest::State(2),
                },
                TaskAction::MoveCharacter {
                    character: CharacterSelector::Player,
                    destination: CharacterDestination::Room(1),
                },
                TaskAction::ChangeVariable {
                    variable: "motto".into(),
                    change: VariableChange::SetText("fair winds".into()),
                },
                TaskAction::ChangeScore(7),
            ],
            ..TaskDef::default()
        }],
        events: vec![EventDef {
            starter: EventStarter::AfterTask(0),
            time1: 9,
            time2: 9,
            ..EventDef::default()
        }],
        npcs: vec![NpcDef {
            name: "sailor".into(),
            start_room: Some(1),
            walks: vec![WalkDef {
                looping: true,
                legs: vec![
                    WalkLeg {
                        destination: WalkDestination::Room(0),
                        duration: 2,
                    },
                    WalkLeg {
                        destination: WalkDestination::Room(1),
                        duration: 2,
                    },
                ],
                ..WalkDef::default()
            }],
            ..NpcDef::default()
        }],
        variables: vec![VariableDef {
            name: "motto".into(),
            kind: VariableKind::Text,
            initial: "ahoy".into(),
        }],
        ..GameDef::default()
    }
}

fn game(name: &str) -> Game {
    let config = EngineConfig {
        random_seed: Some(21),
        ..EngineConfig::default()
    };
    Game::create(Arc::new(def(name)), config).unwrap()
}

fn save(game: &Game) -> Vec<u8> {
    let mut out = Vec::new();
    game.save(&mut out).unwrap();
    out
}

#[test]
fn save_then_restore_round_trips_state() {
    let mut game = game("Harbour");
    game.turn(|g| g.run_task(0, true));
    game.turn(|_| Ok(true));
    let snapshot = game.state().clone();
    let saved = save(&game);

    let mut fresh = self::game("Harbour");
    fresh.load(&mut BufReader::new(saved.as_slice())).unwrap();
    assert_eq!(fresh.state(), &snapshot);
    assert_eq!(fresh.variable("motto").unwrap().to_string(), "fair winds");
}

#[test]
fn restore_keeps_player_preferences() {
    let mut game = game("Harbour");
    game.turn(|g| g.run_task(0, true));
    let saved = save(&game);

    let mut fresh = self::game("Harbour");
    fresh.state_mut().display.verbose = true;
    fresh.state_mut().display.bold_room_names = false;
    fresh.state_mut().display.notify_score_change = false;
    fresh.load(&mut Cursor::new(saved)).unwrap();

    let display = fresh.state().display;
    assert!(display.verbose);
    assert!(!display.bold_room_names);
    assert!(!display.notify_score_change);
    assert_eq!(fresh.state().score, 7);
}

#[test]
fn restore_clears_undo() {
    let mut game = game("Harbour");
    game.turn(|g| g.run_task(0, true));
    let mut cursor = Cursor::new(save(&game));
    assert!(game.can_undo());
    game.load(&mut cursor).unwrap();
    assert!(!game.can_undo());
}

#[test]
fn save_from_other_game_is_refused_without_changes() {
    let other = game("Lighthouse");
    let saved = save(&other);

    let mut game = game("Harbour");
    game.turn(|g| g.run_task(0, true));
    let before = game.state().clone();
    let err = game.load(&mut saved.as_slice()).unwrap_err();
    assert!(matches!(err, SaveError::NameMismatch { .. }));
    assert_eq!(game.state(), &before);
}

#[test]
fn count_mismatch_is_refused_without_changes() {
    let mut bigger = def("Harbour");
    bigger.rooms.push(RoomDef {
        short: "Hold".into(),
        ..RoomDef::default()
    });
    let other = Game::create(Arc::new(bigger), EngineConfig::default()).unwrap();
    let saved = save(&other);

    let mut game = game("Harbour");
    let before = game.state().clone();
    let err = game.load(&mut saved.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        SaveError::CountMismatch {
            what: "rooms",
            expected: 2,
            found: 3
        }
    ));
    assert_eq!(game.state(), &before);
}

#[test]
fn garbage_field_is_refused_without_changes() {
    let game_a = game("Harbour");
    let text = String::from_utf8(save(&game_a)).unwrap();
    let mut lines: Vec<&str> = text.split("\r\n").collect();
    lines[6] = "lots";
    let broken = lines.join("\r\n");

    let mut game = game("Harbour");
    let before = game.state().clone();
    let err = game.load(&mut broken.as_bytes()).unwrap_err();
    assert!(matches!(err, SaveError::Parse { line: 7, .. }));
    assert_eq!(game.state(), &before);
}
