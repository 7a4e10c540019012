use std::path::Path;

use drifter_engine::{EngineConfig, Game, load_game_def};

fn demo() -> Game {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/demo.ron");
    let def = load_game_def(&path).unwrap();
    let config = EngineConfig {
        random_seed: Some(2026),
        ..EngineConfig::default()
    };
    Game::create(def, config).unwrap()
}

fn play(game: &mut Game, input: &str) -> String {
    let report = game.turn(|g| g.run_command(input));
    assert!(report.handled, "\"{input}\" was not handled");
    assert!(report.aborted.is_none());
    game.take_output()
}

#[test]
fn demo_loads_and_reports_engine_version() {
    let game = demo();
    assert_eq!(game.def().header.name, "The Lighthouse");
    assert_eq!(game.def().max_score(), 20);
    assert_eq!(game.variable("version").unwrap().as_integer(), Some(4046));
    assert_eq!(game.state().player.room, 0);
}

#[test]
fn demo_can_be_won() {
    let mut game = demo();
    assert!(play(&mut game, "get lantern").contains("You pick up the lantern."));
    assert!(play(&mut game, "N").contains("Lighthouse Base"));
    assert!(play(&mut game, "get key").contains("You see no key here."));
    assert!(play(&mut game, "up").contains("The gate is shut."));
    assert!(play(&mut game, "open chest").contains("The lid creaks open."));
    assert!(play(&mut game, "get key").contains("You take the iron key."));
    assert!(play(&mut game, "unlock gate").contains("the gate swings open"));
    assert!(play(&mut game, "up").contains("Lamp Room"));

    let ending = play(&mut game, "light lamp");
    assert!(ending.contains("The great lamp blazes out over the water."));
    assert!(ending.contains("*** You have won ***"));
    assert!(!game.is_running());
    assert!(game.state().has_completed);
    assert_eq!(game.state().score, 20);
    assert_eq!(game.variable("lamps_lit").unwrap().as_integer(), Some(1));
    assert_eq!(game.state().turns, 9);
}

#[test]
fn commands_respect_task_rooms() {
    let mut game = demo();
    let report = game.turn(|g| g.run_command("open chest"));
    assert!(!report.handled);
    assert_eq!(game.state().turns, 0);
}

#[test]
fn demo_survives_save_and_restore() {
    let mut game = demo();
    play(&mut game, "get lantern");
    play(&mut game, "north");
    let mut saved = Vec::new();
    game.save(&mut saved).unwrap();
    let snapshot = game.state().clone();

    let mut restored = demo();
    restored.load(&mut saved.as_slice()).unwrap();
    assert_eq!(restored.state(), &snapshot);
    assert!(play(&mut restored, "open chest").contains("The lid creaks open."));
}

#[test]
fn hint_appears_where_it_helps() {
    let mut game = demo();
    assert_eq!(game.hints().count(), 0);
    play(&mut game, "north");
    let questions: Vec<&str> = game.hints().map(|(_, hint)| hint.question.as_str()).collect();
    assert_eq!(questions, ["Where is the key to the gate?"]);
    play(&mut game, "open chest");
    assert_eq!(game.hints().count(), 0);
}
