#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Drifter **
//! Console runner for compiled adventure games

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use drifter_engine::{EngineConfig, Game, ResourceSink, Watch, load_game_def};
use log::{debug, info};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[derive(Parser)]
#[command(author, version, about = "Play a compiled Drifter adventure game.")]
struct Cli {
    /// Game definition file (RON).
    game: PathBuf,
    /// Engine configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for event and walk randomness; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// Report changes to the player after every turn.
    #[arg(long)]
    watch_player: bool,
}

/// Prints media requests instead of playing them.
struct ConsoleSink;

impl ResourceSink for ConsoleSink {
    fn request_sound(&mut self, name: &str, _offset: u64, _length: u64) {
        println!("{}", format!("[sound: {name}]").dimmed());
    }

    fn request_graphic(&mut self, name: &str, _offset: u64, _length: u64) {
        println!("{}", format!("[picture: {name}]").dimmed());
    }

    fn stop_sound(&mut self) {
        println!("{}", "[sound stops]".dimmed());
    }
}

/// Print pending output, showing room names in bold if the player wants them.
fn flush(game: &mut Game, sink: &mut ConsoleSink) {
    game.sync_resources(sink);
    let text = game.take_output();
    let bold = game.state().display.bold_room_names;
    for line in text.lines() {
        if bold && game.def().rooms.iter().any(|room| room.short == line) {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let def = load_game_def(&cli.game).context("while loading game")?;
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.seed.is_some() {
        config.random_seed = cli.seed;
    }
    let mut game = Game::create(def, config).context("while starting game")?;
    if cli.watch_player {
        game.set_watch(Watch::Player)?;
    }
    info!("Starting the game!");

    let header = &game.def().header;
    println!("{}", header.name.bright_yellow().underline());
    if !header.author.is_empty() {
        println!("by {}", header.author.italic());
    }
    if !header.startup_text.is_empty() {
        println!("\n{}", header.startup_text);
    }
    println!();
    game.look();
    let mut sink = ConsoleSink;
    flush(&mut game, &mut sink);

    let mut editor = DefaultEditor::new()?;
    while game.is_running() {
        let prompt = format!("\n[Turn: {}|Score: {}]> ", game.state().turns, game.state().score)
            .cyan()
            .to_string();
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if let Err(err) = editor.add_history_entry(line.as_str()) {
            debug!("could not add history entry: {err}");
        }
        let input = line.trim();
        let (verb, rest) = input.split_once(' ').unwrap_or((input, ""));

        match verb.to_lowercase().as_str() {
            "" => continue,
            "quit" | "q" => break,
            "look" | "l" => game.look(),
            "undo" => {
                if !game.undo() {
                    println!("{}", "There is nothing to undo.".yellow());
                }
            },
            "verbose" => {
                game.state_mut().display.verbose = true;
                println!("Rooms will be described every time you enter them.");
            },
            "brief" => {
                game.state_mut().display.verbose = false;
                println!("Rooms will be described when you look.");
            },
            "notify" => {
                let display = &mut game.state_mut().display;
                display.notify_score_change = !display.notify_score_change;
                let state = if display.notify_score_change { "on" } else { "off" };
                println!("Score notification is now {state}.");
            },
            "save" if !rest.is_empty() => match File::create(rest) {
                Ok(file) => match game.save(&mut BufWriter::new(file)) {
                    Ok(()) => println!("Saved."),
                    Err(err) => println!("{}", format!("Save failed: {err}").red()),
                },
                Err(err) => println!("{}", format!("Cannot create {rest}: {err}").red()),
            },
            "restore" if !rest.is_empty() => match File::open(rest) {
                Ok(file) => match game.load(&mut BufReader::new(file)) {
                    Ok(()) => {
                        println!("Restored.");
                        game.look();
                    },
                    Err(err) => println!("{}", format!("Restore failed: {err}").red()),
                },
                Err(err) => println!("{}", format!("Cannot open {rest}: {err}").red()),
            },
            "hint" | "hints" => {
                let mut any = false;
                for (_, hint) in game.hints() {
                    any = true;
                    println!("{}", hint.question.bold());
                    if !hint.subtle.is_empty() {
                        println!("  {}", hint.subtle);
                    }
                    if !hint.unsubtle.is_empty() {
                        println!("  {}", hint.unsubtle.dimmed());
                    }
                }
                if !any {
                    println!("{}", "There are no hints right now.".yellow());
                }
            },
            "score" => println!(
                "Your score is {} out of a maximum of {}, in {} turns.",
                game.state().score,
                game.def().max_score(),
                game.state().turns
            ),
            _ => {
                let room = game.state().player.room;
                let report = game.turn(|g| g.run_command(input));
                if game.state().player.room != room && game.state().display.verbose {
                    let described = game
                        .def()
                        .rooms
                        .get(game.state().player.room)
                        .is_some_and(|r| game.output().visible().contains(r.short.as_str()));
                    if !described {
                        game.look();
                    }
                }
                if !report.handled {
                    println!("{}", "I don't understand what you want to do.".yellow());
                }
                if let Some(err) = report.aborted {
                    println!("{}", format!("({err})").red());
                }
                if let Some(watch) = report.watch {
                    print!("{}", watch.to_string().magenta());
                }
            },
        }
        flush(&mut game, &mut sink);
    }

    if game.state().has_completed {
        println!("{}", "Congratulations!".bright_green());
    }
    info!("Game over after {} turns.", game.state().turns);
    Ok(())
}
