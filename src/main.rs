use std::path::PathBuf;
use std::{fs, process};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use drawboard::{
    config::BoardConfig,
    engine::source::{ActorSource, RemoteSource, StaticSource},
    player::Player,
    remote::ApiClient,
    server,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "drawboard", about = "Turtle-graphics actors animated in the terminal")]
struct Cli {
    /// Board config file (defaults to ~/.config/drawboard/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the artist/move service.
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
    /// Animate one actor per script file. Plays the demos when no file is given.
    Play { scripts: Vec<PathBuf> },
    /// Animate the artists of a running service.
    Watch { base_url: String },
    /// Register an artist and print it.
    Join { base_url: String, name: String },
    /// Queue moves for an artist.
    Send {
        base_url: String,
        artist_id: String,
        #[arg(required = true)]
        moves: Vec<String>,
    },
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &cli.config {
        Some(path) => BoardConfig::load_from(path),
        None => BoardConfig::load(),
    };

    match cli.command {
        Command::Serve { port } => server::run(port),
        Command::Play { scripts } => play(config, &scripts),
        Command::Watch { base_url } => {
            let client = ApiClient::with_timeout(&base_url, config.request_timeout())?;
            let source = ActorSource::Remote(RemoteSource::new(client));
            Player::new(config, source).play()
        }
        Command::Join { base_url, name } => {
            let artist = ApiClient::new(&base_url)?.create_artist(&name)?;
            println!("{}", serde_json::to_string_pretty(&artist)?);
            Ok(())
        }
        Command::Send {
            base_url,
            artist_id,
            moves,
        } => {
            let client = ApiClient::new(&base_url)?;
            for description in &moves {
                let mv = client.add_move(&artist_id, description)?;
                eprintln!("Queued {} ({})", mv.id, mv.description);
            }
            Ok(())
        }
    }
}

fn play(config: BoardConfig, paths: &[PathBuf]) -> Result<()> {
    let scripts = if paths.is_empty() {
        vec![HOUSE.to_string(), STAR.to_string()]
    } else {
        paths
            .iter()
            .map(|path| {
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let source = ActorSource::Static(StaticSource::new(&scripts));
    Player::new(config, source).play()
}

// ---------------------------------------------------------------------------
// Demo scripts
// ---------------------------------------------------------------------------

const HOUSE: &str = "draw mode

// roof
say Building the roof
color red
right 30
forward 5
right 120
forward 5
right 30

// walls
say Building the walls
color black
forward 5
right
forward 5
right
forward 5
right
forward 5
right

// walk to the door
color off
forward 5
right
forward
right

// door
say Building the door
color green
forward 2
left
forward
left
forward 2
left
forward

// step away
color off
forward 3
left
say Done!";

const STAR: &str = "draw mode

say Let's start...
right 18
color red

forward 7
say One...
right 144

forward 7
say Two...
right 144

forward 7
say Three...
right 144

forward 7
say Four...
right 144

forward 7
say We've got a star!
right 144";
