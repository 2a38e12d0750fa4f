//! Grimbrawl - Halloween graveyard brawler

use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;

use grimbrawl::arena::ArenaPlugin;
use grimbrawl::audio::SpeakerPlugin;
use grimbrawl::camera::CameraPlugin;
use grimbrawl::character::animation::ModelAnimationPlugin;
use grimbrawl::cli;
use grimbrawl::headless::{run_headless_round, HeadlessRoundConfig};
use grimbrawl::session::{GameMode, GameSession};
use grimbrawl::settings::{GameSettings, SettingsPlugin};
use grimbrawl::GamePlugin;

fn main() {
    let args = cli::parse_args();

    if let Some(config_path) = args.headless {
        let mut config = match HeadlessRoundConfig::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        };
        if let Some(max_duration) = args.max_duration {
            config.max_duration_secs = max_duration;
        }
        if let Some(output) = args.output {
            config.output_path = Some(output.to_string_lossy().into_owned());
        }
        if let Err(e) = run_headless_round(config) {
            eprintln!("Headless round failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let settings = match &args.settings {
        Some(path) => GameSettings::load_from(path),
        None => GameSettings::load(),
    };
    let dev = args.dev;
    let level = if dev { Level::DEBUG } else { Level::INFO };

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Grimbrawl".to_string(),
                        resolution: (1280.0, 720.0).into(),
                        resizable: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    level,
                    ..default()
                }),
        )
        .add_plugins((
            GamePlugin { settings },
            SettingsPlugin,
            ArenaPlugin,
            CameraPlugin,
            ModelAnimationPlugin,
            SpeakerPlugin,
        ))
        .add_systems(Startup, move |mut session: ResMut<GameSession>| {
            if dev {
                session.mode = GameMode::Development;
            }
        })
        .run();
}
