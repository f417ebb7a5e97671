//! `codeatlas config` — print or initialize the effective configuration.

use crate::cli::args::Commands;
use crate::config::Settings;

pub fn run(settings: &Settings, command: Commands) -> i32 {
    let Commands::Config { init, force } = command else {
        unreachable!("config::run called with a non-Config command");
    };

    if init {
        return match Settings::init_config_file(force) {
            Ok(path) => {
                println!("wrote {}", path.display());
                0
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        };
    }

    match toml::to_string_pretty(settings) {
        Ok(body) => {
            println!("{body}");
            0
        }
        Err(err) => {
            eprintln!("failed to render configuration: {err}");
            1
        }
    }
}
