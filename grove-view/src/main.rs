//! Application entry point for the Ancestral Grove viewer.
//!
//! Usage: `grove-view [family.json|family.yaml] [config.json]`. Without a
//! family file the bundled sample family is shown. `.yaml` and `.yml`
//! files are read as YAML, anything else as JSON. All UI state and
//! rendering are handled by [`Viewer`].

mod viewer;

use grove_core::Config;
use std::path::PathBuf;
use viewer::{Source, Viewer};

/// Reads an optional config override, falling back to defaults on error.
fn load_config(path: Option<PathBuf>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let parsed = std::fs::read_to_string(&path)
        .map_err(|err| err.to_string())
        .and_then(|text| Config::from_json(&text).map_err(|err| err.to_string()));
    match parsed {
        Ok(cfg) => cfg,
        Err(err) => {
            log::warn!("ignoring config {}: {err}", path.display());
            Config::default()
        }
    }
}

/// Starts the native eframe application.
fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let source = args.next().map_or(Source::Bundled, Source::File);
    let cfg = load_config(args.next());

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Ancestral Grove",
        options,
        Box::new(move |_cc| Ok(Box::new(Viewer::new(source, cfg)))),
    )
}
