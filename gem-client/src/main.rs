#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use eframe::egui;
use gem_client::{
    app::GemApp, config::GemConfig, health::HEALTH_URL, logging::init_logging, paths::GemPaths,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "gem", about = "Desktop shell for the Gem assistant backend")]
struct ClientArgs {
    /// Install root holding `config/`, `backend/` and `debug.log`.
    /// Defaults to `GEM_ROOT`, then the executable's directory.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Program used to run the backend scripts.
    #[arg(long)]
    interpreter: Option<String>,
    #[arg(long, default_value = HEALTH_URL)]
    health_url: String,
    /// Seconds before an unanswered suggestion is rejected; 0 keeps it open.
    #[arg(long)]
    suggestion_timeout_secs: Option<u64>,
}

fn main() -> ExitCode {
    let args = ClientArgs::parse();

    let paths = args
        .root
        .clone()
        .map(GemPaths::new)
        .unwrap_or_else(GemPaths::discover);
    let dirs_result = paths.ensure_dirs();
    init_logging(&paths.client_log_file());
    if let Err(err) = dirs_result {
        warn!(root = %paths.root().display(), "could not create gem directories: {err}");
    }

    let config = match GemConfig::new(
        paths,
        args.interpreter,
        &args.health_url,
        args.suggestion_timeout_secs,
    ) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            eprintln!("gem: {err}");
            return ExitCode::from(2);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Gem")
            .with_inner_size([420.0, 620.0])
            .with_min_inner_size([360.0, 480.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Gem",
        options,
        Box::new(move |_cc| Ok(Box::new(GemApp::new(config)?))),
    );

    match result {
        Ok(()) => {
            info!("gem exited");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("ui failed: {err}");
            ExitCode::FAILURE
        }
    }
}
