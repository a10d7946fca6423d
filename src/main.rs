mod app;
mod config;
mod payload;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use app::{GalaxyApp, LaunchOptions};
use config::load_config;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph payload JSON with `nodes` and `relationships`.
    payload: PathBuf,

    /// Engine configuration JSON; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Book id reported for clicked nodes that carry none.
    #[arg(long)]
    book_id: Option<String>,

    /// Comma-separated entity ids to highlight as a path.
    #[arg(long, value_delimiter = ',')]
    highlight: Vec<String>,

    /// Build the whole galaxy at once instead of revealing it in batches.
    #[arg(long)]
    immediate: bool,

    /// Tracing filter directive, e.g. `debug` or `borges_galaxy=trace`.
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!("{error:#}");
            return ExitCode::FAILURE;
        }
    };

    let options = LaunchOptions {
        payload: args.payload,
        config,
        default_book_id: args.book_id,
        highlight_ids: args.highlight,
        progressive: !args.immediate,
    };
    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "borges-galaxy",
        native_options,
        Box::new(move |cc| Ok(Box::new(GalaxyApp::new(cc, options)))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "window closed with an error");
            ExitCode::FAILURE
        }
    }
}
