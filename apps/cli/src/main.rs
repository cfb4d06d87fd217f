use std::time::Duration;

use anyhow::Result;
use captiondesk_core::{Config, VideoFilter};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

use crate::app::App;

mod app;
mod commands;
mod sink;
mod ui;

/// CLI wrapper for VideoFilter (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliFilter {
    #[default]
    All,
    Captioned,
    NotCaptioned,
}

impl From<CliFilter> for VideoFilter {
    fn from(cli: CliFilter) -> Self {
        match cli {
            CliFilter::All => VideoFilter::All,
            CliFilter::Captioned => VideoFilter::Captioned,
            CliFilter::NotCaptioned => VideoFilter::NotCaptioned,
        }
    }
}

#[derive(Parser)]
#[command(name = "captiondesk")]
#[command(about = "Browse uploaded videos and generate AI captions with a choice of models")]
struct Cli {
    /// Backend base URL. Overrides CAPTIONDESK_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List videos with their caption status
    Videos {
        #[arg(short, long, value_enum, default_value = "all")]
        filter: CliFilter,
    },
    /// List the captioning models the backend offers
    Models,
    /// Generate (or regenerate) a caption for one video
    Generate {
        filename: String,

        /// Model key. Defaults to the backend's default model.
        #[arg(short, long)]
        model: Option<String>,

        /// Custom prompt. Defaults to the model's own prompt.
        #[arg(short, long)]
        prompt: Option<String>,

        /// Replace an existing caption
        #[arg(short, long)]
        regenerate: bool,
    },
    /// Show every model's caption for a video
    Captions { filename: String },
    /// Generate captions for a video with several models at once
    Matrix {
        filename: String,

        #[arg(required = true)]
        models: Vec<String>,

        #[arg(short, long)]
        regenerate: bool,
    },
    /// Poll the video list and print it on every change
    Watch {
        /// Poll interval in seconds. Overrides CAPTIONDESK_POLL_SECS.
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
    /// Delete the stored caption of a video
    Delete { filename: String },
    /// Show backend health
    Health,
    /// Print the URL a player can stream the video from
    StreamUrl { filename: String },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("captiondesk=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Command::Watch {
        interval: Some(secs),
    } = &cli.command
    {
        config = config.with_poll_interval(Duration::from_secs(*secs));
    }
    let app = App::new(config)?;

    match cli.command {
        Command::Videos { filter } => commands::videos(&app, filter.into()).await,
        Command::Models => commands::models(&app).await,
        Command::Generate {
            filename,
            model,
            prompt,
            regenerate,
        } => {
            ui::banner("Caption generation");
            commands::generate(&app, &filename, model, prompt, regenerate).await
        }
        Command::Captions { filename } => commands::captions(&app, &filename).await,
        Command::Matrix {
            filename,
            models,
            regenerate,
        } => {
            ui::banner("Caption matrix");
            commands::matrix(&app, &filename, models, regenerate).await
        }
        Command::Watch { .. } => commands::watch(&app).await,
        Command::Delete { filename } => commands::delete(&app, &filename).await,
        Command::Health => commands::health(&app).await,
        Command::StreamUrl { filename } => commands::stream_url(&app, &filename),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
