use std::sync::Arc;

use anyhow::{Context, Result};
use captiondesk_core::{
    CaptionApi, CaptionError, CaptionSlot, Notification, NotificationSink, SlotAction,
    VideoFilter, VideoSnapshot, format_caption_record, format_video_line,
};
use console::style;
use tokio::{sync::broadcast::error::RecvError, task::JoinSet, time::Instant};
use tracing::debug;

use crate::{app::App, sink::styled, ui};

pub async fn videos(app: &App, filter: VideoFilter) -> Result<()> {
    app.repository.refresh().await?;

    let stats = app.repository.stats();
    println!(
        "{} videos, {} captioned, {} without caption",
        style(stats.total).cyan().bold(),
        style(stats.captioned).green(),
        style(stats.not_captioned).yellow()
    );
    ui::rule();
    for video in app.repository.filtered(filter) {
        println!("{}", format_video_line(&video));
    }
    Ok(())
}

pub async fn models(app: &App) -> Result<()> {
    let catalog = app.catalog.load().await?;

    for model in catalog.models.values() {
        let is_default = catalog.default_model.as_deref() == Some(model.key.as_str());
        println!(
            "{} {} {}{}",
            if is_default {
                style("●").green().bold()
            } else {
                style("○").dim()
            },
            style(&model.key).cyan().bold(),
            model.display_name,
            if model.accepts_prompt {
                String::new()
            } else {
                format!(" {}", style("(no prompt)").dim())
            }
        );
        if !model.default_prompt.is_empty() {
            println!("    {}", style(&model.default_prompt).dim());
        }
    }
    Ok(())
}

pub async fn generate(
    app: &App,
    filename: &str,
    model: Option<String>,
    prompt: Option<String>,
    regenerate: bool,
) -> Result<()> {
    app.catalog.load().await?;
    let model = match model {
        Some(model) => model,
        None => app
            .catalog
            .default_model()
            .context("the backend offers no captioning models")?,
    };

    let orchestrator = app.orchestrator();
    let mut events = orchestrator.subscribe();
    let spinner = ui::create_spinner(&app.progress, "Waiting for the backend...");

    let follower = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(message) = event.event.progress_message() {
                            spinner.set_message(message);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "progress lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    let started = Instant::now();
    orchestrator.request_generation(filename, regenerate);
    let result = orchestrator.confirm_model(&model, prompt.as_deref()).await;
    follower.abort();

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            spinner.finish_with_message(ui::failed(filename));
            return Err(e.into());
        }
    };
    spinner.finish_with_message(ui::done(filename, started.elapsed()));

    ui::rule();
    let display_name = app.catalog.display_name(&record.model_key);
    println!("{}", format_caption_record(&record, &display_name));
    Ok(())
}

pub async fn captions(app: &App, filename: &str) -> Result<()> {
    if let Err(e) = app.catalog.load().await {
        debug!(error = %e, "showing captions without the model catalog");
    }

    let matrix = app.matrix(filename);
    matrix.load_all().await?;
    print_slots(&matrix.slots());
    Ok(())
}

pub async fn matrix(app: &App, filename: &str, models: Vec<String>, regenerate: bool) -> Result<()> {
    app.catalog.load().await?;
    for key in &models {
        if app.catalog.descriptor(key).is_none() {
            return Err(CaptionError::UnknownModel {
                model_key: key.clone(),
            }
            .into());
        }
    }

    let matrix = Arc::new(app.matrix(filename));
    if let Err(e) = matrix.load_all().await {
        app.sink.notify(Notification::warning(e.to_string()));
    }

    let verb = if regenerate { "Regenerating" } else { "Generating" };
    let mut tasks = JoinSet::new();
    for key in models {
        let spinner = ui::create_spinner(
            &app.progress,
            &format!("{verb} caption with {}...", app.catalog.display_name(&key)),
        );
        let matrix = Arc::clone(&matrix);
        tasks.spawn(async move {
            let started = Instant::now();
            let result = if regenerate {
                matrix.regenerate(&key).await
            } else {
                matrix.generate(&key).await
            };
            (key, spinner, started.elapsed(), result)
        });
    }

    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        let (key, spinner, elapsed, result) = joined?;
        match result {
            Ok(_) => spinner.finish_with_message(ui::done(&key, elapsed)),
            Err(e) => {
                failures += 1;
                spinner.finish_with_message(ui::failed(&format!("{key}: {e}")));
            }
        }
    }

    ui::rule();
    print_slots(&matrix.slots());

    if failures > 0 {
        anyhow::bail!("{failures} caption generation(s) failed");
    }
    Ok(())
}

fn print_slots(slots: &[CaptionSlot]) {
    for slot in slots {
        match &slot.record {
            Some(record) => println!("{}", format_caption_record(record, &slot.display_name)),
            None => {
                println!(
                    "## {} ({})\n{}\n",
                    slot.display_name,
                    slot.model_key,
                    style("No caption yet").dim()
                );
            }
        }
        if let Some(error) = &slot.last_error {
            println!("{}", ui::failed(error));
        }
        let next = match slot.action {
            SlotAction::Generate => "generate",
            SlotAction::Regenerate => "regenerate",
        };
        println!("{}\n", style(format!("next: {next}")).dim());
    }
}

pub async fn watch(app: &App) -> Result<()> {
    let period = app.config.poll_interval;

    let mut snapshots = app.repository.subscribe();
    let poller = app.repository.start_polling(period);
    let mut health = tokio::time::interval(period);
    let mut last_reported: Option<String> = None;

    println!(
        "{} every {}s, Ctrl-C to stop",
        style("Watching").cyan().bold(),
        period.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(app, &snapshot);
            }
            _ = health.tick() => {
                let current = app.repository.last_error().map(|e| e.to_string());
                if let Some(message) = current.as_ref().filter(|_| current != last_reported) {
                    app.sink.notify(Notification::warning(message.clone()));
                }
                last_reported = current;
            }
        }
    }

    poller.stop().await;
    Ok(())
}

fn print_snapshot(app: &App, snapshot: &VideoSnapshot) {
    ui::rule();
    println!(
        "{} {}",
        style(format!("#{}", snapshot.generation)).dim(),
        style(format!("{} videos", snapshot.videos.len())).cyan()
    );
    for video in &snapshot.videos {
        println!("{}", format_video_line(video));
    }
    if let Some(notification) = app.sink.center().visible() {
        println!("{}", styled(&notification));
    }
}

pub async fn delete(app: &App, filename: &str) -> Result<()> {
    app.api.delete_caption(filename).await?;
    app.sink
        .notify(Notification::success(format!("Caption deleted for {filename}")));
    Ok(())
}

pub async fn health(app: &App) -> Result<()> {
    let status = app.api.health().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub fn stream_url(app: &App, filename: &str) -> Result<()> {
    println!("{}", app.api.stream_url(filename)?);
    Ok(())
}
