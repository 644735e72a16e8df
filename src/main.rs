//! Prompt Timeline
//!
//! A native, pannable and zoomable timeline of prompt history with
//! theater and crawl playback.

mod api;
mod app;
mod export;
mod local_ratings;
mod settings;
mod theme;
mod timeline;

use chrono::{Local, NaiveDate, Offset};
use clap::Parser;
use eframe::egui;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prompt-timeline", version, about)]
struct Cli {
    /// Records file: JSON array or JSON Lines
    #[arg(long)]
    records: Option<PathBuf>,

    /// Rating service base URL
    #[arg(long, default_value = api::DEFAULT_API_BASE)]
    api: String,

    /// Focus date for the opening view (defaults to the newest record's day)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Keep ratings local; never call the rating service
    #[arg(long)]
    offline: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prompt_timeline=info")))
        .init();

    let cli = Cli::parse();

    let mut records = match &cli.records {
        Some(path) => timeline::load_records(path).unwrap_or_else(|e| {
            tracing::error!("{}, starting with no records", e);
            Vec::new()
        }),
        None => {
            tracing::info!("No --records given, starting empty");
            Vec::new()
        }
    };

    let local_ratings = local_ratings::LocalRatings::load();
    local_ratings.apply(&mut records);

    let api = if cli.offline {
        tracing::info!("Offline: ratings stay local");
        None
    } else {
        let client = api::ApiClient::new(cli.api.clone());
        if let Err(e) = client.health() {
            tracing::warn!("Rating service at {} unavailable: {}", client.base_url(), e);
        }
        Some(client)
    };

    let init = app::AppInit {
        records,
        focus_date: cli.date,
        settings: settings::Settings::load(),
        local_ratings,
        api,
        offset: Local::now().offset().fix(),
        now_ms: chrono::Utc::now().timestamp_millis(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Prompt Timeline"),
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(
        "Prompt Timeline",
        options,
        Box::new(move |cc| Ok(Box::new(app::TimelineApp::new(cc, init)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["prompt-timeline"]);
        assert_eq!(cli.api, "http://127.0.0.1:8000");
        assert!(cli.records.is_none());
        assert!(!cli.offline);
    }

    #[test]
    fn cli_parses_date_and_records() {
        let cli = Cli::parse_from([
            "prompt-timeline",
            "--records",
            "history.jsonl",
            "--date",
            "2024-02-29",
            "--offline",
        ]);
        assert_eq!(cli.records, Some(PathBuf::from("history.jsonl")));
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(cli.offline);
    }
}
