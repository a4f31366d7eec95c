//! Replay command
//!
//! Reads newline-delimited JSON records, each either an interaction event
//! (`{"type": "click", ...}`) or a host action
//! (`{"action": "scroll", "x": 0, "y": 300}`,
//! `{"action": "navigate", "url": "..."}`), dispatches them on a fresh
//! window and prints every relayed collector response as one JSON line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use passive_core::{AgentWorkerFactory, DomEvent, HttpCollector, Passive, Window};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// NDJSON file of recorded events
    #[arg(short, long)]
    pub events: PathBuf,

    /// Path to an activation config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the collector endpoint
    #[arg(long)]
    pub api_url: Option<String>,

    /// Page location the events are observed on
    #[arg(long, default_value = "about:blank")]
    pub location: String,

    /// Also deliver configuration messages to the collector
    #[arg(long)]
    pub forward_config: bool,

    /// How long to wait for responses after the last event
    #[arg(long, default_value_t = 1000)]
    pub settle_ms: u64,
}

/// Host-side actions interleaved with events
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HostAction {
    Scroll { x: f64, y: f64 },
    Navigate { url: String },
}

/// One line of a replay file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayRecord {
    Action(HostAction),
    Event(DomEvent),
}

/// Parse a replay file, skipping blank lines
pub fn parse_records(contents: &str) -> Result<Vec<ReplayRecord>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid record", n + 1))
        })
        .collect()
}

fn read_records(path: &Path) -> Result<Vec<ReplayRecord>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_records(&contents)
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let records = read_records(&args.events)?;
    let activation = config::resolve(args.config.as_deref(), args.api_url.as_deref())?;

    let factory = AgentWorkerFactory::new(Arc::new(HttpCollector::new()))
        .forward_config_messages(args.forward_config);
    let mut window = Window::new(args.location).with_worker(Arc::new(factory));
    if let Some(activation) = activation {
        window = window.with_passive_config(activation);
    }

    let passive = Passive::activate(Some(&window));
    if !passive.is_active() {
        warn!("No activation config; events will be dispatched but nothing is captured");
    }
    passive.on_response(|response| println!("{response}"));

    let mut dispatched = 0usize;
    for record in records {
        match record {
            ReplayRecord::Action(HostAction::Scroll { x, y }) => window.scroll_to(x, y),
            ReplayRecord::Action(HostAction::Navigate { url }) => window.navigate(url),
            ReplayRecord::Event(event) => {
                window.document().dispatch(&event);
                dispatched += 1;
            }
        }
    }
    info!(events = dispatched, "Replay dispatched, waiting for responses");

    tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;
    Ok(())
}
