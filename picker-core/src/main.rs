//! src/main.rs
//! Headless picker driven from stdin
//!
//! Lines starting with `/` are commands (`/bound N`, `/select N`, `/quit`);
//! anything else is filter text. Every listener signal is printed to stdout
//! as one JSON object per line.

use std::{panic::PanicHookInfo, sync::Arc};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
    sync::Notify,
};
use tracing::{debug, error, info, warn};

use picker_core::{
    config::Config,
    controller::{
        listener::{Delivery, PickerListener},
        picker::Picker,
    },
    error::CoreError,
    logging::LoggerBuilder,
    model::page::Total,
    source::{cached::CachedTotalSource, memory::MemorySource},
    util::debounce::Debouncer,
};

type DemoSource = CachedTotalSource<MemorySource<String>>;

const WORDS: [&str; 8] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel",
];

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    setup_panic_handler();

    let config = Config::load().await.context("Failed to load configuration")?;
    let _guard = LoggerBuilder::new()
        .with_config(config.logging.clone())
        .build()
        .await
        .context("Failed to initialize logging")?;

    info!(?config.demo, "Starting headless picker");

    run(config).await.context("Picker runtime error")?;

    info!("Picker exited cleanly");
    Ok(())
}

/// Prints listener signals as JSON lines.
struct StdoutListener;

impl StdoutListener {
    fn emit(value: &Value) {
        println!("{value}");
    }
}

impl PickerListener<String> for StdoutListener {
    fn on_load_started(&self) {
        Self::emit(&json!({ "event": "load_started" }));
    }

    fn on_load_finished(&self, delivery: Delivery<String>) {
        let total = match delivery.total {
            Total::Known(n) => json!(n),
            Total::Unknown => Value::Null,
        };

        Self::emit(&json!({
            "event": "load_finished",
            "epoch": delivery.epoch.get(),
            "version": delivery.version,
            "changed": delivery.changed,
            "total": total,
            "count": delivery.len(),
            "items": delivery.items.as_slice(),
        }));
    }

    fn on_item_selected(&self, item: String) {
        Self::emit(&json!({ "event": "selected", "item": item }));
    }

    fn on_source_unavailable(&self, error: &CoreError) {
        Self::emit(&json!({ "event": "source_unavailable", "error": error.to_string() }));
    }
}

enum Command {
    Bound(usize),
    Select(usize),
    Quit,
    Filter(String),
}

impl Command {
    fn parse(line: &str) -> Result<Self> {
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Filter(line.to_owned()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let mut position = || -> Result<usize> {
            parts
                .next()
                .context("missing position")?
                .parse()
                .context("position must be a non-negative integer")
        };

        match name {
            "bound" => Ok(Self::Bound(position()?)),
            "select" => Ok(Self::Select(position()?)),
            "quit" => Ok(Self::Quit),
            other => anyhow::bail!("unknown command /{other}"),
        }
    }
}

fn build_picker(config: &Config) -> Result<Picker<DemoSource>> {
    let items: Vec<String> = (0..config.demo.item_count)
        .map(|i| format!("{} {i:04}", WORDS[i % WORDS.len()]))
        .collect();

    let mut memory = MemorySource::substring(items)
        .with_page_size(config.demo.page_size)
        .with_latency(config.demo.latency);
    if !config.demo.report_total {
        memory = memory.with_unknown_total();
    }

    let picker = Picker::builder()
        .title("Pick an item")
        .source(Arc::new(CachedTotalSource::new(memory, &config.cache)))
        .listener(Arc::new(StdoutListener))
        .build()?;

    Ok(picker)
}

async fn run(config: Config) -> Result<()> {
    let mut picker = build_picker(&config)?;
    let (mut debouncer, mut filter_rx) = Debouncer::new(config.filter.debounce);

    let shutdown = Arc::new(Notify::new());
    setup_shutdown_handler(Arc::clone(&shutdown));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    picker.start();

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("Shutdown signal received");
                picker.cancel();
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };

                match Command::parse(line.trim_end()) {
                    Ok(Command::Filter(text)) => debouncer.submit(text),
                    Ok(Command::Bound(position)) => {
                        picker.on_item_bound(position);
                    }
                    Ok(Command::Select(position)) => match picker.select(position) {
                        Ok(()) => break,
                        Err(err) => warn!(%err, "Selection rejected"),
                    },
                    Ok(Command::Quit) => {
                        picker.cancel();
                        break;
                    }
                    Err(err) => warn!(%err, "Ignoring input line"),
                }
            }

            Some(text) = filter_rx.recv() => {
                picker.set_filter(text);
            }

            dispatch = picker.pump() => {
                if dispatch.is_none() {
                    break;
                }
            }
        }
    }

    if !picker.is_closed() {
        // input ended; apply any pending filter and let in-flight loads land
        debouncer.flush();
        while let Ok(text) = filter_rx.try_recv() {
            picker.set_filter(text);
        }
        picker.run_until_idle().await;
    }

    Ok(())
}

fn setup_shutdown_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C");

        shutdown.notify_one();
    });
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        error!("Picker panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}
