//! LiveHost assistant runner
//!
//! Wires the catalog store, providers and adaptors into a session and runs
//! it until ctrl-c. `--demo` simulates a live room and turns stdin into the
//! chat feed.

use anyhow::Context;
use clap::Parser;
use livehost_adaptor_obs::ObsSceneController;
use livehost_adaptor_playback::RodioSink;
use livehost_adaptor_tiktok::{BridgeLiveSource, DemoHandle, DemoLiveSource};
use livehost_core::prelude::*;
use livehost_core::{get_env_bool, get_env_int, get_env_or, load_env};
use livehost_provider_elevenlabs::ElevenLabsEngine;
use livehost_provider_groq::GroqClient;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "run-assistant", about = "AI co-host for live commerce streams")]
struct Args {
    /// Simulate the live room and read chat from stdin
    #[arg(long)]
    demo: bool,

    /// Live account username (falls back to TIKTOK_USERNAME)
    #[arg(long)]
    username: Option<String>,

    /// Catalog/settings JSON file
    #[arg(long, default_value = "data/products.json")]
    catalog: String,

    /// Webcast bridge endpoint
    #[arg(long, default_value = "ws://localhost:8912")]
    bridge: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = SessionConfig::from_env().context("incomplete configuration")?;

    println!();
    println!("LiveHost AI Assistant");
    println!("================================");
    println!("Mode: {}", if args.demo { "DEMO" } else { "LIVE" });
    println!("Response delay: {}ms", config.response_delay.as_millis());
    println!("================================");
    println!();

    let store: Arc<dyn CatalogStore> = Arc::new(FileCatalogStore::new(&args.catalog));
    let provider = Arc::new(GroqClient::new(config.completion_api_key.clone()));
    let engine = Arc::new(ElevenLabsEngine::new());
    let sink = Arc::new(RodioSink::new());

    let scene: Option<Arc<dyn SceneController>> = if get_env_bool("OBS_ENABLED", true) {
        Some(Arc::new(ObsSceneController::new(
            get_env_or("OBS_HOST", "localhost"),
            get_env_int("OBS_PORT", 4455u16),
            std::env::var("OBS_PASSWORD").ok(),
        )))
    } else {
        None
    };

    let mut demo_handle: Option<DemoHandle> = None;
    let source: Box<dyn LiveEventSource> = if args.demo {
        let source = DemoLiveSource::new(config.dedup_cooldown);
        demo_handle = Some(source.handle());
        Box::new(source)
    } else {
        let username = args
            .username
            .clone()
            .or_else(|| std::env::var("TIKTOK_USERNAME").ok())
            .context("TIKTOK_USERNAME is required outside demo mode")?;
        Box::new(BridgeLiveSource::new(
            &args.bridge,
            username,
            config.dedup_cooldown,
        ))
    };

    let session = Arc::new(LiveSession::new(
        config, store, source, provider, engine, sink, scene,
    )?);

    // Mirror session signals to the terminal
    let mut signals = session.signals().subscribe();
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(SessionSignal::Log(entry)) => {
                    println!(
                        "[{}] [{:?}] {}",
                        entry.timestamp.format("%H:%M:%S"),
                        entry.kind,
                        entry.data
                    );
                }
                Ok(SessionSignal::Status { running }) => {
                    println!("[status] running={}", running);
                }
                Ok(SessionSignal::Usage(stats)) => {
                    tracing::debug!(
                        "TTS usage: {} chars this session, {} requests",
                        stats.session_characters,
                        stats.request_count
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });

    session.start().await.context("failed to start session")?;
    println!("Assistant ready.");

    if let Some(handle) = demo_handle {
        println!();
        println!("Demo commands:");
        println!("  - type a message to simulate chat");
        println!("  - \"auto\" sends the next scripted message");
        println!("  - \"quit\" exits");
        println!();
        run_demo_input(handle).await;
    } else {
        tokio::signal::ctrl_c().await.ok();
    }

    println!("Shutting down...");
    session.stop().await;
    Ok(())
}

/// Read demo chat from stdin until EOF or "quit"
async fn run_demo_input(handle: DemoHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed.to_lowercase().as_str() {
                    "quit" => break,
                    "auto" => handle.next_scripted(),
                    _ => handle.chat("demo_user", "Demo User", trimmed),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}
