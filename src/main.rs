use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

mod simulator;

use remote_debug_dispatch::descriptor::{PathBinaryResolver, VspDescriptorBuilder};
use remote_debug_dispatch::{start_dispatcher, Dependencies, DispatcherConfig};
use simulator::{HostEvent, SimulatedHost};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Optional config path as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => DispatcherConfig::load_from(&PathBuf::from(path)),
        None => DispatcherConfig::load(),
    };

    let host = Arc::new(SimulatedHost::new(&config.provider_name));
    let descriptors = Arc::new(VspDescriptorBuilder::new(
        host.clone(),
        Arc::new(PathBinaryResolver),
        config.react_native_adapter_dir.clone(),
    ));

    let dispatcher = start_dispatcher(
        Dependencies {
            registry: host.clone(),
            services: host.clone(),
            host: host.clone(),
            notifications: host.clone(),
            metrics: host.clone(),
            descriptors,
        },
        config,
    );

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<HostEvent>();

    // Spawn input handler: one JSON event per line
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<HostEvent>(&line) {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Skipping malformed event: {}", e),
                    }
                }
                Ok(None) => {
                    let _ = tx.send(HostEvent::Quit);
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    let _ = tx.send(HostEvent::Quit);
                    break;
                }
            }
        }
    });

    // Main event loop
    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                match event {
                    HostEvent::Quit => break,
                    HostEvent::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
                    event => host.apply(event),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dispatcher
        .dispose()
        .await
        .context("Remote debug dispatcher failed")
}
