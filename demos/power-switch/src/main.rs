use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use blinker::prelude::*;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::info;

/// A switch that the Blinker server can turn on and off.
#[derive(Parser, Debug)]
#[command(name = "power-switch")]
struct Args {
    /// Server network: tcp, tcp4, tcp6, udp, udp4 or udp6
    #[arg(short = 'n', long)]
    network: String,

    /// Server address (host:port)
    #[arg(short = 'a', long)]
    address: String,

    /// Device key shared with the server
    #[arg(short = 'k', long)]
    key: String,

    /// Heartbeat timeout in seconds (5..=180)
    #[arg(short = 't', long, default_value_t = 60)]
    timeout: u64,

    /// Minimum level for the session's own log events
    #[arg(short = 'l', long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    blinker::logging::init("info");
    let args = Args::parse();

    let power = Arc::new(AtomicBool::new(false));
    let (set, get) = (Arc::clone(&power), Arc::clone(&power));

    let session = Session::builder()
        .server_address(&args.network, &args.address)
        .timeout(Duration::from_secs(args.timeout))
        .log_level(args.log_level)
        .on_resolve_fail(|network: Network, address: &str| {
            eprintln!("resolve fail: {network}, {address}");
        })
        .on_power_set(move |on| {
            info!(on, "power set");
            set.store(on, Ordering::SeqCst);
        })
        .on_update(move || get.load(Ordering::SeqCst))
        .build();

    session.start(&args.key)?;
    info!(running = session.is_running(), connected = session.is_connected(), "started");

    let closer = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        closer.close();
    });

    session.wait_done(None).await;
    info!(running = session.is_running(), connected = session.is_connected(), "stopped");

    tokio::time::sleep(Duration::from_secs(1)).await;

    session.reset();
    session.start(&args.key)?;
    if !session.wait_done(Some(Duration::from_secs(10))).await {
        info!("still running after 10s, closing");
    }
    session.close();
    session.wait_done(None).await;

    info!(power = power.load(Ordering::SeqCst), "done");
    Ok(())
}
