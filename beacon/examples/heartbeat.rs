//! Pings a target on a schedule and logs every firing.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p beacon --example heartbeat -- \
//!     --target gateway --period-ms 200 --duration-ms 1000
//! ```

use beacon::{Beacon, Options, Placement, SpawnHints};
use clap::{
    Parser,
    builder::{Styles, styling::AnsiColor},
};
use color_eyre::eyre::WrapErr as _;
use std::time::Duration;
use tokio::time;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Heartbeat demo
#[derive(Parser, Debug)]
#[clap(about, styles = clap_v3_styles())]
struct Cli {
    /// Value passed to every callback.
    #[arg(long, default_value = "localhost")]
    target: String,
    /// Milliseconds between pings.
    #[arg(long)]
    period_ms: Option<u64>,
    /// Milliseconds until the beacon expires.
    #[arg(long)]
    duration_ms: Option<u64>,
    /// Cancel the beacon after this many milliseconds.
    #[arg(long)]
    cancel_after_ms: Option<u64>,
    /// Register the beacon under this name.
    #[arg(long)]
    name: Option<String>,
    /// Run the beacon on a dedicated thread.
    #[arg(long)]
    thread: bool,
}

fn clap_v3_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Green.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()?;

    let args = Cli::parse();
    if args.period_ms.is_none() && args.duration_ms.is_none() && args.cancel_after_ms.is_none()
    {
        warn!("neither period, duration nor cancellation given, this will run forever");
    }

    let placement = if args.thread { Placement::Thread } else { Placement::Task };
    let options = Options::builder()
        .maybe_name(args.name)
        .hints(SpawnHints::builder().placement(placement).build())
        .build();
    let beacon = Beacon::create(args.target, options).wrap_err("failed to create beacon")?;

    let mut pings = 0_u64;
    if let Some(period) = args.period_ms {
        beacon.set_periodic_callback(Duration::from_millis(period), move |target| {
            pings += 1;
            info!(pings, "ping {target}");
        });
    }
    if let Some(duration) = args.duration_ms {
        beacon.set_duration_with_callback(Duration::from_millis(duration), |target| {
            info!("done with {target}");
        });
    }
    beacon.set_cancel_callback(|target| info!("gave up on {target}")).enable();

    if let Some(cancel_after) = args.cancel_after_ms {
        let canceller = beacon.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(cancel_after)).await;
            canceller.cancel();
        });
    }

    beacon.terminated().await;
    Ok(())
}
