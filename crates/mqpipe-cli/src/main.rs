//! mqpipe demo executable.
//!
//! One binary covers the three demo pipeline roles plus two topology tools:
//!
//! ```text
//! mqpipe --id sampler1  --mq-config pipeline.json sampler
//! mqpipe --id processor --mq-config pipeline.json processor
//! mqpipe --id sink1     --mq-config pipeline.json sink
//! mqpipe --mq-config pipeline.json validate
//! mqpipe --mq-config pipeline.json fmt
//! ```

mod devices;

use clap::{Parser, Subcommand};

use mqpipe_core::{Config, ConfigError, Result};
use mqpipe_runtime::{launch_with, Flags};

#[derive(Parser)]
#[command(name = "mqpipe", version, about = "Run mqpipe demo devices and inspect topologies")]
struct Cli {
    #[command(flatten)]
    flags: Flags,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Emit numbered payloads on the "data1" channel
    Sampler {
        /// Stop after this many payloads (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        count: usize,
    },
    /// Forward payloads from "data1" to "data2", tagged with the device name
    Processor,
    /// Log every payload arriving on "data2"
    Sink,
    /// Parse a topology file and report what it describes
    Validate,
    /// Parse a topology file and print its normalized form
    Fmt,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let res = match cli.command {
        Cmd::Sampler { count } => launch_with(cli.flags, devices::Sampler::new(count)).await,
        Cmd::Processor => launch_with(cli.flags, devices::Processor::default()).await,
        Cmd::Sink => launch_with(cli.flags, devices::Sink::default()).await,
        Cmd::Validate => validate(&cli.flags),
        Cmd::Fmt => fmt(&cli.flags),
    };

    if let Err(e) = res {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn load(flags: &Flags) -> Result<Config> {
    let path = flags
        .mq_config
        .as_ref()
        .ok_or_else(|| ConfigError::Invalid("missing --mq-config".to_owned()))?;
    Ok(Config::load(path)?)
}

fn validate(flags: &Flags) -> Result<()> {
    let cfg = load(flags)?;
    if cfg.options.devices.is_empty() {
        return Err(ConfigError::Invalid("topology declares no devices".to_owned()).into());
    }
    for dev in &cfg.options.devices {
        println!("device {:?}: {} channel(s)", dev.name(), dev.channels.len());
        for ch in &dev.channels {
            for sck in &ch.sockets {
                println!(
                    "  {} {} {} {}",
                    ch.name, sck.kind, sck.method, sck.address
                );
            }
        }
    }
    Ok(())
}

fn fmt(flags: &Flags) -> Result<()> {
    let cfg = load(flags)?;
    println!("{}", cfg.to_json_pretty()?);
    Ok(())
}
