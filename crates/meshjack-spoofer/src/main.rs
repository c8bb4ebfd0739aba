//! Meshjack Binary
//!
//! Command-line interface for sniffing, sending and impersonating nodes on a
//! Meshtastic MQTT bridge.
//!
//! ## Usage
//!
//! ```bash
//! meshjack sniff --port nodeinfo --port position
//! meshjack send --from '!a1b2c3d4' message "hola"
//! meshjack spoof '!a1b2c3d4' --strategy hybrid --long-name "Base Camp"
//! meshjack nodes list
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use meshjack_client::{Observer, ObserverError, PacketEvent, SendOutcome, SendRequest};
use meshjack_core::{HardwareModel, NodeNumber};
use meshjack_protocol::{Altitude, NodeIdentity, OutboundPayload};
use meshjack_spoofer::{
    format_channels, format_node, format_nodes, format_packets, AppConfig, AppConfigBuilder,
    Meshjack, SniffPort, SpoofOverrides, Strategy,
};
use meshjack_store::{NodeField, NodeStore};
use meshjack_timing::{Burst, Ticker};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Meshjack - Meshtastic MQTT sniffer and node impersonation tool
#[derive(Parser, Debug)]
#[command(name = "meshjack")]
#[command(version)]
#[command(about = "Sniff, send and impersonate nodes on a Meshtastic MQTT bridge", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Generate sample configuration file and exit
    #[arg(long)]
    generate_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// MQTT broker host
    #[arg(long, global = true)]
    broker: Option<String>,

    /// MQTT broker port
    #[arg(long, global = true)]
    broker_port: Option<u16>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    /// Root topic, e.g. msh/US/2/e/
    #[arg(long, global = true)]
    root_topic: Option<String>,

    /// Channel name
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Channel key (base64, AQ== for the default key, empty for none)
    #[arg(long, global = true)]
    key: Option<String>,

    /// Store snapshot file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen and record traffic until interrupted
    Sniff {
        /// Port groups to record (text, rangetest, position, nodeinfo, routing, telemetry)
        #[arg(short = 'p', long = "port")]
        ports: Vec<SniffPort>,
    },

    /// Send one packet
    Send(SendArgs),

    /// Impersonate a node
    Spoof(SpoofArgs),

    /// Inspect or edit stored nodes
    Nodes {
        #[command(subcommand)]
        action: NodesCommand,
    },

    /// List stored channels
    Channels,

    /// Store maintenance
    Store {
        #[command(subcommand)]
        action: StoreCommand,
    },
}

#[derive(ClapArgs, Debug)]
struct SendArgs {
    /// Source node
    #[arg(long)]
    from: NodeNumber,

    /// Destination node
    #[arg(long, default_value = "!ffffffff")]
    to: NodeNumber,

    /// Gateway topic to publish on (defaults to the source node)
    #[arg(long)]
    gateway: Option<NodeNumber>,

    /// Request an acknowledgement
    #[arg(long)]
    want_ack: bool,

    #[command(subcommand)]
    payload: SendPayload,
}

#[derive(Subcommand, Debug)]
enum SendPayload {
    /// Text message
    Message { text: String },

    /// Position report
    Position {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Altitude in meters, or feet with an `ft` suffix
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        alt: Altitude,
    },

    /// Node identity
    Nodeinfo {
        #[arg(long)]
        short_name: String,
        #[arg(long)]
        long_name: String,
        /// Hardware model name or code
        #[arg(long, default_value = "43")]
        hw_model: HardwareModel,
        /// Public key as hex
        #[arg(long)]
        pubkey: Option<String>,
        #[arg(long)]
        want_response: bool,
    },

    /// Traceroute request
    Traceroute,

    /// Acknowledge a packet
    Ack {
        /// Packet id being acknowledged
        request_id: u32,
    },
}

#[derive(ClapArgs, Debug)]
struct SpoofArgs {
    /// Node to impersonate
    target: NodeNumber,

    /// direct, reactive, periodic or hybrid
    #[arg(short = 's', long, default_value = "direct")]
    strategy: Strategy,

    /// Destination of forged packets
    #[arg(long)]
    dest: Option<NodeNumber>,

    /// Gateway topic to publish on (defaults to the target)
    #[arg(long)]
    gateway: Option<NodeNumber>,

    #[arg(long)]
    short_name: Option<String>,

    #[arg(long)]
    long_name: Option<String>,

    /// Hardware model name or code
    #[arg(long)]
    hw_model: Option<HardwareModel>,

    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Altitude in meters, or feet with an `ft` suffix
    #[arg(long, allow_hyphen_values = true)]
    alt: Option<Altitude>,

    /// Public key as hex
    #[arg(long)]
    pubkey: Option<String>,

    /// Ask receivers to answer forged identities
    #[arg(long)]
    want_response: bool,

    /// Sends per burst (applies to the selected strategy's bursts)
    #[arg(long)]
    burst_count: Option<u32>,

    /// Seconds between sends in a burst
    #[arg(long)]
    burst_delay: Option<u64>,

    /// Seconds between periodic announcements
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum NodesCommand {
    /// List nodes, most recently seen first
    List,

    /// Show every field of one node
    Show { node: NodeNumber },

    /// Set one field (`none` clears it)
    Set {
        node: NodeNumber,
        field: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Recent packets from or to a node
    Packets {
        node: NodeNumber,
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Remove every node, channel and packet
    Clear,
}

/// Defaults, then the file, then the environment, then flags
fn resolve_config(args: &Args) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env()?;

    let mut builder = AppConfigBuilder::from_config(config);
    if let Some(host) = &args.broker {
        builder = builder.broker_host(host);
    }
    if let Some(port) = args.broker_port {
        builder = builder.broker_port(port);
    }
    if let Some(username) = &args.username {
        builder = builder.username(username);
    }
    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    if let Some(root) = &args.root_topic {
        builder = builder.root_topic(root);
    }
    if let Some(channel) = &args.channel {
        builder = builder.channel(channel);
    }
    if let Some(key) = &args.key {
        builder = builder.key(key);
    }
    if let Some(store) = &args.store {
        builder = builder.store_path(store);
    }
    if let Some(level) = &args.log_level {
        builder = builder.log_level(level);
    }
    Ok(builder.build()?)
}

fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Root token cancelled on Ctrl+C
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        trigger.cancel();
    });
    cancel
}

fn send_payload(payload: SendPayload) -> OutboundPayload {
    match payload {
        SendPayload::Message { text } => OutboundPayload::Text(text),
        SendPayload::Position { lat, lon, alt } => OutboundPayload::Position { lat, lon, alt },
        SendPayload::Nodeinfo {
            short_name,
            long_name,
            hw_model,
            pubkey,
            want_response,
        } => OutboundPayload::NodeInfo {
            identity: NodeIdentity {
                long_name,
                short_name,
                hw_model: hw_model.code(),
                public_key: pubkey,
            },
            want_response,
        },
        SendPayload::Traceroute => OutboundPayload::Traceroute,
        SendPayload::Ack { request_id } => OutboundPayload::Ack { request_id },
    }
}

async fn run_send(app: &Meshjack, args: SendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = SendRequest::new(args.from, args.to, send_payload(args.payload))
        .with_want_ack(args.want_ack);
    if let Some(gateway) = args.gateway {
        request = request.via_gateway(gateway);
    }

    match app.send(&request).await? {
        SendOutcome::Sent { packet_id } => println!("Sent packet {}", packet_id),
        SendOutcome::Skipped => println!("Broker not ready, packet not sent"),
    }
    Ok(())
}

async fn run_spoof(app: &Meshjack, args: SpoofArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut plan = app.plan(args.target, args.strategy)?.with_overrides(SpoofOverrides {
        short_name: args.short_name,
        long_name: args.long_name,
        hw_model: args.hw_model.map(HardwareModel::code),
        lat: args.lat,
        lon: args.lon,
        alt: args.alt,
        pubkey: args.pubkey,
    });
    plan.want_response = args.want_response;
    plan.gateway = args.gateway;
    if let Some(dest) = args.dest {
        plan.destination = dest;
    }

    if args.burst_count.is_some() || args.burst_delay.is_some() {
        let base = match args.strategy {
            Strategy::Direct => plan.direct_burst,
            Strategy::Periodic => plan.periodic_burst,
            Strategy::Reactive | Strategy::Hybrid => plan.reactive_burst,
        };
        let burst = Burst::new(
            args.burst_count.unwrap_or(base.count()),
            args.burst_delay.map(Duration::from_secs).unwrap_or(base.delay()),
        )?;
        match args.strategy {
            Strategy::Direct => plan.direct_burst = burst,
            Strategy::Periodic => plan.periodic_burst = burst,
            Strategy::Reactive | Strategy::Hybrid => plan.reactive_burst = burst,
        }
    }
    if let Some(interval) = args.interval {
        plan.interval = Ticker::new(Duration::from_secs(interval))?;
    }

    let cancel = shutdown_token();
    let report = app.spoof(plan, &cancel).await?;
    println!(
        "Sent {} packets ({} reassertions, {} periodic rounds)",
        report.packets_sent, report.reassertions, report.rounds
    );
    Ok(())
}

async fn run_sniff(app: &Meshjack, ports: Vec<SniffPort>) -> Result<(), Box<dyn std::error::Error>> {
    let printer = |event: &PacketEvent| -> Result<(), ObserverError> {
        println!("{}", event);
        Ok(())
    };
    let printer: Arc<dyn Observer> = Arc::new(printer);

    let cancel = shutdown_token();
    let stats = app.sniff(ports, &cancel, Some(printer)).await?;
    println!("Received {} messages, {} recorded", stats.received, stats.dispatched);
    Ok(())
}

fn run_nodes(app: &Meshjack, action: NodesCommand) -> Result<(), Box<dyn std::error::Error>> {
    let store = app.store();
    match action {
        NodesCommand::List => print!("{}", format_nodes(&store.get_all_nodes())),
        NodesCommand::Show { node } => match store.get_node(node) {
            Some(record) => print!("{}", format_node(&record)),
            None => println!("No record for {}", node),
        },
        NodesCommand::Set { node, field, value } => {
            let field = NodeField::parse(&field, &value)?;
            let record = store.set_node_field(node, field)?;
            print!("{}", format_node(&record));
        }
        NodesCommand::Packets { node, limit } => {
            print!("{}", format_packets(&store.get_node_packets(&node.to_node_id(), limit)));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Handle generate-config option
    if let Some(path) = &args.generate_config {
        AppConfig::default().save_to_file(path)?;
        println!("Generated sample configuration at: {}", path.display());
        return Ok(());
    }

    let config = resolve_config(&args)?;
    init_logging(&config.log_level);

    let Some(command) = args.command else {
        println!("No command given, see --help");
        return Ok(());
    };

    info!(
        broker = %config.broker.host,
        channel = %config.channel.channel,
        root = %config.channel.root_topic,
        "Configuration"
    );
    let app = Meshjack::open(config)?;

    let result = match command {
        Command::Sniff { ports } => run_sniff(&app, ports).await,
        Command::Send(send) => run_send(&app, send).await,
        Command::Spoof(spoof) => run_spoof(&app, spoof).await,
        Command::Nodes { action } => run_nodes(&app, action),
        Command::Channels => {
            print!("{}", format_channels(&app.store().get_all_channels()));
            Ok(())
        }
        Command::Store {
            action: StoreCommand::Clear,
        } => {
            app.store().clear();
            println!("Store cleared");
            Ok(())
        }
    };

    // Keep whatever was recorded, even when the command failed
    if let Err(e) = app.save() {
        error!("Failed to save store: {}", e);
    }

    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from([
            "meshjack",
            "--channel",
            "MediumFast",
            "spoof",
            "!a1b2c3d4",
            "--strategy",
            "hybrid",
            "--lat",
            "-33.4489",
            "--alt",
            "1000ft",
            "--hw-model",
            "TBEAM",
        ]);
        assert_eq!(args.channel.as_deref(), Some("MediumFast"));
        match args.command {
            Some(Command::Spoof(spoof)) => {
                assert_eq!(spoof.target, NodeNumber(0xa1b2_c3d4));
                assert_eq!(spoof.strategy, Strategy::Hybrid);
                assert_eq!(spoof.lat, Some(-33.4489));
                assert!(spoof.alt.is_some());
                assert!(spoof.hw_model.is_some());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_send_args_parsing() {
        let args = Args::parse_from([
            "meshjack", "send", "--from", "!00000001", "--want-ack", "ack", "1234",
        ]);
        match args.command {
            Some(Command::Send(send)) => {
                assert_eq!(send.to, NodeNumber::BROADCAST);
                assert!(send.want_ack);
                assert!(matches!(send.payload, SendPayload::Ack { request_id: 1234 }));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["meshjack", "--broker", "10.1.1.1", "--key", "", "channels"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.broker.host, "10.1.1.1");
        assert_eq!(config.channel.key, "");
    }
}
