//! CLI for gwroute
//!
//! Subcommands:
//! - `run`: route JSON lines from stdin, print what leaves the gateway on stdout
//! - `classify`: show how a channel is read

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use gwroute::config::{Backend, Settings, load_config};
use gwroute::manifest::InMemoryManifestRepository;
use gwroute::model::{ActuatorState, Message, SensorReading};
use gwroute::protocol::ChannelAddress;
use gwroute::publisher::{Lanes, Outbox, PublishWorker};
use gwroute::router::{MessageRouter, RouteOutcome};
use gwroute::transport::Transport;
use gwroute::transport::console::ConsoleTransport;
use gwroute::utils::error::GatewayError;
use gwroute::utils::logging;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "gwroute", version)]
enum Command {
    /// Route messages read from stdin, one JSON object per line.
    ///
    /// `{"channel": "...", "payload": ...}` is routed as an inbound message;
    /// `{"reading": "T", "value": "21.5"}` and `{"alarm": "HOT", "active": true}`
    /// are recorded as the gateway's own data.
    Run,
    /// Print direction, kind, addressing and reference of a channel
    Classify { channel: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputLine {
    Message {
        channel: String,
        #[serde(default)]
        payload: Value,
    },
    Reading {
        reading: String,
        value: String,
    },
    Alarm {
        alarm: String,
        active: bool,
    },
}

/// Commands addressed to the gateway's own actuators and configuration.
enum LocalCommand {
    SetActuator { reference: String, value: String },
    GetActuator { reference: String },
    SetConfiguration { reference: String, values: Vec<String> },
    GetConfiguration { reference: String },
}

#[tokio::main]
async fn main() {
    match Command::parse() {
        Command::Run => {
            if let Err(e) = run().await {
                logging::init("error");
                error!("Gateway failed: {e}");
                std::process::exit(1);
            }
        }
        Command::Classify { channel } => classify(&channel),
    }
}

fn classify(channel: &str) {
    match ChannelAddress::parse(channel) {
        Ok(address) => {
            println!("direction: {}", address.direction);
            println!("kind:      {}", address.kind);
            println!("depth:     {:?}", address.depth());
            if let Some(gateway) = &address.addressing.gateway {
                println!("gateway:   {gateway}");
            }
            if let Some(device) = &address.addressing.device {
                println!("device:    {device}");
            }
            println!("reference: {}", address.reference);
        }
        Err(e) => {
            println!("{e}");
            std::process::exit(2);
        }
    }
}

fn build_router(
    settings: &Settings,
    platform: Arc<ConsoleTransport>,
    devices: Arc<ConsoleTransport>,
    commands: mpsc::UnboundedSender<LocalCommand>,
) -> Result<MessageRouter, GatewayError> {
    let lanes = match settings.persistence.backend {
        Backend::Memory => Lanes::in_memory(),
        Backend::Sled => Lanes::sled(&settings.persistence.path)?,
    };

    let manifests = Arc::new(InMemoryManifestRepository::new());
    for device in &settings.devices {
        manifests.bind(device.key.clone(), device.manifest());
    }
    info!("Bound {} device(s)", manifests.len());

    let mut router = MessageRouter::new(
        &settings.gateway.key,
        manifests,
        platform,
        devices,
        Arc::new(Outbox::new(lanes)),
    )
    .with_batch_size(settings.publisher.batch_size);

    let tx = commands.clone();
    router.set_actuator_set_handler(move |cmd| {
        let _ = tx.send(LocalCommand::SetActuator {
            reference: cmd.reference,
            value: cmd.value,
        });
    });
    let tx = commands.clone();
    router.set_actuator_get_handler(move |cmd| {
        let _ = tx.send(LocalCommand::GetActuator {
            reference: cmd.reference,
        });
    });
    let tx = commands.clone();
    router.set_configuration_set_handler(move |item| {
        let _ = tx.send(LocalCommand::SetConfiguration {
            reference: item.key,
            values: item.values,
        });
    });
    router.set_configuration_get_handler(move |cmd| {
        let _ = commands.send(LocalCommand::GetConfiguration {
            reference: cmd.reference,
        });
    });

    Ok(router)
}

async fn run() -> Result<(), GatewayError> {
    let settings = load_config()?;
    logging::init(&settings.logging.level);
    settings.validate()?;
    info!("Starting gateway '{}'", settings.gateway.key);

    let platform = Arc::new(ConsoleTransport::stdout("platform"));
    let devices = Arc::new(ConsoleTransport::stdout("device"));
    devices.connect();

    let (tx, mut commands) = mpsc::unbounded_channel();
    let router = Arc::new(build_router(
        &settings,
        platform.clone(),
        devices.clone(),
        tx,
    )?);

    let mut worker = PublishWorker::start(router.clone(), platform.clone())?;
    if platform.connect() {
        worker.on_connected();
    }

    // the gateway's own actuator and configuration values
    let mut actuators: HashMap<String, String> = HashMap::new();
    let mut configuration: HashMap<String, Vec<String>> = HashMap::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&router, &line),
                None => {
                    info!("Input closed.");
                    break;
                }
            },
            Some(command) = commands.recv() => {
                apply(&router, command, &mut actuators, &mut configuration);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting gracefully.");
                break;
            }
        }
    }

    // commands handled by the last lines still produce their status
    while let Ok(command) = commands.try_recv() {
        apply(&router, command, &mut actuators, &mut configuration);
    }
    let report = router.publish_all();
    debug!(
        "Final drain: {} published, {} refused",
        report.published, report.failed
    );

    worker.on_disconnected();
    worker.stop();
    platform.disconnect();
    devices.disconnect();
    Ok(())
}

fn handle_line(router: &MessageRouter, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<InputLine>(line) {
        Ok(InputLine::Message { channel, payload }) => {
            let payload = match payload {
                Value::Null => String::new(),
                Value::String(text) => text,
                other => other.to_string(),
            };
            if let RouteOutcome::Dropped(e) = router.route(&Message::new(channel, payload)) {
                info!("Dropped ({}): {e}", e.error_type());
            }
        }
        Ok(InputLine::Reading { reading, value }) => {
            router.add_reading(SensorReading::now(&reading, value));
        }
        Ok(InputLine::Alarm { alarm, active }) => {
            let timestamp = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
            router.add_alarm(&alarm, active, timestamp);
        }
        Err(e) => warn!("Ignoring unreadable input line: {e}"),
    }
}

fn apply(
    router: &MessageRouter,
    command: LocalCommand,
    actuators: &mut HashMap<String, String>,
    configuration: &mut HashMap<String, Vec<String>>,
) {
    match command {
        LocalCommand::SetActuator { reference, value } => {
            info!("Actuator '{reference}' set to '{value}'");
            router.add_actuator_status(&reference, value.clone(), ActuatorState::Ready);
            actuators.insert(reference, value);
        }
        LocalCommand::GetActuator { reference } => match actuators.get(&reference) {
            Some(value) => {
                router.add_actuator_status(&reference, value.clone(), ActuatorState::Ready)
            }
            None => router.add_actuator_status(&reference, "", ActuatorState::Error),
        },
        LocalCommand::SetConfiguration { reference, values } => {
            info!("Configuration '{reference}' set to {values:?}");
            router.add_configuration(&reference, values.clone());
            configuration.insert(reference, values);
        }
        LocalCommand::GetConfiguration { reference } => {
            match configuration.get(&reference) {
                Some(values) => router.add_configuration(&reference, values.clone()),
                None => debug!("No configuration value for '{reference}'"),
            }
        }
    }
}
