//! serial-gateway: WebSocket server that forwards messages between a serial
//! port and WebSocket clients.
//!
//! The serial port is opened when a client connects and closed when it
//! disconnects. Connect to `ws://host:port/list` for the available ports, or
//! to `ws://host:port/<device>@<baud>` to bridge a specific one.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use gateway_bridge::{GatewayContext, PortRegistry, Server, SystemPorts, SystemSerial};
use gateway_config::{config_to_json, load_config, validate};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let level = level.to_ascii_lowercase();
    let default_directive =
        format!("serial_gateway={level},gateway_bridge={level},gateway_config={level}");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("serial-gateway: {e}");
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut config);
    if let Err(e) = validate(&config) {
        eprintln!("serial-gateway: {e}");
        return ExitCode::FAILURE;
    }

    if args.print_config {
        println!("{}", config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    if args.list {
        for port in SystemPorts.list_ports() {
            println!("{}\t{}", port.device_path, port.kind);
        }
        return ExitCode::SUCCESS;
    }

    init_logging(&config.logging.level);

    let ctx = Arc::new(GatewayContext::from_config(
        &config,
        Arc::new(SystemPorts),
        Arc::new(SystemSerial),
    ));
    let handshake_timeout = Duration::from_secs(config.server.handshake_timeout);

    let server = match Server::bind(&config.listen_addr(), ctx, handshake_timeout).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr(), error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    match server.local_addr() {
        Ok(addr) => tracing::info!("serial-gateway listening on ws://{}", addr),
        Err(_) => tracing::info!("serial-gateway listening on ws://{}", config.listen_addr()),
    }
    tracing::info!(
        device = %config.serial.device,
        baud_rate = config.serial.baud_rate,
        "Default serial target"
    );

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(sessions = server.active_sessions(), "Shutting down");
        }
    }

    ExitCode::SUCCESS
}
