use std::path::PathBuf;

use clap::Parser;
use gateway_config::GatewayConfig;

/// serial-gateway: bridge a serial port to WebSocket clients.
#[derive(Parser, Debug)]
#[command(name = "serial-gateway", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Default serial device, or "last" for the newest port.
    #[arg(short = 'd', long)]
    pub device: Option<String>,

    /// Default baud rate.
    #[arg(short = 'b', long)]
    pub baud: Option<u32>,

    /// Address to listen on.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Delay between serial open attempts, in milliseconds.
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print available serial ports and exit.
    #[arg(long)]
    pub list: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Overlay command-line values onto the loaded config.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(device) = &self.device {
            config.serial.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.session.retry_delay_ms = delay;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
