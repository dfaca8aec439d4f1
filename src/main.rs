//! # boleta CLI
//!
//! Command-line interface for Bluetooth ESC/POS receipt printers.
//!
//! ## Usage
//!
//! ```bash
//! # List bonded devices
//! boleta paired
//!
//! # Discover nearby devices for 10 seconds
//! boleta scan --seconds 10
//!
//! # Print the test page on a 58mm printer
//! boleta print --device 66:22:8E:11:22:33 --test
//!
//! # Print a line of text, or a QR code
//! boleta print --device 66:22:8E:11:22:33 --text "hello"
//! boleta print --device 66:22:8E:11:22:33 --qr "https://example.com"
//!
//! # Serve the JSON API
//! boleta serve --listen 0.0.0.0:8080
//! ```
//!
//! Set `RUST_LOG=boleta=debug` for verbose output.

use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use boleta::{
    BoletaError,
    bridge::{BridgeConfig, DeviceBridge},
    command::Command,
    facade::PrinterFacade,
    layout::{self, Composer},
    platform::{
        bluez::{BluezAdapter, BluezConfig},
        is_valid_mac,
    },
    printer::PaperProfile,
    protocol::commands::{self, CutType},
    protocol::text::Alignment,
    receipt,
    server::{self, ServerConfig},
};

const DEFAULT_LOG_FILTER: &str = "boleta=info,tower_http=info";

/// boleta - Bluetooth thermal receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "boleta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    bluetooth: BluetoothArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct BluetoothArgs {
    /// RFCOMM channel of the printer's serial port service
    #[arg(long, global = true, default_value_t = 1)]
    channel: u8,

    /// Wait after cancelling discovery before restarting it (ms)
    #[arg(long, global = true, default_value_t = 500)]
    settle_ms: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List devices bonded with this host
    Paired,

    /// Discover nearby Bluetooth devices
    Scan {
        /// How long to scan
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },

    /// Print to a printer
    Print {
        /// Printer MAC address
        #[arg(long)]
        device: String,

        /// Paper width (58mm or 80mm)
        #[arg(long, default_value = "58mm")]
        paper: String,

        /// Print the test page
        #[arg(long, conflicts_with_all = ["receipt", "text", "qr"])]
        test: bool,

        /// Print a named receipt (test, demo)
        #[arg(long, conflicts_with_all = ["text", "qr"])]
        receipt: Option<String>,

        /// Print a line of text
        #[arg(long, conflicts_with = "qr")]
        text: Option<String>,

        /// Print a QR code
        #[arg(long)]
        qr: Option<String>,
    },

    /// Serve the JSON API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,

        /// Paper width used for the test page
        #[arg(long, default_value = "58mm")]
        paper: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoletaError> {
    let cli = Cli::parse();
    let scan_timeout = match &cli.command {
        Commands::Scan { seconds } => Duration::from_secs(*seconds),
        _ => BluezConfig::default().scan_timeout,
    };
    let bridge = build_bridge(&cli.bluetooth, scan_timeout);

    match cli.command {
        Commands::Paired => {
            if !bridge.is_available().await {
                return Err(BoletaError::NotAvailable);
            }
            let devices = bridge.get_paired_devices().await;
            if devices.is_empty() {
                println!("No paired devices.");
            }
            for device in devices {
                println!("{}  {}", device.id, device.name);
            }
            Ok(())
        }

        Commands::Scan { seconds } => {
            println!("Scanning for {} seconds...", seconds);
            let subscription = bridge
                .start_scanning(|device| match device.rssi {
                    Some(rssi) => println!("{}  {}  ({} dBm)", device.id, device.name, rssi),
                    None => println!("{}  {}", device.id, device.name),
                })
                .await?;

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            bridge.stop_scanning().await;
            let _ = subscription.finished().await;
            println!("Scan finished.");
            Ok(())
        }

        Commands::Print {
            device,
            paper,
            test,
            receipt: receipt_name,
            text,
            qr,
        } => {
            if !is_valid_mac(&device) {
                return Err(BoletaError::InvalidConfig(format!(
                    "Invalid MAC address: {}",
                    device
                )));
            }
            let composer = Composer::new(PaperProfile::parse(&paper)?);
            let command = build_print(&composer, test, receipt_name, text, qr)?;

            println!("Connecting to {}...", device);
            bridge.connect_device(&device).await?;
            let printed = bridge.print(&command).await;
            bridge.disconnect().await?;
            printed?;

            println!("Printed {} bytes.", command.len());
            Ok(())
        }

        Commands::Serve { listen, paper } => {
            let config = ServerConfig {
                listen_addr: listen,
                paper: PaperProfile::parse(&paper)?,
            };
            server::serve(config, PrinterFacade::new(bridge)).await
        }
    }
}

fn build_bridge(args: &BluetoothArgs, scan_timeout: Duration) -> DeviceBridge {
    let adapter = BluezAdapter::new(BluezConfig {
        rfcomm_channel: args.channel,
        scan_timeout,
        ..BluezConfig::default()
    });
    DeviceBridge::new(
        Arc::new(adapter),
        BridgeConfig {
            discovery_settle: Duration::from_millis(args.settle_ms),
        },
    )
}

/// Pick the document to print from the CLI flags.
fn build_print(
    composer: &Composer,
    test: bool,
    receipt_name: Option<String>,
    text: Option<String>,
    qr: Option<String>,
) -> Result<Command, BoletaError> {
    if let Some(name) = receipt_name {
        return receipt::by_name(&name, composer).ok_or_else(|| {
            BoletaError::InvalidConfig(format!(
                "Unknown receipt '{}'. Available: {}",
                name,
                receipt::list_receipts().join(", ")
            ))
        });
    }

    let body = match (text, qr) {
        (Some(text), _) => Command::concat([layout::text_aligned(Alignment::Left, &text), layout::new_line()]),
        (None, Some(data)) => composer.qr_code(&data, 6),
        (None, None) if test => return Ok(receipt::test_receipt(composer)),
        (None, None) => {
            return Err(BoletaError::InvalidConfig(
                "Nothing to print: pass --test, --receipt, --text or --qr".to_string(),
            ));
        }
    };

    Ok(layout::combine([
        commands::init(),
        body,
        layout::new_lines(3),
        commands::cut(CutType::Partial),
    ]))
}
