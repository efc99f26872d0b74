//! Simulated sensor devices
//!
//! Run with: cargo run --example sensor_sim [ENDPOINT] [INTERVAL_MS] [DEVICES]
//!
//! Examples:
//!   cargo run --example sensor_sim
//!   cargo run --example sensor_sim http://127.0.0.1:9000/api/readings
//!   cargo run --example sensor_sim http://127.0.0.1:8080/api/readings 250 NYC,LON,TYO,SYD

use std::time::Duration;

use sensor_hub::simulator::{DeviceSimulator, SimulatorConfig, DEFAULT_ENDPOINT};

fn print_usage() {
    eprintln!("Usage: sensor_sim [ENDPOINT] [INTERVAL_MS] [DEVICES]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  ENDPOINT       Ingest URL (default: {})", DEFAULT_ENDPOINT);
    eprintln!("  INTERVAL_MS    Milliseconds between readings (default: 1000)");
    eprintln!("  DEVICES        Comma-separated device ids (default: NYC,LON,TYO)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sensor_hub=debug".parse()?)
                .add_directive("sensor_sim=debug".parse()?),
        )
        .init();

    let mut config = SimulatorConfig::default();

    if let Some(endpoint) = args.get(1) {
        config = config.endpoint(endpoint.as_str());
    }

    if let Some(interval) = args.get(2) {
        match interval.parse::<u64>() {
            Ok(ms) if ms > 0 => config = config.interval(Duration::from_millis(ms)),
            _ => {
                eprintln!("Error: invalid interval '{}'", interval);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    if let Some(devices) = args.get(3) {
        config = config.devices(devices.split(',').map(str::trim).filter(|d| !d.is_empty()));
    }

    println!(
        "Simulating {} devices -> {} every {:?}",
        config.devices.join(","),
        config.endpoint,
        config.interval
    );

    let report = DeviceSimulator::new(config)
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    println!("\nSent {} readings ({} failed)", report.sent, report.failed);

    Ok(())
}
