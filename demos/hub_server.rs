//! Sensor hub server
//!
//! Run with: cargo run --example hub_server [HTTP_ADDR] [STREAM_ADDR] [BACKFILL]
//!
//! Examples:
//!   cargo run --example hub_server                          # HTTP on 0.0.0.0:8080, TCP on 0.0.0.0:8081
//!   cargo run --example hub_server localhost                # HTTP on 127.0.0.1:8080
//!   cargo run --example hub_server 127.0.0.1:9000 off       # no TCP listener
//!   cargo run --example hub_server localhost 127.0.0.1:9001 last:5
//!
//! ## Subscribing
//!
//! Server-Sent Events:
//!   curl -N http://localhost:8080/api/events
//!
//! Raw TCP (newline-delimited JSON):
//!   nc localhost 8081
//!
//! ## Publishing
//!
//!   cargo run --example sensor_sim
//!   curl -X POST -d '{"deviceId":"NYC","temperature":30,"humidity":45}' http://localhost:8080/api/readings

use std::net::SocketAddr;
use std::time::Duration;

use sensor_hub::{BackfillPolicy, HubServer, RegistryConfig, ServerConfig};

/// Parse an address argument.
///
/// Accepts "localhost", "localhost:PORT", "IP" or "IP:PORT"; a missing port
/// becomes `default_port`.
fn parse_addr(arg: &str, default_port: u16) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    Err(format!(
        "Invalid address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

/// Parse a backfill argument: "none", "last:N" or "window:SECS"
fn parse_backfill(arg: &str) -> Result<BackfillPolicy, String> {
    if arg == "none" {
        return Ok(BackfillPolicy::None);
    }

    if let Some(n) = arg.strip_prefix("last:") {
        return n
            .parse()
            .map(BackfillPolicy::LastN)
            .map_err(|_| format!("Invalid count in '{}'", arg));
    }

    if let Some(secs) = arg.strip_prefix("window:") {
        return secs
            .parse()
            .map(|s| BackfillPolicy::BufferWindow(Duration::from_secs(s)))
            .map_err(|_| format!("Invalid seconds in '{}'", arg));
    }

    Err(format!(
        "Invalid backfill: '{}'. Expected none, last:N or window:SECS",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: hub_server [HTTP_ADDR] [STREAM_ADDR|off] [BACKFILL]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  HTTP_ADDR      HTTP API address (default: 0.0.0.0:8080)");
    eprintln!("  STREAM_ADDR    TCP subscriber address, or 'off' (default: 0.0.0.0:8081)");
    eprintln!("  BACKFILL       none | last:N | window:SECS (default: none)");
}

fn fail(message: String) -> ! {
    eprintln!("Error: {}", message);
    eprintln!();
    print_usage();
    std::process::exit(1);
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
                .add_directive("hub_server=debug".parse()?),
        )
        .init();

    let mut config = ServerConfig::default();

    if let Some(arg) = args.get(1) {
        config = config.bind(parse_addr(arg, 8080).unwrap_or_else(|e| fail(e)));
    }

    match args.get(2).map(String::as_str) {
        Some("off") => config = config.disable_stream_listener(),
        Some(arg) => config = config.stream_addr(parse_addr(arg, 8081).unwrap_or_else(|e| fail(e))),
        None => {}
    }

    let backfill = match args.get(3) {
        Some(arg) => parse_backfill(arg).unwrap_or_else(|e| fail(e)),
        None => BackfillPolicy::None,
    };

    println!("Starting sensor hub");
    println!("  HTTP:     http://{}", config.http_addr);
    match config.stream_addr {
        Some(addr) => println!("  TCP:      {}", addr),
        None => println!("  TCP:      disabled"),
    }
    println!("  Backfill: {:?}", backfill);
    println!();
    println!("Subscribe: curl -N http://localhost:{}/api/events", config.http_addr.port());
    println!("Publish:   cargo run --example sensor_sim");
    println!();

    let server = HubServer::with_registry_config(config, RegistryConfig::default().backfill(backfill));

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nShutting down...");
    };

    if let Err(e) = server.run_until(shutdown).await {
        eprintln!("Server error: {}", e);
    }

    let stats = server.hub().stats().await;
    println!(
        "Published {} readings to {} sessions ({} frames, {:.1} per reading, {} dropped)",
        stats.readings_published,
        stats.total_sessions,
        stats.frames_enqueued,
        stats.fanout_ratio(),
        stats.frames_dropped
    );

    Ok(())
}
