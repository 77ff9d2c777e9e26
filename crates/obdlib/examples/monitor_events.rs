//! Monitor real-time engine events.
//!
//! Demonstrates subscribing to the engine event stream and printing all
//! events as they arrive. Useful for building dashboards, logging trips,
//! or debugging adapter communication.
//!
//! Events include decoded parameter values, periodic poll snapshots, ECU
//! online/offline transitions, and connection status changes.
//!
//! # Requirements
//!
//! - An ELM327 adapter plugged into the OBD-II port, ignition on
//! - Serial port path adjusted for your system
//!
//! # Usage
//!
//! ```sh
//! cargo run -p obdlib --example monitor_events
//! ```

use std::time::Duration;

use obdlib::{Elm327Builder, ObdEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let serial_port = "/dev/ttyUSB0";

    println!("Connecting to ELM327 on {}...", serial_port);

    let engine = Elm327Builder::new().serial_port(serial_port).build().await?;

    let mut events = engine.subscribe();
    println!("Subscribed to engine events. Monitoring for 60 seconds...\n");

    engine.add_poller("vss").await?;
    engine.add_poller("rpm").await?;
    engine.add_poller("temp").await?;
    engine.start_polling(None).await?;

    println!("{:<12} Event", "Timestamp");
    println!("{:-<12} {:-<50}", "", "");

    let start = tokio::time::Instant::now();
    let deadline = start + Duration::from_secs(60);

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(event)) => {
                let elapsed = start.elapsed();
                let timestamp = format!("{:>6}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis());

                match event {
                    ObdEvent::Pid { name, value } => {
                        println!("{} Pid          {} = {}", timestamp, name, value);
                    }
                    ObdEvent::Snapshot(values) => {
                        let line: Vec<String> = values
                            .iter()
                            .map(|(name, value)| match value {
                                Some(v) => format!("{name}={v}"),
                                None => format!("{name}=-"),
                            })
                            .collect();
                        println!("{} Snapshot     {}", timestamp, line.join("  "));
                    }
                    ObdEvent::Ecu { online, status } => {
                        let state = if online { "online" } else { "offline" };
                        println!("{} Ecu          {} ({})", timestamp, state, status);
                    }
                    ObdEvent::Reply(reply) => {
                        println!("{} Reply        {:?}", timestamp, reply);
                    }
                    ObdEvent::Connected => {
                        println!("{} Connected", timestamp);
                    }
                    ObdEvent::Disconnected => {
                        println!("{} Disconnected", timestamp);
                        break;
                    }
                    ObdEvent::Error(msg) => {
                        println!("{} Error        {}", timestamp, msg);
                    }
                }
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                println!("(missed {} events due to lag)", n);
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                println!("Event channel closed.");
                break;
            }
            Err(_) => {
                // Timeout -- monitoring period elapsed.
                break;
            }
        }
    }

    engine.disconnect().await?;
    println!("\nMonitoring complete.");
    Ok(())
}
