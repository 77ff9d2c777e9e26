//! Read stored diagnostic trouble codes.
//!
//! Queries the MIL status first (mode 01 PID 01), then requests the
//! stored codes (mode 03) and prints them.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p obdlib --example read_dtcs
//! ```

use std::time::Duration;

use obdlib::{Elm327Builder, ObdEvent, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let engine = Elm327Builder::new()
        .serial_port("/dev/ttyUSB0")
        .build()
        .await?;

    let mut events = engine.subscribe();

    engine.request_value_by_name("dtc_cnt").await?;
    engine.request_value_by_name("requestdtc").await?;

    // Collect replies for a few seconds; the one-in-flight queue answers
    // the two requests in order after the adapter setup completes.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ObdEvent::Pid { name, value })) => match (name.as_str(), value) {
                ("dtc_cnt", Value::MilStatus { mil_on, dtc_count }) => {
                    println!(
                        "MIL: {}  stored codes: {}",
                        if mil_on { "ON" } else { "off" },
                        dtc_count
                    );
                }
                ("requestdtc", Value::TroubleCodes(codes)) => {
                    if codes.is_empty() {
                        println!("No stored trouble codes.");
                    } else {
                        for code in &codes {
                            println!("  {code}");
                        }
                    }
                    break;
                }
                _ => {}
            },
            Ok(Ok(_)) => {}
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }

    engine.disconnect().await?;
    Ok(())
}
