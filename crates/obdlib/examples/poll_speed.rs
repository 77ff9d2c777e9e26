//! Continuously poll vehicle speed and engine RPM.
//!
//! The minimal polling setup: two pollers, default interval (derived from
//! the active count), values printed as they decode.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p obdlib --example poll_speed
//! ```

use obdlib::{Elm327Builder, ObdEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let engine = Elm327Builder::new()
        .serial_port("/dev/ttyUSB0")
        .build()
        .await?;

    let mut events = engine.subscribe();

    engine.add_poller("vss").await?;
    engine.add_poller("rpm").await?;
    engine.start_polling(None).await?;

    while let Ok(event) = events.recv().await {
        if let ObdEvent::Pid { name, value } = event {
            match name.as_str() {
                "vss" => println!("speed: {value} km/h"),
                "rpm" => println!("rpm:   {value}"),
                _ => {}
            }
        }
    }

    Ok(())
}
