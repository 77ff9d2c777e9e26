// obdlib test application -- CLI tool for exercising the ELM327 engine
// against a real adapter or a mock transport.
//
// Usage:
//   obdlib-test-app list
//   obdlib-test-app --port /dev/ttyUSB0 get vss rpm temp
//   obdlib-test-app --port /dev/ttyUSB0 poll vss rpm --duration 30
//   obdlib-test-app --port /dev/ttyUSB0 --baud 115200 monitor --duration 60
//   obdlib-test-app --port /dev/ttyUSB0 dtc
//   obdlib-test-app --port /dev/ttyUSB0 clear-dtc
//   obdlib-test-app --port /dev/ttyUSB0 raw ATRV
//   obdlib-test-app --mock get vss
//
// Set RUST_LOG=obdlib_elm327=debug for protocol-level tracing.

use std::collections::HashSet;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use obdlib::pids::standard_pids;
use obdlib::{Elm327Builder, Elm327Engine, ObdEvent, Value};
use obdlib_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// obdlib test application -- exercises the ELM327 engine from the
/// command line.
#[derive(Parser)]
#[command(name = "obdlib-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, /dev/rfcomm0, COM3).
    /// Required for all commands except `list` unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Override the default 38400 baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Override the default 2000 ms command timeout.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Use a mock transport instead of a real serial port.
    /// Useful for verifying CLI parsing and builder wiring without
    /// hardware; data commands will time out rather than return values.
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all parameters in the standard registry.
    List,

    /// Request one or more parameters by name and print their values.
    Get {
        /// Parameter names (e.g. vss, rpm, temp).
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Poll parameters continuously and print values as they arrive.
    Poll {
        /// Parameter names to poll.
        #[arg(required = true)]
        names: Vec<String>,

        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,

        /// Override the derived poll interval, in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Subscribe to engine events and print them in real time.
    Monitor {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Read the MIL status and stored diagnostic trouble codes.
    Dtc,

    /// Clear stored trouble codes and reset the MIL (with confirmation).
    ClearDtc,

    /// Send a raw adapter command (e.g. ATRV, 0902) and print the replies.
    Raw {
        /// Command text without the trailing carriage return.
        command: String,

        /// Expected reply count appended to the command (0 = unbounded).
        #[arg(long, default_value_t = 0)]
        expected: u8,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Prompt the user for y/N confirmation. Returns true only if "y" or "Y"
/// entered.
fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    io::stdout().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim(), "y" | "Y")
}

/// Validate that every requested name exists in the standard registry
/// before connecting, so typos fail fast with the full list of options.
fn validate_names(names: &[String]) -> Result<()> {
    for name in names {
        if !standard_pids().iter().any(|d| d.name == name) {
            let known: Vec<&str> = standard_pids().iter().map(|d| d.name).collect();
            bail!(
                "unknown parameter '{}'. Supported parameters: {}",
                name,
                known.join(", ")
            );
        }
    }
    Ok(())
}

/// Format a decoded value with its registry unit, if any.
fn format_value(name: &str, value: &Value) -> String {
    let unit = standard_pids()
        .iter()
        .find(|d| d.name == name)
        .map(|d| d.unit)
        .unwrap_or("");
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

// ---------------------------------------------------------------------------
// Engine construction
// ---------------------------------------------------------------------------

/// Construct an engine from CLI arguments, over a real serial port or a
/// mock transport.
async fn create_engine(cli: &Cli) -> Result<Elm327Engine> {
    let mut builder = Elm327Builder::new();

    if let Some(ms) = cli.timeout_ms {
        builder = builder.command_timeout(Duration::from_millis(ms));
    }

    if cli.mock {
        let mock = MockTransport::new();
        let engine = builder
            .build_with_transport(Box::new(mock))
            .await
            .context("failed to build engine with mock transport")?;
        println!("Connected (mock transport)");
        return Ok(engine);
    }

    let port = cli
        .port
        .as_deref()
        .context("--port is required when not using --mock")?;
    let baud = cli.baud.unwrap_or(38400);

    builder = builder.serial_port(port).baud_rate(baud);

    let engine = builder
        .build()
        .await
        .with_context(|| format!("failed to open serial port {port} at {baud} baud"))?;

    println!("Connected to {port} at {baud} baud");
    Ok(engine)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    let entries = standard_pids();

    let name_width = entries
        .iter()
        .map(|d| d.name.len())
        .max()
        .unwrap_or(10)
        .max(10);

    println!(
        "{:<name_width$}  {:<4}  {:<4}  {:>5}  {:<8}  Description",
        "Name",
        "Mode",
        "PID",
        "Bytes",
        "Unit",
        name_width = name_width,
    );
    println!(
        "{:<name_width$}  {:<4}  {:<4}  {:>5}  {:<8}  -----------",
        "-".repeat(name_width),
        "----",
        "----",
        "-----",
        "--------",
        name_width = name_width,
    );

    for d in entries {
        println!(
            "{:<name_width$}  {:<4}  {:<4}  {:>5}  {:<8}  {}",
            d.name,
            d.mode,
            d.pid.unwrap_or("--"),
            d.bytes,
            d.unit,
            d.description,
            name_width = name_width,
        );
    }

    println!();
    println!("{} parameters total.", entries.len());

    Ok(())
}

async fn cmd_get(engine: &Elm327Engine, names: &[String]) -> Result<()> {
    let mut events = engine.subscribe();

    for name in names {
        engine.request_value_by_name(name).await?;
    }

    // The queue answers in order once adapter setup completes; wait until
    // every requested name has reported, or give up after a deadline.
    let mut waiting: HashSet<&str> = names.iter().map(String::as_str).collect();
    let deadline = Instant::now() + Duration::from_secs(10);

    while !waiting.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ObdEvent::Pid { name, value })) => {
                if waiting.remove(name.as_str()) {
                    println!("{name}: {}", format_value(&name, &value));
                }
            }
            Ok(Ok(ObdEvent::Error(msg))) => {
                eprintln!("[error] {msg}");
            }
            Ok(Ok(_)) => {}
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                eprintln!("[warning] missed {n} events (consumer too slow)");
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => break,
            Err(_) => break,
        }
    }

    if !waiting.is_empty() {
        let missing: Vec<&str> = waiting.into_iter().collect();
        bail!("no reply for: {}", missing.join(", "));
    }

    Ok(())
}

async fn cmd_poll(
    engine: &Elm327Engine,
    names: &[String],
    duration_secs: u64,
    interval_ms: Option<u64>,
) -> Result<()> {
    let mut events = engine.subscribe();

    for name in names {
        engine.add_poller(name).await?;
    }
    engine
        .start_polling(interval_ms.map(Duration::from_millis))
        .await?;

    println!("Polling {} (Ctrl-C to stop)...", names.join(", "));

    let deadline = if duration_secs > 0 {
        Some(Instant::now() + Duration::from_secs(duration_secs))
    } else {
        None
    };

    let start = Instant::now();

    loop {
        let timeout = match deadline {
            Some(dl) => {
                let remaining = dl.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    println!("Poll duration elapsed.");
                    break;
                }
                remaining
            }
            None => Duration::from_secs(3600),
        };

        match tokio::time::timeout(timeout, events.recv()).await {
            Ok(Ok(ObdEvent::Pid { name, value })) => {
                let elapsed = start.elapsed();
                println!(
                    "{:>6}.{:03}s  {name} = {}",
                    elapsed.as_secs(),
                    elapsed.subsec_millis(),
                    format_value(&name, &value),
                );
            }
            Ok(Ok(ObdEvent::Ecu { online, status })) => {
                let state = if online { "online" } else { "offline" };
                println!("[ecu] {state} ({status})");
            }
            Ok(Ok(ObdEvent::Error(msg))) => {
                eprintln!("[error] {msg}");
            }
            Ok(Ok(_)) => {}
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                eprintln!("[warning] missed {n} events (consumer too slow)");
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                println!("Event channel closed.");
                break;
            }
            Err(_) => {
                if deadline.is_some() {
                    println!("Poll duration elapsed.");
                }
                break;
            }
        }
    }

    engine.stop_polling().await.ok();
    engine.remove_all_pollers().await.ok();

    Ok(())
}

async fn cmd_monitor(engine: &Elm327Engine, duration_secs: u64) -> Result<()> {
    let mut events = engine.subscribe();

    println!("Monitoring engine events (Ctrl-C to stop)...");

    let deadline = if duration_secs > 0 {
        Some(Instant::now() + Duration::from_secs(duration_secs))
    } else {
        None
    };

    loop {
        let timeout = match deadline {
            Some(dl) => {
                let remaining = dl.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    println!("Monitor duration elapsed.");
                    break;
                }
                remaining
            }
            None => Duration::from_secs(3600),
        };

        match tokio::time::timeout(timeout, events.recv()).await {
            Ok(Ok(event)) => {
                println!("[event] {event:?}");
                if matches!(event, ObdEvent::Disconnected) {
                    break;
                }
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                println!("[warning] missed {n} events (consumer too slow)");
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                println!("Event channel closed.");
                break;
            }
            Err(_) => {
                if deadline.is_some() {
                    println!("Monitor duration elapsed.");
                }
                break;
            }
        }
    }

    Ok(())
}

async fn cmd_dtc(engine: &Elm327Engine) -> Result<()> {
    let mut events = engine.subscribe();

    engine.request_value_by_name("dtc_cnt").await?;
    engine.request_value_by_name("requestdtc").await?;

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut saw_codes = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
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
                        println!("Stored trouble codes:");
                        for code in &codes {
                            println!("  {code}");
                        }
                    }
                    saw_codes = true;
                    break;
                }
                _ => {}
            },
            Ok(Ok(ObdEvent::Error(msg))) => {
                eprintln!("[error] {msg}");
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }

    if !saw_codes {
        bail!("no reply to the stored-codes request");
    }

    Ok(())
}

async fn cmd_clear_dtc(engine: &Elm327Engine) -> Result<()> {
    println!("WARNING: This clears stored trouble codes, freeze frame data,");
    println!("and resets the MIL. Readiness monitors will need a drive cycle");
    println!("to complete again.");
    if !confirm("Continue? [y/N] ") {
        println!("Aborted.");
        return Ok(());
    }

    let mut events = engine.subscribe();
    engine.request_value_by_name("cleardtc").await?;

    // Mode 04 acknowledges with a bare "44" or an OK status token; report
    // success on the first reply either way.
    let deadline = Instant::now() + Duration::from_secs(10);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            bail!("no reply to the clear request");
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ObdEvent::Reply(reply))) => {
                println!("Adapter replied: {reply:?}");
                println!("Trouble codes cleared.");
                return Ok(());
            }
            Ok(Ok(ObdEvent::Error(msg))) => {
                bail!("clear request failed: {msg}");
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) => bail!("event channel closed before the clear completed"),
            Err(_) => bail!("no reply to the clear request"),
        }
    }
}

async fn cmd_raw(engine: &Elm327Engine, command: &str, expected: u8) -> Result<()> {
    let mut events = engine.subscribe();

    engine.write(command, None, expected).await?;
    println!("Sent: {command}");

    // Print every reply frame for a short window; raw commands have no
    // registry entry, so the engine cannot attribute them by name.
    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ObdEvent::Reply(reply))) => {
                println!("[reply] {reply:?}");
            }
            Ok(Ok(ObdEvent::Error(msg))) => {
                eprintln!("[error] {msg}");
                break;
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // The `list` command does not require an adapter connection.
    if matches!(&cli.command, Command::List) {
        return cmd_list();
    }

    // Validate parameter names before opening the port.
    match &cli.command {
        Command::Get { names } | Command::Poll { names, .. } => validate_names(names)?,
        _ => {}
    }

    let engine = create_engine(&cli).await?;

    let result = match &cli.command {
        Command::Get { names } => cmd_get(&engine, names).await,
        Command::Poll {
            names,
            duration,
            interval_ms,
        } => cmd_poll(&engine, names, *duration, *interval_ms).await,
        Command::Monitor { duration } => cmd_monitor(&engine, *duration).await,
        Command::Dtc => cmd_dtc(&engine).await,
        Command::ClearDtc => cmd_clear_dtc(&engine).await,
        Command::Raw { command, expected } => cmd_raw(&engine, command, *expected).await,
        Command::List => unreachable!("list handled above"),
    };

    engine.disconnect().await.ok();

    result
}
