//! The protocol engine task and its public handle.
//!
//! One spawned task per connection owns the transport, the command queue,
//! the poller set, the liveness flag, and the frame reassembler -- all
//! mutable state lives in that task, so nothing here needs a lock. The
//! public [`Elm327Engine`] handle talks to the task over an `mpsc` control
//! channel with per-request `oneshot` replies; decoded replies and state
//! changes fan out to subscribers over a `broadcast` channel.
//!
//! Each loop iteration reduces exactly one inbound event (a control
//! request, a chunk of transport data, a poll tick, a command timeout, or
//! an idle wakeup) and then pumps the queue once. Dispatch is therefore
//! never re-entrant: a reply that enqueues a follow-up command cannot
//! trigger a send until the current event is fully processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use obdlib_core::error::{Error, Result};
use obdlib_core::events::ObdEvent;
use obdlib_core::transport::Transport;
use obdlib_core::types::Reply;
use obdlib_pids::PidRegistry;

use crate::decoder;
use crate::liveness::{self, LivenessState};
use crate::poller::PollerState;
use crate::protocol::{self, FrameReassembler};
use crate::queue::{CommandQueue, PendingCommand};

/// Adapter setup commands enqueued on connect, before anything else.
///
/// Reset, echo off, linefeeds off, spaces off, headers off, adaptive
/// timing 2, protocol auto. User commands queued early are simply ordered
/// after these through the one-in-flight queue.
const INIT_SEQUENCE: &[&str] = &["ATZ", "ATE0", "ATL0", "ATS0", "ATH0", "ATAT2", "ATSP0"];

/// How long one transport read waits before the loop re-evaluates.
const READ_POLL: Duration = Duration::from_millis(100);

/// Backoff after an empty read so a fast-failing transport cannot spin
/// the loop.
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Broadcast channel capacity for [`ObdEvent`] fan-out.
const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Control plane
// ---------------------------------------------------------------------------

/// A request sent from the public handle to the engine task.
pub(crate) enum ControlRequest {
    Write {
        wire_text: String,
        name: Option<String>,
        expected_replies: u8,
        response_tx: oneshot::Sender<Result<()>>,
    },
    RequestValue {
        name: String,
        response_tx: oneshot::Sender<Result<()>>,
    },
    AddPoller {
        name: String,
        response_tx: oneshot::Sender<Result<()>>,
    },
    RemovePoller {
        name: String,
        response_tx: oneshot::Sender<Result<()>>,
    },
    RemoveAllPollers {
        response_tx: oneshot::Sender<Result<()>>,
    },
    StartPolling {
        interval: Option<Duration>,
        response_tx: oneshot::Sender<Result<()>>,
    },
    StopPolling {
        response_tx: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        response_tx: oneshot::Sender<Result<()>>,
    },
}

/// One inbound event, reduced per loop iteration.
enum EngineEvent {
    /// A control request from the public handle.
    Control(ControlRequest),
    /// Raw bytes read from the transport.
    DataChunk(Vec<u8>),
    /// A hard transport receive failure (not a read timeout).
    ChannelError(Error),
    /// The poll timer fired.
    PollTick,
    /// The in-flight command went unanswered past its deadline.
    CommandTimeout,
    /// Nothing happened this iteration.
    Idle,
    /// The control channel closed: the handle was dropped.
    Shutdown,
}

/// Engine construction parameters, assembled by the builder.
pub(crate) struct EngineConfig {
    pub command_timeout: Duration,
    pub queue_capacity: usize,
    pub carry_limit: usize,
    pub registry: PidRegistry,
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Handle to a running ELM327 protocol engine.
///
/// Cheap to clone-free: all methods take `&self` and forward to the engine
/// task. Dropping the handle shuts the task down and closes the transport.
///
/// Construct via [`Elm327Builder`](crate::builder::Elm327Builder).
pub struct Elm327Engine {
    cmd_tx: mpsc::Sender<ControlRequest>,
    event_tx: broadcast::Sender<ObdEvent>,
    connected: Arc<AtomicBool>,
    /// Kept so the task can be observed/aborted; the task exits on its own
    /// when `cmd_tx` is dropped.
    #[allow(dead_code)]
    task_handle: JoinHandle<()>,
}

impl Elm327Engine {
    /// Spawn the engine task over an open transport.
    pub(crate) fn start(transport: Box<dyn Transport>, config: EngineConfig) -> Elm327Engine {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ControlRequest>(16);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));

        let core = EngineCore {
            transport,
            queue: CommandQueue::with_capacity(config.queue_capacity),
            poller: PollerState::new(),
            liveness: LivenessState::new(),
            reassembler: FrameReassembler::with_carry_limit(config.carry_limit),
            registry: config.registry,
            event_tx: event_tx.clone(),
            command_timeout: config.command_timeout,
            deadline: None,
            next_tick: None,
            connected: true,
            connected_flag: Arc::clone(&connected),
        };
        let task_handle = tokio::spawn(core.run(cmd_rx));

        Elm327Engine {
            cmd_tx,
            event_tx,
            connected,
            task_handle,
        }
    }

    /// Subscribe to engine events. Each subscriber gets every event from
    /// the moment of subscription; slow subscribers may lag and miss
    /// events under heavy poll load.
    pub fn subscribe(&self) -> broadcast::Receiver<ObdEvent> {
        self.event_tx.subscribe()
    }

    /// `true` while the engine holds an open transport.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue a raw command.
    ///
    /// `name` attributes the command to a parameter for reply tracking;
    /// `expected_replies` bounds the ECU reply count on the wire
    /// (`0` = unbounded).
    pub async fn write(
        &self,
        wire_text: &str,
        name: Option<&str>,
        expected_replies: u8,
    ) -> Result<()> {
        self.request(|response_tx| ControlRequest::Write {
            wire_text: wire_text.to_string(),
            name: name.map(str::to_string),
            expected_replies,
            response_tx,
        })
        .await
    }

    /// Queue a single bounded request for a registry parameter. The value
    /// arrives as [`ObdEvent::Pid`] once decoded.
    pub async fn request_value_by_name(&self, name: &str) -> Result<()> {
        self.request(|response_tx| ControlRequest::RequestValue {
            name: name.to_string(),
            response_tx,
        })
        .await
    }

    /// Add a parameter to the active poller set. Idempotent.
    pub async fn add_poller(&self, name: &str) -> Result<()> {
        self.request(|response_tx| ControlRequest::AddPoller {
            name: name.to_string(),
            response_tx,
        })
        .await
    }

    /// Remove a parameter from the active poller set, pruning its queued
    /// (unsent) commands.
    pub async fn remove_poller(&self, name: &str) -> Result<()> {
        self.request(|response_tx| ControlRequest::RemovePoller {
            name: name.to_string(),
            response_tx,
        })
        .await
    }

    /// Remove every poller. Safe to call when none are active.
    pub async fn remove_all_pollers(&self) -> Result<()> {
        self.request(|response_tx| ControlRequest::RemoveAllPollers { response_tx })
            .await
    }

    /// Start the poll timer. `interval` of `None` derives the interval
    /// from the active poller count (50 ms per command).
    pub async fn start_polling(&self, interval: Option<Duration>) -> Result<()> {
        self.request(|response_tx| ControlRequest::StartPolling {
            interval,
            response_tx,
        })
        .await
    }

    /// Stop the poll timer and drop all queued commands. An in-flight
    /// command is left to resolve.
    pub async fn stop_polling(&self) -> Result<()> {
        self.request(|response_tx| ControlRequest::StopPolling { response_tx })
            .await
    }

    /// Disconnect: stop polling, clear the queue, close the transport.
    /// Idempotent.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|response_tx| ControlRequest::Disconnect { response_tx })
            .await
    }

    async fn request<F>(&self, make: F) -> Result<()>
    where
        F: FnOnce(oneshot::Sender<Result<()>>) -> ControlRequest,
    {
        let (response_tx, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(response_tx))
            .await
            .map_err(|_| Error::NotConnected)?;
        response_rx.await.map_err(|_| Error::NotConnected)?
    }
}

// ---------------------------------------------------------------------------
// Engine task
// ---------------------------------------------------------------------------

/// All per-connection mutable state, owned exclusively by the engine task.
struct EngineCore {
    transport: Box<dyn Transport>,
    queue: CommandQueue,
    poller: PollerState,
    liveness: LivenessState,
    reassembler: FrameReassembler,
    registry: PidRegistry,
    event_tx: broadcast::Sender<ObdEvent>,
    command_timeout: Duration,
    /// Deadline for the in-flight command, set at dispatch.
    deadline: Option<Instant>,
    /// When the next poll tick fires; `None` while polling is stopped.
    next_tick: Option<Instant>,
    connected: bool,
    /// Mirror of `connected` readable from the public handle.
    connected_flag: Arc<AtomicBool>,
}

impl EngineCore {
    async fn run(mut self, mut ctrl_rx: mpsc::Receiver<ControlRequest>) {
        self.emit(ObdEvent::Connected);
        for cmd in INIT_SEQUENCE {
            self.enqueue_reported(PendingCommand::raw(cmd));
        }
        self.pump().await;

        loop {
            let event = self.next_event(&mut ctrl_rx).await;
            match event {
                EngineEvent::Shutdown => break,
                event => self.handle_event(event).await,
            }
            self.pump().await;
        }

        // Handle dropped: release the port.
        debug!("control channel closed, engine task exiting");
        let _ = self.transport.close().await;
        self.set_connected(false);
    }

    /// Wait for exactly one inbound event.
    ///
    /// Biased priority: control requests first, then the command-timeout
    /// and poll timers, then transport reads.
    async fn next_event(&mut self, ctrl_rx: &mut mpsc::Receiver<ControlRequest>) -> EngineEvent {
        let connected = self.connected;
        let deadline = self.deadline;
        let tick = if self.poller.is_polling() {
            self.next_tick
        } else {
            None
        };
        let far = Instant::now() + Duration::from_secs(3600);
        let transport = &mut self.transport;

        tokio::select! {
            biased;

            cmd = ctrl_rx.recv() => match cmd {
                Some(cmd) => EngineEvent::Control(cmd),
                None => EngineEvent::Shutdown,
            },

            _ = sleep_until(deadline.unwrap_or(far)), if deadline.is_some() => {
                EngineEvent::CommandTimeout
            }

            _ = sleep_until(tick.unwrap_or(far)), if tick.is_some() => {
                EngineEvent::PollTick
            }

            event = async {
                let mut buf = [0u8; 256];
                match transport.receive(&mut buf, READ_POLL).await {
                    Ok(n) if n > 0 => EngineEvent::DataChunk(buf[..n].to_vec()),
                    Ok(_) | Err(Error::Timeout) => {
                        tokio::time::sleep(IDLE_BACKOFF).await;
                        EngineEvent::Idle
                    }
                    Err(e) => EngineEvent::ChannelError(e),
                }
            }, if connected => event,
        }
    }

    async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Control(request) => self.handle_control(request).await,
            EngineEvent::DataChunk(data) => self.handle_data(&data),
            EngineEvent::ChannelError(e) => {
                warn!(error = %e, "transport receive failed");
                self.emit(ObdEvent::Error(format!("transport receive failed: {e}")));
                self.do_disconnect().await;
            }
            EngineEvent::PollTick => self.handle_poll_tick(),
            EngineEvent::CommandTimeout => self.handle_command_timeout(),
            EngineEvent::Idle => {}
            EngineEvent::Shutdown => {}
        }
    }

    async fn handle_control(&mut self, request: ControlRequest) {
        match request {
            ControlRequest::Write {
                wire_text,
                name,
                expected_replies,
                response_tx,
            } => {
                let result = self.queue.enqueue(PendingCommand {
                    wire_text,
                    name,
                    expected_replies,
                });
                if let Err(ref e) = result {
                    self.report(e);
                }
                let _ = response_tx.send(result);
            }
            ControlRequest::RequestValue { name, response_tx } => {
                let result = match self.registry.command_for(&name) {
                    Some(wire) => {
                        let result = self
                            .queue
                            .enqueue(PendingCommand::for_parameter(&wire, &name));
                        if let Err(ref e) = result {
                            self.report(e);
                        }
                        result
                    }
                    None => Err(Error::UnknownParameter(name)),
                };
                let _ = response_tx.send(result);
            }
            ControlRequest::AddPoller { name, response_tx } => {
                let result = match self.registry.command_for(&name) {
                    Some(wire) => {
                        if self.poller.add(&name) {
                            debug!(name, "poller added");
                            if self.poller.is_polling() && self.connected {
                                self.enqueue_reported(PendingCommand::for_parameter(&wire, &name));
                            }
                        }
                        Ok(())
                    }
                    None => Err(Error::UnknownParameter(name)),
                };
                let _ = response_tx.send(result);
            }
            ControlRequest::RemovePoller { name, response_tx } => {
                if self.poller.remove(&name) {
                    debug!(name, "poller removed");
                }
                self.queue.prune(&name);
                let _ = response_tx.send(Ok(()));
            }
            ControlRequest::RemoveAllPollers { response_tx } => {
                for name in self.poller.names().to_vec() {
                    self.queue.prune(&name);
                }
                self.poller.clear();
                let _ = response_tx.send(Ok(()));
            }
            ControlRequest::StartPolling {
                interval,
                response_tx,
            } => {
                self.poller.set_interval(interval);
                self.poller.start();
                // First tick fires immediately.
                self.next_tick = Some(Instant::now());
                debug!(interval = ?self.poller.interval(), "polling started");
                let _ = response_tx.send(Ok(()));
            }
            ControlRequest::StopPolling { response_tx } => {
                self.poller.stop();
                self.next_tick = None;
                self.queue.clear();
                debug!("polling stopped, pending queue emptied");
                let _ = response_tx.send(Ok(()));
            }
            ControlRequest::Disconnect { response_tx } => {
                self.do_disconnect().await;
                let _ = response_tx.send(Ok(()));
            }
        }
    }

    fn handle_data(&mut self, data: &[u8]) {
        let frames = self.reassembler.feed(data);
        for frame in frames {
            trace!(frame = %frame, "frame reassembled");
            let reply = decoder::decode(&frame, &self.registry);
            self.process_reply(reply);
        }
        if let Some(e) = self.reassembler.take_overflow() {
            warn!(error = %e, "framing buffer overflowed, reset");
            self.report(&e);
        }
    }

    fn handle_poll_tick(&mut self) {
        if !self.poller.is_polling() || !self.connected {
            return;
        }
        for name in self.poller.names().to_vec() {
            if let Some(wire) = self.registry.command_for(&name) {
                self.enqueue_reported(PendingCommand::for_parameter(&wire, &name));
            }
        }
        self.emit(ObdEvent::Snapshot(self.poller.snapshot()));
        self.next_tick = Some(Instant::now() + self.poller.interval());
    }

    fn handle_command_timeout(&mut self) {
        self.deadline = None;
        let Some(dropped) = self.queue.resolve() else {
            return;
        };
        warn!(cmd = %dropped.wire_text, "command unanswered, dropped");
        self.emit(ObdEvent::Error(format!(
            "command timed out: {}",
            dropped.wire_text
        )));
        // Same recovery as a transient ECU drop: an active poller's
        // command goes around again, anything else is gone.
        if let Some(name) = &dropped.name {
            if self.poller.is_active(name) {
                self.poller.reset_value(name);
                self.enqueue_reported(dropped.clone());
            }
        }
    }

    fn process_reply(&mut self, reply: Reply) {
        self.emit(ObdEvent::Reply(reply.clone()));
        match reply {
            Reply::Status { text } => {
                if let Some(online) = self.liveness.observe_status(&text) {
                    debug!(status = %text, "ECU offline");
                    self.emit(ObdEvent::Ecu {
                        online,
                        status: text.clone(),
                    });
                }
                let resolved = self.resolve_in_flight();
                if liveness::is_retry_status(&text) {
                    if let Some(cmd) = resolved {
                        if let Some(name) = &cmd.name {
                            if self.poller.is_active(name) {
                                debug!(name, status = %text, "transient drop, re-enqueueing poll");
                                self.poller.reset_value(name);
                                self.enqueue_reported(cmd.clone());
                            }
                        }
                    }
                }
            }
            Reply::Parameter {
                name: Some(name),
                value: Some(value),
                ..
            } => {
                if let Some(online) = self.liveness.observe_named_reply() {
                    debug!(name, "ECU back online");
                    self.emit(ObdEvent::Ecu {
                        online,
                        status: name.clone(),
                    });
                }
                self.resolve_in_flight();
                self.poller.record_value(&name, value.clone());
                self.emit(ObdEvent::Pid {
                    name: name.clone(),
                    value,
                });
                // Self-sustaining refresh: an answered poll goes around again.
                if self.poller.is_active(&name) {
                    if let Some(wire) = self.registry.command_for(&name) {
                        self.enqueue_reported(PendingCommand::for_parameter(&wire, &name));
                    }
                }
            }
            Reply::Diagnostic { value, .. } => {
                let resolved = self.resolve_in_flight();
                if let Some(name) = resolved.and_then(|cmd| cmd.name) {
                    self.poller.record_value(&name, value.clone());
                    self.emit(ObdEvent::Pid { name, value });
                }
            }
            Reply::Parameter { .. } | Reply::Unknown { .. } => {
                self.resolve_in_flight();
            }
        }
    }

    /// Dispatch the next queued command if the line is free.
    ///
    /// Runs once per loop iteration, after the current event is fully
    /// processed.
    async fn pump(&mut self) {
        if !self.connected {
            return;
        }
        let Some(cmd) = self.queue.next_to_send() else {
            return;
        };
        let bytes = protocol::encode_command(&cmd.wire_text, cmd.expected_replies);
        debug!(cmd = %cmd.wire_text, "dispatching command");
        match self.transport.send(&bytes).await {
            Ok(()) => {
                self.deadline = Some(Instant::now() + self.command_timeout);
            }
            Err(e) => {
                warn!(error = %e, cmd = %cmd.wire_text, "transport write failed");
                self.emit(ObdEvent::Error(format!("transport write failed: {e}")));
                self.queue.resolve();
                self.deadline = None;
                // Stop producing data rather than spin on a dead link.
                self.poller.clear();
                self.poller.stop();
                self.next_tick = None;
            }
        }
    }

    async fn do_disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.poller.stop();
        self.next_tick = None;
        self.deadline = None;
        self.queue.clear();
        self.queue.resolve();
        let _ = self.transport.close().await;
        self.set_connected(false);
        debug!("disconnected");
        self.emit(ObdEvent::Disconnected);
    }

    fn resolve_in_flight(&mut self) -> Option<PendingCommand> {
        self.deadline = None;
        self.queue.resolve()
    }

    fn enqueue_reported(&mut self, cmd: PendingCommand) {
        if let Err(e) = self.queue.enqueue(cmd) {
            self.report(&e);
        }
    }

    fn report(&self, e: &Error) {
        warn!(error = %e, "engine error");
        self.emit(ObdEvent::Error(e.to_string()));
    }

    fn emit(&self, event: ObdEvent) {
        // No subscribers is fine; events are best-effort.
        let _ = self.event_tx.send(event);
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        self.connected_flag.store(connected, Ordering::SeqCst);
    }
}
