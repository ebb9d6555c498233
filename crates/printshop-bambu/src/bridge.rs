//! Background MQTT listener for one printer.
//!
//! The bridge owns a dedicated OS thread running a single-threaded tokio
//! runtime. That thread keeps the merged [`PrinterStatus`] to itself and hands
//! a copy to the [`StatusSink`] after every change; the sink is the only point
//! where data crosses back to the caller's thread.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use rumqttc::{AsyncClient, ConnectionError, Event, MqttOptions, Packet, QoS};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::error::{Result, TelemetryError};
use crate::request::{PrinterRequest, Sequence};
use crate::status::{PrinterStatus, StatusReport};

/// Connection state of the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Not started, or stopped by the caller.
    #[default]
    Idle,
    /// Waiting for the broker to accept the first connect.
    Connecting,
    /// Connected and receiving reports.
    Online,
    /// An established link dropped; the worker keeps polling.
    Disconnected,
    /// The first connect failed. Inert until an explicit reconnect.
    Failed(String),
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Connecting => f.write_str("Connecting"),
            Self::Online => f.write_str("Online"),
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Failed(reason) => write!(f, "Failed ({reason})"),
        }
    }
}

/// A merged status snapshot handed to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Last known printer state.
    pub status: PrinterStatus,
    /// Link state when the update was produced.
    pub link: LinkState,
    /// When the update was produced.
    pub at: Instant,
}

impl StatusUpdate {
    fn new(status: &PrinterStatus, link: LinkState) -> Self {
        Self {
            status: status.clone(),
            link,
            at: Instant::now(),
        }
    }
}

/// Receiver of status updates, called from the bridge thread.
///
/// Implementations should only schedule work onto their own thread, for
/// example by sending on a channel.
pub trait StatusSink: Send + Sync {
    /// Accept one update.
    fn deliver(&self, update: StatusUpdate);
}

impl<F> StatusSink for F
where
    F: Fn(StatusUpdate) + Send + Sync,
{
    fn deliver(&self, update: StatusUpdate) {
        self(update)
    }
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Live telemetry link to one printer.
pub struct PrinterBridge {
    config: BridgeConfig,
    sink: Arc<dyn StatusSink>,
    link: Arc<Mutex<LinkState>>,
    worker: Option<Worker>,
}

impl PrinterBridge {
    /// Create a stopped bridge.
    pub fn new(config: BridgeConfig, sink: impl StatusSink + 'static) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            link: Arc::new(Mutex::new(LinkState::Idle)),
            worker: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current link state.
    pub fn link_state(&self) -> LinkState {
        self.link.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// True while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Start the worker, stopping any previous one first.
    ///
    /// Settings are checked up front; the connect itself happens on the
    /// worker and its outcome shows up in [`PrinterBridge::link_state`].
    pub fn connect(&mut self) -> Result<()> {
        self.stop_worker();

        let options = match self.config.mqtt_options() {
            Ok(options) => options,
            Err(e) => {
                set_link(&self.link, LinkState::Failed(e.to_string()));
                return Err(e);
            }
        };

        set_link(&self.link, LinkState::Connecting);
        let cancel = CancellationToken::new();
        let session = Session {
            config: self.config.clone(),
            options,
            sink: Arc::clone(&self.sink),
            link: Arc::clone(&self.link),
            cancel: cancel.clone(),
        };
        let handle = std::thread::Builder::new()
            .name(format!("printer-{}", self.config.serial))
            .spawn(move || session.run())
            .map_err(|e| {
                let err = TelemetryError::Worker(e.to_string());
                set_link(&self.link, LinkState::Failed(err.to_string()));
                err
            })?;

        tracing::info!(host = %self.config.host, serial = %self.config.serial, "printer bridge started");
        self.worker = Some(Worker { cancel, handle });
        Ok(())
    }

    /// Replace the settings and connect again.
    pub fn reconnect(&mut self, config: BridgeConfig) -> Result<()> {
        self.config = config;
        self.connect()
    }

    /// Stop the worker and wait for it to exit.
    pub fn disconnect(&mut self) {
        self.stop_worker();
        set_link(&self.link, LinkState::Idle);
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.cancel();
            if worker.handle.join().is_err() {
                tracing::warn!(serial = %self.config.serial, "printer worker panicked");
            }
        }
    }
}

impl Drop for PrinterBridge {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn set_link(link: &Mutex<LinkState>, state: LinkState) {
    *link.lock().unwrap_or_else(|e| e.into_inner()) = state;
}

fn connection_error(err: ConnectionError) -> TelemetryError {
    match err {
        ConnectionError::ConnectionRefused(code) => {
            TelemetryError::AuthenticationFailed(format!("{code:?}"))
        }
        other => TelemetryError::ConnectionFailed(other.to_string()),
    }
}

struct Session {
    config: BridgeConfig,
    options: MqttOptions,
    sink: Arc<dyn StatusSink>,
    link: Arc<Mutex<LinkState>>,
    cancel: CancellationToken,
}

impl Session {
    fn run(self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                self.fail(&PrinterStatus::default(), TelemetryError::Worker(e.to_string()));
                return;
            }
        };
        runtime.block_on(self.listen());
    }

    fn fail(&self, status: &PrinterStatus, err: TelemetryError) {
        tracing::warn!(host = %self.config.host, serial = %self.config.serial, error = %err, "printer connect failed");
        let state = LinkState::Failed(err.to_string());
        set_link(&self.link, state.clone());
        self.sink.deliver(StatusUpdate::new(status, state));
    }

    fn request_status(&self, client: &AsyncClient, seq: &mut Sequence) {
        let payload = PrinterRequest::PushAll.to_json(seq.next_id()).to_string();
        if let Err(e) = client.try_publish(self.config.request_topic(), QoS::AtMostOnce, false, payload) {
            tracing::debug!(error = %e, "status request not queued");
        }
    }

    async fn listen(&self) {
        let report_topic = self.config.report_topic();
        let (client, mut event_loop) = AsyncClient::new(self.options.clone(), 16);

        let mut heartbeat = tokio::time::interval(self.config.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::Instant::now() + self.config.connect_timeout;

        let mut seq = Sequence::default();
        let mut status = PrinterStatus::default();
        let mut online = false;
        let mut connected_once = false;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = client.try_disconnect();
                    tracing::debug!(serial = %self.config.serial, "printer bridge stopped");
                    return;
                }
                _ = tokio::time::sleep_until(deadline), if !connected_once => {
                    self.fail(&status, TelemetryError::Timeout("no answer from broker".into()));
                    return;
                }
                _ = heartbeat.tick(), if online => {
                    self.request_status(&client, &mut seq);
                }
                event = event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        online = true;
                        connected_once = true;
                        tracing::info!(host = %self.config.host, serial = %self.config.serial, "printer connected");
                        set_link(&self.link, LinkState::Online);
                        if let Err(e) = client.try_subscribe(report_topic.as_str(), QoS::AtMostOnce) {
                            tracing::warn!(error = %e, "report subscription not queued");
                        }
                        self.request_status(&client, &mut seq);
                        heartbeat.reset();
                        self.sink.deliver(StatusUpdate::new(&status, LinkState::Online));
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == report_topic => {
                        match StatusReport::parse(&publish.payload) {
                            Ok(report) if !report.is_empty() => {
                                status.merge(&report);
                                tracing::debug!(state = %status.state, percent = status.percent, "status merged");
                                self.sink.deliver(StatusUpdate::new(&status, LinkState::Online));
                            }
                            Ok(_) => {}
                            Err(e) => tracing::debug!(error = %e, "ignoring report"),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let err = connection_error(e);
                        if !connected_once {
                            self.fail(&status, err);
                            return;
                        }
                        if online {
                            online = false;
                            tracing::warn!(serial = %self.config.serial, error = %err, "printer link dropped");
                            set_link(&self.link, LinkState::Disconnected);
                            self.sink.deliver(StatusUpdate::new(&status, LinkState::Disconnected));
                        }
                        tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            _ = tokio::time::sleep(self.config.retry_delay) => {}
                        }
                    }
                }
            }
        }
    }
}
