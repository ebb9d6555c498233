#![warn(missing_docs)]

//! Live Bambu Lab printer status for printshop.
//!
//! This crate provides:
//! - MQTT connection settings for LAN and cloud brokers
//! - Typed partial status reports and the merge-by-present-key rule
//! - A cancellable background bridge that republishes merged status
//! - A caller-side view that marks old status as unknown
//!
//! # Example
//!
//! ```ignore
//! use std::sync::mpsc;
//! use printshop_bambu::{BridgeConfig, PrinterBridge, StatusUpdate, StatusView};
//!
//! let (tx, rx) = mpsc::channel();
//! let mut bridge = PrinterBridge::new(
//!     BridgeConfig::local("192.168.1.40", "01S00A000000000", "12345678"),
//!     move |update: StatusUpdate| { let _ = tx.send(update); },
//! );
//! bridge.connect()?;
//!
//! let mut view = StatusView::new(None);
//! for update in rx {
//!     view.apply(update);
//!     println!("{} {}%", view.display_state(), view.status().percent);
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod request;
pub mod status;
mod tls;
pub mod view;

pub use bridge::{LinkState, PrinterBridge, StatusSink, StatusUpdate};
pub use config::{BridgeConfig, ConnectionMode, CLOUD_HOST, MQTT_PORT, MQTT_USER};
pub use error::{Result, TelemetryError};
pub use request::{PrinterRequest, Sequence};
pub use status::{MachineState, PrinterStatus, StatusReport};
pub use view::StatusView;
