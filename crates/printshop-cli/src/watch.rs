//! `printshop watch`: print live printer status until interrupted.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{bail, Result};
use printshop_bambu::{LinkState, PrinterBridge, StatusUpdate, StatusView};

use crate::config::AppConfig;

const REDRAW: Duration = Duration::from_secs(1);

pub fn run(config: &AppConfig) -> Result<()> {
    let bridge_config = config.bridge_config()?;
    println!(
        "Connecting to {}:{} ({})",
        bridge_config.host, bridge_config.port, bridge_config.serial
    );

    let (tx, rx) = mpsc::channel();
    let mut bridge = PrinterBridge::new(bridge_config, move |update: StatusUpdate| {
        let _ = tx.send(update);
    });
    bridge.connect()?;

    let mut view = StatusView::new(config.stale_after());
    let mut last = String::new();
    loop {
        match rx.recv_timeout(REDRAW) {
            Ok(update) => view.apply(update),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let line = status_line(&view);
        if line != last {
            println!("{line}");
            last = line;
        }
        if let LinkState::Failed(reason) = view.link() {
            bridge.disconnect();
            bail!("printer connection failed: {reason}");
        }
    }
    bridge.disconnect();
    Ok(())
}

fn status_line(view: &StatusView) -> String {
    let status = view.status();
    format!(
        "[{}] {} {:.0}% {} left | {} | {}",
        view.link(),
        view.display_state(),
        status.percent,
        status.time_left_label(),
        status.job_label(),
        status.temps_label()
    )
}
