//! Application state: the controller plus its link to the relay.

use std::path::PathBuf;
use std::time::Instant;

use eecalc_core::starters::STARTERS;
use eecalc_core::{Controller, Key, Snapshot, SyncEvent};
use eecalc_relay::RelayConnection;
use tokio::sync::mpsc::error::TryRecvError;

pub struct App {
    pub controller: Controller,
    link: Option<RelayConnection>,
    /// Sheet namespace joined on the relay
    pub sheet: String,
    /// Relay address, kept for display after the link drops
    pub server: Option<String>,
    /// Status message to display
    pub status_message: String,
    /// Where Ctrl-S writes the sheet
    pub save_path: PathBuf,
    /// Snapshot to load once the relay's sheet has arrived.
    pending_load: Option<Snapshot>,
    synced: bool,
}

impl App {
    pub fn new(
        controller: Controller,
        link: Option<RelayConnection>,
        sheet: String,
        server: Option<String>,
        save_path: PathBuf,
    ) -> Self {
        let status_message = match &link {
            Some(_) => format!("Joining {}...", sheet),
            None => "Offline".to_string(),
        };
        App {
            controller,
            link,
            sheet,
            server,
            status_message,
            save_path,
            pending_load: None,
            synced: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.link.is_some()
    }

    /// Replace the sheet with `snapshot` and broadcast it.
    ///
    /// While still waiting for the relay's own snapshot the load is deferred,
    /// otherwise the incoming sheet would overwrite it.
    pub fn load_snapshot(&mut self, snapshot: Snapshot, now: Instant) {
        if self.is_online() && !self.synced {
            self.pending_load = Some(snapshot);
            return;
        }
        let events = self.controller.load_starter(&snapshot, now);
        self.send(events);
        self.status_message = match &snapshot.title {
            Some(title) => format!("Loaded {}", title),
            None => format!("Loaded {} cells", snapshot.cells.len()),
        };
    }

    /// Load the `number`th bundled starter (1-based).
    pub fn load_starter_number(&mut self, number: usize, now: Instant) {
        let Some(starter) = number.checked_sub(1).and_then(|i| STARTERS.get(i)) else {
            self.status_message = format!("No starter {}", number);
            return;
        };
        match starter.snapshot() {
            Ok(snapshot) => self.load_snapshot(snapshot, now),
            Err(e) => self.status_message = format!("Error loading {}: {}", starter.name, e),
        }
    }

    pub fn handle_key(&mut self, key: Key, now: Instant) {
        let events = self.controller.handle_key(key, now);
        self.send(events);
    }

    fn send(&mut self, events: Vec<SyncEvent>) {
        let Some(link) = &self.link else {
            return;
        };
        for event in events {
            if !link.send(event) {
                self.go_offline("Relay connection lost");
                return;
            }
        }
    }

    /// Apply everything the relay has delivered so far.
    pub fn poll_remote(&mut self, now: Instant) {
        loop {
            let received = match self.link.as_mut() {
                Some(link) => link.inbound.try_recv(),
                None => return,
            };
            match received {
                Ok(event) => {
                    let is_sheet = matches!(event, SyncEvent::Sheet { .. });
                    self.controller.apply_remote(event, now);
                    if is_sheet && !self.synced {
                        self.synced = true;
                        self.status_message = format!("Joined {}", self.sheet);
                        if let Some(snapshot) = self.pending_load.take() {
                            self.load_snapshot(snapshot, now);
                        }
                    }
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.go_offline("Relay closed the connection");
                    return;
                }
            }
        }
    }

    fn go_offline(&mut self, reason: &str) {
        tracing::warn!(sheet = %self.sheet, "{}", reason);
        self.link = None;
        self.status_message = format!("{}; editing offline", reason);
    }

    pub fn tick(&mut self, now: Instant) {
        self.controller.tick(now);
    }

    pub fn recalculate_all(&mut self) {
        self.controller.recalculate_all();
        self.status_message = "Recalculated".to_string();
    }

    /// Re-read the custom functions files and recalculate with them.
    pub fn reload_functions(&mut self) {
        match self.controller.document_mut().reload_functions() {
            Ok(count) => {
                self.controller.recalculate_all();
                self.status_message = format!("Reloaded {} functions file(s)", count);
            }
            Err(e) => self.status_message = format!("Error reloading: {}", e),
        }
    }

    pub fn save(&mut self) {
        match self.controller.document().save_snapshot(&self.save_path) {
            Ok(()) => self.status_message = format!("Saved {}", self.save_path.display()),
            Err(e) => self.status_message = format!("Error saving: {}", e),
        }
    }
}
