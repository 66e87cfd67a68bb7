//! UI-facing notification sink
//!
//! The engine never renders anything itself; it reports loading state, loaded
//! spots and user-facing errors through a [`ViewportSink`].

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::models::Spot;

pub trait ViewportSink: Send + Sync {
    fn on_loading_changed(&self, loading: bool);
    fn on_spots_loaded(&self, spots: Vec<Spot>, total: usize);
    fn on_error(&self, message: String);
}

/// A sink notification as a value, for channels and replay output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    LoadingChanged { loading: bool },
    SpotsLoaded { spots: Vec<Spot>, total: usize },
    Error { message: String },
}

/// Forwards every notification into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl ViewportSink for ChannelSink {
    fn on_loading_changed(&self, loading: bool) {
        self.send(SinkEvent::LoadingChanged { loading });
    }

    fn on_spots_loaded(&self, spots: Vec<Spot>, total: usize) {
        self.send(SinkEvent::SpotsLoaded { spots, total });
    }

    fn on_error(&self, message: String) {
        self.send(SinkEvent::Error { message });
    }
}

/// Logs notifications instead of rendering them
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ViewportSink for TracingSink {
    fn on_loading_changed(&self, loading: bool) {
        info!(loading, "Loading state changed");
    }

    fn on_spots_loaded(&self, spots: Vec<Spot>, total: usize) {
        info!(count = spots.len(), total, "Spots loaded");
    }

    fn on_error(&self, message: String) {
        error!(%message, "Load failed");
    }
}
