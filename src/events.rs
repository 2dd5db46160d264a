//! Everything the viewer's main loop reacts to, funneled through one channel.
//!
//! Key presses and spinner ticks come from a blocking crossterm poller;
//! loader results are pushed by whoever holds a [`EventHandler::sender`].

use crate::loader::PetHistory;
use crossterm::event::{self, Event as TermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::error;

pub enum Event {
    /// Spinner frame.
    Tick,
    Input(KeyEvent),
    /// Every pet's history, fetched and cleaned.
    HistoryLoaded {
        pets: Vec<PetHistory>,
        timestamp: Instant,
    },
    /// Sign-in or the pet listing failed.
    LoadFailed(String),
}

pub struct EventHandler {
    sender: UnboundedSender<Event>,
    receiver: UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Starts polling the terminal, emitting a tick every `tick_rate_ms`.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (sender, receiver) = unbounded_channel();
        let terminal_tx = sender.clone();
        let tick_rate = Duration::from_millis(tick_rate_ms);
        // crossterm's poll blocks the calling thread.
        tokio::task::spawn_blocking(move || pump_terminal(terminal_tx, tick_rate));

        Self { sender, receiver }
    }

    /// Handle for background tasks that report back to the main loop.
    pub fn sender(&self) -> UnboundedSender<Event> {
        self.sender.clone()
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

/// Runs until the receiver is gone or the terminal stops answering.
fn pump_terminal(tx: UnboundedSender<Event>, tick_rate: Duration) {
    let mut next_tick = Instant::now() + tick_rate;
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        let ready = match event::poll(wait) {
            Ok(ready) => ready,
            Err(e) => {
                error!("Terminal poll failed: {}", e);
                return;
            }
        };
        if ready {
            match event::read() {
                Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(Event::Input(key)).is_err() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Terminal read failed: {}", e);
                    return;
                }
            }
        }
        if Instant::now() >= next_tick {
            if tx.send(Event::Tick).is_err() {
                return;
            }
            next_tick = Instant::now() + tick_rate;
        }
    }
}
