use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{
    AttestationResponse, HealthResponse, QueryResponse, RetrieveResponse, SearchResponse,
    UploadResponse,
};
use crate::chat::MessageId;
use crate::error::ApiError;

/// Outcome of a backend call, delivered back to the UI loop.
#[derive(Debug)]
pub enum Settled {
    Chat {
        placeholder: MessageId,
        outcome: Result<QueryResponse, ApiError>,
    },
    Upload {
        names: Vec<String>,
        outcome: Result<UploadResponse, ApiError>,
    },
    Retrieve {
        cid: String,
        outcome: Result<RetrieveResponse, ApiError>,
    },
    Backup(Result<UploadResponse, ApiError>),
    Search(Result<SearchResponse, ApiError>),
    SendToChat(Result<(), ApiError>),
    Attestation(Result<AttestationResponse, ApiError>),
    Health(Result<HealthResponse, ApiError>),
}

#[derive(Debug)]
pub enum AppEvent {
    Tick,
    Key(KeyEvent),
    Paste(String),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Settled(Settled),
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;

pub struct EventHandler {
    sender: EventSender,
    receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    /// Bare channel with no producers attached. Used by tests.
    pub fn detached() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// Channel fed by a tick task and a terminal input thread.
    pub fn new(tick_rate_ms: u64) -> Self {
        let handler = Self::detached();

        // Tick loop (async)
        let tick_sender = handler.sender.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(tick_rate_ms));
            loop {
                interval.tick().await;
                if tick_sender.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        // Input loop (blocking thread)
        let input_sender = handler.sender.clone();
        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    input_sender.send(AppEvent::Key(key))
                }
                Ok(Event::Paste(text)) => input_sender.send(AppEvent::Paste(text)),
                Ok(Event::Mouse(mouse)) => input_sender.send(AppEvent::Mouse(mouse)),
                Ok(Event::Resize(w, h)) => input_sender.send(AppEvent::Resize(w, h)),
                Ok(_) => Ok(()),
                Err(e) => {
                    debug!(error = %e, "terminal input loop stopped");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        handler
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.receiver.recv().await
    }
}
