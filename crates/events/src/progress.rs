//! Batch progress protocol.
//!
//! A batch run emits zero or more `progress` and `imageComplete` events
//! followed by exactly one terminal `complete` or `error` event. Over HTTP
//! each event is one JSON object in an SSE `data:` frame:
//!
//! ```text
//! data: {"type":"progress","current":1,"total":5,"message":"Generating cover..."}
//!
//! data: {"type":"imageComplete","image":{...},"imageType":"cover"}
//!
//! data: {"type":"complete","data":[...]}
//! ```
//!
//! [`ProgressConsumer`] is the receiving side: it applies `imageComplete`
//! events to a [`LocalView`] as they arrive and resolves to the
//! authoritative result from the terminal event.

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use picturebook_core::illustration::{IllustrationTarget, ImageType, PageImage};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Error message used when a stream ends without a terminal event.
pub const NO_RESULT_MESSAGE: &str = "No result received from server";

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    Progress {
        current: u32,
        total: u32,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    ImageComplete {
        image: PageImage,
        image_type: ImageType,
    },
    Complete {
        data: Vec<PageImage>,
    },
    Error {
        error: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// The terminal event for a finished batch.
    pub fn terminal<E: std::fmt::Display>(result: &Result<Vec<PageImage>, E>) -> Self {
        match result {
            Ok(images) => Self::Complete {
                data: images.clone(),
            },
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives progress from a running batch. Calls must not block.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, current: u32, total: u32, message: &str);

    fn image_complete(&self, image: &PageImage, image_type: ImageType);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn progress(&self, _current: u32, _total: u32, _message: &str) {}

    fn image_complete(&self, _image: &PageImage, _image_type: ImageType) {}
}

/// Forwards events into an unbounded channel.
///
/// Sends after the receiver is gone are dropped: a client that disconnects
/// stops observing, but the batch keeps running.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    pub fn send(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Progress receiver dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl ProgressSink for ChannelSink {
    fn progress(&self, current: u32, total: u32, message: &str) {
        self.send(ProgressEvent::Progress {
            current,
            total,
            message: message.to_string(),
        });
    }

    fn image_complete(&self, image: &PageImage, image_type: ImageType) {
        self.send(ProgressEvent::ImageComplete {
            image: image.clone(),
            image_type,
        });
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProgressError {
    /// The server sent an `error` event.
    #[error("{0}")]
    Server(String),

    /// The stream ended before a terminal event.
    #[error("No result received from server")]
    NoResult,

    #[error("Stream error: {0}")]
    Transport(String),
}

/// Illustrations received so far, applied optimistically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalView {
    pub cover: Option<PageImage>,
    pub back_cover: Option<PageImage>,
    /// Upserted by page number, kept sorted.
    pub pages: Vec<PageImage>,
    pub current: u32,
    pub total: u32,
    pub message: String,
}

impl LocalView {
    fn apply_image(&mut self, image: PageImage) {
        match image.slot {
            IllustrationTarget::Cover => self.cover = Some(image),
            IllustrationTarget::BackCover => self.back_cover = Some(image),
            IllustrationTarget::Page(n) => {
                self.pages.retain(|p| p.slot != IllustrationTarget::Page(n));
                self.pages.push(image);
                self.pages.sort_by_key(|p| p.slot.page_number());
            }
        }
    }

    /// Completion percentage, 0 when nothing is known yet.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.current) / f64::from(self.total) * 100.0
        }
    }
}

/// Reader for a batch progress stream.
///
/// SSE framing is decoded by `eventsource-stream`; each `data:` payload is
/// one [`ProgressEvent`].
#[derive(Debug, Default)]
pub struct ProgressConsumer {
    view: LocalView,
    outcome: Option<Result<Vec<PageImage>, ProgressError>>,
}

impl ProgressConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &LocalView {
        &self.view
    }

    /// Whether a terminal event has been received.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Read SSE bytes until the terminal event or the end of the stream,
    /// applying each event as it arrives. Returns the decoded events.
    pub async fn read<S, B, E>(&mut self, stream: S) -> Vec<ProgressEvent>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut events = Vec::new();
        self.read_with(stream, |event, _| events.push(event.clone()))
            .await;
        events
    }

    /// Like [`read`](Self::read), calling `on_event` with each event and
    /// the view it has just been applied to.
    pub async fn read_with<S, B, E, F>(&mut self, stream: S, mut on_event: F)
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
        F: FnMut(&ProgressEvent, &LocalView),
    {
        let mut frames = std::pin::pin!(stream.eventsource());
        while !self.is_finished() {
            let Some(frame) = frames.next().await else {
                break;
            };
            match frame {
                Ok(frame) => {
                    if let Some(event) = decode(&frame.data) {
                        self.apply(event.clone());
                        on_event(&event, &self.view);
                    }
                }
                Err(EventStreamError::Transport(e)) => {
                    self.outcome = Some(Err(ProgressError::Transport(e.to_string())));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to decode progress stream");
                    self.outcome = Some(Err(ProgressError::Transport(e.to_string())));
                }
            }
        }
    }

    /// Apply one decoded event. Events after the terminal one are ignored.
    pub fn apply(&mut self, event: ProgressEvent) {
        if self.outcome.is_some() {
            return;
        }
        match event {
            ProgressEvent::Progress {
                current,
                total,
                message,
            } => {
                self.view.current = current;
                self.view.total = total;
                self.view.message = message;
            }
            ProgressEvent::ImageComplete { image, .. } => self.view.apply_image(image),
            ProgressEvent::Complete { data } => self.outcome = Some(Ok(data)),
            ProgressEvent::Error { error } => {
                self.outcome = Some(Err(ProgressError::Server(error)));
            }
        }
    }

    /// Resolve to the terminal result.
    pub fn finish(self) -> (LocalView, Result<Vec<PageImage>, ProgressError>) {
        let outcome = self.outcome.unwrap_or(Err(ProgressError::NoResult));
        (self.view, outcome)
    }

    /// Drain a byte stream to completion.
    pub async fn consume<S, B, E>(stream: S) -> (LocalView, Result<Vec<PageImage>, ProgressError>)
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut consumer = Self::new();
        consumer.read(stream).await;
        consumer.finish()
    }
}

/// Decode one `data:` payload. Empty and unparseable payloads yield `None`.
fn decode(data: &str) -> Option<ProgressEvent> {
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse progress frame");
            None
        }
    }
}
