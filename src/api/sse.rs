//! Server-Sent Events support

use super::types::TranscriptResponse;
use crate::runtime::{SessionNotice, TranscriptView};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::StreamExt;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Init {
        input_disabled: bool,
        transcript: TranscriptResponse,
    },
    StateChange {
        input_disabled: bool,
    },
    Transcript(TranscriptResponse),
    Error {
        /// `submit_failed` or `sync_failed`
        kind: &'static str,
        message: String,
    },
}

impl From<SessionNotice> for StreamEvent {
    fn from(notice: SessionNotice) -> Self {
        match notice {
            SessionNotice::SubmitFailed { message } => StreamEvent::Error {
                kind: "submit_failed",
                message,
            },
            SessionNotice::SyncFailed { message } => StreamEvent::Error {
                kind: "sync_failed",
                message,
            },
        }
    }
}

/// Convert session channels to an SSE stream
///
/// Starts with the current snapshot, then forwards every change of the
/// input-disabled signal, every transcript replacement and every notice.
pub fn sse_stream(
    disabled_rx: watch::Receiver<bool>,
    transcript_rx: watch::Receiver<TranscriptView>,
    notices_rx: broadcast::Receiver<SessionNotice>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init_event = StreamEvent::Init {
        input_disabled: *disabled_rx.borrow(),
        transcript: TranscriptResponse::from(&*transcript_rx.borrow()),
    };
    let init = futures::stream::once(async move { Ok(stream_event_to_axum(init_event)) });

    let state_changes = WatchStream::from_changes(disabled_rx)
        .map(|input_disabled| StreamEvent::StateChange { input_disabled });

    let transcripts = WatchStream::from_changes(transcript_rx)
        .map(|view| StreamEvent::Transcript(TranscriptResponse::from(&view)));

    // Lagged notices are skipped
    let notices = BroadcastStream::new(notices_rx)
        .filter_map(|result| result.ok().map(StreamEvent::from));

    let updates = state_changes
        .merge(transcripts)
        .merge(notices)
        .map(|event| Ok(stream_event_to_axum(event)));

    Sse::new(init.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn stream_event_to_axum(event: StreamEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn event_payload(event: StreamEvent) -> (&'static str, serde_json::Value) {
    match event {
        StreamEvent::Init {
            input_disabled,
            transcript,
        } => (
            "init",
            json!({
                "type": "init",
                "input_disabled": input_disabled,
                "transcript": transcript
            }),
        ),
        StreamEvent::StateChange { input_disabled } => (
            "state_change",
            json!({
                "type": "state_change",
                "input_disabled": input_disabled
            }),
        ),
        StreamEvent::Transcript(transcript) => (
            "transcript",
            json!({
                "type": "transcript",
                "transcript": transcript
            }),
        ),
        StreamEvent::Error { kind, message } => (
            "error",
            json!({
                "type": "error",
                "kind": kind,
                "message": message
            }),
        ),
    }
}
