#![forbid(unsafe_code)]

use std::sync::Arc;

use huddle_domain::{ConnectionStatus, SenderTag, StreamId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::SessionEvent;
use crate::state::{StreamRef, VideoType};
use crate::transport::{
	EventFamily, RawEvent, RawEventHandler, RawLifecycle, RawSignal, RawStream, SessionTransport, SubscriptionId,
	TransportError,
};

/// Raw events that cannot be coerced into a session event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
	#[error("malformed {family} event: {detail}")]
	MalformedEvent { family: EventFamily, detail: String },
}

/// Translate one raw transport event into a session event.
///
/// Pure apart from logging: malformed signal and roster payloads are coerced
/// to the closest valid form; only an unrecognised lifecycle name is an error.
pub fn normalize(raw: RawEvent) -> Result<SessionEvent, NormalizeError> {
	match raw {
		RawEvent::Lifecycle(ev) => normalize_lifecycle(ev).map(SessionEvent::LifecycleChanged),
		RawEvent::Roster(streams) => Ok(SessionEvent::RosterReplaced(normalize_roster(streams))),
		RawEvent::Signal(signal) => Ok(normalize_signal(signal)),
	}
}

fn normalize_lifecycle(ev: RawLifecycle) -> Result<ConnectionStatus, NormalizeError> {
	ev.event_type
		.parse::<ConnectionStatus>()
		.map_err(|e| NormalizeError::MalformedEvent {
			family: EventFamily::Lifecycle,
			detail: e.to_string(),
		})
}

/// Blank ids are dropped; a repeated id keeps its first position and takes
/// the later entry's metadata.
fn normalize_roster(streams: Vec<RawStream>) -> Vec<StreamRef> {
	let mut out: Vec<StreamRef> = Vec::with_capacity(streams.len());

	for raw in streams {
		let Ok(id) = StreamId::new(raw.stream_id.trim()) else {
			note_coercion(EventFamily::Roster, "dropped roster entry with blank stream id");
			continue;
		};

		let stream = StreamRef {
			name: raw.name.unwrap_or_default(),
			has_audio: raw.has_audio.unwrap_or(true),
			has_video: raw.has_video.unwrap_or(true),
			video_type: parse_video_type(raw.video_type.as_deref(), raw.has_video),
			id,
		};

		match out.iter_mut().find(|s| s.id == stream.id) {
			Some(existing) => {
				note_coercion(EventFamily::Roster, "merged duplicate roster entry");
				*existing = stream;
			}
			None => out.push(stream),
		}
	}

	out
}

fn parse_video_type(raw: Option<&str>, has_video: Option<bool>) -> VideoType {
	if has_video == Some(false) {
		return VideoType::Absent;
	}
	match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
		Some("camera") | None => VideoType::Camera,
		Some("screen") => VideoType::Screen,
		Some(_) => VideoType::Custom,
	}
}

fn normalize_signal(signal: RawSignal) -> SessionEvent {
	let sender = match signal.from_connection_id {
		Some(id) => SenderTag::new(id),
		None => {
			note_coercion(EventFamily::Signal, "signal without sender connection");
			SenderTag::anonymous()
		}
	};

	let body = match signal.data {
		Some(serde_json::Value::String(s)) => s,
		Some(other) => {
			note_coercion(EventFamily::Signal, "non-string signal data");
			other.to_string()
		}
		None => {
			note_coercion(EventFamily::Signal, "signal without data");
			String::new()
		}
	};

	SessionEvent::ChatSignalReceived { sender, body }
}

fn note_coercion(family: EventFamily, detail: &'static str) {
	warn!(%family, detail, "coerced malformed transport event");
	metrics::counter!("huddle_malformed_events_total", "family" => family.as_str()).increment(1);
}

/// Owns the transport subscriptions and feeds normalized events into the
/// store's input queue.
///
/// Subscribes to every family on [`attach`](Self::attach) and unsubscribes
/// exactly once, on [`teardown`](Self::teardown) or drop.
pub struct EventNormalizer {
	transport: Arc<dyn SessionTransport>,
	subscriptions: Vec<SubscriptionId>,
}

impl EventNormalizer {
	/// Subscribe to all event families of `transport`.
	///
	/// If any family fails, the families already subscribed are released
	/// before the error is returned.
	pub fn attach(
		transport: Arc<dyn SessionTransport>,
		events_tx: mpsc::UnboundedSender<SessionEvent>,
	) -> Result<Self, TransportError> {
		let mut normalizer = Self {
			transport,
			subscriptions: Vec::with_capacity(EventFamily::ALL.len()),
		};

		for family in EventFamily::ALL {
			let handler = make_handler(family, events_tx.clone());
			let id = normalizer.transport.subscribe(family, handler)?;
			debug!(%family, id = id.0, "subscribed to transport events");
			normalizer.subscriptions.push(id);
		}

		Ok(normalizer)
	}

	pub fn is_attached(&self) -> bool {
		!self.subscriptions.is_empty()
	}

	/// Release the transport subscriptions.
	pub fn teardown(mut self) {
		self.release();
	}

	fn release(&mut self) {
		for id in self.subscriptions.drain(..) {
			self.transport.unsubscribe(id);
			debug!(id = id.0, "unsubscribed from transport events");
		}
	}
}

impl Drop for EventNormalizer {
	fn drop(&mut self) {
		self.release();
	}
}

fn make_handler(family: EventFamily, events_tx: mpsc::UnboundedSender<SessionEvent>) -> RawEventHandler {
	Arc::new(move |raw: RawEvent| {
		if raw.family() != family {
			debug!(subscribed = %family, got = %raw.family(), "transport delivered event to another family's handler");
		}

		match normalize(raw) {
			Ok(event) => {
				if events_tx.send(event).is_err() {
					debug!(%family, "session store stopped; dropping transport event");
				}
			}
			Err(e) => {
				warn!(error = %e, "rejected transport event");
				metrics::counter!("huddle_malformed_events_total", "family" => family.as_str()).increment(1);
			}
		}
	})
}
