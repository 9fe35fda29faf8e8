#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// Event families a session transport publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
	Lifecycle,
	Roster,
	Signal,
}

impl EventFamily {
	pub const ALL: [EventFamily; 3] = [EventFamily::Lifecycle, EventFamily::Roster, EventFamily::Signal];

	pub const fn as_str(self) -> &'static str {
		match self {
			EventFamily::Lifecycle => "lifecycle",
			EventFamily::Roster => "roster",
			EventFamily::Signal => "signal",
		}
	}
}

impl fmt::Display for EventFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Lifecycle notification, named the way the transport names it
/// (`sessionConnected`, `sessionReconnecting`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLifecycle {
	pub event_type: String,
}

impl RawLifecycle {
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
		}
	}
}

/// One published stream as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStream {
	pub stream_id: String,
	pub name: Option<String>,
	pub has_audio: Option<bool>,
	pub has_video: Option<bool>,
	pub video_type: Option<String>,
}

impl RawStream {
	pub fn new(stream_id: impl Into<String>) -> Self {
		Self {
			stream_id: stream_id.into(),
			..Default::default()
		}
	}
}

/// Out-of-band signal as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSignal {
	/// Connection id of the sender, when the transport knows it.
	pub from_connection_id: Option<String>,
	/// Application-level signal type.
	pub kind: Option<String>,
	pub data: Option<serde_json::Value>,
}

impl RawSignal {
	/// Text signal from a known connection.
	pub fn text(from: impl Into<String>, data: impl Into<String>) -> Self {
		Self {
			from_connection_id: Some(from.into()),
			kind: None,
			data: Some(serde_json::Value::String(data.into())),
		}
	}
}

/// Raw transport event, one variant per family.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
	Lifecycle(RawLifecycle),
	/// Complete current roster.
	Roster(Vec<RawStream>),
	Signal(RawSignal),
}

impl RawEvent {
	pub fn family(&self) -> EventFamily {
		match self {
			RawEvent::Lifecycle(_) => EventFamily::Lifecycle,
			RawEvent::Roster(_) => EventFamily::Roster,
			RawEvent::Signal(_) => EventFamily::Signal,
		}
	}
}

/// Callback registered with the transport for one event family.
pub type RawEventHandler = Arc<dyn Fn(RawEvent) + Send + Sync>;

/// Handle returned by [`SessionTransport::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Outbound signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPayload {
	pub kind: Option<String>,
	pub data: String,
}

impl SignalPayload {
	pub fn chat(data: impl Into<String>) -> Self {
		Self {
			kind: None,
			data: data.into(),
		}
	}
}

/// Errors reported by a session transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
	#[error("subscribe to {family} events failed: {detail}")]
	Subscribe { family: EventFamily, detail: String },

	/// Send-signal failure, carrying the transport's error name and message.
	#[error("signal error ({name}): {message}")]
	Signal { name: String, message: String },

	#[error("transport closed")]
	Closed,
}

/// The external session transport.
///
/// Handlers may be invoked from any thread, but never concurrently for the
/// same transport; events of all families arrive in one total order.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
	/// Register `handler` for one event family.
	fn subscribe(&self, family: EventFamily, handler: RawEventHandler) -> Result<SubscriptionId, TransportError>;

	/// Drop a registration. Unknown ids are ignored.
	fn unsubscribe(&self, id: SubscriptionId);

	/// Send a signal to every connection in the session, including this one.
	async fn send_signal(&self, payload: SignalPayload) -> Result<(), TransportError>;
}
