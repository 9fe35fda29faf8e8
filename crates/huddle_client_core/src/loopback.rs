#![forbid(unsafe_code)]

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::transport::{
	EventFamily, RawEvent, RawEventHandler, RawLifecycle, RawSignal, RawStream, SessionTransport, SignalPayload,
	SubscriptionId, TransportError,
};

struct Registration {
	id: SubscriptionId,
	family: EventFamily,
	handler: RawEventHandler,
}

#[derive(Default)]
struct Inner {
	registrations: Vec<Registration>,
	next_id: u64,
	refused: HashSet<EventFamily>,
	fail_next_send: Option<TransportError>,
	sent: Vec<SignalPayload>,
	unsubscribe_calls: usize,
}

/// In-process transport: injected events go straight to current subscribers,
/// and sent signals are echoed back from this transport's own connection.
pub struct LoopbackTransport {
	connection_id: String,
	inner: Mutex<Inner>,
}

impl Default for LoopbackTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl LoopbackTransport {
	pub fn new() -> Self {
		Self::with_connection_id(uuid::Uuid::new_v4().to_string())
	}

	pub fn with_connection_id(connection_id: impl Into<String>) -> Self {
		Self {
			connection_id: connection_id.into(),
			inner: Mutex::new(Inner::default()),
		}
	}

	/// Connection id used as the sender of echoed signals.
	pub fn connection_id(&self) -> &str {
		&self.connection_id
	}

	/// Deliver `event` to every handler registered for its family.
	///
	/// Handlers run on the caller's thread, outside the internal lock.
	pub fn emit(&self, event: RawEvent) {
		let family = event.family();
		let handlers: Vec<RawEventHandler> = self
			.inner
			.lock()
			.registrations
			.iter()
			.filter(|r| r.family == family)
			.map(|r| r.handler.clone())
			.collect();

		debug!(%family, handlers = handlers.len(), "loopback emit");
		for handler in handlers {
			handler(event.clone());
		}
	}

	pub fn emit_lifecycle(&self, event_type: &str) {
		self.emit(RawEvent::Lifecycle(RawLifecycle::new(event_type)));
	}

	pub fn emit_roster(&self, streams: Vec<RawStream>) {
		self.emit(RawEvent::Roster(streams));
	}

	pub fn emit_signal(&self, signal: RawSignal) {
		self.emit(RawEvent::Signal(signal));
	}

	/// Make the next `send_signal` fail with `error` instead of echoing.
	pub fn fail_next_send(&self, error: TransportError) {
		self.inner.lock().fail_next_send = Some(error);
	}

	/// Refuse future subscriptions for `family`.
	pub fn refuse_subscriptions_for(&self, family: EventFamily) {
		self.inner.lock().refused.insert(family);
	}

	/// Live registrations for `family`.
	pub fn subscriber_count(&self, family: EventFamily) -> usize {
		self.inner.lock().registrations.iter().filter(|r| r.family == family).count()
	}

	/// Total `unsubscribe` calls, including ones for unknown ids.
	pub fn unsubscribe_calls(&self) -> usize {
		self.inner.lock().unsubscribe_calls
	}

	/// Payloads accepted by `send_signal`, in order.
	pub fn sent_signals(&self) -> Vec<SignalPayload> {
		self.inner.lock().sent.clone()
	}
}

#[async_trait]
impl SessionTransport for LoopbackTransport {
	fn subscribe(&self, family: EventFamily, handler: RawEventHandler) -> Result<SubscriptionId, TransportError> {
		let mut inner = self.inner.lock();
		if inner.refused.contains(&family) {
			return Err(TransportError::Subscribe {
				family,
				detail: "refused by loopback transport".to_string(),
			});
		}

		inner.next_id += 1;
		let id = SubscriptionId(inner.next_id);
		inner.registrations.push(Registration { id, family, handler });
		Ok(id)
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		let mut inner = self.inner.lock();
		inner.unsubscribe_calls += 1;
		inner.registrations.retain(|r| r.id != id);
	}

	async fn send_signal(&self, payload: SignalPayload) -> Result<(), TransportError> {
		let echo = {
			let mut inner = self.inner.lock();
			if let Some(err) = inner.fail_next_send.take() {
				return Err(err);
			}
			inner.sent.push(payload.clone());
			RawSignal {
				from_connection_id: Some(self.connection_id.clone()),
				kind: payload.kind,
				data: Some(serde_json::Value::String(payload.data)),
			}
		};

		self.emit_signal(echo);
		Ok(())
	}
}
