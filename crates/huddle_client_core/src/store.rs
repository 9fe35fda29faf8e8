#![forbid(unsafe_code)]

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::event::SessionEvent;
use crate::state::{ChatMessage, SessionSnapshot};

/// Item delivered to store observers after every applied event.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
	pub snapshot: Arc<SessionSnapshot>,

	/// The message appended by this transition, if any.
	pub appended: Option<ChatMessage>,
}

/// Sole owner and writer of the session snapshot.
///
/// Events are applied one at a time; every observer receives every resulting
/// snapshot, in apply order.
#[derive(Debug)]
pub struct SessionStore {
	current: Arc<SessionSnapshot>,
	observers: Vec<mpsc::UnboundedSender<SnapshotUpdate>>,
}

impl Default for SessionStore {
	fn default() -> Self {
		Self::new()
	}
}

impl SessionStore {
	pub fn new() -> Self {
		Self {
			current: Arc::new(SessionSnapshot::initial()),
			observers: Vec::new(),
		}
	}

	/// Current snapshot.
	pub fn snapshot(&self) -> Arc<SessionSnapshot> {
		Arc::clone(&self.current)
	}

	/// Register an observer. It sees every snapshot applied after this call.
	pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SnapshotUpdate> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.observers.push(tx);
		rx
	}

	/// Number of observers whose receiver is still alive.
	pub fn observer_count(&self) -> usize {
		self.observers.iter().filter(|o| !o.is_closed()).count()
	}

	/// Apply one event and notify observers. Never fails.
	pub fn apply(&mut self, event: SessionEvent) -> Arc<SessionSnapshot> {
		let kind = event.kind();
		let (next, appended) = transition(&self.current, event);
		self.current = Arc::new(next);

		metrics::counter!("huddle_events_applied_total", "kind" => kind).increment(1);
		debug!(
			version = self.current.version,
			kind,
			status = %self.current.connection_status,
			log_len = self.current.message_log.len(),
			"applied session event"
		);

		self.emit(appended);
		self.snapshot()
	}

	fn emit(&mut self, appended: Option<ChatMessage>) {
		let update = SnapshotUpdate {
			snapshot: self.snapshot(),
			appended,
		};

		self.observers.retain(|o| o.send(update.clone()).is_ok());
	}

	/// Consume events until every producer is gone; returns the final snapshot.
	pub async fn run(mut self, mut events_rx: mpsc::UnboundedReceiver<SessionEvent>) -> Arc<SessionSnapshot> {
		info!(observers = self.observer_count(), "session store started");

		while let Some(event) = events_rx.recv().await {
			self.apply(event);
		}

		info!(version = self.current.version, "session store stopped");
		self.snapshot()
	}
}

/// Compute the successor of `prev`.
///
/// The chat message records the clock before it advances.
pub fn transition(prev: &SessionSnapshot, event: SessionEvent) -> (SessionSnapshot, Option<ChatMessage>) {
	let mut next = prev.clone();
	next.version = prev.version.saturating_add(1);
	let mut appended = None;

	match event {
		SessionEvent::LifecycleChanged(status) => {
			next.connection_status = status;
		}
		SessionEvent::RosterReplaced(streams) => {
			next.roster = Arc::new(streams);
		}
		SessionEvent::ChatSignalReceived { sender, body } => {
			let message = ChatMessage {
				sender,
				body,
				logical_time: prev.logical_clock,
			};
			Arc::make_mut(&mut next.message_log).push(message.clone());
			next.logical_clock = prev.logical_clock.advanced();
			appended = Some(message);
		}
		ref ev @ (SessionEvent::PublishErrorRaised(_) | SessionEvent::SubscribeErrorRaised(_)) => {
			next.last_error = ev.fault();
		}
		SessionEvent::ErrorCleared => {
			next.last_error = None;
		}
	}

	(next, appended)
}
