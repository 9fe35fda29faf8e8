#![forbid(unsafe_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::SessionError;
use crate::transport::{SessionTransport, SignalPayload};

#[derive(Debug, Default)]
struct Draft {
	text: String,
	/// Bumped on every edit so a completed send can tell whether the user typed meanwhile.
	revision: u64,
}

/// Single-line chat composer.
///
/// Sending never touches the message log; the local line shows up only when
/// the transport echoes it back.
#[derive(Clone)]
pub struct Composer {
	draft: Arc<Mutex<Draft>>,
	transport: Arc<dyn SessionTransport>,
}

impl Composer {
	pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
		Self {
			draft: Arc::new(Mutex::new(Draft::default())),
			transport,
		}
	}

	pub fn set_draft(&self, text: impl Into<String>) {
		let mut draft = self.draft.lock();
		draft.text = text.into();
		draft.revision += 1;
	}

	pub fn draft(&self) -> String {
		self.draft.lock().text.clone()
	}

	/// Send the current draft as a chat signal.
	///
	/// On success the draft is cleared unless it was edited while the send was
	/// in flight. On failure the draft is kept and the error is returned.
	pub async fn submit(&self) -> Result<(), SessionError> {
		let (text, revision) = {
			let draft = self.draft.lock();
			(draft.text.clone(), draft.revision)
		};
		let len = text.len();

		match self.transport.send_signal(SignalPayload::chat(text)).await {
			Ok(()) => {
				let mut draft = self.draft.lock();
				if draft.revision == revision {
					draft.text.clear();
					draft.revision += 1;
				}
				info!(len, "signal sent");
				metrics::counter!("huddle_signal_send_total", "outcome" => "ok").increment(1);
				Ok(())
			}
			Err(e) => {
				warn!(error = %e, "signal send failed");
				metrics::counter!("huddle_signal_send_total", "outcome" => "error").increment(1);
				Err(SessionError::SignalSend(e))
			}
		}
	}

	/// Key handler for the composer input: Enter submits, other keys are ignored.
	pub async fn handle_key(&self, key: &str) -> Option<Result<(), SessionError>> {
		if key == "Enter" { Some(self.submit().await) } else { None }
	}
}

#[cfg(test)]
mod tests {
	use async_trait::async_trait;
	use tokio::sync::{Notify, mpsc};

	use super::*;
	use crate::loopback::LoopbackTransport;
	use crate::transport::{EventFamily, RawEventHandler, SubscriptionId, TransportError};

	#[tokio::test]
	async fn success_clears_draft() {
		let transport = Arc::new(LoopbackTransport::new());
		let composer = Composer::new(transport.clone());

		composer.set_draft("hello");
		composer.submit().await.unwrap();

		assert_eq!(composer.draft(), "");
		assert_eq!(transport.sent_signals(), vec![SignalPayload::chat("hello")]);
	}

	#[tokio::test]
	async fn failure_keeps_draft() {
		let transport = Arc::new(LoopbackTransport::new());
		let composer = Composer::new(transport.clone());
		transport.fail_next_send(TransportError::Signal {
			name: "OT_NOT_CONNECTED".to_string(),
			message: "not connected".to_string(),
		});

		composer.set_draft("hello");
		let err = composer.submit().await.unwrap_err();

		assert!(matches!(err, SessionError::SignalSend(TransportError::Signal { .. })));
		assert!(err.to_string().contains("signal error (OT_NOT_CONNECTED): not connected"));
		assert_eq!(composer.draft(), "hello");
	}

	#[tokio::test]
	async fn empty_draft_is_still_sent() {
		let transport = Arc::new(LoopbackTransport::new());
		let composer = Composer::new(transport.clone());

		composer.submit().await.unwrap();
		assert_eq!(transport.sent_signals(), vec![SignalPayload::chat("")]);
	}

	#[tokio::test]
	async fn only_enter_submits() {
		let transport = Arc::new(LoopbackTransport::new());
		let composer = Composer::new(transport.clone());
		composer.set_draft("x");

		assert!(composer.handle_key("a").await.is_none());
		assert!(transport.sent_signals().is_empty());
		assert!(composer.handle_key("Enter").await.unwrap().is_ok());
		assert_eq!(transport.sent_signals().len(), 1);
	}

	/// Holds every send until released.
	struct GatedTransport {
		release: Notify,
		started: mpsc::UnboundedSender<()>,
	}

	#[async_trait]
	impl SessionTransport for GatedTransport {
		fn subscribe(&self, _: EventFamily, _: RawEventHandler) -> Result<SubscriptionId, TransportError> {
			Ok(SubscriptionId(1))
		}

		fn unsubscribe(&self, _: SubscriptionId) {}

		async fn send_signal(&self, _: SignalPayload) -> Result<(), TransportError> {
			let _ = self.started.send(());
			self.release.notified().await;
			Ok(())
		}
	}

	#[tokio::test]
	async fn edit_during_send_is_kept() {
		let (started_tx, mut started_rx) = mpsc::unbounded_channel();
		let transport = Arc::new(GatedTransport {
			release: Notify::new(),
			started: started_tx,
		});
		let composer = Composer::new(transport.clone());
		composer.set_draft("first");

		let sending = tokio::spawn({
			let composer = composer.clone();
			async move { composer.submit().await }
		});

		tokio::time::timeout(std::time::Duration::from_secs(2), started_rx.recv())
			.await
			.expect("send did not start")
			.expect("transport dropped");
		composer.set_draft("second");
		transport.release.notify_one();

		sending.await.unwrap().unwrap();
		assert_eq!(composer.draft(), "second");
	}
}
