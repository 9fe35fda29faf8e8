#![forbid(unsafe_code)]

use huddle_domain::{ConnectionStatus, SenderTag};

use crate::state::{FaultKind, SessionFault, StreamRef};

/// Normalized input to the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	LifecycleChanged(ConnectionStatus),

	/// Complete current roster, already keyed by stream id.
	RosterReplaced(Vec<StreamRef>),

	ChatSignalReceived {
		sender: SenderTag,
		body: String,
	},

	PublishErrorRaised(String),

	SubscribeErrorRaised(String),

	/// Explicitly dismiss the sticky error.
	ErrorCleared,
}

impl SessionEvent {
	/// Stable label for logs and metrics.
	pub const fn kind(&self) -> &'static str {
		match self {
			SessionEvent::LifecycleChanged(_) => "lifecycle_changed",
			SessionEvent::RosterReplaced(_) => "roster_replaced",
			SessionEvent::ChatSignalReceived { .. } => "chat_signal_received",
			SessionEvent::PublishErrorRaised(_) => "publish_error_raised",
			SessionEvent::SubscribeErrorRaised(_) => "subscribe_error_raised",
			SessionEvent::ErrorCleared => "error_cleared",
		}
	}

	pub fn chat(sender: impl Into<SenderTag>, body: impl Into<String>) -> Self {
		SessionEvent::ChatSignalReceived {
			sender: sender.into(),
			body: body.into(),
		}
	}

	/// The fault this event raises, if it is an error event.
	pub fn fault(&self) -> Option<SessionFault> {
		match self {
			SessionEvent::PublishErrorRaised(message) => Some(SessionFault {
				kind: FaultKind::Publish,
				message: message.clone(),
			}),
			SessionEvent::SubscribeErrorRaised(message) => Some(SessionFault {
				kind: FaultKind::Subscribe,
				message: message.clone(),
			}),
			_ => None,
		}
	}
}
