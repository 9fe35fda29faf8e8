#![forbid(unsafe_code)]

use huddle_domain::StreamId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::event::SessionEvent;

/// Outcome reported by a media widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaNotification {
	PublishSucceeded,
	PublishFailed { message: String },
	SubscribeSucceeded { stream_id: StreamId },
	SubscribeFailed { stream_id: Option<StreamId>, message: String },
	PublisherAccessDenied,
	PublisherStreamCreated,
	PublisherStreamDestroyed { reason: String },
	SubscriberVideoEnabled { stream_id: StreamId },
	SubscriberVideoDisabled { stream_id: StreamId },
}

impl MediaNotification {
	/// The store event this notification raises. Only failures reach the store.
	pub fn to_event(&self) -> Option<SessionEvent> {
		match self {
			MediaNotification::PublishFailed { message } => Some(SessionEvent::PublishErrorRaised(message.clone())),
			MediaNotification::SubscribeFailed { message, .. } => {
				Some(SessionEvent::SubscribeErrorRaised(message.clone()))
			}
			_ => None,
		}
	}
}

/// Handle given to media widgets for reporting publish/subscribe outcomes.
#[derive(Debug, Clone)]
pub struct MediaReporter {
	events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl MediaReporter {
	pub fn new(events_tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
		Self { events_tx }
	}

	/// Log `notification` and forward failures to the store.
	///
	/// Returns false when the store has stopped and a failure could not be
	/// delivered.
	pub fn report(&self, notification: MediaNotification) -> bool {
		match &notification {
			MediaNotification::PublishSucceeded => info!("publish succeeded"),
			MediaNotification::SubscribeSucceeded { stream_id } => info!(%stream_id, "subscribe succeeded"),
			MediaNotification::PublishFailed { message } => warn!(error = %message, "publish failed"),
			MediaNotification::SubscribeFailed { stream_id, message } => {
				warn!(stream_id = ?stream_id.as_ref().map(StreamId::as_str), error = %message, "subscribe failed")
			}
			MediaNotification::PublisherAccessDenied => warn!("user denied access to media source"),
			MediaNotification::PublisherStreamCreated => debug!("publisher stream created"),
			MediaNotification::PublisherStreamDestroyed { reason } => {
				info!(%reason, "publisher stream destroyed")
			}
			MediaNotification::SubscriberVideoEnabled { stream_id } => debug!(%stream_id, "subscriber video enabled"),
			MediaNotification::SubscriberVideoDisabled { stream_id } => {
				debug!(%stream_id, "subscriber video disabled")
			}
		}

		match notification.to_event() {
			Some(event) => self.events_tx.send(event).is_ok(),
			None => true,
		}
	}
}
