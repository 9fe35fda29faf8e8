#![forbid(unsafe_code)]

use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use async_trait::async_trait;
use huddle_domain::SessionId;
use huddle_util::endpoint::HttpEndpoint;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::ChatMessage;
use crate::store::SnapshotUpdate;

/// JSON body posted to the persistence endpoint for one chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
	pub body: String,
	pub replay_time: f64,
	pub topic: String,
	pub user: String,
}

impl ReplayRecord {
	pub fn from_message(message: &ChatMessage, topic: &SessionId, user: &str) -> Self {
		Self {
			body: message.body.clone(),
			replay_time: message.logical_time.as_f64(),
			topic: topic.as_str().to_string(),
			user: user.to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
	#[error("archive client setup failed: {0}")]
	Client(String),

	#[error("archive request failed: {0}")]
	Request(String),

	#[error("archive endpoint answered status {0}")]
	Status(u16),
}

/// Destination for archived chat messages.
#[async_trait]
pub trait ReplaySink: Send + Sync + 'static {
	/// Deliver one record; returns the endpoint's status code on success.
	async fn archive(&self, record: ReplayRecord) -> Result<u16, ArchiveError>;
}

/// Posts records as JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpReplaySink {
	endpoint: HttpEndpoint,
	client: reqwest::Client,
}

impl HttpReplaySink {
	pub fn new(endpoint: HttpEndpoint, timeout: Duration) -> Result<Self, ArchiveError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ArchiveError::Client(e.to_string()))?;
		Ok(Self { endpoint, client })
	}

	pub fn endpoint(&self) -> &HttpEndpoint {
		&self.endpoint
	}
}

#[async_trait]
impl ReplaySink for HttpReplaySink {
	async fn archive(&self, record: ReplayRecord) -> Result<u16, ArchiveError> {
		let resp = self
			.client
			.post(self.endpoint.url().clone())
			.json(&record)
			.send()
			.await
			.map_err(|e| ArchiveError::Request(e.to_string()))?;

		let status = resp.status();
		if status.is_success() {
			Ok(status.as_u16())
		} else {
			Err(ArchiveError::Status(status.as_u16()))
		}
	}
}

/// Forwards every newly appended chat message to a [`ReplaySink`].
///
/// Requests are started one after another in log order; completions overlap
/// on detached tasks. Outcomes are logged and counted, never retried, and
/// never reported back to the store.
#[derive(Clone)]
pub struct ReplayArchiver {
	sink: Arc<dyn ReplaySink>,
	topic: SessionId,
	user_label: String,
}

impl ReplayArchiver {
	pub fn new(sink: Arc<dyn ReplaySink>, topic: SessionId, user_label: impl Into<String>) -> Self {
		Self {
			sink,
			topic,
			user_label: user_label.into(),
		}
	}

	/// Start delivery of one message without waiting for it to finish.
	///
	/// The request is driven to its first suspension point before this
	/// returns, so consecutive calls issue requests in call order. The rest
	/// runs on a detached task, or `None` is returned if the sink finished
	/// without suspending.
	pub async fn dispatch(&self, message: &ChatMessage) -> Option<JoinHandle<()>> {
		let record = ReplayRecord::from_message(message, &self.topic, &self.user_label);
		let replay_time = record.replay_time;
		let sink = Arc::clone(&self.sink);

		let mut request = Box::pin(async move { sink.archive(record).await });
		if let Poll::Ready(outcome) = futures::poll!(request.as_mut()) {
			record_outcome(replay_time, outcome);
			return None;
		}

		Some(tokio::spawn(async move {
			record_outcome(replay_time, request.await);
		}))
	}

	/// Dispatch the appended message of every update, in order, until the
	/// store goes away.
	pub async fn run(self, mut updates: mpsc::UnboundedReceiver<SnapshotUpdate>) {
		info!(topic = %self.topic, "replay archiver started");

		while let Some(update) = updates.recv().await {
			if let Some(message) = update.appended {
				drop(self.dispatch(&message).await);
			}
		}

		info!(topic = %self.topic, "replay archiver stopped");
	}

	pub fn spawn(self, updates: mpsc::UnboundedReceiver<SnapshotUpdate>) -> JoinHandle<()> {
		tokio::spawn(self.run(updates))
	}
}

fn record_outcome(replay_time: f64, outcome: Result<u16, ArchiveError>) {
	match outcome {
		Ok(status) => {
			debug!(replay_time, status, "archived chat message");
			metrics::counter!("huddle_archive_dispatch_total", "outcome" => "ok").increment(1);
		}
		Err(e) => {
			warn!(replay_time, error = %e, "archive dispatch failed");
			metrics::counter!("huddle_archive_dispatch_total", "outcome" => "error").increment(1);
		}
	}
}
