#![forbid(unsafe_code)]

use std::sync::Arc;

use huddle_domain::SessionId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::SessionError;
use crate::archiver::{HttpReplaySink, ReplayArchiver, ReplaySink};
use crate::config::SessionConfig;
use crate::event::SessionEvent;
use crate::media::MediaReporter;
use crate::normalizer::EventNormalizer;
use crate::outbound::Composer;
use crate::state::SessionSnapshot;
use crate::store::{SessionStore, SnapshotUpdate};
use crate::transport::SessionTransport;

/// A joined session: normalizer, store loop, and optional archiver wired
/// together.
///
/// Must be started inside a tokio runtime.
pub struct Session {
	session_id: SessionId,
	normalizer: EventNormalizer,
	events_tx: mpsc::UnboundedSender<SessionEvent>,
	store_task: JoinHandle<Arc<SessionSnapshot>>,
	archiver_task: Option<JoinHandle<()>>,
	composer: Composer,
}

impl Session {
	/// Build the archive sink from `cfg` (if active) and start.
	pub fn from_config(
		cfg: &SessionConfig,
		transport: Arc<dyn SessionTransport>,
	) -> Result<(Self, mpsc::UnboundedReceiver<SnapshotUpdate>), SessionError> {
		let sink: Option<Arc<dyn ReplaySink>> = match (&cfg.archive.url, cfg.archive.is_active()) {
			(Some(url), true) => Some(Arc::new(HttpReplaySink::new(url.clone(), cfg.archive.timeout)?)),
			_ => None,
		};
		Self::start(cfg, transport, sink)
	}

	/// Subscribe to `transport` and start the store loop.
	///
	/// Returns the session and the presentation observer's update queue. The
	/// only fatal error is a refused transport subscription; partial
	/// subscriptions are released before it is returned.
	pub fn start(
		cfg: &SessionConfig,
		transport: Arc<dyn SessionTransport>,
		sink: Option<Arc<dyn ReplaySink>>,
	) -> Result<(Self, mpsc::UnboundedReceiver<SnapshotUpdate>), SessionError> {
		let session_id = cfg.credentials.session_id.clone();

		let mut store = SessionStore::new();
		let ui_rx = store.subscribe();
		let archiver = sink.map(|sink| {
			let archiver = ReplayArchiver::new(sink, session_id.clone(), cfg.archive.user_label.clone());
			(archiver, store.subscribe())
		});

		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let normalizer =
			EventNormalizer::attach(Arc::clone(&transport), events_tx.clone()).map_err(SessionError::Subscribe)?;

		let store_task = tokio::spawn(store.run(events_rx));
		let archiver_task = archiver.map(|(archiver, updates)| archiver.spawn(updates));

		info!(
			session_id = %session_id,
			archive = archiver_task.is_some(),
			"session started"
		);

		Ok((
			Self {
				session_id,
				normalizer,
				events_tx,
				store_task,
				archiver_task,
				composer: Composer::new(transport),
			},
			ui_rx,
		))
	}

	pub fn session_id(&self) -> &SessionId {
		&self.session_id
	}

	pub fn composer(&self) -> Composer {
		self.composer.clone()
	}

	/// Handle for the media widgets.
	pub fn media_reporter(&self) -> MediaReporter {
		MediaReporter::new(self.events_tx.clone())
	}

	/// Dismiss the sticky error. Returns false if the store has stopped.
	pub fn clear_error(&self) -> bool {
		self.events_tx.send(SessionEvent::ErrorCleared).is_ok()
	}

	pub fn is_archiving(&self) -> bool {
		self.archiver_task.is_some()
	}

	/// Release the transport subscriptions and stop feeding the store.
	///
	/// The returned handle resolves to the final snapshot once every
	/// outstanding [`MediaReporter`] is dropped too. In-flight archive
	/// requests are abandoned.
	pub fn teardown(self) -> JoinHandle<Arc<SessionSnapshot>> {
		let Session {
			session_id,
			normalizer,
			events_tx,
			store_task,
			archiver_task,
			composer: _,
		} = self;

		normalizer.teardown();
		drop(events_tx);
		drop(archiver_task);

		debug!(session_id = %session_id, "session torn down");
		store_task
	}
}
