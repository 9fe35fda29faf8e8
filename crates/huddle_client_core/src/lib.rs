#![forbid(unsafe_code)]

//! Session-state synchronization core for a collaborative audio/video chat
//! client.

pub mod archiver;
pub mod config;
pub mod event;
pub mod loopback;
pub mod media;
pub mod normalizer;
pub mod outbound;
pub mod session;
pub mod state;
pub mod store;
pub mod transport;
pub mod view;

pub use archiver::{ArchiveError, HttpReplaySink, ReplayArchiver, ReplayRecord, ReplaySink};
pub use config::{SessionConfig, default_config_path, load_session_config, load_session_config_from_path};
pub use event::SessionEvent;
pub use loopback::LoopbackTransport;
pub use media::{MediaNotification, MediaReporter};
pub use normalizer::{EventNormalizer, NormalizeError, normalize};
pub use outbound::Composer;
pub use session::Session;
pub use state::{ChatMessage, FaultKind, LogicalTime, SessionFault, SessionSnapshot, StreamRef, VideoType};
pub use store::{SessionStore, SnapshotUpdate};
pub use transport::{EventFamily, RawEvent, SessionTransport, SignalPayload, TransportError};
pub use view::{LayoutSettings, LocalControls, SessionView};

/// Errors for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	/// Transport refused a subscription at startup.
	#[error("failed to subscribe to session transport: {0}")]
	Subscribe(TransportError),

	#[error("failed to send signal: {0}")]
	SignalSend(TransportError),

	#[error(transparent)]
	Archive(#[from] ArchiveError),
}
