#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use huddle_domain::{ConnectionStatus, SenderTag, StreamId};
use serde::{Serialize, Serializer};

/// Logical clock ticks per unit of replay time; one tick is 0.2.
pub const TICKS_PER_UNIT: u64 = 5;

/// Non-negative rational replay time, stored as whole ticks of 0.2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalTime {
	ticks: u64,
}

impl LogicalTime {
	pub const ZERO: LogicalTime = LogicalTime { ticks: 0 };

	pub const fn from_ticks(ticks: u64) -> Self {
		Self { ticks }
	}

	pub const fn ticks(self) -> u64 {
		self.ticks
	}

	/// The clock after one accepted chat signal.
	pub const fn advanced(self) -> Self {
		Self {
			ticks: self.ticks.saturating_add(1),
		}
	}

	pub fn as_f64(self) -> f64 {
		self.ticks as f64 / TICKS_PER_UNIT as f64
	}
}

impl fmt::Display for LogicalTime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_f64())
	}
}

impl Serialize for LogicalTime {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(self.as_f64())
	}
}

/// Kind of video a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoType {
	Camera,
	Screen,
	Custom,
	#[default]
	Absent,
}

/// One participant's published media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRef {
	pub id: StreamId,
	/// Publisher-provided label, may be empty.
	pub name: String,
	pub has_audio: bool,
	pub has_video: bool,
	pub video_type: VideoType,
}

impl StreamRef {
	pub fn new(id: StreamId) -> Self {
		Self {
			id,
			name: String::new(),
			has_audio: true,
			has_video: true,
			video_type: VideoType::Camera,
		}
	}
}

/// A received chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
	pub sender: SenderTag,
	pub body: String,
	/// Clock value at receipt.
	pub logical_time: LogicalTime,
}

/// Where a sticky error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
	Publish,
	Subscribe,
}

impl FaultKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			FaultKind::Publish => "publish",
			FaultKind::Subscribe => "subscribe",
		}
	}
}

/// Error shown to the user until explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFault {
	pub kind: FaultKind,
	pub message: String,
}

impl fmt::Display for SessionFault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// One immutable version of the session state.
///
/// Roster and log are shared between versions until a transition replaces or
/// appends to them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
	/// 0 for the initial snapshot, +1 per applied event.
	pub version: u64,
	pub connection_status: ConnectionStatus,
	pub roster: Arc<Vec<StreamRef>>,
	pub message_log: Arc<Vec<ChatMessage>>,
	pub logical_clock: LogicalTime,
	pub last_error: Option<SessionFault>,
}

impl SessionSnapshot {
	pub fn initial() -> Self {
		Self {
			version: 0,
			connection_status: ConnectionStatus::Connecting,
			roster: Arc::new(Vec::new()),
			message_log: Arc::new(Vec::new()),
			logical_clock: LogicalTime::ZERO,
			last_error: None,
		}
	}

	pub fn roster(&self) -> &[StreamRef] {
		&self.roster
	}

	pub fn messages(&self) -> &[ChatMessage] {
		&self.message_log
	}

	pub fn stream(&self, id: &StreamId) -> Option<&StreamRef> {
		self.roster.iter().find(|s| &s.id == id)
	}
}

impl Default for SessionSnapshot {
	fn default() -> Self {
		Self::initial()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn logical_time_counts_in_fifths() {
		let t = LogicalTime::ZERO.advanced().advanced().advanced();
		assert_eq!(t.ticks(), 3);
		assert!((t.as_f64() - 0.6).abs() < 1e-12);
		assert_eq!(LogicalTime::from_ticks(2).to_string(), "0.4");
		assert_eq!(LogicalTime::ZERO.to_string(), "0");
	}

	#[test]
	fn logical_time_serializes_as_number() {
		let json = serde_json::to_string(&LogicalTime::from_ticks(1)).unwrap();
		assert_eq!(json, "0.2");
	}

	#[test]
	fn initial_snapshot_is_connecting_and_empty() {
		let s = SessionSnapshot::initial();
		assert_eq!(s.version, 0);
		assert_eq!(s.connection_status, ConnectionStatus::Connecting);
		assert!(s.roster().is_empty());
		assert!(s.messages().is_empty());
		assert_eq!(s.logical_clock, LogicalTime::ZERO);
		assert!(s.last_error.is_none());
	}
}
