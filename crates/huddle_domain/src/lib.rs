#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session connection lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	#[default]
	Connecting,
	Connected,
	Reconnecting,
	Reconnected,
	Disconnected,
}

impl ConnectionStatus {
	pub const ALL: [ConnectionStatus; 5] = [
		ConnectionStatus::Connecting,
		ConnectionStatus::Connected,
		ConnectionStatus::Reconnecting,
		ConnectionStatus::Reconnected,
		ConnectionStatus::Disconnected,
	];

	/// Display label used by the status line.
	pub const fn as_str(self) -> &'static str {
		match self {
			ConnectionStatus::Connecting => "Connecting",
			ConnectionStatus::Connected => "Connected",
			ConnectionStatus::Reconnecting => "Reconnecting",
			ConnectionStatus::Reconnected => "Reconnected",
			ConnectionStatus::Disconnected => "Disconnected",
		}
	}
}

impl fmt::Display for ConnectionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors for parsing identifiers and statuses from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("empty value")]
	Empty,
	#[error("unknown connection status: {0}")]
	UnknownStatus(String),
}

impl FromStr for ConnectionStatus {
	type Err = ParseIdError;

	/// Accepts transport event names (`sessionReconnecting`) as well as bare
	/// status names in any case or separator style.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}

		let folded: String = s
			.chars()
			.filter(|c| *c != '_' && *c != '-')
			.map(|c| c.to_ascii_lowercase())
			.collect();
		let bare = folded.strip_prefix("session").unwrap_or(folded.as_str());

		match bare {
			"connecting" => Ok(ConnectionStatus::Connecting),
			"connected" => Ok(ConnectionStatus::Connected),
			"reconnecting" => Ok(ConnectionStatus::Reconnecting),
			"reconnected" => Ok(ConnectionStatus::Reconnected),
			"disconnected" => Ok(ConnectionStatus::Disconnected),
			_ => Err(ParseIdError::UnknownStatus(s.to_string())),
		}
	}
}

/// Session identifier; also the archive topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	/// Create a non-empty `SessionId`.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(ParseIdError::Empty);
		}
		Ok(Self(id))
	}
	pub fn as_str(&self) -> &str {
		&self.0
	}
	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for SessionId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SessionId::new(s.to_string())
	}
}

/// Transport-assigned media stream identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
	/// Create a non-empty `StreamId`.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(ParseIdError::Empty);
		}
		Ok(Self(id))
	}
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for StreamId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for StreamId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		StreamId::new(s.to_string())
	}
}

/// Opaque label identifying who sent a chat signal.
///
/// Usually the sender's transport connection id. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderTag(String);

impl SenderTag {
	/// Tag used when the transport does not say who sent a signal.
	pub const ANONYMOUS: &'static str = "anonymous";

	pub fn new(tag: impl Into<String>) -> Self {
		Self(tag.into())
	}

	pub fn anonymous() -> Self {
		Self(Self::ANONYMOUS.to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SenderTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for SenderTag {
	fn from(s: &str) -> Self {
		SenderTag::new(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_parse_accepts_transport_event_names() {
		assert_eq!(
			"sessionConnected".parse::<ConnectionStatus>().unwrap(),
			ConnectionStatus::Connected
		);
		assert_eq!(
			"sessionReconnecting".parse::<ConnectionStatus>().unwrap(),
			ConnectionStatus::Reconnecting
		);
		assert_eq!(
			"session_disconnected".parse::<ConnectionStatus>().unwrap(),
			ConnectionStatus::Disconnected
		);
		assert_eq!(" RECONNECTED ".parse::<ConnectionStatus>().unwrap(), ConnectionStatus::Reconnected);
	}

	#[test]
	fn status_display_roundtrips() {
		for status in ConnectionStatus::ALL {
			assert_eq!(status.to_string().parse::<ConnectionStatus>().unwrap(), status);
		}
		assert_eq!(ConnectionStatus::default(), ConnectionStatus::Connecting);
	}

	#[test]
	fn status_parse_rejects_unknown() {
		assert_eq!("".parse::<ConnectionStatus>().unwrap_err(), ParseIdError::Empty);
		assert!(matches!(
			"sessionExploded".parse::<ConnectionStatus>(),
			Err(ParseIdError::UnknownStatus(name)) if name == "sessionExploded"
		));
	}

	#[test]
	fn rejects_empty_ids() {
		assert!(SessionId::new("").is_err());
		assert!(StreamId::new("   ").is_err());
		assert!("".parse::<SessionId>().is_err());
		assert_eq!(SessionId::new("s-1").unwrap().as_str(), "s-1");
	}

	#[test]
	fn sender_tag_allows_anything() {
		assert_eq!(SenderTag::new("").as_str(), "");
		assert_eq!(SenderTag::anonymous().as_str(), SenderTag::ANONYMOUS);
	}
}
