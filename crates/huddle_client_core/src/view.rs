#![forbid(unsafe_code)]

use std::fmt;

use huddle_domain::{SenderTag, StreamId};

use crate::state::{LogicalTime, SessionSnapshot, VideoType};

/// Local publisher toggles. Not part of the synchronized session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalControls {
	pub publish_video: bool,
}

impl Default for LocalControls {
	fn default() -> Self {
		Self { publish_video: true }
	}
}

impl LocalControls {
	pub fn toggle_video(&mut self) -> bool {
		self.publish_video = !self.publish_video;
		self.publish_video
	}
}

/// Tile sizes in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSettings {
	pub publisher_width: u32,
	pub publisher_height: u32,
	pub subscriber_width: u32,
	pub subscriber_height: u32,
}

impl Default for LayoutSettings {
	fn default() -> Self {
		Self {
			publisher_width: 500,
			publisher_height: 500,
			subscriber_width: 1000,
			subscriber_height: 1000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherProps {
	pub publish_video: bool,
	pub width: u32,
	pub height: u32,
}

/// One remote stream tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTile {
	pub key: StreamId,
	pub label: String,
	pub has_audio: bool,
	pub has_video: bool,
	pub video_type: VideoType,
	pub width: u32,
	pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
	pub sender: SenderTag,
	pub body: String,
	pub logical_time: LogicalTime,
}

/// Everything the presentation surface draws for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
	pub version: u64,
	pub status_line: String,
	pub error_banner: Option<String>,
	pub video_button_label: &'static str,
	pub publisher: PublisherProps,
	pub tiles: Vec<StreamTile>,
	pub transcript: Vec<TranscriptLine>,
}

impl SessionView {
	pub fn build(snapshot: &SessionSnapshot, controls: &LocalControls, layout: &LayoutSettings) -> Self {
		let tiles = snapshot
			.roster()
			.iter()
			.map(|s| StreamTile {
				key: s.id.clone(),
				label: if s.name.is_empty() {
					s.id.to_string()
				} else {
					s.name.clone()
				},
				has_audio: s.has_audio,
				has_video: s.has_video,
				video_type: s.video_type,
				width: layout.subscriber_width,
				height: layout.subscriber_height,
			})
			.collect();

		let transcript = snapshot
			.messages()
			.iter()
			.map(|m| TranscriptLine {
				sender: m.sender.clone(),
				body: m.body.clone(),
				logical_time: m.logical_time,
			})
			.collect();

		Self {
			version: snapshot.version,
			status_line: format!("Session Status: {}", snapshot.connection_status),
			error_banner: snapshot.last_error.as_ref().map(|e| format!("Error: {e}")),
			video_button_label: if controls.publish_video {
				"Disable Video"
			} else {
				"Enable Video"
			},
			publisher: PublisherProps {
				publish_video: controls.publish_video,
				width: layout.publisher_width,
				height: layout.publisher_height,
			},
			tiles,
			transcript,
		}
	}
}

/// Plain-text rendering for terminals and logs.
impl fmt::Display for SessionView {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{}", self.status_line)?;
		if let Some(banner) = &self.error_banner {
			writeln!(f, "{banner}")?;
		}
		writeln!(
			f,
			"[{}] publisher {}x{}",
			self.video_button_label, self.publisher.width, self.publisher.height
		)?;
		for tile in &self.tiles {
			writeln!(f, "  tile {} ({}x{})", tile.label, tile.width, tile.height)?;
		}
		for line in &self.transcript {
			writeln!(f, "  [{}] {}: {}", line.logical_time, line.sender, line.body)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use huddle_domain::ConnectionStatus;

	use super::*;
	use crate::state::{ChatMessage, FaultKind, SessionFault, StreamRef};

	fn snapshot() -> SessionSnapshot {
		let mut named = StreamRef::new(StreamId::new("s1").unwrap());
		named.name = "Alice".to_string();
		SessionSnapshot {
			version: 4,
			connection_status: ConnectionStatus::Connected,
			roster: Arc::new(vec![named, StreamRef::new(StreamId::new("s2").unwrap())]),
			message_log: Arc::new(vec![ChatMessage {
				sender: SenderTag::new("c1"),
				body: "hi".to_string(),
				logical_time: LogicalTime::ZERO,
			}]),
			logical_clock: LogicalTime::from_ticks(1),
			last_error: None,
		}
	}

	#[test]
	fn builds_status_tiles_and_transcript() {
		let view = SessionView::build(&snapshot(), &LocalControls::default(), &LayoutSettings::default());

		assert_eq!(view.status_line, "Session Status: Connected");
		assert!(view.error_banner.is_none());
		assert_eq!(view.video_button_label, "Disable Video");
		assert_eq!((view.publisher.width, view.publisher.height), (500, 500));

		let keys: Vec<&str> = view.tiles.iter().map(|t| t.key.as_str()).collect();
		assert_eq!(keys, vec!["s1", "s2"]);
		assert_eq!(view.tiles[0].label, "Alice");
		assert_eq!(view.tiles[1].label, "s2");
		assert_eq!((view.tiles[0].width, view.tiles[0].height), (1000, 1000));

		assert_eq!(view.transcript.len(), 1);
		assert_eq!(view.transcript[0].body, "hi");
	}

	#[test]
	fn error_banner_and_video_toggle() {
		let mut snap = snapshot();
		snap.last_error = Some(SessionFault {
			kind: FaultKind::Subscribe,
			message: "stream unavailable".to_string(),
		});
		let mut controls = LocalControls::default();
		assert!(!controls.toggle_video());

		let view = SessionView::build(&snap, &controls, &LayoutSettings::default());
		assert_eq!(view.error_banner.as_deref(), Some("Error: stream unavailable"));
		assert_eq!(view.video_button_label, "Enable Video");
		assert!(!view.publisher.publish_video);

		let text = view.to_string();
		assert!(text.starts_with("Session Status: Connected\nError: stream unavailable\n"));
		assert!(text.contains("[0] c1: hi"));
	}
}
