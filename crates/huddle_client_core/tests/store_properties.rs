#![forbid(unsafe_code)]

//! Property tests for the session store under arbitrary event sequences.

use huddle_client_core::{ChatMessage, LogicalTime, SessionEvent, SessionStore, StreamRef};
use huddle_domain::{ConnectionStatus, StreamId};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = ConnectionStatus> {
	prop::sample::select(ConnectionStatus::ALL.to_vec())
}

fn roster_strategy() -> impl Strategy<Value = Vec<StreamRef>> {
	prop::collection::btree_set("[a-z0-9]{1,8}", 0..6).prop_map(|ids| {
		ids.into_iter()
			.map(|id| StreamRef::new(StreamId::new(id).unwrap()))
			.collect()
	})
}

fn chat_strategy() -> impl Strategy<Value = (String, String)> {
	("[a-z]{1,6}", ".{0,12}")
}

fn event_strategy() -> impl Strategy<Value = SessionEvent> {
	prop_oneof![
		3 => status_strategy().prop_map(SessionEvent::LifecycleChanged),
		2 => roster_strategy().prop_map(SessionEvent::RosterReplaced),
		4 => chat_strategy().prop_map(|(s, b)| SessionEvent::chat(s.as_str(), b)),
		1 => ".{0,8}".prop_map(SessionEvent::PublishErrorRaised),
		1 => ".{0,8}".prop_map(SessionEvent::SubscribeErrorRaised),
		1 => Just(SessionEvent::ErrorCleared),
	]
}

proptest! {
	/// Connection status always equals the most recent lifecycle event.
	#[test]
	fn prop_status_is_last_lifecycle(events in prop::collection::vec(event_strategy(), 0..60)) {
		let mut store = SessionStore::new();
		let mut expected = ConnectionStatus::Connecting;

		for event in events {
			if let SessionEvent::LifecycleChanged(s) = &event {
				expected = *s;
			}
			let snapshot = store.apply(event);
			prop_assert_eq!(snapshot.connection_status, expected);
		}
	}

	/// N chat signals give N entries in arrival order, the k-th stamped
	/// (k-1) ticks, with the clock at N ticks.
	#[test]
	fn prop_log_order_and_clock(chats in prop::collection::vec(chat_strategy(), 0..40)) {
		let mut store = SessionStore::new();
		for (sender, body) in &chats {
			store.apply(SessionEvent::chat(sender.as_str(), body.clone()));
		}

		let snapshot = store.snapshot();
		prop_assert_eq!(snapshot.messages().len(), chats.len());
		prop_assert_eq!(snapshot.logical_clock, LogicalTime::from_ticks(chats.len() as u64));
		prop_assert!((snapshot.logical_clock.as_f64() - 0.2 * chats.len() as f64).abs() < 1e-9);

		for (k, (message, (sender, body))) in snapshot.messages().iter().zip(&chats).enumerate() {
			prop_assert_eq!(message.sender.as_str(), sender.as_str());
			prop_assert_eq!(&message.body, body);
			prop_assert_eq!(message.logical_time, LogicalTime::from_ticks(k as u64));
		}
	}

	/// Interleaved non-chat events never touch the log or the clock.
	#[test]
	fn prop_only_chat_moves_log_and_clock(events in prop::collection::vec(event_strategy(), 0..60)) {
		let mut store = SessionStore::new();
		let mut expected: Vec<(String, String)> = Vec::new();

		for event in events {
			if let SessionEvent::ChatSignalReceived { sender, body } = &event {
				expected.push((sender.to_string(), body.clone()));
			}
			store.apply(event);
		}

		let snapshot = store.snapshot();
		let got: Vec<(String, String)> = snapshot
			.messages()
			.iter()
			.map(|m: &ChatMessage| (m.sender.to_string(), m.body.clone()))
			.collect();
		prop_assert_eq!(got, expected.clone());
		prop_assert_eq!(snapshot.logical_clock.ticks(), expected.len() as u64);
	}

	/// Replacing the roster twice with the same list equals replacing it once.
	#[test]
	fn prop_roster_replace_is_idempotent(
		prefix in prop::collection::vec(event_strategy(), 0..20),
		roster in roster_strategy(),
	) {
		let mut once = SessionStore::new();
		let mut twice = SessionStore::new();
		for event in prefix {
			once.apply(event.clone());
			twice.apply(event);
		}

		let a = once.apply(SessionEvent::RosterReplaced(roster.clone()));
		twice.apply(SessionEvent::RosterReplaced(roster.clone()));
		let b = twice.apply(SessionEvent::RosterReplaced(roster));

		prop_assert_eq!(a.roster(), b.roster());
		prop_assert_eq!(a.connection_status, b.connection_status);
		prop_assert_eq!(a.messages(), b.messages());
		prop_assert_eq!(&a.last_error, &b.last_error);
	}

	/// Error events leave status and roster alone; the error sticks until cleared.
	#[test]
	fn prop_last_error_is_sticky(events in prop::collection::vec(event_strategy(), 0..60)) {
		let mut store = SessionStore::new();
		let mut expected = None;

		for event in events {
			let before = store.snapshot();
			match &event {
				SessionEvent::PublishErrorRaised(_) | SessionEvent::SubscribeErrorRaised(_) => {
					expected = event.fault();
				}
				SessionEvent::ErrorCleared => expected = None,
				_ => {}
			}
			let is_error = event.fault().is_some();
			let after = store.apply(event);

			prop_assert_eq!(&after.last_error, &expected);
			if is_error {
				prop_assert_eq!(after.connection_status, before.connection_status);
				prop_assert_eq!(after.roster(), before.roster());
			}
		}
	}

	/// Observers see every snapshot version, consecutively.
	#[test]
	fn prop_observer_versions_are_consecutive(events in prop::collection::vec(event_strategy(), 0..40)) {
		let mut store = SessionStore::new();
		let mut rx = store.subscribe();
		let n = events.len();
		for event in events {
			store.apply(event);
		}

		let mut versions = Vec::new();
		while let Ok(update) = rx.try_recv() {
			versions.push(update.snapshot.version);
		}
		prop_assert_eq!(versions, (1..=n as u64).collect::<Vec<_>>());
	}
}
