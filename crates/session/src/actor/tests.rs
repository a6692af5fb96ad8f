//! Service-level tests for the session actor.

use std::net::IpAddr;
use std::num::NonZeroU8;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tessera_proto::{ControlCommand, Envelope, HEADER_LEN, MessageKind};

use super::{SessionHandle, SessionService};
use crate::config::SessionConfig;
use crate::memory::InMemoryHistory;

fn msg(len: usize) -> Envelope {
	Envelope::new(MessageKind(130), 2, vec![7u8; len - HEADER_LEN]).unwrap()
}

fn ip(s: &str) -> IpAddr {
	s.parse().unwrap()
}

fn start(size_limit: u64, threshold: u64) -> (SessionHandle, InMemoryHistory) {
	let config = SessionConfig {
		size_limit,
		autoreset_threshold: threshold,
		mailbox_capacity: 8,
	};
	let store = InMemoryHistory::new();
	let history = config.build_history("svc", store.clone());
	(SessionService::start(history, config.mailbox_capacity), store)
}

#[tokio::test(flavor = "current_thread")]
async fn appends_are_serialized_and_published() {
	let (handle, store) = start(0, 0);
	let mut sub = handle.subscribe();
	assert_eq!(*sub.borrow(), -1);

	assert_eq!(handle.add_message(msg(10)).await, Ok(true));
	assert_eq!(handle.add_message(msg(20)).await, Ok(true));

	sub.changed().await.unwrap();
	assert_eq!(*sub.borrow_and_update(), 1);
	assert_eq!(store.len(), 2);

	let status = handle.status().await.unwrap();
	assert_eq!(status.id, "svc");
	assert_eq!(status.size_in_bytes, 30);
	assert_eq!(status.first_index, 0);
	assert_eq!(status.last_index, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn full_history_rejects_without_publishing() {
	let (handle, store) = start(100, 0);
	assert_eq!(handle.add_message(msg(90)).await, Ok(true));
	let mut sub = handle.subscribe();
	let _ = sub.borrow_and_update();

	assert_eq!(handle.add_message(msg(20)).await, Ok(false));
	assert!(!sub.has_changed().unwrap());
	assert_eq!(store.len(), 1);

	let status = handle.status().await.unwrap();
	assert_eq!(status.size_in_bytes, 90);
	assert_eq!(status.last_index, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn reset_is_all_or_nothing() {
	let (handle, store) = start(100, 0);
	assert_eq!(handle.add_message(msg(50)).await, Ok(true));

	assert_eq!(handle.reset(vec![msg(80), msg(70)]).await, Ok(false));
	let status = handle.status().await.unwrap();
	assert_eq!((status.first_index, status.last_index, status.size_in_bytes), (0, 0, 50));

	assert_eq!(handle.reset(vec![msg(30), msg(30)]).await, Ok(true));
	let status = handle.status().await.unwrap();
	assert_eq!((status.first_index, status.last_index, status.size_in_bytes), (1, 2, 60));
	assert_eq!(store.generation(), 1);
	assert_eq!(*handle.subscribe().borrow(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn status_reports_effective_threshold() {
	let (handle, _store) = start(1000, 100);
	assert_eq!(handle.status().await.unwrap().auto_reset_threshold, 100);
	assert_eq!(handle.reset(vec![msg(200)]).await, Ok(true));
	assert_eq!(handle.status().await.unwrap().auto_reset_threshold, 300);

	handle.set_size_limit(250).await.unwrap();
	let status = handle.status().await.unwrap();
	assert_eq!(status.size_limit, 250);
	assert_eq!(status.auto_reset_threshold, 225);
}

#[tokio::test(flavor = "current_thread")]
async fn ban_commands() {
	let (handle, _store) = start(0, 0);
	assert_eq!(handle.add_ban("alice", ip("10.0.0.5"), "", "admin").await, Ok(true));
	assert_eq!(handle.add_ban("alice", ip("10.0.0.5"), "", "admin").await, Ok(false));
	assert_eq!(handle.is_banned(ip("::ffff:10.0.0.5"), "").await, Ok(true));

	assert_eq!(
		handle.ban_list(false).await.unwrap(),
		json!([{"id": 1, "username": "alice", "bannedBy": "admin"}])
	);

	assert_eq!(handle.remove_ban(1).await.unwrap(), "alice");
	assert_eq!(handle.remove_ban(1).await.unwrap(), "");
	assert_eq!(handle.is_banned(ip("10.0.0.5"), "").await, Ok(false));
}

#[tokio::test(flavor = "current_thread")]
async fn admin_commands_share_the_queue_with_traffic() {
	let (handle, store) = start(0, 0);
	handle.join_user(3, "bob").await.unwrap();

	let kick = ControlCommand::kick(NonZeroU8::new(3).unwrap(), true).unwrap();
	let clients: Vec<_> = (0..4)
		.map(|_| {
			let h = handle.clone();
			tokio::spawn(async move { h.add_message(msg(12)).await })
		})
		.collect();
	assert_eq!(handle.add_message(kick.clone()).await, Ok(true));
	for c in clients {
		assert_eq!(c.await.unwrap(), Ok(true));
	}

	let status = handle.status().await.unwrap();
	assert_eq!(status.last_index, 4);
	assert_eq!(status.size_in_bytes, 4 * 12 + kick.length() as u64);
	let batch = store.batch_after(-1, 10);
	assert_eq!(batch.messages.len(), 5);
	assert!(batch.messages.contains(&kick));
}

#[tokio::test(flavor = "current_thread")]
async fn dropping_handles_stops_the_service() {
	let (handle, _store) = start(0, 0);
	let mut sub = handle.subscribe();
	drop(handle);

	let closed = tokio::time::timeout(Duration::from_secs(1), sub.changed()).await;
	assert!(matches!(closed, Ok(Err(_))));
}

#[tokio::test(flavor = "current_thread")]
async fn resumed_history_starts_from_loaded_counters() {
	let config = SessionConfig::default();
	let store = InMemoryHistory::new();
	let history = config.build_history("resumed", store.clone());
	let handle = SessionService::start_loaded(history, 4096, 10, 4);

	let mut sub = handle.subscribe();
	assert_eq!(*sub.borrow_and_update(), 9);
	let status = handle.status().await.unwrap();
	assert_eq!(status.size_in_bytes, 4096);
	assert_eq!(status.auto_reset_base_size, 4096);

	let appended = msg(8);
	assert_eq!(handle.add_message(appended.clone()).await, Ok(true));
	sub.changed().await.unwrap();
	let published = *sub.borrow_and_update();
	assert_eq!(published, 10);
	assert_eq!(store.last_index(), published);

	let batch = store.batch_after(published - 1, 10);
	assert_eq!(batch.messages, vec![appended]);
	assert_eq!(batch.last_index, published);

	assert_eq!(handle.reset(vec![msg(16)]).await, Ok(true));
	let status = handle.status().await.unwrap();
	assert_eq!(store.first_index(), status.first_index);
	assert_eq!(store.last_index(), status.last_index);
}
