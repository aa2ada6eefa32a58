/// Event bus integration tests for LinkDeck
///
/// Exercises the polled delivery model: bounded per-channel logs, push-order
/// preservation within a channel, and the retention cap.

use ldeck_bus::{channel_activity, channel_update};
use ldeck_core::Envelope;
use ldeck_test_utils::TestDeck;
use serde_json::json;

#[test]
fn test_published_message_is_visible_in_same_process() {
    let deck = TestDeck::new();
    let channel = channel_update("list-1");

    let env = Envelope::new("list_update", "list-1", "add_url")
        .with_field("item_id", json!("item-1"));
    deck.bus.publish(&channel, &env);

    let recent = deck.bus.fetch_recent(&channel, 10);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0], env);
}

#[test]
fn test_log_preserves_publish_order_newest_first() {
    let deck = TestDeck::new();
    let channel = channel_activity("list-1");

    for i in 0..10 {
        deck.bus.publish(
            &channel,
            &Envelope::new("list_activity", "list-1", format!("click-{}", i)),
        );
    }

    let recent = deck.bus.fetch_recent(&channel, 10);
    let actions: Vec<&str> = recent.iter().map(|e| e.action.as_str()).collect();
    let expected: Vec<String> = (0..10).rev().map(|i| format!("click-{}", i)).collect();
    assert_eq!(actions, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn test_message_absent_after_aging_past_retention_cap() {
    let deck = TestDeck::new();
    let channel = channel_update("list-1");

    let oldest = Envelope::new("list_update", "list-1", "the-first-edit");
    deck.bus.publish(&channel, &oldest);

    // 100 more messages push the first one past the retention cap
    for i in 0..100 {
        deck.bus.publish(
            &channel,
            &Envelope::new("list_update", "list-1", format!("edit-{}", i)),
        );
    }

    let recent = deck.bus.fetch_recent(&channel, 200);
    assert_eq!(recent.len(), 100);
    assert!(recent.iter().all(|e| e.action != "the-first-edit"));
}

#[test]
fn test_no_ordering_or_leakage_across_channels() {
    let deck = TestDeck::new();

    deck.bus.publish(
        &channel_update("list-a"),
        &Envelope::new("list_update", "list-a", "add_url"),
    );
    deck.bus.publish(
        &channel_activity("list-a"),
        &Envelope::new("list_activity", "list-a", "click"),
    );

    assert_eq!(deck.bus.fetch_recent(&channel_update("list-a"), 10).len(), 1);
    assert_eq!(deck.bus.fetch_recent(&channel_activity("list-a"), 10).len(), 1);
    assert!(deck.bus.fetch_recent(&channel_update("list-b"), 10).is_empty());
}

#[test]
fn test_envelope_wire_shape() {
    let deck = TestDeck::new();
    let channel = channel_update("list-1");
    deck.bus.publish(
        &channel,
        &Envelope::new("list_update", "list-1", "reorder").with_field("positions", json!([2, 0, 1])),
    );

    let recent = deck.bus.fetch_recent(&channel, 1);
    let value = serde_json::to_value(&recent[0]).unwrap();
    assert_eq!(value["type"], "list_update");
    assert_eq!(value["list_id"], "list-1");
    assert_eq!(value["action"], "reorder");
    assert_eq!(value["positions"], json!([2, 0, 1]));
    // ISO-8601 timestamp on the wire
    assert!(value["timestamp"].as_str().unwrap().contains('T'));
}
