//! Packet bus tests

use std::future::pending;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};

use super::*;
use crate::protocol::{Packet, PubAck, Publish, QoS};

fn data(n: u8) -> BusItem {
    BusItem::detached(Packet::Publish(Publish::new("t", vec![n], QoS::AtMostOnce)))
}

fn payload_of(item: &BusItem) -> u8 {
    match item.packet() {
        Packet::Publish(p) => p.payload[0],
        other => panic!("expected publish, got {:?}", other),
    }
}

#[test]
fn test_fifo_within_partition() {
    let bus = PacketBus::new();
    for n in 0..5 {
        bus.enqueue_item(data(n), Partition::Data).unwrap();
    }

    let order: Vec<u8> = std::iter::from_fn(|| bus.try_dequeue_item().unwrap())
        .map(|item| payload_of(&item))
        .collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_control_then_health_then_data() {
    let bus = PacketBus::new();
    bus.enqueue_item(data(1), Partition::Data).unwrap();
    bus.enqueue_item(BusItem::detached(Packet::PingResp), Partition::Health)
        .unwrap();
    bus.enqueue_item(
        BusItem::detached(Packet::PubAck(PubAck::new(7))),
        Partition::Control,
    )
    .unwrap();

    let types: Vec<u8> = std::iter::from_fn(|| bus.try_dequeue_item().unwrap())
        .map(|item| item.packet().packet_type())
        .collect();
    assert_eq!(types, vec![4, 13, 3]);
}

#[test]
fn test_partition_counts() {
    let bus = PacketBus::new();
    bus.enqueue_item(data(1), Partition::Data).unwrap();
    bus.enqueue_item(data(2), Partition::Data).unwrap();
    bus.enqueue_item(BusItem::detached(Packet::PingResp), Partition::Health)
        .unwrap();

    assert_eq!(bus.partition_items_count(Partition::Data), 2);
    assert_eq!(bus.partition_items_count(Partition::Health), 1);
    assert_eq!(bus.partition_items_count(Partition::Control), 0);
    assert_eq!(bus.total_items_count(), 3);
    // Counting does not consume
    assert_eq!(bus.partition_items_count(Partition::Data), 2);
}

#[test]
fn test_drop_first_item_takes_head() {
    let bus = PacketBus::new();
    bus.enqueue_item(data(1), Partition::Data).unwrap();
    bus.enqueue_item(data(2), Partition::Data).unwrap();

    let head = bus.drop_first_item(Partition::Data).unwrap();
    assert_eq!(payload_of(&head), 1);
    assert_eq!(bus.partition_items_count(Partition::Data), 1);
    assert!(bus.drop_first_item(Partition::Control).is_none());
}

#[test]
fn test_dequeue_returns_immediately_when_item_queued() {
    let bus = PacketBus::new();
    bus.enqueue_item(data(9), Partition::Data).unwrap();

    let mut fut = task::spawn(bus.dequeue_item(pending::<()>()));
    let item = assert_ready_ok!(fut.poll());
    assert_eq!(payload_of(&item), 9);
}

#[test]
fn test_dequeue_waits_until_enqueue() {
    let bus = PacketBus::new();
    let mut fut = task::spawn(bus.dequeue_item(pending::<()>()));
    assert_pending!(fut.poll());

    bus.enqueue_item(BusItem::detached(Packet::PingResp), Partition::Health)
        .unwrap();
    assert!(fut.is_woken());

    let item = assert_ready_ok!(fut.poll());
    assert_eq!(item.packet(), &Packet::PingResp);
}

#[test]
fn test_dequeue_cancelled() {
    let bus = PacketBus::new();
    let mut fut = task::spawn(bus.dequeue_item(std::future::ready(())));
    let err = assert_ready_err!(fut.poll());
    drop(fut);

    assert_eq!(err, BusError::OperationCancelled);
    assert_eq!(bus.total_items_count(), 0);
    assert!(!bus.is_closed());
}

#[tokio::test]
async fn test_dequeue_cancelled_by_signal() {
    let bus = PacketBus::new();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let cancel = async move {
        let _ = rx.await;
    };
    let (result, _) = tokio::join!(bus.dequeue_item(cancel), async move {
        tokio::task::yield_now().await;
        tx.send(()).unwrap();
    });

    assert_eq!(result.unwrap_err(), BusError::OperationCancelled);
}

#[test]
fn test_completion_fulfilled_on_send() {
    let bus = PacketBus::new();
    let (item, mut completion) = BusItem::new(Packet::PingResp);
    bus.enqueue_item(item, Partition::Health).unwrap();
    assert_eq!(completion.try_outcome(), None);

    bus.try_dequeue_item().unwrap().unwrap().complete();
    assert_eq!(completion.try_outcome(), Some(Ok(())));
}

#[test]
fn test_clear_discards_without_resolving() {
    let bus = PacketBus::new();
    let (item, mut completion) = BusItem::new(Packet::PingResp);
    bus.enqueue_item(item, Partition::Health).unwrap();
    bus.enqueue_item(data(1), Partition::Data).unwrap();

    bus.clear();

    assert_eq!(bus.total_items_count(), 0);
    assert!(!bus.is_closed());
    assert_eq!(completion.try_outcome(), Some(Err(BusError::Discarded)));
}

#[test]
fn test_dispose_fails_pending_and_is_idempotent() {
    let bus = PacketBus::new();
    let (item, mut completion) = BusItem::new(Packet::PingResp);
    bus.enqueue_item(item, Partition::Health).unwrap();

    bus.dispose();
    bus.dispose();

    assert!(bus.is_closed());
    assert_eq!(completion.try_outcome(), Some(Err(BusError::BusClosed)));
    assert_eq!(bus.try_dequeue_item().unwrap_err(), BusError::BusClosed);
}

#[test]
fn test_enqueue_after_dispose() {
    let bus = PacketBus::new();
    bus.dispose();

    let (item, mut completion) = BusItem::new(Packet::PingResp);
    assert_eq!(
        bus.enqueue_item(item, Partition::Health),
        Err(BusError::BusClosed)
    );
    assert_eq!(completion.try_outcome(), Some(Err(BusError::BusClosed)));
}

#[test]
fn test_dispose_releases_waiting_writer() {
    let bus = PacketBus::new();
    let mut fut = task::spawn(bus.dequeue_item(pending::<()>()));
    assert_pending!(fut.poll());

    bus.dispose();
    assert!(fut.is_woken());
    assert_eq!(assert_ready_err!(fut.poll()), BusError::BusClosed);
}

#[tokio::test]
async fn test_concurrent_producers_single_writer() {
    use std::sync::Arc;

    let bus = Arc::new(PacketBus::new());
    let mut producers = Vec::new();
    for lane in [Partition::Control, Partition::Data, Partition::Health] {
        let bus = bus.clone();
        producers.push(tokio::spawn(async move {
            for n in 0..50u8 {
                let packet = Packet::Publish(Publish::new("t", vec![n], QoS::AtMostOnce));
                bus.enqueue_item(BusItem::detached(packet), lane).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }

    let mut received = 0;
    while received < 150 {
        bus.dequeue_item(pending::<()>()).await.unwrap();
        received += 1;
    }
    for p in producers {
        p.await.unwrap();
    }
    assert_eq!(bus.total_items_count(), 0);
}

proptest! {
    #[test]
    fn prop_single_partition_is_fifo(payloads in proptest::collection::vec(any::<u8>(), 0..64)) {
        let bus = PacketBus::new();
        for &n in &payloads {
            bus.enqueue_item(data(n), Partition::Data).unwrap();
        }
        let drained: Vec<u8> = std::iter::from_fn(|| bus.try_dequeue_item().unwrap())
            .map(|item| payload_of(&item))
            .collect();
        prop_assert_eq!(drained, payloads);
    }

    #[test]
    fn prop_priority_never_yields_data_before_control(
        lanes in proptest::collection::vec(0u8..3, 1..64)
    ) {
        let bus = PacketBus::new();
        for (i, lane) in lanes.iter().enumerate() {
            let partition = match lane {
                0 => Partition::Control,
                1 => Partition::Health,
                _ => Partition::Data,
            };
            let packet = Packet::Publish(Publish::new("t", vec![*lane, i as u8], QoS::AtMostOnce));
            bus.enqueue_item(BusItem::detached(packet), partition).unwrap();
        }

        let ranks: Vec<u8> = std::iter::from_fn(|| bus.try_dequeue_item().unwrap())
            .map(|item| item.packet().as_publish().unwrap().payload[0])
            .collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        prop_assert_eq!(ranks, sorted);
    }
}
