//! Concurrent registration/subscription/publish stress test, grounded in
//! `original_source/tests/test_datahub_stress_check.c`'s sensor/controller/
//! monitor fan-out shape, adapted to assert the graph invariants from
//! spec.md §8 instead of a throughput target.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bus_api::{delete_instance, get_instance, EventMask, NodeParams, NodeRef};

const SENSORS: usize = 12;
const MONITORS: usize = 8;
const ROUNDS: usize = 50;

#[test]
fn concurrent_subscribe_publish_remove_holds_invariants() {
    let bus = get_instance("it-stress-1");
    let delivered = Arc::new(AtomicUsize::new(0));

    let sensors: Vec<_> = (0..SENSORS)
        .map(|i| {
            bus.new_node(&format!("sensor-{i}"), NodeParams { payload_size: 4, ..Default::default() })
                .unwrap()
        })
        .collect();

    crossbeam::thread::scope(|scope| {
        for m in 0..MONITORS {
            let bus = bus.clone();
            let delivered = delivered.clone();
            let sensor_names: Vec<String> = (0..SENSORS).map(|i| format!("sensor-{i}")).collect();
            scope.spawn(move |_| {
                let captured = delivered.clone();
                let monitor = bus
                    .new_node(
                        &format!("monitor-{m}"),
                        NodeParams {
                            event_mask: EventMask::PUBLISH,
                            callback: Some(Arc::new(move |_| {
                                captured.fetch_add(1, Ordering::Relaxed);
                                0
                            })),
                            ..Default::default()
                        },
                    )
                    .unwrap();

                for round in 0..ROUNDS {
                    let target = &sensor_names[round % SENSORS];
                    let _ = monitor.subscribe(target);
                    if round % 7 == 0 {
                        let _ = monitor.unsubscribe(NodeRef::Name(target));
                    }
                }
            });
        }

        for (i, sensor) in sensors.iter().enumerate() {
            let sensor = sensor.clone();
            scope.spawn(move |_| {
                for round in 0..ROUNDS {
                    let payload = [(i as u8), (round as u8), 0, 0];
                    let _ = sensor.publish(&payload);
                    std::thread::yield_now();
                }
            });
        }
    })
    .unwrap();

    // I-2/I-3 (spec.md §8): no edge count can exceed the population that
    // could have produced it, regardless of how subscribe/unsubscribe
    // interleaved across threads.
    for sensor in &sensors {
        assert!(sensor.sub_count() <= MONITORS);
    }
    for m in 0..MONITORS {
        if let Some((_, monitor)) = bus.get_node_by_name(&format!("monitor-{m}")) {
            assert!(monitor.pub_count() <= SENSORS);
        }
    }

    assert_eq!(bus.node_count(), SENSORS + MONITORS + 1);
    delete_instance("it-stress-1");
}

#[test]
fn concurrent_create_remove_same_name_never_double_registers() {
    let bus = get_instance("it-stress-2");
    let successes = Arc::new(AtomicUsize::new(0));

    crossbeam::thread::scope(|scope| {
        for _ in 0..16 {
            let bus = bus.clone();
            let successes = successes.clone();
            scope.spawn(move |_| {
                if bus.new_node("contested", NodeParams::default()).is_ok() {
                    successes.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    })
    .unwrap();

    // Exactly one create_node for a given name can win; the rest see EXIST.
    assert_eq!(successes.load(Ordering::Relaxed), 1);
    assert_eq!(bus.node_count(), 2); // dummy + "contested"
    delete_instance("it-stress-2");
}

#[test]
fn callback_reentrant_subscribe_and_publish_does_not_deadlock() {
    let bus = get_instance("it-stress-reentrant");
    let hub = bus
        .new_node("hub", NodeParams { payload_size: 1, ..Default::default() })
        .unwrap();

    let relay_bus = bus.clone();
    let relay_count = Arc::new(AtomicUsize::new(0));
    let captured = relay_count.clone();
    let relay = bus
        .new_node(
            "relay",
            NodeParams {
                payload_size: 1,
                event_mask: EventMask::PUBLISH,
                callback: Some(Arc::new(move |p| {
                    captured.fetch_add(1, Ordering::Relaxed);
                    // Re-entrant publish from inside a callback (spec.md §5):
                    // must not deadlock since no bus lock is held here.
                    if let Some((_, downstream)) = relay_bus.get_node_by_name("downstream") {
                        let _ = downstream.publish(&[p.sender as u8]);
                    }
                    0
                })),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(relay.subscribe("hub"), 0);

    let _downstream = bus
        .new_node("downstream", NodeParams { payload_size: 1, ..Default::default() })
        .unwrap();

    // Subscribed to "downstream", so it's driven only by the relay's
    // re-entrant publish from inside its own callback.
    let sink_count = Arc::new(AtomicUsize::new(0));
    let captured = sink_count.clone();
    let sink = bus
        .new_node(
            "sink",
            NodeParams {
                payload_size: 1,
                event_mask: EventMask::PUBLISH,
                callback: Some(Arc::new(move |_| {
                    captured.fetch_add(1, Ordering::Relaxed);
                    0
                })),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(sink.subscribe("downstream"), 0);

    for i in 0..20u8 {
        hub.publish(&[i]);
    }

    // A timed join-style check: by the time publish() returns synchronously
    // (there is no suspension beyond lock contention, spec.md §5), delivery
    // has already happened.
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(relay_count.load(Ordering::Relaxed), 20);
    assert_eq!(sink_count.load(Ordering::Relaxed), 20);
    delete_instance("it-stress-reentrant");
}
