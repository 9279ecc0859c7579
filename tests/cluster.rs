//! End-to-end coherence scenarios over an in-process loopback cluster.
//!
//! Placement facts used below (FNV-1a 32-bit):
//! - N=3: "bar" -> home 2, backup 0; "foo" -> home 0, backup 1;
//!   "baz" -> home 1, backup 2; "counter" -> home 0, backup 1.
//! - N=2: "gamma" -> home 0, backup 1.

use dsm_cluster::cluster::types::{NodeId, ObjectRole};
use dsm_cluster::dsm::error::DsmError;
use dsm_cluster::dsm::object_id::ObjectId;
use dsm_cluster::net::loopback::loopback_cluster;
use std::sync::Mutex;
use std::time::Duration;

fn id(name: &str) -> ObjectId {
    ObjectId::new(name)
}

#[test]
fn write_on_client_lands_on_home_backup_and_writer() {
    let (_hub, nodes) = loopback_cluster(3);

    // Node 1 is neither home (2) nor backup (0) for "bar".
    assert_eq!(nodes[1].role_for(&id("bar")), ObjectRole::Cache);

    nodes[1]
        .write::<String>(id("bar"), "hello".to_string())
        .unwrap();

    // Home and backup replicate the commit; the writer keeps its
    // optimistic local copy.
    for node in &nodes {
        assert!(node.exists(&id("bar")));
        assert_eq!(node.snapshot()["bar"], b"hello".to_vec());
    }

    // A read on the backup is a local hit and sees the committed value.
    assert_eq!(nodes[0].read::<String>(id("bar")).unwrap(), "hello");
}

#[test]
fn write_on_cache_then_reads_everywhere() {
    let (_hub, nodes) = loopback_cluster(3);

    // "foo": home 0, backup 1; node 2 writes as a plain client.
    nodes[2].write::<String>(id("foo"), "x".to_string()).unwrap();

    assert_eq!(nodes[2].read::<String>(id("foo")).unwrap(), "x");
    assert_eq!(nodes[0].read::<String>(id("foo")).unwrap(), "x");
    assert_eq!(nodes[1].read::<String>(id("foo")).unwrap(), "x");

    assert_eq!(nodes[0].role_for(&id("foo")), ObjectRole::Home);
    assert_eq!(nodes[1].role_for(&id("foo")), ObjectRole::Backup);
}

#[test]
fn queued_writer_runs_before_later_reader() {
    // Single node: thread A holds a read handle, B requests a write
    // handle, C requests a read handle after B. When A drops, B must be
    // granted before C.
    let (_hub, nodes) = loopback_cluster(1);
    let node = &nodes[0];
    let order = Mutex::new(Vec::new());

    let first_read = node.read_handle::<String>(id("doc")).unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let mut handle = node.write_handle::<String>(id("doc")).unwrap();
            order.lock().unwrap().push("writer");
            handle.set("from writer".to_string()).unwrap();
        });

        // Let the writer queue up before the reader arrives.
        std::thread::sleep(Duration::from_millis(50));

        scope.spawn(|| {
            let handle = node.read_handle::<String>(id("doc")).unwrap();
            order.lock().unwrap().push("reader");
            assert_eq!(*handle, "from writer");
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(order.lock().unwrap().is_empty());

        drop(first_read);
    });

    assert_eq!(*order.lock().unwrap(), vec!["writer", "reader"]);
}

#[test]
fn remove_propagates_to_home_backup_and_cachers() {
    let (_hub, nodes) = loopback_cluster(2);

    // "gamma": home 0, backup 1. Write on the home, read on the backup.
    nodes[0]
        .write::<String>(id("gamma"), "v1".to_string())
        .unwrap();
    assert_eq!(nodes[1].read::<String>(id("gamma")).unwrap(), "v1");

    nodes[0].remove(&id("gamma")).unwrap();

    for node in &nodes {
        assert!(!node.exists(&id("gamma")));
    }
    assert!(matches!(
        nodes[1].read::<String>(id("gamma")),
        Err(DsmError::NotFound(_))
    ));
}

#[test]
fn remove_from_client_clears_cluster() {
    let (_hub, nodes) = loopback_cluster(3);

    nodes[1]
        .write::<String>(id("bar"), "doomed".to_string())
        .unwrap();
    nodes[1].remove(&id("bar")).unwrap();

    for node in &nodes {
        assert!(!node.exists(&id("bar")));
    }
}

#[test]
fn fetch_falls_back_to_backup() {
    let (_hub, nodes) = loopback_cluster(3);

    // "foo": home 0, backup 1.
    nodes[0].write::<String>(id("foo"), "v".to_string()).unwrap();

    // Empty the home's store out-of-band; the backup still holds "v".
    nodes[0].core().on_cache_remove(&id("foo"));
    assert!(!nodes[0].exists(&id("foo")));

    // A client read misses on the home and succeeds against the backup,
    // caching the result locally.
    assert_eq!(nodes[2].read::<String>(id("foo")).unwrap(), "v");
    assert!(nodes[2].exists(&id("foo")));

    // The home itself recovers the same way from its own miss.
    assert_eq!(nodes[0].read::<String>(id("foo")).unwrap(), "v");
    assert!(nodes[0].exists(&id("foo")));
}

#[test]
fn failed_lock_rpc_aborts_the_handle_operation() {
    let (hub, nodes) = loopback_cluster(3);

    // "foo" is homed on node 0; with it gone, the lock cannot be taken
    // and the operation must surface the failure instead of proceeding
    // with a half-locked object.
    hub.disconnect(NodeId(0));

    assert!(matches!(
        nodes[2].write_handle::<String>(id("foo")),
        Err(DsmError::Transport { .. })
    ));
    assert!(matches!(
        nodes[2].read_handle::<String>(id("foo")),
        Err(DsmError::Transport { .. })
    ));

    // Objects coordinated by the surviving pair stay usable; "baz" is
    // homed on node 1 with backup 2.
    nodes[2].write::<String>(id("baz"), "ok".to_string()).unwrap();
    assert_eq!(nodes[1].read::<String>(id("baz")).unwrap(), "ok");
}

#[test]
fn cachers_converge_after_commits() {
    let (_hub, nodes) = loopback_cluster(3);

    // "baz": home 1, backup 2. Node 0 becomes a registered cacher by
    // fetching.
    nodes[1].write::<String>(id("baz"), "v1".to_string()).unwrap();
    assert_eq!(nodes[0].read::<String>(id("baz")).unwrap(), "v1");

    // Every subsequent commit must refresh node 0's replica without
    // another fetch.
    nodes[1].write::<String>(id("baz"), "v2".to_string()).unwrap();
    assert_eq!(nodes[0].snapshot()["baz"], b"v2".to_vec());

    nodes[2].write::<String>(id("baz"), "v3".to_string()).unwrap();
    assert_eq!(nodes[0].snapshot()["baz"], b"v3".to_vec());

    // And a remove must reach it too.
    nodes[1].remove(&id("baz")).unwrap();
    assert!(!nodes[0].exists(&id("baz")));
}

#[test]
fn alternating_increments_lose_no_updates() {
    let (_hub, nodes) = loopback_cluster(2);

    // "gamma": home 0. Read-modify-write from both sides of the pair.
    for i in 0..100 {
        let node = &nodes[i % 2];
        let mut handle = node.write_handle::<i64>(id("gamma")).unwrap();
        let current = *handle;
        handle.set(current + 1).unwrap();
    }

    assert_eq!(nodes[0].read::<i64>(id("gamma")).unwrap(), 100);
    assert_eq!(nodes[1].read::<i64>(id("gamma")).unwrap(), 100);
}

#[test]
fn concurrent_increments_from_all_roles_serialize() {
    let (_hub, nodes) = loopback_cluster(3);

    // "counter": home 0, backup 1, so the three writers cover the home,
    // backup and client commit paths at once.
    const PER_NODE: i64 = 30;

    std::thread::scope(|scope| {
        for node in &nodes {
            scope.spawn(move || {
                for _ in 0..PER_NODE {
                    let mut handle = node.write_handle::<i64>(id("counter")).unwrap();
                    let current = *handle;
                    handle.set(current + 1).unwrap();
                }
            });
        }
    });

    let expected = PER_NODE * nodes.len() as i64;
    for node in &nodes {
        assert_eq!(node.read::<i64>(id("counter")).unwrap(), expected);
    }
}

#[test]
fn concurrent_readers_share_and_see_committed_value() {
    let (_hub, nodes) = loopback_cluster(3);

    nodes[0]
        .write::<String>(id("foo"), "stable".to_string())
        .unwrap();

    std::thread::scope(|scope| {
        for node in &nodes {
            for _ in 0..4 {
                scope.spawn(move || {
                    for _ in 0..20 {
                        let handle = node.read_handle::<String>(id("foo")).unwrap();
                        assert_eq!(*handle, "stable");
                    }
                });
            }
        }
    });
}

#[test]
fn snapshot_reports_roles_for_monitoring() {
    let (_hub, nodes) = loopback_cluster(3);

    nodes[1]
        .write::<String>(id("bar"), "hello".to_string())
        .unwrap();

    // Writer node 1 holds a cached replica of an object homed elsewhere.
    let snapshot = nodes[1].snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key("bar"));
    assert_eq!(nodes[1].role_for(&id("bar")), ObjectRole::Cache);
    assert_eq!(nodes[2].role_for(&id("bar")), ObjectRole::Home);
}
