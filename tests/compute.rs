use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use launch_window::compute::{ComputeFacility, ManualFacility, TaskLabel, ThreadPoolFacility};

#[test]
fn manual_facility_runs_only_when_driven() {
    let facility = ManualFacility::<u64>::new();
    let seen = Arc::new(AtomicUsize::new(0));

    for tag in 0..4u64 {
        let seen = Arc::clone(&seen);
        facility.submit(
            "grid-scan",
            tag % 2,
            Box::new(move || tag * 10),
            Box::new(move |value| {
                seen.fetch_add(value as usize, Ordering::SeqCst);
            }),
        );
    }
    assert_eq!(facility.pending(), 4);
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    let cancelled =
        facility.cancel_where(&|label: &TaskLabel| label.topic == "grid-scan" && label.tag == 1);
    assert_eq!(cancelled, 2);
    let queued = facility.queued();
    assert!(queued.iter().all(|label| label.tag == 0));

    assert!(facility.run_task(queued[1].id));
    assert_eq!(seen.load(Ordering::SeqCst), 20);
    assert!(!facility.run_task(queued[1].id));
    assert_eq!(facility.run_all(), 1);
    assert!(!facility.run_next());
    assert_eq!(seen.load(Ordering::SeqCst), 20);
}

#[test]
fn cancel_ignores_other_topics() {
    let facility = ManualFacility::<()>::new();
    facility.submit("grid-scan", 7, Box::new(|| ()), Box::new(|_| ()));
    facility.submit("preview", 7, Box::new(|| ()), Box::new(|_| ()));
    assert_eq!(
        facility.cancel_where(&|label: &TaskLabel| label.topic == "grid-scan" && label.tag == 7),
        1
    );
    assert_eq!(facility.queued()[0].topic, "preview");
}

#[test]
fn thread_pool_delivers_every_result() {
    let facility = ThreadPoolFacility::<usize>::new(Some(3)).expect("pool");
    assert_eq!(facility.threads(), 3);
    let (tx, rx) = mpsc::channel();

    for i in 0..32 {
        let tx = tx.clone();
        facility.submit(
            "grid-scan",
            1,
            Box::new(move || i * i),
            Box::new(move |value| {
                tx.send(value).expect("receiver alive");
            }),
        );
    }
    drop(tx);

    let mut results: Vec<usize> = (0..32)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).expect("result"))
        .collect();
    results.sort_unstable();
    assert_eq!(results, (0..32).map(|i| i * i).collect::<Vec<_>>());
    assert_eq!(facility.pending(), 0);
}
