use beacon::{Beacon, CreateError, InitError, Options, Placement, SpawnHints};
use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test_log::test]
fn test_task_placement_requires_runtime() {
    let err = Beacon::create((), Options::default()).unwrap_err();
    assert!(matches!(err, CreateError::Init(InitError::NoRuntime)));
}

#[test_log::test]
fn test_thread_placement_without_runtime() {
    let (tx, rx) = mpsc::channel();
    let options = Options::builder()
        .name("placement-thread")
        .hints(SpawnHints::builder().placement(Placement::Thread).build())
        .build();
    let beacon = Beacon::create(42_u32, options).unwrap();
    let periodic_tx = tx.clone();
    beacon
        .set_periodic_callback(Duration::from_millis(10), move |target| {
            let _ = periodic_tx.send(("periodic", *target, thread::current().name().map(String::from)));
        })
        .set_cancel_callback(move |target| {
            let _ = tx.send(("cancel", *target, thread::current().name().map(String::from)));
        })
        .enable();

    let (kind, target, thread_name) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(kind, "periodic");
    assert_eq!(target, 42);
    assert_eq!(thread_name.as_deref(), Some("bcn-placement-thread"));

    beacon.cancel();
    let cancelled = rx
        .iter()
        .find(|(kind, _, _)| *kind == "cancel")
        .expect("cancel callback should run");
    assert_eq!(cancelled.1, 42);

    let deadline = Instant::now() + TIMEOUT;
    while beacon.is_alive() {
        assert!(Instant::now() < deadline, "beacon thread didn't exit");
        thread::sleep(Duration::from_millis(1));
    }
    assert!(Beacon::<u32>::whereis("placement-thread").is_none());
}

#[test_log::test(tokio::test)]
async fn test_custom_thread_name() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let options = Options::builder()
        .hints(
            SpawnHints::builder()
                .placement(Placement::Thread)
                .thread_name("heartbeat")
                .build(),
        )
        .build();
    let beacon = Beacon::create((), options).unwrap();
    beacon
        .set_duration_with_callback(Duration::from_millis(5), move |_| {
            let _ = tx.send(thread::current().name().map(String::from));
        })
        .enable();

    beacon.terminated().await;
    assert_eq!(rx.recv().await.flatten().as_deref(), Some("heartbeat"));
}
