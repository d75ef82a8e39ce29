//! Integration tests for the meridian-notify crate.
//!
//! These tests exercise wait-sets and listeners across threads together with
//! the bundled attachable sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use meridian_notify::{
    Listener, NotificationCallback, NotifyError, NotifyingQueue, QueueEvent, UserTrigger, WaitSet,
    create_notification_callback, create_notification_callback_with_context,
};

fn noop(_: &UserTrigger) {}

fn bump(_: &UserTrigger, counter: &AtomicU32) {
    counter.fetch_add(1, Ordering::SeqCst);
}

fn drain_and_sum(queue: &NotifyingQueue<u32>, total: &AtomicU32) {
    while let Some(value) = queue.pop() {
        total.fetch_add(value, Ordering::SeqCst);
    }
}

struct Progress {
    entered: AtomicBool,
    finished: AtomicBool,
}

fn slow_callback(_: &UserTrigger, progress: &Progress) {
    progress.entered.store(true, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    progress.finished.store(true, Ordering::SeqCst);
}

fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════
//  WaitSet
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn wait_set_wakes_on_trigger_from_other_thread() {
    let wait_set = WaitSet::new();
    let trigger = Arc::new(UserTrigger::new());
    wait_set
        .attach_event(&trigger, (), 42, create_notification_callback(noop))
        .unwrap();

    let remote = Arc::clone(&trigger);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.trigger();
    });

    let fired = wait_set.wait();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].notification_id(), 42);
    assert!(fired[0].originates_from(&trigger));
    handle.join().unwrap();
}

#[test]
fn wait_set_never_invokes_callbacks_itself() {
    let wait_set = WaitSet::new();
    let trigger = Arc::new(UserTrigger::new());
    let counter = Arc::new(AtomicU32::new(0));
    wait_set
        .attach_event(
            &trigger,
            (),
            0,
            create_notification_callback_with_context(bump, Arc::clone(&counter)),
        )
        .unwrap();

    trigger.trigger();
    let fired = wait_set.timed_wait(Duration::from_secs(1));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    for notification in &fired {
        assert!(notification.call());
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn wait_set_same_source_under_different_events() {
    let wait_set = WaitSet::new();
    let queue = Arc::new(NotifyingQueue::<u32>::new(4));
    let trigger = Arc::new(UserTrigger::new());

    wait_set
        .attach_event(
            &queue,
            QueueEvent::DataReceived,
            1,
            NotificationCallback::new(|_: &NotifyingQueue<u32>| {}),
        )
        .unwrap();
    let duplicate = wait_set.attach_event(
        &queue,
        QueueEvent::DataReceived,
        2,
        NotificationCallback::new(|_: &NotifyingQueue<u32>| {}),
    );
    assert!(matches!(duplicate, Err(NotifyError::AlreadyAttached { .. })));

    // A different source with the same numeric event id is a different attachment.
    wait_set
        .attach_event(&trigger, (), 3, create_notification_callback(noop))
        .unwrap();
    assert_eq!(wait_set.size(), 2);
}

#[test]
fn wait_set_reports_level_triggered_queue_until_drained() {
    let wait_set = WaitSet::new();
    let queue = Arc::new(NotifyingQueue::new(4));
    wait_set
        .attach_event(
            &queue,
            QueueEvent::DataReceived,
            0,
            NotificationCallback::new(|_: &NotifyingQueue<&str>| {}),
        )
        .unwrap();

    queue.push("sample").unwrap();
    assert_eq!(wait_set.timed_wait(Duration::from_secs(1)).len(), 1);
    // Still non-empty: reported again without a new push.
    assert_eq!(wait_set.timed_wait(Duration::from_millis(10)).len(), 1);

    queue.pop();
    assert!(wait_set.timed_wait(Duration::from_millis(10)).is_empty());
}

#[test]
fn notification_call_after_detach_is_refused() {
    let wait_set = WaitSet::new();
    let trigger = Arc::new(UserTrigger::new());
    wait_set
        .attach_event(&trigger, (), 0, create_notification_callback(noop))
        .unwrap();

    trigger.trigger();
    let fired = wait_set.timed_wait(Duration::from_secs(1));
    assert_eq!(fired.len(), 1);

    wait_set.detach_event(&trigger, ());
    assert!(!fired[0].call());
}

// ═══════════════════════════════════════════════════════════════════════
//  Listener
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn listener_panicking_callback_does_not_skip_others() {
    let listener = Listener::new().unwrap();
    let failing = Arc::new(UserTrigger::new());
    let healthy = Arc::new(UserTrigger::new());
    let counter = Arc::new(AtomicU32::new(0));

    listener
        .attach_event(
            &failing,
            (),
            NotificationCallback::new(|_: &UserTrigger| panic!("callback failure")),
        )
        .unwrap();
    listener
        .attach_event(
            &healthy,
            (),
            create_notification_callback_with_context(bump, Arc::clone(&counter)),
        )
        .unwrap();

    failing.trigger();
    healthy.trigger();
    assert!(eventually(|| counter.load(Ordering::SeqCst) == 1));

    // The listener keeps serving after the panic.
    healthy.trigger();
    assert!(eventually(|| counter.load(Ordering::SeqCst) == 2));
}

#[test]
fn listener_detach_waits_for_in_flight_callback() {
    let listener = Listener::new().unwrap();
    let trigger = Arc::new(UserTrigger::new());
    let progress = Arc::new(Progress {
        entered: AtomicBool::new(false),
        finished: AtomicBool::new(false),
    });

    listener
        .attach_event(
            &trigger,
            (),
            create_notification_callback_with_context(slow_callback, Arc::clone(&progress)),
        )
        .unwrap();

    trigger.trigger();
    assert!(eventually(|| progress.entered.load(Ordering::SeqCst)));

    listener.detach_event(&trigger, ());
    assert!(progress.finished.load(Ordering::SeqCst));
}

#[test]
fn listener_callback_may_detach_itself() {
    let listener = Arc::new(Listener::new().unwrap());
    let trigger = Arc::new(UserTrigger::new());
    let counter = Arc::new(AtomicU32::new(0));

    struct Context {
        listener: std::sync::Weak<Listener>,
        counter: Arc<AtomicU32>,
    }

    let context = Arc::new(Context {
        listener: Arc::downgrade(&listener),
        counter: Arc::clone(&counter),
    });
    let weak_trigger = Arc::downgrade(&trigger);

    listener
        .attach_event(
            &trigger,
            (),
            NotificationCallback::new(move |_: &UserTrigger| {
                context.counter.fetch_add(1, Ordering::SeqCst);
                if let (Some(listener), Some(trigger)) =
                    (context.listener.upgrade(), weak_trigger.upgrade())
                {
                    listener.detach_event(&trigger, ());
                }
            }),
        )
        .unwrap();

    trigger.trigger();
    assert!(eventually(|| counter.load(Ordering::SeqCst) == 1));
    assert!(eventually(|| listener.size() == 0));

    trigger.trigger();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn listener_drains_queue_in_callback() {
    let listener = Listener::new().unwrap();
    let queue = Arc::new(NotifyingQueue::new(16));
    let received = Arc::new(AtomicU32::new(0));

    listener
        .attach_event(
            &queue,
            QueueEvent::DataReceived,
            create_notification_callback_with_context(drain_and_sum, Arc::clone(&received)),
        )
        .unwrap();

    for value in 1..=4 {
        queue.push(value).unwrap();
    }
    assert!(eventually(|| received.load(Ordering::SeqCst) == 10));
    assert!(queue.is_empty());
}

#[test]
fn dropping_source_detaches_from_listener() {
    let listener = Listener::new().unwrap();
    let trigger = Arc::new(UserTrigger::new());
    listener
        .attach_event(&trigger, (), create_notification_callback(noop))
        .unwrap();
    assert_eq!(listener.size(), 1);

    drop(trigger);
    assert_eq!(listener.size(), 0);
}
