use kernel_sync::{LockStats, SpinLock};
use std::panic;
use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn guard_releases_on_drop() {
    let bucket = SpinLock::named("bcache", Vec::<u32>::new());

    {
        let mut entries = bucket.lock();
        entries.push(7);
        assert!(bucket.is_locked());
        assert!(bucket.try_lock().is_none());
    }
    assert!(!bucket.is_locked());

    let entries = bucket.try_lock().expect("free after drop");
    assert_eq!(*entries, [7]);
}

#[test]
fn name_is_reported() {
    let l = SpinLock::named("kmem", ());
    assert_eq!(l.name(), "kmem");
    assert_eq!(l.stats().name, "kmem");
}

#[test]
fn stats_count_every_acquisition() {
    let l = SpinLock::named("ref", 0u32);
    *l.lock() += 1;
    *l.lock() += 1;

    let held = l.lock();
    assert!(l.try_lock().is_none(), "failed attempts are not acquisitions");
    drop(held);

    assert_eq!(
        l.stats(),
        LockStats {
            name: "ref",
            acquires: 3,
            contended: 0,
        }
    );
}

#[test]
fn waiting_for_a_held_lock_counts_as_contended() {
    let l = SpinLock::named("bcache", 0u32);
    let started = Barrier::new(2);
    let acquired = AtomicBool::new(false);

    let held = l.lock();
    thread::scope(|s| {
        s.spawn(|| {
            started.wait();
            *l.lock() += 1;
            acquired.store(true, Ordering::SeqCst);
        });
        started.wait();
        thread::sleep(Duration::from_millis(20));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(held);
    });

    assert!(acquired.load(Ordering::SeqCst));
    assert_eq!(*l.lock(), 1);
    assert_eq!(l.stats().acquires, 3);
}

#[test]
fn refcount_updates_under_contention_are_exact() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 5_000;
    const FRAMES: usize = 4;

    let refs = SpinLock::named("ref", [0u32; FRAMES]);
    let inside = AtomicBool::new(false);
    let start = Barrier::new(THREADS);

    thread::scope(|s| {
        for t in 0..THREADS {
            let (refs, inside, start) = (&refs, &inside, &start);
            s.spawn(move || {
                start.wait();
                for round in 0..ROUNDS {
                    let mut counts = refs.lock();
                    assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
                    counts[(t + round) % FRAMES] += 1;
                    inside.store(false, Ordering::SeqCst);
                    drop(counts);
                    thread::yield_now();
                }
            });
        }
    });

    let counts = *refs.lock();
    assert_eq!(counts.iter().sum::<u32>() as usize, THREADS * ROUNDS);
    let stats = refs.stats();
    assert_eq!(stats.acquires as usize, THREADS * ROUNDS + 1);
    assert!(stats.contended < stats.acquires);
}

#[test]
fn panic_while_held_still_unlocks() {
    let l = SpinLock::named("kmem", 0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let mut g = l.lock();
        *g = 123;
        panic!("kfree: double free");
    }));
    assert!(res.is_err());

    assert!(!l.is_locked());
    assert_eq!(*l.lock(), 123);
}

#[test]
fn spin_lock_is_sync_for_send_values() {
    fn assert_sync<S: Sync>(_: &S) {}
    assert_sync(&SpinLock::named("bcache", Vec::<u8>::new()));
}

#[test]
fn guard_can_be_read_from_another_thread() {
    fn assert_sync<S: Sync>(_: &S) {}
    let l = SpinLock::named("ref", [1u32; 4]);
    let g = l.lock();
    assert_sync(&g);
    let sum = thread::scope(|s| s.spawn(|| g.iter().sum::<u32>()).join().unwrap());
    assert_eq!(sum, 4);
}
