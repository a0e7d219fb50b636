use kernel_sync::{CriticalSection, InterruptControl, SpinLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn lock_releases_on_guard_drop() {
    let l = SpinLock::new(0_u32);

    {
        let mut g = l.lock();
        *g = 41;
        assert!(l.is_locked());
    }

    assert!(!l.is_locked());
    let mut g = l.lock();
    *g += 1;
    assert_eq!(*g, 42);
}

#[test]
fn try_lock_fails_while_held() {
    let l = SpinLock::new(1u8);

    let g1 = l.try_lock();
    assert!(g1.is_some());
    assert!(l.try_lock().is_none());

    // A failed try_lock must not release the holder's lock.
    assert!(l.is_locked());

    drop(g1);
    assert!(l.try_lock().is_some());
}

#[test]
fn with_lock_works_and_unlocks() {
    let l = SpinLock::new(Vec::<u32>::new());
    let len = l.with_lock(|v| {
        v.push(0x6100_0000);
        v.len()
    });
    assert_eq!(len, 1);
    assert_eq!(l.with_lock(|v| v[0]), 0x6100_0000);
}

#[test]
fn get_mut_and_into_inner() {
    let mut l = SpinLock::new(vec![1, 2, 3]);
    l.get_mut().push(4);
    assert_eq!(l.into_inner(), [1, 2, 3, 4]);
}

#[test]
fn contended_frame_counter_is_exact() {
    let threads = 8;
    let iters = 5_000;

    let lock = Arc::new(SpinLock::new(0usize));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let in_cs = Arc::clone(&in_cs);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for _ in 0..iters {
                    lock.with_lock(|v| {
                        let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(prev, 0, "mutual exclusion violated");
                        *v += 1;
                        in_cs.fetch_sub(1, Ordering::SeqCst);
                    });
                    thread::yield_now();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(lock.with_lock(|v| *v), threads * iters);
}

#[test]
fn lock_is_released_on_panic() {
    let l = SpinLock::new(0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err(), "expected panic");
    assert_eq!(l.with_lock(|v| *v), 123);
}

/// Single-core interrupt mask backed by an atomic so it can be shared.
struct AtomicIrq {
    masked: AtomicBool,
}

impl InterruptControl for AtomicIrq {
    type State = bool;

    fn save_and_disable(&self) -> bool {
        self.masked.swap(true, Ordering::SeqCst)
    }

    unsafe fn restore(&self, state: bool) {
        self.masked.store(state, Ordering::SeqCst);
    }
}

#[test]
fn lock_inside_critical_section_leaves_mask_to_the_section() {
    let irq = AtomicIrq {
        masked: AtomicBool::new(false),
    };
    let l = SpinLock::new(0u8);

    {
        let _cs = CriticalSection::enter(&irq);
        {
            let mut g = l.lock();
            *g = 1;
        }
        assert!(!l.is_locked());
        assert!(irq.masked.load(Ordering::SeqCst));
    }
    assert!(!irq.masked.load(Ordering::SeqCst));
}

#[test]
fn spinlock_is_sync_for_send_t() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let l = SpinLock::new(0u8);
    takes_sync(&l);
}
