#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use libfuzzer_sys::fuzz_target;
use querycache::builder::CacheBuilder;
use querycache::cache::PutOutcome;

// Fuzz arbitrary operation sequences on QueryCache
//
// First byte picks the capacity; then pairs of (op, key) bytes drive put, get,
// peek, remove, invalidate and clear. Tracks accepted values against
// destructor calls so leaks and double destroys both fail.
fuzz_target!(|data: &[u8]| {
    let Some((&cap_byte, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(cap_byte % 32);

    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&destroyed);
    let cache = CacheBuilder::new(capacity)
        .destructor(move |_: u32| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .build();
    let mut accepted = 0usize;

    for pair in ops.chunks_exact(2) {
        let op = pair[0] % 7;
        let key = [pair[1] % 48];
        let value = u32::from(pair[1]);

        match op {
            0 | 1 => {
                // put
                let was_valid = cache.is_valid();
                match cache.put(&key, value) {
                    PutOutcome::Inserted { .. } | PutOutcome::Replaced => {
                        accepted += 1;
                        assert_eq!(cache.get(&key), Some(value));
                    }
                    PutOutcome::Rejected(v) => {
                        assert_eq!(v, value);
                        assert!(!was_valid || capacity == 0);
                    }
                }
            }
            2 => {
                // get
                if let Some(v) = cache.get(&key) {
                    assert!(cache.is_valid());
                    assert_eq!(v % 48, u32::from(key[0]));
                }
            }
            3 => {
                // peek (read-only)
                let before = cache.recency_order();
                let _ = cache.peek_with(&key, |v| *v);
                assert_eq!(before, cache.recency_order());
            }
            4 => {
                // remove
                let old_len = cache.len();
                if cache.remove(&key) {
                    assert_eq!(cache.len(), old_len - 1);
                    assert!(!cache.contains(&key));
                }
            }
            5 => {
                // invalidate
                cache.invalidate();
                assert!(!cache.contains(&key));
            }
            6 => {
                // clear
                cache.clear();
                assert!(cache.is_empty());
                assert!(cache.is_valid());
            }
            _ => unreachable!(),
        }

        assert!(cache.len() <= capacity);
        cache.check_invariants().unwrap();
        assert_eq!(destroyed.load(Ordering::Relaxed) + cache.len(), accepted);
    }

    drop(cache);
    assert_eq!(destroyed.load(Ordering::Relaxed), accepted);
});
