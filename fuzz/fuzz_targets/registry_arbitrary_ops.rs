#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use querycache::registry::CacheRegistry;

// Fuzz arbitrary operation sequences on CacheRegistry
//
// Tests random sequences of get_or_create, remove, rename, invalidate and
// clear across a small namespace pool, checking handle identity and the
// removed-handle teardown contract.
fuzz_target!(|data: &[u8]| {
    let registry: CacheRegistry<u8> = CacheRegistry::new(4);
    let names = ["g0", "g1", "g2", "g3"];

    for chunk in data.chunks_exact(3) {
        let op = chunk[0] % 6;
        let name = names[usize::from(chunk[1] % 4)];
        let other = names[usize::from(chunk[2] % 4)];

        match op {
            0 => {
                let a = registry.get_or_create(name);
                let b = registry.get_or_create(name);
                assert!(Arc::ptr_eq(&a, &b));
                let _ = a.put(&[chunk[2]], chunk[2]);
            }
            1 => {
                let handle = registry.get(name);
                let removed = registry.remove(name);
                assert_eq!(removed, handle.is_some());
                if let Some(handle) = handle {
                    assert!(!handle.is_valid());
                    assert!(handle.is_empty());
                }
                assert!(!registry.contains(name));
            }
            2 => {
                let had_from = registry.contains(name);
                let had_to = registry.contains(other);
                let renamed = registry.rename(name, other);
                assert_eq!(renamed, had_from && !had_to);
                if renamed {
                    assert!(registry.contains(other));
                    assert!(!registry.contains(name));
                }
            }
            3 => {
                assert_eq!(registry.invalidate(name), registry.contains(name));
            }
            4 => {
                if let Some(cache) = registry.get(name) {
                    let len = cache.len();
                    assert_eq!(registry.clear(name), Some(len));
                    assert!(cache.is_valid());
                }
            }
            5 => {
                registry.clear_all();
                for ns in registry.namespaces() {
                    assert!(registry.get(&ns).is_some_and(|c| c.is_empty()));
                }
            }
            _ => unreachable!(),
        }

        assert!(registry.len() <= names.len());
    }
});
