use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use querycache::registry::RegistryBuilder;
use tracing_subscriber::EnvFilter;

fn main() {
    // RUST_LOG=querycache=debug shows namespace lifecycle events
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let registry = RegistryBuilder::new(128)
        .namespace_capacity("audit", 1)
        .destructor(move |_rows: Vec<u64>| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .build();

    let social = registry.get_or_create("social");
    let _ = social.put("MATCH (a)-[:KNOWS]->(b) RETURN count(b)", vec![42]);

    let audit = registry.get_or_create("audit");
    let _ = audit.put("MATCH (e:Event) RETURN e.id", vec![1, 2, 3]);
    let _ = audit.put("MATCH (u:User) RETURN u.id", vec![7]);
    println!("audit holds {} of {}", audit.len(), audit.capacity());

    // a graph write: stop serving, mutate, then resume
    registry.invalidate("social");
    println!("social valid during write? {}", social.is_valid());
    registry.clear("social");

    registry.rename("audit", "audit_archive");
    println!("namespaces: {:?}", registry.namespaces());

    registry.remove("audit_archive");
    println!("values released: {}", released.load(Ordering::Relaxed));
}

// Expected output:
// audit holds 1 of 1
// social valid during write? false
// namespaces: ["audit_archive", "social"]
// values released: 3
//
// Explanation: the audit cache has capacity 1, so its second put evicts the
// first (1 release). Clearing social releases its entry (2), and removing
// the renamed audit cache tears it down (3).
