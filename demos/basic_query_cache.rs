use querycache::cache::{PutOutcome, QueryCache};

fn main() {
    let cache: QueryCache<Vec<&str>> = QueryCache::new(2);

    let _ = cache.put("MATCH (p:Person) RETURN p.name", vec!["alice", "bob"]);
    let _ = cache.put("MATCH (c:City) RETURN c.name", vec!["oslo"]);

    if let Some(rows) = cache.get("MATCH (p:Person) RETURN p.name") {
        println!("hit people: {rows:?}");
    }

    let outcome = cache.put("MATCH (n) RETURN count(n)", vec!["3"]);
    println!("inserted, evicted = {}", outcome == PutOutcome::Inserted { evicted: true });
    println!(
        "cities cached? {}",
        cache.contains("MATCH (c:City) RETURN c.name")
    );

    cache.invalidate();
    println!(
        "people after invalidate: {:?}",
        cache.get("MATCH (p:Person) RETURN p.name")
    );

    let destroyed = cache.clear();
    println!("cleared {destroyed} entries, valid = {}", cache.is_valid());
}

// Expected output:
// hit people: ["alice", "bob"]
// inserted, evicted = true
// cities cached? false
// people after invalidate: None
// cleared 2 entries, valid = true
//
// Explanation: capacity=2; the get promotes the Person query to MRU, so the
// third put evicts the City query. invalidate() hides entries without
// destroying them; clear() destroys both and makes the cache usable again.
