use std::sync::Arc;

use lotus::cache::FrequencyCache;
use lotus::{CacheSetting, DocId, Engine, IndexConfig, Registry, SearchRequest, TokenizeMode};

fn cached_engine(cache: CacheSetting) -> lotus::Result<Engine> {
    let config = IndexConfig::builder()
        .mode(TokenizeMode::Strict)
        .cache(cache)
        .build();
    Engine::new(config, Arc::new(Registry::new()))
}

#[test]
fn test_mutations_invalidate_cached_results() -> lotus::Result<()> {
    let mut index = cached_engine(CacheSetting::Capacity(10))?;
    index.add(1, "apple pie")?;

    assert_eq!(index.search("apple pie")?, vec![DocId::Int(1)]);
    assert_eq!(index.search("apple pie")?, vec![DocId::Int(1)]);
    assert_eq!(index.info().cached_queries, 1);

    index.remove(1)?;
    assert!(index.search("apple pie")?.is_empty());

    index.add(2, "apple pie")?;
    assert_eq!(index.search("apple pie")?, vec![DocId::Int(2)]);

    index.update(2, "cherry pie")?;
    assert!(index.search("apple pie")?.is_empty());
    assert_eq!(index.search("cherry")?, vec![DocId::Int(2)]);

    Ok(())
}

#[test]
fn test_cache_is_keyed_by_raw_query() -> lotus::Result<()> {
    let mut index = cached_engine(CacheSetting::Unbounded)?;
    for i in 0..5 {
        index.add(i, "shared")?;
    }

    assert_eq!(index.search("shared")?.len(), 5);
    // same text, so the cached result is served regardless of the limit
    assert_eq!(index.search(SearchRequest::new("shared").with_limit(2))?.len(), 5);
    // different text with the same encoding is a separate entry
    assert_eq!(index.search(SearchRequest::new("SHARED").with_limit(2))?.len(), 2);
    assert_eq!(index.info().cached_queries, 2);

    Ok(())
}

#[test]
fn test_disabled_cache_stores_nothing() -> lotus::Result<()> {
    let mut index = cached_engine(CacheSetting::Disabled)?;
    index.add(1, "plain")?;
    index.search("plain")?;
    assert_eq!(index.info().cached_queries, 0);

    Ok(())
}

#[test]
fn test_frequently_read_entries_survive_eviction() {
    let mut cache: FrequencyCache<Vec<DocId>> = FrequencyCache::new(Some(2));
    cache.set("a", vec![DocId::Int(1)]);
    cache.set("b", vec![DocId::Int(2)]);
    for _ in 0..3 {
        assert!(cache.get("a").is_some());
    }

    cache.set("c", vec![DocId::Int(3)]);
    assert!(cache.contains("a"));
    assert!(!cache.contains("b"));
    assert!(cache.contains("c"));
    assert_eq!(cache.len(), 2);
}
