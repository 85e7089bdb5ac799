//! The bounded output cache wrapping a node's execution.

use pullgraph::algorithms::{FunctionSource, PassThrough};
use pullgraph::{Pipeline, StructuredExtent};

fn cached_chain(cache_size: usize) -> (Pipeline, pullgraph::NodeId, pullgraph::NodeId) {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(FunctionSource::new(StructuredExtent::line(0, 999)));
    let sink = pipeline.add_node(PassThrough::new());
    pipeline.connect(source, 0, sink, 0).unwrap();
    pipeline.set_cache_size(sink, cache_size).unwrap();
    (pipeline, source, sink)
}

fn source_executions(pipeline: &Pipeline, id: pullgraph::NodeId) -> u64 {
    pipeline
        .algorithm::<FunctionSource>(id)
        .expect("source node")
        .executions()
}

fn request(pipeline: &mut Pipeline, sink: pullgraph::NodeId, lo: i32, hi: i32) {
    pipeline
        .set_update_extent(sink, 0, StructuredExtent::line(lo, hi))
        .unwrap();
    pipeline.update(sink).unwrap();
}

#[test]
fn a_repeated_request_is_served_from_cache_without_touching_upstream() {
    let (mut pipeline, source, sink) = cached_chain(2);
    request(&mut pipeline, sink, 0, 9);
    request(&mut pipeline, sink, 100, 109);
    assert_eq!(source_executions(&pipeline, source), 2);

    // Back to the first window: a hit, nothing executes.
    request(&mut pipeline, sink, 0, 9);
    assert_eq!(source_executions(&pipeline, source), 2);
    let stats = pipeline.cache_stats(sink).unwrap();
    assert_eq!(stats.hits, 1);
}

#[test]
fn eviction_follows_insertion_order() {
    let (mut pipeline, source, sink) = cached_chain(2);
    // K1, K2, K3: the ring holds {K2, K3} afterwards.
    request(&mut pipeline, sink, 0, 9);
    request(&mut pipeline, sink, 100, 109);
    request(&mut pipeline, sink, 200, 209);
    assert_eq!(source_executions(&pipeline, source), 3);

    // K1 was evicted: miss, re-execute; and its insertion evicts K2.
    request(&mut pipeline, sink, 0, 9);
    assert_eq!(source_executions(&pipeline, source), 4);

    // K3 survived both evictions.
    request(&mut pipeline, sink, 200, 209);
    assert_eq!(source_executions(&pipeline, source), 4);

    // K2 is gone.
    request(&mut pipeline, sink, 100, 109);
    assert_eq!(source_executions(&pipeline, source), 5);
}

#[test]
fn upstream_modification_invalidates_cached_entries() {
    let (mut pipeline, source, sink) = cached_chain(4);
    request(&mut pipeline, sink, 0, 9);
    request(&mut pipeline, sink, 0, 9);
    assert_eq!(source_executions(&pipeline, source), 1);

    pipeline.touch(source).unwrap();
    request(&mut pipeline, sink, 0, 9);
    assert_eq!(
        source_executions(&pipeline, source),
        2,
        "a stale cache entry must not satisfy the request"
    );
}

#[test]
fn resizing_drops_all_cached_entries() {
    let (mut pipeline, source, sink) = cached_chain(4);
    request(&mut pipeline, sink, 0, 9);
    request(&mut pipeline, sink, 100, 109);
    assert_eq!(pipeline.cache_size(sink), 4);

    pipeline.set_cache_size(sink, 8).unwrap();
    assert_eq!(pipeline.cache_size(sink), 8);

    // Both earlier results were dropped with the ring. The sink still holds
    // its latest output, so only the non-current window re-executes.
    request(&mut pipeline, sink, 100, 109);
    assert_eq!(source_executions(&pipeline, source), 2);
    request(&mut pipeline, sink, 0, 9);
    assert_eq!(source_executions(&pipeline, source), 3);
}

#[test]
fn a_superset_already_held_beats_the_cache() {
    let (mut pipeline, source, sink) = cached_chain(2);
    request(&mut pipeline, sink, 0, 99);
    // Subsets are satisfied by the held data before the cache is consulted.
    request(&mut pipeline, sink, 10, 20);
    request(&mut pipeline, sink, 40, 45);
    assert_eq!(source_executions(&pipeline, source), 1);
    let stats = pipeline.cache_stats(sink).unwrap();
    assert_eq!(stats.hits, 0);
}
