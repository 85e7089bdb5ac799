//! Interactive-scrubbing demo: a three-node chain updated over a sliding
//! window, with a bounded output cache on the terminal node.
//!
//! Run with `RUST_LOG=debug` to watch the request passes.

use pullgraph::algorithms::{DilateFilter, FunctionSource, PassThrough};
use pullgraph::{Pipeline, PipelineError, StructuredExtent};

fn main() -> Result<(), PipelineError> {
    env_logger::init();

    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(FunctionSource::with_function(
        StructuredExtent::line(0, 9999),
        |x, _, _| (x * 0.01).sin(),
    ));
    let dilate = pipeline.add_node(DilateFilter::new(25));
    let sink = pipeline.add_node(PassThrough::new());
    pipeline.connect(source, 0, dilate, 0)?;
    pipeline.connect(dilate, 0, sink, 0)?;
    pipeline.set_cache_size(sink, 8)?;

    // Scrub forward, then revisit earlier windows.
    let windows: Vec<(i32, i32)> = (0..12)
        .map(|i| (i * 500, i * 500 + 99))
        .chain((8..12).map(|i| (i * 500, i * 500 + 99)))
        .collect();
    for (lo, hi) in windows {
        pipeline.set_update_extent(sink, 0, StructuredExtent::line(lo, hi))?;
        pipeline.update(sink)?;
        let data = pipeline
            .output_data(sink, 0)
            .ok_or_else(|| PipelineError::execution("no output produced"))?;
        println!("[{lo:>5}, {hi:>5}] realized {:?}", data.information().realized);
    }

    let source_runs = pipeline
        .algorithm::<FunctionSource>(source)
        .map(|s| s.executions())
        .unwrap_or(0);
    println!("source executed {source_runs} times for 16 requests");
    if let Some(stats) = pipeline.cache_stats(sink) {
        println!("cache: {}", serde_json::to_string_pretty(&stats).unwrap());
    }
    Ok(())
}
