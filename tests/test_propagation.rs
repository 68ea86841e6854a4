//! Context propagation across tasks.

mod common;

use sig::Context;

use common::fixtures::both;

#[tokio::test]
async fn test_child_unit_on_spawned_task_joins_trace() {
    let fx = both();
    let mut parent = fx.registry.start(Context::new());

    let registry = fx.registry.clone();
    let child_cx = parent.context().clone();
    tokio::spawn(async move {
        let mut child = registry.start(child_cx);
        child.info("in child", &[]);
        child.end();
    })
    .await
    .unwrap();
    parent.end();

    let spans = fx.tracer.spans();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[1].parent, Some(spans[0].context));
    assert_eq!(spans[0].context.trace_id, spans[1].context.trace_id);

    // Records carry the context of the unit that emitted them.
    let captured = fx.logger.captured();
    let child_record = captured
        .iter()
        .find(|c| c.record.body == "in child")
        .unwrap();
    assert_eq!(child_record.context.span_context(), Some(&spans[1].context));
}

#[tokio::test]
async fn test_concurrent_units_are_independent() {
    let fx = both();
    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = fx.registry.clone();
        handles.push(tokio::spawn(async move {
            let mut unit = registry.start(Context::new());
            unit.info("work", &[sig::attrs! { "task" => i }]);
            unit.end();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let spans = fx.tracer.spans();
    assert_eq!(spans.len(), 8);
    assert!(spans.iter().all(|s| s.end_calls == 1 && s.events.len() == 1));
    let mut traces: Vec<_> = spans.iter().map(|s| s.context.trace_id.to_u128()).collect();
    traces.sort();
    traces.dedup();
    assert_eq!(traces.len(), 8);
    assert_eq!(fx.logger.records().len(), 24);
}
