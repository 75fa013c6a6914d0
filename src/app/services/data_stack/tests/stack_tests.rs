use crate::app::services::data_stack::DataStack;
use crate::config::StackConfig;
use serde_json::json;

fn keep_all(_: &serde_json::Value) -> Result<(), String> {
    Ok(())
}

fn stack(max_size: usize) -> DataStack {
    DataStack::new(&StackConfig {
        max_size,
        auto_process: false,
        process_threshold: max_size,
    })
}

#[test]
fn test_push_respects_capacity() {
    let mut stack = stack(3);

    for i in 0..3 {
        let outcome = stack.push(json!({"timestamp": i}), keep_all);
        assert!(outcome.accepted);
    }
    assert!(stack.is_full());
    assert_eq!(stack.len(), 3);

    // Rejected push leaves the buffer untouched
    let outcome = stack.push(json!({"timestamp": 99}), keep_all);
    assert!(!outcome.accepted);
    assert_eq!(stack.len(), 3);
    assert_eq!(stack.peek().unwrap()["timestamp"], 2);
}

#[test]
fn test_peek_and_pop_are_lifo() {
    let mut stack = stack(10);
    stack.push(json!({"n": 1}), keep_all);
    stack.push(json!({"n": 2}), keep_all);
    stack.push(json!({"n": 3}), keep_all);

    assert_eq!(stack.peek().unwrap()["n"], 3);
    assert_eq!(stack.len(), 3, "peek must not mutate");

    assert_eq!(stack.pop().unwrap()["n"], 3);
    assert_eq!(stack.pop().unwrap()["n"], 2);
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_flush_drains_fifo() {
    let mut stack = stack(10);
    for n in [1, 2, 3] {
        stack.push(json!({"n": n}), keep_all);
    }

    let mut seen = Vec::new();
    let mut sink = |item: &serde_json::Value| {
        seen.push(item["n"].as_i64().unwrap());
        Ok(())
    };
    let outcome = stack.flush(&mut sink);

    // Oldest first, buffer left empty
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(outcome.drained, 3);
    assert_eq!(outcome.persisted, 3);
    assert_eq!(outcome.failed, 0);
    assert!(stack.is_empty());
}

#[test]
fn test_flush_empties_even_when_items_fail() {
    let mut stack = stack(10);
    for n in [1, 2, 3, 4] {
        stack.push(json!({"n": n}), keep_all);
    }

    let mut sink = |item: &serde_json::Value| {
        if item["n"].as_i64().unwrap() % 2 == 0 {
            Err("conversion failed".to_string())
        } else {
            Ok(())
        }
    };
    let outcome = stack.flush(&mut sink);

    assert_eq!(outcome.drained, 4);
    assert_eq!(outcome.persisted, 2);
    assert_eq!(outcome.failed, 2);
    assert!(stack.is_empty(), "flush must always empty the buffer");
}

#[test]
fn test_auto_process_fires_at_threshold() {
    let mut stack = DataStack::new(&StackConfig {
        max_size: 1000,
        auto_process: true,
        process_threshold: 5,
    });

    let mut persisted = 0usize;
    for i in 0..4 {
        let outcome = stack.push(json!({"n": i}), |_| {
            persisted += 1;
            Ok(())
        });
        assert!(outcome.flush.is_none(), "must not flush below threshold");
    }
    assert_eq!(stack.len(), 4);

    // Fifth push crosses the threshold and flushes synchronously
    let outcome = stack.push(json!({"n": 4}), |_| {
        persisted += 1;
        Ok(())
    });
    let flush = outcome.flush.expect("threshold push must flush");
    assert_eq!(flush.drained, 5);
    assert_eq!(persisted, 5);
    assert!(stack.is_empty());

    // Sixth push starts a fresh accumulation cycle
    let outcome = stack.push(json!({"n": 5}), |_| {
        persisted += 1;
        Ok(())
    });
    assert!(outcome.flush.is_none());
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_clear_discards_without_persisting() {
    let mut stack = stack(10);
    stack.push(json!({"n": 1}), keep_all);
    stack.push(json!({"n": 2}), keep_all);

    stack.clear();
    assert!(stack.is_empty());
}

#[test]
fn test_info_snapshot() {
    let mut stack = DataStack::new(&StackConfig {
        max_size: 8,
        auto_process: true,
        process_threshold: 6,
    });

    let info = stack.info();
    assert_eq!(info.stack_size, 0);
    assert_eq!(info.max_stack_size, 8);
    assert!(info.last_data_feed.is_none());
    assert!(info.latest_data.is_none());

    stack.push(json!({"temperature": 20.5}), keep_all);
    let info = stack.info();
    assert_eq!(info.stack_size, 1);
    assert!(info.auto_process);
    assert_eq!(info.process_threshold, 6);
    assert!(info.last_data_feed.is_some());
    assert_eq!(info.latest_data.unwrap()["temperature"], 20.5);
}
