// SPDX-License-Identifier: MIT OR Apache-2.0
//! Behavioral tests for the error value model: trait bounds, immutability,
//! message and context semantics, adapters, stack capture, and interop.

use std::error::Error as StdError;
use std::io;

use fl_error::{
    Canceled, Code, DeadlineExceeded, Error, Fault, Joined, Limits, ResultExt, Stack, TypedField,
    bad_request, builtin_codes, convert, defect, internal, interrupt, interrupt_deadline, kv,
    not_found, recode, timeout, with, with_stack, with_stack_skipping, wrap,
};
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────────

fn assert_send_sync_static<T: Send + Sync + 'static>() {}

fn assert_std_error<T: StdError>() {}

const NONE: Option<Error> = None;

/// Snapshot of every observable property of an error.
fn observe(e: &Error) -> (String, Code, String, Option<String>, Option<Stack>) {
    (
        e.message().to_owned(),
        e.code(),
        format!("{:?}", e.fields()),
        Fault::cause(e).map(|c| c.to_string()),
        e.stack().cloned(),
    )
}

/// Round-trip through anyhow::Error and back via downcast.
fn check_anyhow_roundtrip<E: StdError + Send + Sync + 'static + Clone>(err: E) {
    let anyhow_err: anyhow::Error = anyhow::Error::new(err.clone());
    let display_before = err.to_string();
    assert_eq!(display_before, anyhow_err.to_string());
    let downcasted = anyhow_err
        .downcast_ref::<E>()
        .expect("downcast should succeed");
    assert_eq!(downcasted.to_string(), display_before);
}

// =========================================================================
// Bounds
// =========================================================================

#[test]
fn public_types_are_thread_safe_errors() {
    assert_send_sync_static::<Error>();
    assert_send_sync_static::<Joined>();
    assert_send_sync_static::<Stack>();
    assert_send_sync_static::<Limits>();
    assert_send_sync_static::<TypedField<String>>();
    assert_std_error::<Error>();
    assert_std_error::<Joined>();
    assert_std_error::<Canceled>();
    assert_std_error::<DeadlineExceeded>();
    assert_std_error::<fl_error::FieldError>();
}

// =========================================================================
// Immutability
// =========================================================================

#[test]
fn fluent_operations_never_alter_the_receiver() {
    let bases = [
        not_found("user", 42).with_field("a", 1),
        defect(Some(io::Error::other("boom"))),
        interrupt("stop").with_field("a", 1),
        internal(Some(io::Error::other("io"))),
    ];
    for base in bases {
        let before = observe(&base);
        let _ = base.add_context("m", kv!("k", 1));
        let _ = base.add_context_bounded("m", 1, kv!("k", 1, "j", 2));
        let _ = base.with_field("x", "y");
        let _ = base.with_message("replaced");
        let _ = base.append_message("more");
        let _ = base.reclassify(Code::CONFLICT);
        let _ = base.capture_stack();
        let _ = base.capture_stack_skipping(2);
        let mut snapshot = base.context();
        snapshot.insert("injected".into(), json!(true));
        assert_eq!(observe(&base), before, "receiver changed: {base}");
        assert!(!base.context().contains_key("injected"));
    }
}

#[test]
fn fixed_classifications_survive_reclassify() {
    for code in builtin_codes().into_iter().chain([Code::new("custom"), Code::default()]) {
        assert_eq!(defect(NONE).reclassify(code.clone()).code(), Code::DEFECT);
        assert_eq!(interrupt("x").reclassify(code.clone()).code(), Code::INTERRUPT);
        assert_eq!(not_found("x", 1).reclassify(code.clone()).code(), code);
    }
}

// =========================================================================
// Message and context
// =========================================================================

#[test]
fn message_is_set_once_by_add_context() {
    let e = bad_request("")
        .add_context("first", kv!())
        .add_context("second", kv!());
    assert_eq!(e.message(), "first");
}

#[test]
fn append_message_is_the_only_concatenation() {
    let e = bad_request("base").append_message("one").append_message("two");
    assert_eq!(e.message(), "base: one: two");
}

#[test]
fn context_order_and_last_write_wins() {
    let e = bad_request("x")
        .with_field("k1", 1)
        .with_field("k2", 2)
        .with_field("k1", 3);
    let map = e.context();
    assert_eq!(map.len(), 2);
    assert_eq!(map["k1"], json!(3));
    assert_eq!(map["k2"], json!(2));
    let ordered: Vec<_> = e
        .fields()
        .iter()
        .map(|f| (f.key.as_str(), f.value.clone()))
        .collect();
    assert_eq!(
        ordered,
        [("k1", json!(1)), ("k2", json!(2)), ("k1", json!(3))]
    );
}

#[test]
fn bounded_context_keeps_most_recent_insertions() {
    let e = bad_request("x")
        .with_field("a", 1)
        .with_field("b", 2)
        .with_field("a", 3)
        .add_context_bounded("", 2, kv!("c", 4));
    let ordered: Vec<_> = e.fields().iter().map(|f| f.key.as_str()).collect();
    assert_eq!(ordered, ["a", "c"]);
    assert_eq!(e.context()["a"], json!(3));
}

#[test]
fn malformed_kv_is_tolerated() {
    let e = bad_request("x").add_context("", kv!(1, "dropped", "ok", true, "dangling"));
    let map = e.context();
    assert_eq!(map.len(), 2);
    assert_eq!(map["ok"], json!(true));
    assert_eq!(map["dangling"], serde_json::Value::Null);
}

#[test]
fn structured_values_are_kept() {
    #[derive(serde::Serialize)]
    struct Req<'a> {
        path: &'a str,
        retries: u8,
    }
    let e = bad_request("x").with_field("req", Req { path: "/a", retries: 2 });
    assert_eq!(e.context()["req"], json!({"path": "/a", "retries": 2}));
}

// =========================================================================
// Adapters
// =========================================================================

#[test]
fn conversion_versus_wrapping_of_none() {
    assert!(convert(NONE).is_none());
    assert_eq!(wrap(NONE, "m", kv!()).message(), "m");
    assert_eq!(with(NONE, "k", 1).message(), "error");
    assert_eq!(recode(NONE, Code::TIMEOUT).code(), Code::TIMEOUT);
    assert!(with_stack(NONE).stack().is_some());
}

#[test]
fn foreign_causes_are_never_swallowed() {
    let adapters: Vec<Error> = vec![
        convert(Some(io::Error::other("root"))).unwrap(),
        wrap(Some(io::Error::other("root")), "m", kv!()),
        with(Some(io::Error::other("root")), "k", 1),
        recode(Some(io::Error::other("root")), Code::UNAVAILABLE),
        with_stack(Some(io::Error::other("root"))),
        internal(Some(io::Error::other("root"))),
        defect(Some(io::Error::other("root"))),
    ];
    for e in adapters {
        let leaf = fl_error::root(Some(&e)).expect("has a root");
        assert_eq!(leaf.to_string(), "root", "lost cause in {e}");
        assert!(leaf.downcast_ref::<io::Error>().is_some());
    }
}

#[test]
fn result_ext_composes_with_question_mark() {
    fn read(path: &str) -> Result<String, Error> {
        let body = std::fs::read_to_string(path).wrap_err("read", kv!("path", path))?;
        Ok(body)
    }
    let e = read("/nonexistent/faultline/file").unwrap_err();
    assert_eq!(e.message(), "read");
    assert_eq!(e.context()["path"], json!("/nonexistent/faultline/file"));
    assert!(StdError::source(&e).unwrap().is::<io::Error>());
}

#[test]
fn timeout_and_interrupt_are_distinct() {
    let t = timeout(std::time::Duration::from_millis(250));
    assert!(!fl_error::is_interrupt(Some(&t)));
    assert!(fl_error::is_retryable(Some(&t)));
    let d = interrupt_deadline("late");
    assert!(fl_error::is_interrupt(Some(&d)));
    assert!(!fl_error::is_retryable(Some(&d)));
}

// =========================================================================
// Stack capture
// =========================================================================

#[inline(never)]
fn capture_here(skip: usize) -> Error {
    with_stack_skipping(NONE, skip)
}

#[inline(never)]
fn via_helper(skip: usize) -> Error {
    capture_here(skip)
}

#[inline(never)]
fn capture_native_here(skip: usize) -> Error {
    with_stack_skipping(Some(not_found("x", 1)), skip)
}

fn symbolized(stack: &Stack, needle: &str) -> bool {
    stack.iter().any(|f| f.function.contains(needle))
}

#[test]
fn stack_starts_at_the_caller() {
    let e = via_helper(0);
    let stack = e.stack().expect("stack captured");
    assert!(!stack.is_empty());
    assert!(stack.len() <= fl_error::DEFAULT_STACK_DEPTH);
    if symbolized(stack, "capture_here") {
        assert!(stack.frames()[0].function.contains("capture_here"));
    }
}

#[test]
fn skip_drops_exactly_one_more_frame() {
    let zero = via_helper(0);
    let one = via_helper(1);
    let (zero, one) = (zero.stack().unwrap(), one.stack().unwrap());
    if symbolized(zero, "via_helper") {
        assert_eq!(one.frames()[0].function, zero.frames()[1].function);
        assert!(one.frames()[0].function.contains("via_helper"));
    }
}

#[test]
fn native_stack_skips_dispatch_frames() {
    let e = capture_native_here(0);
    let stack = e.stack().unwrap();
    assert_eq!(e.code(), Code::NOT_FOUND);
    if symbolized(stack, "capture_native_here") {
        assert!(stack.frames()[0].function.contains("capture_native_here"));
    }
}

#[test]
fn defect_stack_is_captured_once() {
    let d = defect(NONE);
    let again = d.capture_stack();
    assert_eq!(d.stack(), again.stack());
    assert!(interrupt("x").capture_stack().stack().is_none());
}

// =========================================================================
// Interop
// =========================================================================

#[test]
fn anyhow_roundtrip() {
    check_anyhow_roundtrip(not_found("user", 1));
    check_anyhow_roundtrip(interrupt("stop"));
    check_anyhow_roundtrip(Canceled);
    check_anyhow_roundtrip(DeadlineExceeded);
}

#[test]
fn anyhow_context_chain_keeps_faultline_cause() {
    let e = not_found("user", 1);
    let chained = anyhow::Error::new(e.clone()).context("loading profile");
    let inner = chained
        .chain()
        .find_map(|c| c.downcast_ref::<Error>())
        .expect("faultline error in chain");
    assert!(inner.same_value(&e));
}

#[test]
fn errors_box_into_dyn_error() {
    fn fails() -> Result<(), Box<dyn StdError + Send + Sync>> {
        Err(not_found("user", 1).into())
    }
    let boxed = fails().unwrap_err();
    assert_eq!(boxed.to_string(), "not_found: user not found");
    assert!(boxed.downcast_ref::<Error>().is_some());
}

#[test]
fn typed_fields_over_adapters() {
    const USER_ID: TypedField<u64> = TypedField::new("user_id");
    let e = USER_ID.set(Some(&wrap(Some(io::Error::other("db")), "lookup", kv!())), 42);
    assert_eq!(USER_ID.get(Some(&e)), Some(42));
    assert_eq!(USER_ID.must_get(Some(&e)), 42);
    assert!(USER_ID.get(None).is_none());
}
