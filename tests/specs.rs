//! End-to-end scenario tests (spec.md §8): the concrete scenarios S1-S6,
//! driven through `thrum_daemon::handlers::dispatch` rather than a real
//! socket (see `specs/harness.rs`).
//!
//! The universal invariants (1-8) are exercised as sibling unit tests in
//! `crates/storage` and `crates/daemon`, next to the code they constrain,
//! rather than duplicated here.

mod specs {
    pub mod harness;
    mod scenarios;
}
