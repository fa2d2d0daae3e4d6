//! Dynamic loading and safe invocation of the Predicate ABI (section 4.2):
//! a shared library exporting `swarm_test_init`, `swarm_test_execute`, and
//! `swarm_test_cleanup`.

mod ffi;
mod api;

pub use api::{ExecuteOutcome, PredicateError, PredicateLibrary};
