//! Raw function-pointer types for the three symbols a predicate library must
//! export. These are resolved dynamically via `libloading` rather than
//! linked at build time, so there is no `unsafe extern "C" { fn ... }`
//! import block here (there is nothing to link against) — only the types
//! needed to transmute a resolved [`libloading::Symbol`] into a plain
//! function pointer.

/// `swarm_test_init(config_ptr, config_len) -> bool`. Returns nonzero on
/// success. Called exactly once, before any `execute` call.
pub(crate) type InitFn = unsafe extern "C" fn(config_ptr: *const u8, config_len: usize) -> u8;

/// `swarm_test_execute(task_ptr, task_len, result_buf_ptr, result_buf_cap) -> i32`.
/// Called concurrently from many threads; must be thread-safe.
pub(crate) type ExecuteFn = unsafe extern "C" fn(
    task_ptr: *const u8,
    task_len: usize,
    result_buf_ptr: *mut u8,
    result_buf_cap: usize,
) -> i32;

/// `swarm_test_cleanup()`. Called exactly once, after all `execute` calls
/// have returned.
pub(crate) type CleanupFn = unsafe extern "C" fn();

pub(crate) const INIT_SYMBOL: &[u8] = b"swarm_test_init\0";
pub(crate) const EXECUTE_SYMBOL: &[u8] = b"swarm_test_execute\0";
pub(crate) const CLEANUP_SYMBOL: &[u8] = b"swarm_test_cleanup\0";
