//! Safe wrapper around a dynamically loaded predicate library.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use libloading::{Library, Symbol};
use swarm_core::RESULT_BUF_MIN_CAP;

use crate::ffi::{CleanupFn, ExecuteFn, InitFn, CLEANUP_SYMBOL, EXECUTE_SYMBOL, INIT_SYMBOL};

#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    #[error("failed to load predicate library: {0}")]
    Load(#[source] libloading::Error),

    #[error("predicate library is missing required symbol: {0}")]
    MissingSymbol(#[source] libloading::Error),

    #[error("swarm_test_init returned failure")]
    InitFailed,

    #[error("result buffer capacity {got} is below the minimum of {min}")]
    ResultBufferTooSmall { got: usize, min: usize },
}

/// The outcome of one `execute` call, per the return-code contract in
/// section 4.2: positive is a success with that many bytes written,
/// zero is a processed-but-not-a-success task, negative is a predicate
/// internal error (still counted as processed, not a success).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Success { bytes_written: usize },
    NotSuccess,
    Error(i32),
}

/// A loaded predicate, holding the library open for as long as this value
/// lives and exposing the three ABI calls as safe Rust functions.
///
/// `execute` may be called concurrently from many threads, matching the
/// ABI's thread-safety requirement — this type is `Send + Sync` and carries
/// no interior state of its own beyond the resolved function pointers and
/// the cleanup guard.
pub struct PredicateLibrary {
    // Kept alive for as long as the resolved function pointers below may be
    // called; never read directly once loaded.
    _library: Library,
    init_fn: InitFn,
    execute_fn: ExecuteFn,
    cleanup_fn: CleanupFn,
    cleaned_up: AtomicBool,
}

// SAFETY: the three resolved function pointers are plain addresses into the
// loaded shared object; the ABI contract (section 4.2) requires
// `swarm_test_execute` to be safe to call from multiple threads
// concurrently, and `init`/`cleanup` are only ever called once each by
// construction of this type's public API.
unsafe impl Send for PredicateLibrary {}
unsafe impl Sync for PredicateLibrary {}

impl PredicateLibrary {
    /// Loads the shared library at `path` and resolves all three required
    /// symbols, erroring out if any is missing. Does not call `init`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredicateError> {
        // SAFETY: loading an arbitrary shared object runs its initializer
        // code; the caller is trusted to pass a path to a predicate built
        // against this ABI, per the host/predicate trust boundary in
        // section 4.2.
        let library = unsafe { Library::new(path.as_ref()) }.map_err(PredicateError::Load)?;

        // SAFETY: `Symbol<T>` borrows from `library`, but `T` here is a
        // plain `extern "C" fn` pointer type, which is `Copy`; dereferencing
        // it yields a value independent of the `Symbol`'s lifetime. The
        // address stays valid for as long as `library` remains loaded,
        // which we guarantee by keeping it in this struct.
        let init_fn = unsafe {
            let sym: Symbol<InitFn> = library
                .get(INIT_SYMBOL)
                .map_err(PredicateError::MissingSymbol)?;
            *sym
        };
        let execute_fn = unsafe {
            let sym: Symbol<ExecuteFn> = library
                .get(EXECUTE_SYMBOL)
                .map_err(PredicateError::MissingSymbol)?;
            *sym
        };
        let cleanup_fn = unsafe {
            let sym: Symbol<CleanupFn> = library
                .get(CLEANUP_SYMBOL)
                .map_err(PredicateError::MissingSymbol)?;
            *sym
        };

        Ok(PredicateLibrary {
            _library: library,
            init_fn,
            execute_fn,
            cleanup_fn,
            cleaned_up: AtomicBool::new(false),
        })
    }

    /// Calls `swarm_test_init` with the given opaque configuration blob.
    /// The predicate may retain pointers into `config` beyond the duration
    /// of this call: the host guarantees the region outlives the library.
    pub fn init(&self, config: &[u8]) -> Result<(), PredicateError> {
        // SAFETY: `config` is a valid slice for its own length; the
        // predicate contract requires `init` to be callable with any
        // byte sequence including an empty one.
        let ok = unsafe { (self.init_fn)(config.as_ptr(), config.len()) };
        if ok == 0 {
            return Err(PredicateError::InitFailed);
        }
        Ok(())
    }

    /// Evaluates one task. `result_buf` must have at least
    /// [`RESULT_BUF_MIN_CAP`] bytes of capacity; this is validated before
    /// the unsafe call is made.
    pub fn execute(&self, task: &[u8], result_buf: &mut [u8]) -> Result<ExecuteOutcome, PredicateError> {
        if result_buf.len() < RESULT_BUF_MIN_CAP {
            return Err(PredicateError::ResultBufferTooSmall {
                got: result_buf.len(),
                min: RESULT_BUF_MIN_CAP,
            });
        }
        // SAFETY: `task` and `result_buf` are valid, properly sized slices
        // for the lengths passed; the predicate contract allows concurrent
        // calls from multiple threads on the same loaded library.
        let rc = unsafe {
            (self.execute_fn)(
                task.as_ptr(),
                task.len(),
                result_buf.as_mut_ptr(),
                result_buf.len(),
            )
        };
        Ok(match rc {
            rc if rc > 0 => ExecuteOutcome::Success {
                bytes_written: rc as usize,
            },
            0 => ExecuteOutcome::NotSuccess,
            rc => ExecuteOutcome::Error(rc),
        })
    }
}

impl Drop for PredicateLibrary {
    fn drop(&mut self) {
        // Ensures `swarm_test_cleanup` runs at most once even if `drop` were
        // somehow reentered, mirroring the "closed at most once" invariant
        // applied elsewhere to socket handles (section 3).
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }
        // SAFETY: all `execute` calls borrow `&self` and cannot outlive this
        // `drop`, so no concurrent call is in flight when cleanup runs.
        unsafe { (self.cleanup_fn)() }
    }
}
