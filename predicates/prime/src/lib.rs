//! Reference predicate: succeeds when a task's decimal value is prime.
//! No configuration is required, so `swarm_test_init` accepts any blob
//! (including an empty one) and always succeeds.

use std::sync::atomic::{AtomicBool, Ordering};

static READY: AtomicBool = AtomicBool::new(false);

#[unsafe(no_mangle)]
pub extern "C" fn swarm_test_init(_config_ptr: *const u8, _config_len: usize) -> u8 {
    READY.store(true, Ordering::SeqCst);
    1
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

#[unsafe(no_mangle)]
pub extern "C" fn swarm_test_execute(
    task_ptr: *const u8,
    task_len: usize,
    result_buf_ptr: *mut u8,
    result_buf_cap: usize,
) -> i32 {
    if result_buf_cap < 24 {
        return -1;
    }
    if !READY.load(Ordering::SeqCst) {
        return -2;
    }
    if task_ptr.is_null() {
        return -3;
    }
    // SAFETY: host guarantees `task_ptr` is valid for `task_len` bytes.
    let task = unsafe { std::slice::from_raw_parts(task_ptr, task_len) };
    let value = match std::str::from_utf8(task).ok().and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(v) => v,
        None => return 0,
    };
    if !is_prime(value) {
        return 0;
    }

    // SAFETY: host guarantees `result_buf_ptr` is valid for
    // `result_buf_cap` bytes and `result_buf_cap >= 24` was checked above.
    let buf = unsafe { std::slice::from_raw_parts_mut(result_buf_ptr, result_buf_cap) };
    buf[0] = 1;
    buf[1..8].fill(0);
    buf[8..16].copy_from_slice(&1.0f64.to_le_bytes());
    buf[16..20].copy_from_slice(&(task_len as u32).to_le_bytes());
    buf[20..24].copy_from_slice(&0u32.to_le_bytes());
    24
}

#[unsafe(no_mangle)]
pub extern "C" fn swarm_test_cleanup() {
    READY.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primality_table() {
        assert!(is_prime(2));
        assert!(is_prime(97));
        assert!(!is_prime(1));
        assert!(!is_prime(0));
        assert!(!is_prime(100));
    }

    #[test]
    fn execute_flags_primes_only() {
        swarm_test_init(std::ptr::null(), 0);
        let mut buf = [0u8; 24];
        let composite = b"100";
        assert_eq!(
            swarm_test_execute(composite.as_ptr(), composite.len(), buf.as_mut_ptr(), buf.len()),
            0
        );
        let prime = b"101";
        assert_eq!(
            swarm_test_execute(prime.as_ptr(), prime.len(), buf.as_mut_ptr(), buf.len()),
            24
        );
        swarm_test_cleanup();
    }
}
