//! Reference predicate: succeeds when a task's decimal value is a perfect
//! square. Score is the integer square root, giving the dispatcher a
//! human-checkable result even though the search space has no "secret".

use std::sync::atomic::{AtomicBool, Ordering};

static READY: AtomicBool = AtomicBool::new(false);

#[unsafe(no_mangle)]
pub extern "C" fn swarm_test_init(_config_ptr: *const u8, _config_len: usize) -> u8 {
    READY.store(true, Ordering::SeqCst);
    1
}

fn integer_sqrt(n: u64) -> Option<u64> {
    if n == 0 {
        return Some(0);
    }
    let mut root = (n as f64).sqrt() as u64;
    while root.saturating_mul(root) > n {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= n {
        root += 1;
    }
    if root * root == n {
        Some(root)
    } else {
        None
    }
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
    let root = match integer_sqrt(value) {
        Some(r) => r,
        None => return 0,
    };

    // SAFETY: host guarantees `result_buf_ptr` is valid for
    // `result_buf_cap` bytes and `result_buf_cap >= 24` was checked above.
    let buf = unsafe { std::slice::from_raw_parts_mut(result_buf_ptr, result_buf_cap) };
    buf[0] = 1;
    buf[1..8].fill(0);
    buf[8..16].copy_from_slice(&(root as f64).to_le_bytes());
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
    fn integer_sqrt_table() {
        assert_eq!(integer_sqrt(0), Some(0));
        assert_eq!(integer_sqrt(144), Some(12));
        assert_eq!(integer_sqrt(145), None);
    }

    #[test]
    fn execute_reports_root_as_score() {
        swarm_test_init(std::ptr::null(), 0);
        let mut buf = [0u8; 24];
        let square = b"144";
        let rc = swarm_test_execute(square.as_ptr(), square.len(), buf.as_mut_ptr(), buf.len());
        assert_eq!(rc, 24);
        assert_eq!(f64::from_le_bytes(buf[8..16].try_into().unwrap()), 12.0);

        let non_square = b"145";
        assert_eq!(
            swarm_test_execute(non_square.as_ptr(), non_square.len(), buf.as_mut_ptr(), buf.len()),
            0
        );
        swarm_test_cleanup();
    }
}
