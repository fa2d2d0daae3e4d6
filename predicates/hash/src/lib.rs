//! Reference predicate: succeeds when a task's bytes hash (FNV-1a, 64-bit)
//! to a target value supplied at init time as 16 hex digits.

use std::sync::{Mutex, OnceLock};

struct State {
    target: u64,
}

fn state_cell() -> &'static Mutex<Option<State>> {
    static STATE: OnceLock<Mutex<Option<State>>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(None))
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Config is the target hash as hex, optionally `0x`-prefixed.
#[unsafe(no_mangle)]
pub extern "C" fn swarm_test_init(config_ptr: *const u8, config_len: usize) -> u8 {
    if config_ptr.is_null() || config_len == 0 {
        return 0;
    }
    // SAFETY: host guarantees `config_ptr` is valid for `config_len` bytes.
    let bytes = unsafe { std::slice::from_raw_parts(config_ptr, config_len) };
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t.trim(),
        Err(_) => return 0,
    };
    let hex = text.strip_prefix("0x").unwrap_or(text);
    let target = match u64::from_str_radix(hex, 16) {
        Ok(v) => v,
        Err(_) => return 0,
    };
    *state_cell().lock().unwrap() = Some(State { target });
    1
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
    let target = match state_cell().lock().unwrap().as_ref() {
        Some(state) => state.target,
        None => return -2,
    };
    if task_ptr.is_null() {
        return -3;
    }
    // SAFETY: host guarantees `task_ptr` is valid for `task_len` bytes.
    let task = unsafe { std::slice::from_raw_parts(task_ptr, task_len) };
    if fnv1a(task) != target {
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
    *state_cell().lock().unwrap() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_known_vector() {
        assert_eq!(fnv1a(b""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn execute_matches_configured_target() {
        let target = fnv1a(b"needle");
        let config = format!("{target:016x}");
        assert_eq!(swarm_test_init(config.as_ptr(), config.len()), 1);

        let mut buf = [0u8; 24];
        let miss = b"haystack";
        assert_eq!(
            swarm_test_execute(miss.as_ptr(), miss.len(), buf.as_mut_ptr(), buf.len()),
            0
        );
        let hit = b"needle";
        assert_eq!(
            swarm_test_execute(hit.as_ptr(), hit.len(), buf.as_mut_ptr(), buf.len()),
            24
        );
        swarm_test_cleanup();
    }
}
