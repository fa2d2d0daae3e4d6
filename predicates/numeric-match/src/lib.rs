//! Reference predicate: succeeds on the single task whose decimal value
//! equals a secret supplied at `swarm_test_init` time. Matches the ABI in
//! section 4.2 and the "numeric needle" scenario in section 8.

use std::sync::{Mutex, OnceLock};

struct State {
    secret: u64,
}

fn state_cell() -> &'static Mutex<Option<State>> {
    static STATE: OnceLock<Mutex<Option<State>>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(None))
}

/// Config is the secret, decimal ASCII, optionally whitespace-padded.
#[unsafe(no_mangle)]
pub extern "C" fn swarm_test_init(config_ptr: *const u8, config_len: usize) -> u8 {
    if config_ptr.is_null() || config_len == 0 {
        return 0;
    }
    // SAFETY: host guarantees `config_ptr` is valid for `config_len` bytes
    // for the duration of this call (section 4.2).
    let bytes = unsafe { std::slice::from_raw_parts(config_ptr, config_len) };
    let secret = match std::str::from_utf8(bytes).ok().and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(v) => v,
        None => return 0,
    };
    *state_cell().lock().unwrap() = Some(State { secret });
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
    let secret = match state_cell().lock().unwrap().as_ref() {
        Some(state) => state.secret,
        None => return -2,
    };
    if task_ptr.is_null() {
        return -3;
    }
    // SAFETY: host guarantees `task_ptr` is valid for `task_len` bytes.
    let task = unsafe { std::slice::from_raw_parts(task_ptr, task_len) };
    let value = match std::str::from_utf8(task).ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(v) => v,
        None => return 0,
    };
    if value != secret {
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
    fn matches_only_the_secret() {
        let config = b"8734501";
        assert_eq!(swarm_test_init(config.as_ptr(), config.len()), 1);

        let mut buf = [0u8; 24];
        let miss = b"1";
        assert_eq!(
            swarm_test_execute(miss.as_ptr(), miss.len(), buf.as_mut_ptr(), buf.len()),
            0
        );

        let hit = b"8734501";
        let rc = swarm_test_execute(hit.as_ptr(), hit.len(), buf.as_mut_ptr(), buf.len());
        assert_eq!(rc, 24);
        assert_eq!(buf[0], 1);
        assert_eq!(f64::from_le_bytes(buf[8..16].try_into().unwrap()), 1.0);

        swarm_test_cleanup();
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        swarm_test_init(b"1".as_ptr(), 1);
        let mut tiny = [0u8; 4];
        assert_eq!(
            swarm_test_execute(b"1".as_ptr(), 1, tiny.as_mut_ptr(), tiny.len()),
            -1
        );
        swarm_test_cleanup();
    }
}
