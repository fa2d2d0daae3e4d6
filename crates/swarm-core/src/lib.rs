//! Shared wire protocol codec and data model for the swarm coordinator and
//! compute node.

pub mod error;
pub mod log;
pub mod task;
pub mod wire;

pub use error::WireError;
pub use log::LogLevel;
pub use task::{PredicateKind, TaskChunk, TaskResult, TaskSource, WorkerRecord};
pub use wire::{
    Heartbeat, MessageHeader, MessageType, QueenWelcome, RequestWork, SubmitResult, TaskEntry,
    WorkDispatch, WorkDispatchHeader, WorkerHello, HEADER_LEN, MAGIC, MAX_PAYLOAD_LEN,
    RESULT_BUF_MIN_CAP,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn handshake_roundtrip() {
        let hello = WorkerHello {
            cpu_cores: 8,
            worker_nonce: 0xdead_beef,
        };
        let mut buf = Vec::new();
        wire::write_frame(&mut buf, MessageType::WorkerHello, &hello.encode()).unwrap();

        let mut cursor = Cursor::new(buf);
        let (msg_type, payload) = wire::read_frame(&mut cursor).unwrap();
        assert_eq!(msg_type, MessageType::WorkerHello);
        let decoded = WorkerHello::decode(&payload).unwrap();
        assert_eq!(decoded.cpu_cores, 8);
        assert_eq!(decoded.worker_nonce, 0xdead_beef);
    }

    #[test]
    fn work_dispatch_roundtrip() {
        let dispatch = WorkDispatch {
            header: WorkDispatchHeader {
                start_task_id: 100,
                task_count: 3,
                test_fn_id: PredicateKind::NumericMatch.as_u32(),
            },
            entries: vec![
                TaskEntry {
                    task_id: 100,
                    data: b"100".to_vec(),
                },
                TaskEntry {
                    task_id: 101,
                    data: b"101".to_vec(),
                },
                TaskEntry {
                    task_id: 102,
                    data: b"102".to_vec(),
                },
            ],
        };
        let encoded = dispatch.encode();
        let decoded = WorkDispatch::decode(&encoded).unwrap();
        assert_eq!(decoded.header.start_task_id, 100);
        assert_eq!(decoded.entries.len(), 3);
        assert_eq!(decoded.entries[2].task_id, 102);
        assert_eq!(decoded.entries[2].data, b"102".to_vec());
    }

    #[test]
    fn submit_result_roundtrip_with_empty_data() {
        let result = SubmitResult {
            assigned_id: 7,
            task_id: 8_734_501,
            success: true,
            score: 1.0,
            data: Vec::new(),
        };
        let encoded = result.encode();
        let decoded = SubmitResult::decode(&encoded).unwrap();
        assert_eq!(decoded.task_id, 8_734_501);
        assert!(decoded.success);
        assert_eq!(decoded.score, 1.0);
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        MessageHeader {
            msg_type: MessageType::DispatchWork,
            payload_len: MAX_PAYLOAD_LEN + 1,
        }
        .write_to(&mut buf)
        .unwrap();
        let mut cursor = Cursor::new(buf);
        let err = MessageHeader::read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = vec![0xffu8; HEADER_LEN];
        let mut cursor = Cursor::new(buf.clone());
        let err = MessageHeader::read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, WireError::BadMagic { .. }));
        buf.clear(); // silence unused warning if assertion changes later
    }

    #[test]
    fn truncated_task_entry_is_rejected() {
        // task_count says 1 entry but no entry bytes follow.
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&PredicateKind::Prime.as_u32().to_le_bytes());
        let err = WorkDispatch::decode(&buf).unwrap_err();
        assert!(matches!(err, WireError::TruncatedPayload { .. }));
    }
}
