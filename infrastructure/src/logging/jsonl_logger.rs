//! Append-only JSONL transcript of decision events.
//!
//! One line per [`ConversationEvent`]: the payload's fields plus `type` and
//! an RFC 3339 `timestamp`. Successive runs append to the same file.

use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use stepwise_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use tracing::warn;

/// Decision transcript written as JSON lines, flushed after every event.
pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open `path` for appending, creating parent directories.
    ///
    /// A transcript is optional, so failures are logged and yield `None`.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(dir = %parent.display(), error = %e, "Cannot create transcript directory");
            return None;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .inspect_err(|e| warn!(path = %path.display(), error = %e, "Cannot open transcript"))
            .ok()?;

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Object payloads are flattened into the record; anything else goes under `data`.
fn record(event: ConversationEvent, timestamp: String) -> Value {
    let mut fields = match event.payload {
        Value::Object(map) => map,
        other => Map::from_iter([("data".to_string(), other)]),
    };
    fields.insert("type".to_string(), Value::from(event.event_type));
    fields.insert("timestamp".to_string(), Value::from(timestamp));
    Value::Object(fields)
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let Ok(line) = serde_json::to_string(&record(event, timestamp)) else {
            return;
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|()| writer.flush()) {
            warn!(path = %self.path.display(), error = %e, "Failed to append to transcript");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use stepwise_application::ports::conversation_logger::events;

    fn read(path: &Path) -> String {
        let mut content = String::new();
        File::open(path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_jsonl_logger_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("decisions.jsonl");
        let logger = JsonlConversationLogger::new(&path).unwrap();

        logger.log(ConversationEvent::new(
            events::COMPLETION_DECISION,
            serde_json::json!({
                "model": "anthropic:claude-sonnet-4-0",
                "item_index": 0,
                "completed": true,
                "text": "Reproduced locally"
            }),
        ));
        logger.log(ConversationEvent::new(
            events::PLAN_ITEM_COMPLETED,
            serde_json::json!({ "task_id": "t-1", "item_index": 0 }),
        ));
        drop(logger);

        let content = read(&path);
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("type").is_some());
            assert!(value.get("timestamp").is_some());
        }

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "completion_decision");
        assert_eq!(first["completed"], true);
        assert_eq!(first["text"], "Reproduced locally");
    }

    #[test]
    fn test_jsonl_logger_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");

        for _ in 0..2 {
            let logger = JsonlConversationLogger::new(&path).unwrap();
            logger.log(ConversationEvent::new(
                events::CHECKPOINT_FAILED,
                serde_json::json!({ "document": "gh:#1" }),
            ));
        }

        assert_eq!(read(&path).trim().lines().count(), 2);
    }

    #[test]
    fn test_record_payload_fields_win_except_type_and_timestamp() {
        let event = ConversationEvent::new(
            events::COMPLETION_DECISION,
            serde_json::json!({ "type": "spoofed", "completed": false }),
        );
        let value = record(event, "2026-01-01T00:00:00.000Z".to_string());
        assert_eq!(value["type"], "completion_decision");
        assert_eq!(value["timestamp"], "2026-01-01T00:00:00.000Z");
        assert_eq!(value["completed"], false);
    }

    #[test]
    fn test_unwritable_location_disables_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        assert!(JsonlConversationLogger::new(blocker.join("decisions.jsonl")).is_none());
    }

    #[test]
    fn test_jsonl_logger_handles_non_object_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.jsonl");
        let logger = JsonlConversationLogger::new(&path).unwrap();

        logger.log(ConversationEvent::new(
            events::CONTRACT_VIOLATION,
            serde_json::json!("no choice"),
        ));
        drop(logger);

        let value: serde_json::Value = serde_json::from_str(read(&path).trim()).unwrap();
        assert_eq!(value["type"], "contract_violation");
        assert_eq!(value["data"], "no choice");
    }
}
