// Reporting metadata written by test code during one execution window

use super::request::{Attribute, LogFile, LogLevel};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::Value;

/// Log queued for an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
    /// Epoch millis; `None` is stamped when the log is sent
    pub time: Option<i64>,
    pub file: Option<LogFile>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, level: LogLevel, time: i64) -> Self {
        Self {
            message: message.into(),
            level,
            time: Some(time),
            file: None,
        }
    }
}

/// Per-entity side channel consumed once when the entity finishes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportingMetadata {
    pub logs: Vec<LogEntry>,
    pub attributes: Vec<Attribute>,
    pub description: Option<String>,
    pub test_case_id: Option<String>,
}

impl ReportingMetadata {
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
            && self.attributes.is_empty()
            && self.description.is_none()
            && self.test_case_id.is_none()
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    /// Concatenates; duplicates and order are kept
    pub fn add_attributes(&mut self, attributes: impl IntoIterator<Item = Attribute>) {
        self.attributes.extend(attributes);
    }

    pub fn set_test_case_id(&mut self, test_case_id: impl Into<String>) {
        self.test_case_id = Some(test_case_id.into());
    }

    /// Appends on a new line; never overwrites
    pub fn append_description(&mut self, description: &str) {
        match &mut self.description {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(description);
            }
            None => self.description = Some(description.to_string()),
        }
    }

    /// Layer `other` on top: logs and attributes are appended, the description
    /// is appended, and its test case id wins when present.
    pub fn merge(&mut self, other: ReportingMetadata) {
        let ReportingMetadata {
            logs,
            attributes,
            description,
            test_case_id,
        } = other;

        self.logs.extend(logs);
        self.add_attributes(attributes);
        if let Some(description) = description {
            self.append_description(&description);
        }
        if let Some(test_case_id) = test_case_id {
            self.test_case_id = Some(test_case_id);
        }
    }

    /// Parse metadata a runner process attached to a task.
    ///
    /// Accepts either `{"rpMeta": {"test": {...}}}` or the inner object directly.
    /// Every field is applied only when it has the expected shape; anything else
    /// is dropped so a misbehaving test cannot break the finish request.
    pub fn from_runner_meta(meta: &Value) -> Option<Self> {
        let test = meta.pointer("/rpMeta/test").unwrap_or(meta).as_object()?;
        let mut metadata = Self::default();

        if let Some(logs) = test.get("logs").and_then(Value::as_array) {
            metadata.logs = logs.iter().filter_map(parse_log).collect();
        }

        if let Some(attributes) = test.get("attributes").and_then(Value::as_array) {
            metadata.attributes = attributes
                .iter()
                .filter_map(|a| serde_json::from_value::<Attribute>(a.clone()).ok())
                .collect();
        }

        if let Some(description) = test.get("description").and_then(Value::as_str) {
            metadata.description = Some(description.to_string());
        }

        if let Some(test_case_id) = test.get("testCaseId").and_then(Value::as_str) {
            metadata.test_case_id = Some(test_case_id.to_string());
        }

        if metadata.is_empty() {
            None
        } else {
            Some(metadata)
        }
    }
}

fn parse_log(value: &Value) -> Option<LogEntry> {
    let file = value.get("file").and_then(parse_file);
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| file.as_ref().map(|f| f.name.clone()))?;

    Some(LogEntry {
        message,
        level: value
            .get("level")
            .and_then(Value::as_str)
            .map(LogLevel::parse)
            .unwrap_or_default(),
        time: value.get("time").and_then(Value::as_i64),
        file,
    })
}

/// Attachment `content` is either a base64 string or an array of bytes. A
/// string that is not valid base64 is kept as its UTF-8 bytes.
fn parse_file(value: &Value) -> Option<LogFile> {
    let name = value.get("name").and_then(Value::as_str)?;
    let mime_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("application/octet-stream");
    let content = match value.get("content") {
        Some(Value::String(s)) => BASE64
            .decode(s.trim())
            .unwrap_or_else(|_| s.as_bytes().to_vec()),
        Some(Value::Array(bytes)) => bytes
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|b| u8::try_from(b).ok())
            .collect(),
        _ => Vec::new(),
    };

    Some(LogFile::new(name, mime_type, content))
}
