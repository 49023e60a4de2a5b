//! Schema validation for decoded checkpoint records
//!
//! Every record of a batch is checked field by field against the shape its
//! kind requires. All problems are collected; a batch with any problem is
//! rejected as a whole and nothing is converted. Only a clean batch is turned
//! into typed records.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationIssue};
use crate::models::conversation::parse_timestamp;
use crate::models::{
    ClusterRecord, ConversationRecord, Dataset, MetadataValue, RecordKind, SummaryRecord,
};

/// Validate a decoded batch of the given kind.
pub fn validate(kind: RecordKind, raw: &[Value]) -> Result<Dataset, ValidationError> {
    match kind {
        RecordKind::Conversation => validate_conversations(raw).map(Dataset::Conversations),
        RecordKind::Summary => validate_summaries(raw).map(Dataset::Summaries),
        RecordKind::Cluster => validate_clusters(raw).map(Dataset::Clusters),
    }
}

pub fn validate_conversations(raw: &[Value]) -> Result<Vec<ConversationRecord>, ValidationError> {
    validate_batch(RecordKind::Conversation, raw, |check| {
        check.string("chat_id");
        check.optional_timestamp("created_at");
        check.optional_metadata("metadata");
        check.optional_messages("messages");
    })
}

pub fn validate_summaries(raw: &[Value]) -> Result<Vec<SummaryRecord>, ValidationError> {
    validate_batch(RecordKind::Summary, raw, |check| {
        check.string("chat_id");
        check.string("summary");
    })
}

pub fn validate_clusters(raw: &[Value]) -> Result<Vec<ClusterRecord>, ValidationError> {
    validate_batch(RecordKind::Cluster, raw, |check| {
        check.string("id");
        check.string("name");
        check.string("description");
        check.optional_string("slug");
        check.nullable_string("parent_id");
        check.string_array("chat_ids");
        check.number("x_coord");
        check.number("y_coord");
        check.unsigned("count");
        check.optional_unsigned("level");
    })
}

/// Run `rules` over every record, then convert only if nothing failed.
fn validate_batch<T, F>(kind: RecordKind, raw: &[Value], rules: F) -> Result<Vec<T>, ValidationError>
where
    T: DeserializeOwned,
    F: Fn(&mut RecordCheck<'_>),
{
    let mut issues = Vec::new();

    for (index, value) in raw.iter().enumerate() {
        match value.as_object() {
            Some(object) => {
                let mut check = RecordCheck {
                    record: index,
                    object,
                    issues: &mut issues,
                };
                rules(&mut check);
            }
            None => issues.push(ValidationIssue {
                record: index,
                field: String::new(),
                problem: "not an object".to_string(),
            }),
        }
    }

    if !issues.is_empty() {
        tracing::debug!("{} batch failed validation with {} issue(s)", kind, issues.len());
        return Err(ValidationError { kind, issues });
    }

    let mut records = Vec::with_capacity(raw.len());
    for (index, value) in raw.iter().enumerate() {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => records.push(record),
            Err(e) => issues.push(ValidationIssue {
                record: index,
                field: String::new(),
                problem: e.to_string(),
            }),
        }
    }

    if issues.is_empty() {
        Ok(records)
    } else {
        Err(ValidationError { kind, issues })
    }
}

/// Field checks for a single record.
struct RecordCheck<'a> {
    record: usize,
    object: &'a Map<String, Value>,
    issues: &'a mut Vec<ValidationIssue>,
}

impl<'a> RecordCheck<'a> {
    fn fail(&mut self, field: impl Into<String>, problem: impl Into<String>) {
        self.issues.push(ValidationIssue {
            record: self.record,
            field: field.into(),
            problem: problem.into(),
        });
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        let object: &'a Map<String, Value> = self.object;
        object.get(field)
    }

    /// Present and not null.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.get(field).filter(|v| !v.is_null())
    }

    fn string(&mut self, field: &str) {
        match self.get(field) {
            None => self.fail(field, "missing"),
            Some(Value::String(_)) => {}
            Some(_) => self.fail(field, "expected string"),
        }
    }

    fn optional_string(&mut self, field: &str) {
        if let Some(value) = self.present(field) {
            if !value.is_string() {
                self.fail(field, "expected string");
            }
        }
    }

    /// Absent, null, or a string.
    fn nullable_string(&mut self, field: &str) {
        self.optional_string(field)
    }

    fn string_array(&mut self, field: &str) {
        let problem = match self.get(field) {
            None => Some("missing".to_string()),
            Some(Value::Array(items)) => items
                .iter()
                .position(|item| !item.is_string())
                .map(|i| format!("expected string at index {}", i)),
            Some(_) => Some("expected array of strings".to_string()),
        };
        if let Some(problem) = problem {
            self.fail(field, problem);
        }
    }

    fn number(&mut self, field: &str) {
        match self.get(field) {
            None => self.fail(field, "missing"),
            Some(Value::Number(n)) if n.as_f64().map(f64::is_finite).unwrap_or(false) => {}
            Some(_) => self.fail(field, "expected number"),
        }
    }

    fn unsigned(&mut self, field: &str) {
        match self.get(field) {
            None => self.fail(field, "missing"),
            Some(value) if value.is_u64() => {}
            Some(_) => self.fail(field, "expected non-negative integer"),
        }
    }

    fn optional_unsigned(&mut self, field: &str) {
        if let Some(value) = self.present(field) {
            if !value.is_u64() {
                self.fail(field, "expected non-negative integer");
            }
        }
    }

    fn optional_timestamp(&mut self, field: &str) {
        if let Some(value) = self.present(field) {
            let parses = value
                .as_str()
                .map(|s| parse_timestamp(s).is_some())
                .unwrap_or(false);
            if !parses {
                self.fail(field, "expected ISO 8601 timestamp");
            }
        }
    }

    fn optional_metadata(&mut self, field: &str) {
        let Some(value) = self.present(field) else {
            return;
        };
        let Some(entries) = value.as_object() else {
            self.fail(field, "expected object");
            return;
        };
        let bad: Vec<String> = entries
            .iter()
            .filter(|(_, v)| MetadataValue::from_json(v).is_none())
            .map(|(k, _)| format!("{}.{}", field, k))
            .collect();
        for path in bad {
            self.fail(path, "expected scalar or array of scalars");
        }
    }

    fn optional_messages(&mut self, field: &str) {
        let Some(value) = self.present(field) else {
            return;
        };
        let Some(messages) = value.as_array() else {
            self.fail(field, "expected array");
            return;
        };

        let mut problems = Vec::new();
        for (i, message) in messages.iter().enumerate() {
            let Some(message) = message.as_object() else {
                problems.push((format!("{}[{}]", field, i), "expected object"));
                continue;
            };
            for key in ["role", "content"] {
                match message.get(key) {
                    None => problems.push((format!("{}[{}].{}", field, i, key), "missing")),
                    Some(Value::String(_)) => {}
                    Some(_) => problems.push((format!("{}[{}].{}", field, i, key), "expected string")),
                }
            }
            if let Some(ts) = message.get("created_at").filter(|v| !v.is_null()) {
                let parses = ts
                    .as_str()
                    .map(|s| parse_timestamp(s).is_some())
                    .unwrap_or(false);
                if !parses {
                    problems.push((
                        format!("{}[{}].created_at", field, i),
                        "expected ISO 8601 timestamp",
                    ));
                }
            }
        }
        for (path, problem) in problems {
            self.fail(path, problem);
        }
    }
}
