//! Export document format and validation

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ImportError, Result, StoreError};
use crate::ledger::{DeletionRecord, Ledger, normalize};

/// Format version written by `export_all`
pub const EXPORT_VERSION: &str = "1.0";

/// Portable snapshot of the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub deletion_history: Ledger,
}

impl ExportDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::WriteFailed(format!("Failed to serialize export: {}", e)).into())
    }

    /// Number of records across all repositories
    pub fn record_count(&self) -> usize {
        self.deletion_history.values().map(Vec::len).sum()
    }
}

/// Snapshot the ledger for export
pub fn export_all(snapshot: &Ledger) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        exported_at: Utc::now(),
        deletion_history: snapshot.clone(),
    }
}

/// Parse and validate an export document
pub fn parse_document(text: &str) -> Result<ExportDocument> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ImportError::NotJson(e.to_string()))?;
    validate_document(&value)
}

/// Validate a decoded document field by field
///
/// `version` and `deletionHistory` are required. Every record must carry a
/// non-empty branch name and commit hash and a readable timestamp. Deletion
/// times in the future are clamped to now.
pub fn validate_document(value: &Value) -> Result<ExportDocument> {
    let root = value.as_object().ok_or_else(|| ImportError::MalformedField {
        field: "document",
        reason: "expected an object".to_string(),
    })?;

    let version = match root.get("version") {
        None | Some(Value::Null) => return Err(ImportError::MissingField("version").into()),
        Some(Value::String(v)) => v.clone(),
        Some(other) => {
            return Err(ImportError::MalformedField {
                field: "version",
                reason: format!("expected a string, found {}", kind_of(other)),
            }
            .into());
        }
    };
    if version != EXPORT_VERSION {
        warn!(
            "Importing document version {} (expected {})",
            version, EXPORT_VERSION
        );
    }

    let exported_at = match root.get("exportedAt") {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ImportError::MalformedField {
                field: "exportedAt",
                reason: e.to_string(),
            })?,
        None | Some(Value::Null) => Utc::now(),
        Some(other) => {
            return Err(ImportError::MalformedField {
                field: "exportedAt",
                reason: format!("expected a string, found {}", kind_of(other)),
            }
            .into());
        }
    };

    let history = match root.get("deletionHistory") {
        None | Some(Value::Null) => {
            return Err(ImportError::MissingField("deletionHistory").into());
        }
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ImportError::MalformedField {
                field: "deletionHistory",
                reason: format!("expected an object, found {}", kind_of(other)),
            }
            .into());
        }
    };

    let deletion_history = validate_history(history)?;
    debug!(
        "Validated import with {} repositories",
        deletion_history.len()
    );

    Ok(ExportDocument {
        version,
        exported_at,
        deletion_history,
    })
}

fn validate_history(history: &Map<String, Value>) -> Result<Ledger> {
    let now = Utc::now();
    let mut ledger = Ledger::new();

    for (repo, records) in history {
        let Value::Array(records) = records else {
            return Err(ImportError::MalformedField {
                field: "deletionHistory",
                reason: format!("repository '{}' does not hold a list", repo),
            }
            .into());
        };

        let mut parsed = Vec::with_capacity(records.len());
        for (index, raw) in records.iter().enumerate() {
            let invalid = |reason: String| ImportError::InvalidRecord {
                repo: repo.clone(),
                index,
                reason,
            };

            let mut record: DeletionRecord =
                serde_json::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))?;

            record.validate().map_err(invalid)?;
            if record.deleted_at > now {
                record.deleted_at = now;
            }
            parsed.push(record);
        }

        ledger.insert(repo.clone(), parsed);
    }

    Ok(normalize(ledger))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Write an export document to `path`
pub async fn write_export(path: &Path, document: &ExportDocument) -> Result<()> {
    let content = document.to_json_pretty()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    debug!("Wrote export to {:?}", path);
    Ok(())
}

/// Read and validate an export document from `path`
pub async fn read_export(path: &Path) -> Result<ExportDocument> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_document(&content)
}
