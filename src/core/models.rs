// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Response envelopes the client has to look inside.
//!
//! Documents themselves stay opaque [serde_json::Value]s. Only the paging
//! fields of `_all_docs` and `_changes` responses are typed, so the streaming
//! helpers know where the next page starts.

use serde::Deserialize;
use serde_json::Value;

/// One page of an `_all_docs` (or view) response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AllDocsPage {
    /// Total number of rows in the index, not in this page.
    pub total_rows: Option<u64>,
    pub offset: Option<u64>,
    /// Rows as returned by the server.
    pub rows: Vec<Value>,
}

/// One page of a `_changes` response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChangesPage {
    pub results: Vec<Value>,
    /// Opaque sequence token: a number on CouchDB 1.x, a string on 2.x and
    /// Cloudant.
    pub last_seq: Value,
    /// Number of changes after this page.
    pub pending: Option<u64>,
}

impl ChangesPage {
    /// Value to send as `since` when requesting the next page.
    pub fn next_since(&self) -> String {
        match &self.last_seq {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Document id of an `_all_docs` row, if it has one.
///
/// Rows for keys that don't exist carry `"error": "not_found"` instead.
pub fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_changes_page_string_seq() {
        let page: ChangesPage = serde_json::from_value(json!({
            "results": [{"seq": "1-g1AAAA", "id": "a", "changes": [{"rev": "1-x"}]}],
            "last_seq": "1-g1AAAA",
            "pending": 0,
        }))
        .unwrap();

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.next_since(), "1-g1AAAA");
        assert_eq!(page.pending, Some(0));
    }

    #[test]
    fn test_changes_page_numeric_seq() {
        let page: ChangesPage = serde_json::from_value(json!({
            "results": [],
            "last_seq": 42,
        }))
        .unwrap();

        assert_eq!(page.next_since(), "42");
        assert!(page.pending.is_none());
    }

    #[test]
    fn test_all_docs_page_and_row_id() {
        let page: AllDocsPage = serde_json::from_value(json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "adam", "key": "adam", "value": {"rev": "1-a"}},
                {"key": "missing", "error": "not_found"},
            ],
        }))
        .unwrap();

        assert_eq!(page.total_rows, Some(2));
        assert_eq!(row_id(&page.rows[0]), Some("adam"));
        assert_eq!(row_id(&page.rows[1]), None);
    }

    #[test]
    fn test_all_docs_page_missing_rows() {
        let error = serde_json::from_value::<AllDocsPage>(json!({"total_rows": 0}))
            .expect_err("rows is required");
        assert_eq!(error.classify(), serde_json::error::Category::Data);
    }
}
