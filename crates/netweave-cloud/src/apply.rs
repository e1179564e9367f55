//! Apply outcome types

use serde::{Deserialize, Serialize};

/// Result of applying a resource graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Per-declaration outcomes, in apply order
    pub records: Vec<ApplyRecord>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            duration_ms: 0,
        }
    }

    /// True when every record succeeded
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.success)
    }

    pub fn created_count(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }

    /// The record that halted the apply, if any
    pub fn first_failure(&self) -> Option<&ApplyRecord> {
        self.records.iter().find(|r| !r.success)
    }

    pub fn add_success(&mut self, resource: String, message: String) {
        self.records.push(ApplyRecord {
            resource,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, resource: String, error: String) {
        self.records.push(ApplyRecord {
            resource,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome for a single declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRecord {
    /// Declaration name
    pub resource: String,

    /// Whether the declaration was applied
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if the apply halted here
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_result_success() {
        let mut result = ApplyResult::new();
        result.add_success("vpc".to_string(), "VPC created".to_string());
        result.add_success("igw".to_string(), "Internet gateway created".to_string());

        assert!(result.is_success());
        assert_eq!(result.created_count(), 2);
        assert!(result.first_failure().is_none());
    }

    #[test]
    fn test_apply_result_halts_at_failure() {
        let mut result = ApplyResult::new();
        result.add_success("vpc".to_string(), "VPC created".to_string());
        result.add_failure("igw".to_string(), "quota exceeded".to_string());

        assert!(!result.is_success());
        assert_eq!(result.created_count(), 1);
        assert_eq!(result.first_failure().unwrap().resource, "igw");
    }
}
