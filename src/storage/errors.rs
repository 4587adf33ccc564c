//! # Storage Errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Collection or record is missing
    #[error("{0}")]
    DoesNotExist(String),

    /// Record shape rejected by the store
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Seed file could not be read or decoded
    #[error("Seed data error: {0}")]
    Seed(String),

    /// Internal lock failure
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Missing collection
    pub fn missing_collection() -> Self {
        Self::DoesNotExist("Collection does not exist".to_string())
    }

    /// Missing record within an existing collection
    pub fn missing_entry(id: &str) -> Self {
        Self::DoesNotExist(format!("Entry does not exist: {}", id))
    }

    /// Whether this is the "does not exist" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DoesNotExist(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        assert!(StorageError::missing_collection()
            .to_string()
            .contains("does not exist"));
        assert_eq!(
            StorageError::missing_entry("abc").to_string(),
            "Entry does not exist: abc"
        );
        assert!(StorageError::missing_entry("abc").is_not_found());
        assert!(!StorageError::LockPoisoned.is_not_found());
    }
}
