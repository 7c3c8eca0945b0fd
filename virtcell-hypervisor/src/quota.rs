//! Quota enforcement.
//!
//! Pure functions over snapshots the caller supplies. The inventory store
//! computes the sums; nothing here performs I/O, so the math is testable in
//! isolation. All validation runs before any command is constructed.

use crate::error::{HypervisorError, Result};

/// Memory available for new machines, in MiB.
pub fn remaining_memory(max_mib: i64, used_mib: i64) -> i64 {
    max_mib - used_mib
}

/// Storage available for new volumes, in GiB.
pub fn remaining_storage(max_gib: i64, used_gib: i64) -> i64 {
    max_gib - used_gib
}

/// Validate a proposed memory allocation against the quota.
///
/// Fails iff `requested < 0`, `requested > max`, or `requested > remaining`.
pub fn validate_memory_request(requested: i64, max_mib: i64, remaining_mib: i64) -> Result<()> {
    if requested < 0 || requested > max_mib || requested > remaining_mib {
        return Err(HypervisorError::ImpossibleMemoryAllocation {
            requested,
            quota: max_mib,
            remaining: remaining_mib,
        });
    }
    Ok(())
}

/// Validate a proposed storage allocation against the quota.
///
/// Same law as memory, in the storage domain.
pub fn validate_storage_request(requested: i64, max_gib: i64, remaining_gib: i64) -> Result<()> {
    if requested < 0 || requested > max_gib || requested > remaining_gib {
        return Err(HypervisorError::ImpossibleStorageAllocation {
            requested,
            quota: max_gib,
            remaining: remaining_gib,
        });
    }
    Ok(())
}

/// Validate an architecture against the connection's supported set.
pub fn validate_architecture(requested: &str, supported: &[String]) -> Result<()> {
    if !supported.iter().any(|s| s == requested) {
        return Err(HypervisorError::InvalidArchitecture {
            requested: requested.to_string(),
            supported: supported.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_memory_subtracts_used() {
        assert_eq!(remaining_memory(8192, 6000), 2192);
        assert_eq!(remaining_storage(500, 120), 380);
    }

    #[test]
    fn memory_request_within_quota_passes() {
        assert!(validate_memory_request(2000, 8192, 2192).is_ok());
        // Exactly the remaining amount is still admissible
        assert!(validate_memory_request(2192, 8192, 2192).is_ok());
        assert!(validate_memory_request(0, 8192, 2192).is_ok());
    }

    #[test]
    fn memory_request_over_remaining_fails() {
        let err = validate_memory_request(3000, 8192, 2192).unwrap_err();
        match err {
            HypervisorError::ImpossibleMemoryAllocation {
                requested,
                quota,
                remaining,
            } => {
                assert_eq!(requested, 3000);
                assert_eq!(quota, 8192);
                assert_eq!(remaining, 2192);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_memory_request_fails() {
        assert!(validate_memory_request(-1, 8192, 8192).is_err());
    }

    #[test]
    fn memory_request_over_quota_fails_even_with_room() {
        // ceiling check is independent of the remaining amount
        assert!(validate_memory_request(9000, 8192, 10000).is_err());
    }

    #[test]
    fn storage_request_follows_same_law() {
        assert!(validate_storage_request(100, 500, 380).is_ok());
        assert!(validate_storage_request(400, 500, 380).is_err());
        assert!(validate_storage_request(-5, 500, 380).is_err());
        assert!(validate_storage_request(600, 500, 500).is_err());
    }

    #[test]
    fn architecture_membership() {
        let supported = vec!["x86_64".to_string(), "arm64".to_string()];
        assert!(validate_architecture("x86_64", &supported).is_ok());

        let err = validate_architecture("mips", &supported).unwrap_err();
        match err {
            HypervisorError::InvalidArchitecture { requested, .. } => {
                assert_eq!(requested, "mips");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
