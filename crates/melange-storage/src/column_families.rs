//! RocksDB column family definitions.

/// Identity records: record_handle → StoredIdentity
pub const CF_IDENTITIES: &str = "identities";

/// Identity address index: address → record_handle
pub const CF_IDENTITIES_BY_ADDRESS: &str = "identities_by_address";

/// Alias records: alias_handle → AliasRecord
pub const CF_ALIASES: &str = "aliases";

/// Aliases by identity index: (identity_handle, alias_handle) → alias_handle
pub const CF_ALIASES_BY_IDENTITY: &str = "aliases_by_identity";

/// Key-value settings: key → String (e.g. `current_identity`)
pub const CF_SETTINGS: &str = "settings";

/// Local user accounts: user_id → User
pub const CF_USERS: &str = "users";

/// Username index: username → user_id
pub const CF_USERS_BY_USERNAME: &str = "users_by_username";

/// Get all column family names
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        CF_IDENTITIES,
        CF_IDENTITIES_BY_ADDRESS,
        CF_ALIASES,
        CF_ALIASES_BY_IDENTITY,
        CF_SETTINGS,
        CF_USERS,
        CF_USERS_BY_USERNAME,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_column_families() {
        let cfs = all_column_families();
        let mut unique = std::collections::HashSet::new();

        for cf in &cfs {
            assert!(unique.insert(cf), "Duplicate column family: {}", cf);
        }
    }
}
