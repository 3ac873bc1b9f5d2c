// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for load simulation.

/// Generate a pool of distinct client keys in the 10.x.x.x range.
pub fn generate_client_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            format!("10.{a}.{b}.{c}")
        })
        .collect()
}

/// Generate a pool of distinct cache signatures shaped like real office
/// lookups.
pub fn generate_signatures(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "GET:/api/v1/post-offices/nearby?latitude={}&longitude={}&radius=5000",
                43.0 + (i % 50) as f64 / 100.0,
                1.0 + (i / 50) as f64 / 100.0,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_keys_are_unique() {
        let keys = generate_client_keys(512);
        assert_eq!(keys.len(), 512);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 512);
    }

    #[test]
    fn test_signatures_are_unique() {
        let signatures = generate_signatures(200);
        let unique: std::collections::HashSet<_> = signatures.iter().collect();
        assert_eq!(unique.len(), 200);
        assert!(signatures[0].starts_with("GET:/api/v1/post-offices/nearby?"));
    }
}
