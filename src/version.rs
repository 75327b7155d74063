//! `major.minor.patch` ordering for client version checks.

/// Packs a version into `major·10000 + minor·100 + patch`.
///
/// Missing components count as zero. Components of 100 or more spill into
/// the next field, which matches how published versions have been compared.
pub fn version_to_number(version: &str) -> Option<u64> {
    let mut parts = version.trim().split('.').map(|p| p.parse::<u64>());
    let mut next = || parts.next().transpose().map(Option::unwrap_or_default);
    let major = next().ok()?;
    let minor = next().ok()?;
    let patch = next().ok()?;
    Some(major * 10_000 + minor * 100 + patch)
}

/// Whether `a` is strictly newer than `b`. Unparsable versions are never newer.
pub fn is_newer(a: &str, b: &str) -> bool {
    match (version_to_number(a), version_to_number(b)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        assert_eq!(version_to_number("1.2.3"), Some(10_203));
        assert_eq!(version_to_number("0.10.0"), Some(1_000));
        assert_eq!(version_to_number("2"), Some(20_000));
        assert_eq!(version_to_number("1.x.0"), None);
    }

    #[test]
    fn test_ordering() {
        assert!(is_newer("1.0.10", "1.0.9"));
        assert!(is_newer("1.1.0", "1.0.99"));
        assert!(!is_newer("1.0.0", "1.0.0"));
        assert!(!is_newer("junk", "0.0.1"));
        assert!(is_newer(env!("CARGO_PKG_VERSION"), "0.0.0"));
    }
}
