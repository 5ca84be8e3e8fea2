//! Version sequencing over dotted numeric version strings

use crate::error::BoxerError;
use crate::ledger::Ledger;

/// Compute the working version for a run
///
/// The ledger's active version wins verbatim; an empty ledger falls back to
/// `"{default_major}.0"`.
pub fn current_version(ledger: &Ledger, default_major: u32) -> String {
    match ledger.active_version() {
        Some(version) => version.to_string(),
        None => format!("{default_major}.0"),
    }
}

/// Advance a dotted version by incrementing its final segment
///
/// No rollover or carry: `"1.9"` becomes `"1.10"`. The final segment must be a
/// plain non-negative integer, otherwise the version cannot be bumped.
pub fn next_version(version: &str) -> Result<String, BoxerError> {
    let mut segments: Vec<String> = version.split('.').map(str::to_string).collect();

    let last = segments
        .last()
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| BoxerError::InvalidVersionFormat {
            version: version.to_string(),
        })?;

    let incremented = last
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| BoxerError::InvalidVersionFormat {
            version: version.to_string(),
        })?;

    *segments.last_mut().unwrap() = incremented.to_string();
    Ok(segments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_next_version_increments_final_segment_only() {
        assert_eq!(next_version("1.0").unwrap(), "1.1");
        assert_eq!(next_version("2.3").unwrap(), "2.4");
        assert_eq!(next_version("1.2.3").unwrap(), "1.2.4");
        assert_eq!(next_version("7").unwrap(), "8");
    }

    #[test]
    fn test_next_version_no_carry() {
        assert_eq!(next_version("1.9").unwrap(), "1.10");
        assert_eq!(next_version("0.99").unwrap(), "0.100");
    }

    #[test]
    fn test_next_version_is_pure() {
        let input = "3.1".to_string();
        let first = next_version(&input).unwrap();
        let second = next_version(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(input, "3.1");
    }

    #[test]
    fn test_next_version_rejects_non_numeric_tail() {
        assert!(matches!(
            next_version("1.x"),
            Err(BoxerError::InvalidVersionFormat { version }) if version == "1.x"
        ));
        assert!(next_version("1.-2").is_err());
        assert!(next_version("1.+2").is_err());
        assert!(next_version("1.").is_err());
        assert!(next_version("").is_err());
    }

    #[test]
    fn test_next_version_rejects_unincrementable_segment() {
        let saturated = format!("1.{}", u64::MAX);
        assert!(matches!(
            next_version(&saturated),
            Err(BoxerError::InvalidVersionFormat { .. })
        ));
    }

    #[test]
    fn test_current_version_prefers_active() {
        let mut ledger = Ledger::default();
        ledger.set_active_version("2.3");
        assert_eq!(current_version(&ledger, 5), "2.3");
    }

    #[test]
    fn test_current_version_default_on_empty_ledger() {
        assert_eq!(current_version(&Ledger::default(), 1), "1.0");
        assert_eq!(current_version(&Ledger::default(), 0), "0.0");
    }
}
