//! Utility functions for volkeeper

use chrono::{DateTime, Utc};

/// Format of identities derived from a volume's creation time
const LEGACY_ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

/// Parse duration string (e.g., "30s", "5m", "1h", "7d")
pub fn parse_duration(s: &str) -> crate::Result<std::time::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let split = if s.ends_with("ms") {
        s.len() - 2
    } else {
        s.char_indices().last().map(|(i, _)| i).unwrap_or(0)
    };
    let (num_str, unit) = s.split_at(split);

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    let duration = match unit {
        "ms" => std::time::Duration::from_millis(num),
        "s" => std::time::Duration::from_secs(num),
        "m" => std::time::Duration::from_secs(num * 60),
        "h" => std::time::Duration::from_secs(num * 3600),
        "d" => std::time::Duration::from_secs(num * 86400),
        _ => {
            return Err(crate::Error::InvalidConfig(format!(
                "unknown duration unit: {}",
                unit
            )))
        }
    };

    Ok(duration)
}

/// Normalize a configured volume directory.
///
/// One trailing separator is stripped and the result is case-folded, so two
/// spellings of the same directory compare equal inside the pool.
pub fn normalize_path(raw: &str) -> crate::Result<String> {
    if raw.trim().is_empty() {
        return Err(crate::Error::InvalidConfig(
            "volume path cannot be empty".into(),
        ));
    }

    let mut path = raw;
    if path.len() > 1 && path.ends_with(std::path::is_separator) {
        path = &path[..path.len() - 1];
    }

    Ok(path.to_lowercase())
}

/// Identity used for volumes that were never assigned one
pub fn legacy_id(created: &DateTime<Utc>) -> String {
    created.format(LEGACY_ID_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            parse_duration("500ms").unwrap(),
            std::time::Duration::from_millis(500)
        );
        assert_eq!(
            parse_duration("30s").unwrap(),
            std::time::Duration::from_secs(30)
        );
        assert_eq!(
            parse_duration("5m").unwrap(),
            std::time::Duration::from_secs(300)
        );
        assert_eq!(
            parse_duration("1h").unwrap(),
            std::time::Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/Data/Store/").unwrap(), "/data/store");
        assert_eq!(normalize_path("/data/store").unwrap(), "/data/store");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert!(normalize_path("").is_err());
        assert!(normalize_path("   ").is_err());
    }

    #[test]
    fn test_legacy_id() {
        let created = Utc.with_ymd_and_hms(2007, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(legacy_id(&created), "20070314092653");
    }
}
