//! Provider filename conventions
//!
//! SEVIRI rapid-scan files are named
//! `MSG<n>-SEVI-MSG15-0100-NA-<YYYYMMDDHHMMSS>...<ext>` with the
//! acquisition timestamp embedded after the fifth hyphen. The compressed
//! archive is partitioned by that timestamp down to the minute, so a file
//! acquired at 2020-06-01 12:04:15 lands under `2020/06/01/12/04/`.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^MSG[0-9]-SEVI-MSG15-0100-NA-(\d{14})")
        .expect("timestamp pattern always compiles")
});

/// Parse the acquisition timestamp embedded in a provider filename.
///
/// Returns `None` when the name does not follow the provider convention.
pub fn embedded_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let captures = TIMESTAMP_RE.captures(filename)?;
    NaiveDateTime::parse_from_str(&captures[1], "%Y%m%d%H%M%S").ok()
}

/// Minute-resolution partition path for an acquisition timestamp,
/// `YYYY/MM/DD/HH/MM`.
pub fn partition_path(timestamp: NaiveDateTime) -> PathBuf {
    PathBuf::from(timestamp.format("%Y/%m/%d/%H/%M").to_string())
}

/// Destination of a compressed artifact inside the partitioned tree.
///
/// Returns `<root>/<YYYY>/<MM>/<DD>/<HH>/<MM>/<filename>` when the filename
/// carries an embedded timestamp.
pub fn partitioned_destination(root: &Path, filename: &str) -> Option<PathBuf> {
    let timestamp = embedded_timestamp(filename)?;
    Some(root.join(partition_path(timestamp)).join(filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_embedded_timestamp() {
        let parsed =
            embedded_timestamp("MSG3-SEVI-MSG15-0100-NA-20200601120415.883000000Z-NA.nat");
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2020, 6, 1).and_then(|d| d.and_hms_opt(12, 4, 15))
        );
    }

    #[test]
    fn test_embedded_timestamp_rejects_foreign_names() {
        assert_eq!(embedded_timestamp("EOPMetadata.xml"), None);
        assert_eq!(embedded_timestamp("GOES16-ABI-20200601120415.nc"), None);
    }

    #[test]
    fn test_partitioned_destination() {
        let name = "MSG3-SEVI-MSG15-0100-NA-20200601120415.883000000Z-NA.nat.bz2";
        let destination = partitioned_destination(Path::new("/archive"), name);
        assert_eq!(
            destination,
            Some(PathBuf::from(format!("/archive/2020/06/01/12/04/{name}")))
        );
    }
}
