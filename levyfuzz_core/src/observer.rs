use crate::coverage::{CoverageSet, PointId};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix the coverage tool appends to a candidate's path to name its report.
pub const MAP_SUFFIX: &str = ".map";

#[derive(Error, Debug)]
pub enum CoverageMapError {
    #[error("Unable to read coverage map {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record whose identifier prefix is not an integer.
    #[error("Coverage map {path:?} appears corrupt at line {line}: {entry:?} is not a point identifier")]
    CorruptEntry {
        path: PathBuf,
        line: usize,
        entry: String,
    },
}

/// Location of the coverage report produced for the candidate at `input_path`.
pub fn map_path_for(input_path: &Path) -> PathBuf {
    let mut map_path = input_path.as_os_str().to_owned();
    map_path.push(MAP_SUFFIX);
    PathBuf::from(map_path)
}

/// Reads the coverage report at `path` into a [`CoverageSet`].
pub fn read_coverage_map(path: &Path) -> Result<CoverageSet, CoverageMapError> {
    let file = File::open(path).map_err(|source| CoverageMapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_coverage_map(BufReader::new(file), path)
}

/// Parses `<id>:<aux>` records, one per line.
///
/// Only the integer prefix before the first colon is kept; a line without a
/// colon is taken whole. Blank lines are skipped. `source_path` is used for
/// error reporting only.
pub fn parse_coverage_map<R: BufRead>(
    reader: R,
    source_path: &Path,
) -> Result<CoverageSet, CoverageMapError> {
    let mut coverage = CoverageSet::empty();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| CoverageMapError::Io {
            path: source_path.to_path_buf(),
            source,
        })?;
        let record = line.trim();
        if record.is_empty() {
            continue;
        }

        let id_part = record.split(':').next().unwrap_or(record);
        let id: PointId = id_part
            .parse()
            .map_err(|_| CoverageMapError::CorruptEntry {
                path: source_path.to_path_buf(),
                line: index + 1,
                entry: id_part.to_string(),
            })?;
        coverage.add(id);
    }

    Ok(coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn map_path_appends_suffix() {
        let path = Path::new("/tmp/out/aB3dE5gH7j");
        assert_eq!(map_path_for(path), PathBuf::from("/tmp/out/aB3dE5gH7j.map"));
    }

    #[test]
    fn parses_showmap_records() {
        let report = "000001:1\n000042:3\n000001:2\n\n65535:128\n";
        let coverage = parse_coverage_map(Cursor::new(report), Path::new("t.map")).unwrap();

        assert_eq!(coverage.len(), 3);
        assert!(coverage.contains(1));
        assert!(coverage.contains(42));
        assert!(coverage.contains(65535));
    }

    #[test]
    fn empty_report_yields_empty_set() {
        let coverage = parse_coverage_map(Cursor::new(""), Path::new("t.map")).unwrap();
        assert!(coverage.is_empty());
    }

    #[test]
    fn last_record_without_newline_is_kept() {
        let coverage = parse_coverage_map(Cursor::new("7:1\n9:1"), Path::new("t.map")).unwrap();
        assert_eq!(coverage, CoverageSet::new([7, 9]));
    }

    #[test]
    fn negative_id_is_accepted() {
        let coverage = parse_coverage_map(Cursor::new("-3:1\n5:2\n"), Path::new("t.map")).unwrap();
        assert!(coverage.contains(-3));
        assert_eq!(coverage.len(), 2);
    }

    #[test]
    fn id_wider_than_32_bits_is_accepted() {
        let coverage =
            parse_coverage_map(Cursor::new("4294967296:1\n"), Path::new("t.map")).unwrap();
        assert!(coverage.contains(4_294_967_296));
        assert!(!coverage.contains(0));
    }

    #[test]
    fn non_numeric_prefix_is_corruption() {
        let report = "000001:1\nzz12:4\n";
        let err = parse_coverage_map(Cursor::new(report), Path::new("t.map")).unwrap_err();
        match err {
            CoverageMapError::CorruptEntry { line, entry, .. } => {
                assert_eq!(line, 2);
                assert_eq!(entry, "zz12");
            }
            other => panic!("Expected CorruptEntry, got {other:?}"),
        }
    }

    #[test]
    fn missing_report_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_coverage_map(&dir.path().join("absent.map")).unwrap_err();
        assert!(matches!(err, CoverageMapError::Io { .. }));
    }

    #[test]
    fn reads_report_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.map");
        std::fs::write(&path, "3:1\n4:1\n").unwrap();

        let coverage = read_coverage_map(&path).unwrap();
        assert_eq!(coverage, CoverageSet::new([3, 4]));
    }
}
