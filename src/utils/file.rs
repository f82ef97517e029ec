use log::debug;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

/// Read a small sysfs-style text file and return its lines with trailing whitespace removed.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let start = Instant::now();
    let contents = fs::read_to_string(path)?;
    let lines = contents
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect();

    debug!("read_lines({}) took: {} ms", path.display(), start.elapsed().as_millis());
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_lines_trims_line_endings() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"first  \r\nsecond\n").unwrap();

        let lines = read_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_read_lines_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_lines(&dir.path().join("nope")).is_err());
    }
}
