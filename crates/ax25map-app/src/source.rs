use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where raw monitor lines come from.
pub trait LogSource {
    fn read_lines(&self) -> Result<Vec<String>>;
}

/// A monitor log on disk. Invalid UTF-8 is replaced rather than rejected,
/// since payload bytes routinely end up in the log.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSource for FileLogSource {
    fn read_lines(&self) -> Result<Vec<String>> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read log file {}", self.path.display()))?;
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Lines already in memory (stdin, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticLogSource {
    lines: Vec<String>,
}

impl StaticLogSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }
}

impl LogSource for StaticLogSource {
    fn read_lines(&self) -> Result<Vec<String>> {
        Ok(self.lines.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_source_is_lossy() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("listen.log");
        fs::write(&path, b"fm K6FB to ID ctl UI\n\xff\xfe payload\n")?;

        let lines = FileLogSource::new(&path).read_lines()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "fm K6FB to ID ctl UI");
        assert!(lines[1].ends_with(" payload"));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = FileLogSource::new("/nonexistent/ax25.log")
            .read_lines()
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read log file"));
    }
}
