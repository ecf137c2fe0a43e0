use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Command feed written by the external automatic controller. Read in full
/// every poll; the last line wins. The line is taken verbatim with no shape
/// validation, so a malformed feed propagates straight into the published
/// command (known gap of the protocol, see crate docs).
#[derive(Debug, Clone)]
pub struct CommandFeed {
    path: PathBuf,
}

impl CommandFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet or holds no lines; the
    /// caller keeps its previous command and retries next tick.
    pub async fn read_latest(&self) -> Result<Option<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read command feed {}", self.path.display()))
            }
        };
        Ok(content.lines().last().map(str::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_a_silent_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let feed = CommandFeed::new(dir.path().join("trpy.csv"));
        assert_eq!(feed.read_latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trpy.csv");
        tokio::fs::write(&path, "").await.unwrap();
        assert_eq!(CommandFeed::new(&path).read_latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_line_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trpy.csv");
        tokio::fs::write(&path, "1100,1500,1500,1500\n1200,1510,1490,1500\n")
            .await
            .unwrap();
        assert_eq!(
            CommandFeed::new(&path).read_latest().await.unwrap(),
            Some("1200,1510,1490,1500".to_owned())
        );
    }

    #[tokio::test]
    async fn malformed_lines_propagate_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trpy.csv");
        tokio::fs::write(&path, "1100,1500,1500,1500\ngarbage,,\n")
            .await
            .unwrap();
        assert_eq!(
            CommandFeed::new(&path).read_latest().await.unwrap(),
            Some("garbage,,".to_owned())
        );
    }
}
