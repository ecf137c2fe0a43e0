use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// One snapshot of the whole control state, shared by the pose export and
/// the flight log. Field order is fixed; the external controller indexes
/// columns positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub elapsed_s: f64,
    pub state: u8,
    pub mode: u8,
    pub regulator: u8,
    pub filter: u8,
    pub throttle: i32,
    pub roll: i32,
    pub pitch: i32,
    pub yaw: i32,
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
    pub setpoint: [f64; 3],
}

impl ExportRecord {
    pub fn to_csv_line(&self) -> String {
        let mut line = format!(
            "{:.3},{},{},{},{},{},{},{},{}",
            self.elapsed_s,
            self.state,
            self.mode,
            self.regulator,
            self.filter,
            self.throttle,
            self.roll,
            self.pitch,
            self.yaw
        );
        for v in self
            .translation
            .iter()
            .chain(&self.rotation)
            .chain(&self.setpoint)
        {
            line.push(',');
            line.push_str(&format!("{}", v));
        }
        line
    }
}

/// Pose export file: one CSV line, fully rewritten on every publish so the
/// external controller always polls a complete, current snapshot. A state
/// code of 0 in the record tells it to shut down.
#[derive(Debug, Clone)]
pub struct PoseExport {
    path: PathBuf,
}

impl PoseExport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, record: &ExportRecord) -> Result<()> {
        let mut line = record.to_csv_line();
        line.push('\n');
        tokio::fs::write(&self.path, line)
            .await
            .with_context(|| format!("write pose export {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExportRecord {
        ExportRecord {
            elapsed_s: 1.5,
            state: 1,
            mode: 1,
            regulator: 2,
            filter: 0,
            throttle: 1200,
            roll: 1500,
            pitch: 1480,
            yaw: 1520,
            translation: [0.1, 0.2, 0.3],
            rotation: [0.0, 0.0, 1.5],
            setpoint: [0.0, 0.0, 0.8],
        }
    }

    #[test]
    fn csv_line_has_the_fixed_column_order() {
        assert_eq!(
            sample().to_csv_line(),
            "1.500,1,1,2,0,1200,1500,1480,1520,0.1,0.2,0.3,0,0,1.5,0,0,0.8"
        );
    }

    #[tokio::test]
    async fn export_overwrites_instead_of_appending() {
        let dir = tempfile::tempdir().unwrap();
        let export = PoseExport::new(dir.path().join("pose.csv"));

        export.write(&sample()).await.unwrap();
        let mut second = sample();
        second.state = 0;
        export.write(&second).await.unwrap();

        let content = tokio::fs::read_to_string(export.path()).await.unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("1.500,0,"));
    }
}
