use anyhow::{Context, Result};
use std::io::SeekFrom;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::net::UdpSocket;
use tracing::warn;

/// Where pose samples come from. The tracker itself (marker detection,
/// camera calibration) is a separate process; this end only receives its
/// output, either live over UDP or replayed from a recording.
pub enum PoseSource {
    Udp(UdpSocket),
    File(BufReader<File>),
}

/// Replay cadence for file sources, roughly one camera frame.
const REPLAY_INTERVAL: Duration = Duration::from_millis(33);

impl PoseSource {
    pub async fn udp(bind: &str) -> Result<Self> {
        let sock = UdpSocket::bind(bind)
            .await
            .with_context(|| format!("bind pose socket {}", bind))?;
        Ok(Self::Udp(sock))
    }

    pub async fn file(path: &str) -> Result<Self> {
        let f = File::open(path)
            .await
            .with_context(|| format!("open pose replay file {}", path))?;
        Ok(Self::File(BufReader::new(f)))
    }

    /// Next sample, at the source's own cadence. Unparseable input is
    /// skipped with a warning rather than ending the stream.
    pub async fn next_sample(&mut self) -> Result<super::PoseSample> {
        loop {
            let line = match self {
                PoseSource::Udp(sock) => {
                    let mut buf = [0u8; 256];
                    let n = sock.recv(&mut buf).await.context("pose socket recv")?;
                    String::from_utf8_lossy(&buf[..n]).into_owned()
                }
                PoseSource::File(r) => {
                    let mut line = String::new();
                    let n = r.read_line(&mut line).await?;
                    if n == 0 {
                        // EOF: rewind and replay
                        r.get_mut().seek(SeekFrom::Start(0)).await?;
                        continue;
                    }
                    tokio::time::sleep(REPLAY_INTERVAL).await;
                    line
                }
            };
            match parse_pose_line(line.trim()) {
                Some(sample) => return Ok(sample),
                None => {
                    if !line.trim().is_empty() {
                        warn!("unparseable pose sample: {:?}", line.trim());
                    }
                }
            }
        }
    }
}

/// Tracker wire format: `tx,ty,tz,rx,ry,rz,detected` with detected as 0/1.
pub fn parse_pose_line(s: &str) -> Option<super::PoseSample> {
    let fields: Vec<&str> = s.split(',').map(str::trim).collect();
    if fields.len() != 7 {
        return None;
    }
    let mut v = [0.0f64; 6];
    for (slot, field) in v.iter_mut().zip(&fields[..6]) {
        *slot = field.parse().ok()?;
    }
    let detected = match fields[6] {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    Some(super::PoseSample {
        translation: [v[0], v[1], v[2]],
        rotation: [v[3], v[4], v[5]],
        detected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_a_detected_sample() {
        let s = parse_pose_line("0.1,0.2,0.3,0.0,0.0,1.57,1").unwrap();
        assert!(s.detected);
        assert_eq!(s.translation, [0.1, 0.2, 0.3]);
        assert_eq!(s.rotation, [0.0, 0.0, 1.57]);
    }

    #[test]
    fn rejects_short_and_garbled_lines() {
        assert!(parse_pose_line("").is_none());
        assert!(parse_pose_line("0.1,0.2,0.3").is_none());
        assert!(parse_pose_line("a,b,c,d,e,f,1").is_none());
        assert!(parse_pose_line("0,0,0,0,0,0,maybe").is_none());
    }

    #[tokio::test]
    async fn file_source_replays_samples() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "0.1,0.2,0.3,0.0,0.0,0.0,1").unwrap();
        writeln!(tmp, "not a pose line").unwrap();
        writeln!(tmp, "0.4,0.5,0.6,0.0,0.0,0.0,0").unwrap();
        tmp.flush().unwrap();

        let mut src = PoseSource::file(tmp.path().to_str().unwrap()).await.unwrap();
        let first = src.next_sample().await.unwrap();
        assert!(first.detected);
        // the garbled line is skipped
        let second = src.next_sample().await.unwrap();
        assert!(!second.detected);
        assert_eq!(second.translation, [0.4, 0.5, 0.6]);
        // EOF rewinds to the first sample
        let third = src.next_sample().await.unwrap();
        assert_eq!(third, first);
    }

    #[tokio::test]
    async fn udp_source_receives_datagrams() {
        let mut src = PoseSource::udp("127.0.0.1:0").await.unwrap();
        let addr = match &src {
            PoseSource::Udp(s) => s.local_addr().unwrap(),
            _ => unreachable!(),
        };
        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tx.send_to(b"1.0,2.0,3.0,0.1,0.2,0.3,1", addr).await.unwrap();
        let sample = src.next_sample().await.unwrap();
        assert!(sample.detected);
        assert_eq!(sample.translation, [1.0, 2.0, 3.0]);
    }
}
