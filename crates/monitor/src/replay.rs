//! Recorded landmark streams
//!
//! A recording is JSON lines, one [`LandmarkFrame`] per line. Blank lines
//! and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::pipeline::LandmarkFrame;
use crate::MonitorError;

/// Parse a recording from any buffered reader
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<LandmarkFrame>, MonitorError> {
    let mut frames = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let frame = serde_json::from_str(trimmed).map_err(|source| MonitorError::Recording {
            line: index + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Load a recording file
pub fn load_recording(path: &Path) -> Result<Vec<LandmarkFrame>, MonitorError> {
    let file = File::open(path)?;
    let frames = read_frames(BufReader::new(file))?;
    info!("Loaded {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RECORDING: &str = concat!(
        "# eyes closed, then no face\n",
        r#"{"timestamp":"2024-05-01T08:00:00Z","face":{"left_eye":["#,
        r#"{"x":0.4,"y":0.5},{"x":0.42,"y":0.51},{"x":0.4,"y":0.5},"#,
        r#"{"x":0.45,"y":0.5},{"x":0.5,"y":0.5},{"x":0.47,"y":0.51}],"#,
        r#""right_eye":null,"outer_lips":null}}"#,
        "\n",
        r#"{"timestamp":"2024-05-01T08:00:00.100Z","face":null}"#,
        "\n\n",
        r#"{"timestamp":"2024-05-01T08:00:00.200Z"}"#,
        "\n"
    );

    #[test]
    fn test_reads_frames() {
        let frames = read_frames(Cursor::new(RECORDING)).unwrap();
        assert_eq!(frames.len(), 3);

        let face = frames[0].face.as_ref().unwrap();
        assert_eq!(face.left_eye.as_ref().map(Vec::len), Some(6));
        assert!(face.right_eye.is_none());
        assert!(frames[1].face.is_none());
        assert!(frames[2].face.is_none());
        assert!(frames[1].timestamp < frames[2].timestamp);
    }

    #[test]
    fn test_reports_bad_line() {
        let input = "{\"timestamp\":\"2024-05-01T08:00:00Z\"}\n{\"timestamp\": 12\n";
        match read_frames(Cursor::new(input)) {
            Err(MonitorError::Recording { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected recording error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_recording(Path::new("/nonexistent/recording.jsonl"));
        assert!(matches!(result, Err(MonitorError::Io(_))));
    }
}
