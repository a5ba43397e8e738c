//! Claims JSONL tailer
//!
//! Reads complete lines past a byte offset. A partial trailing line is
//! left for the next pass; the returned offset never lands mid-line.

use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use wingman_types::ClaimRecord;

pub struct ClaimsTailer {
    path: PathBuf,
}

impl ClaimsTailer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reads records appended since `offset`. Returns the parsed
    /// records and the new offset. A missing file yields nothing; a
    /// shrunken file (rotation) restarts from zero.
    pub fn read_from(&self, offset: u64) -> std::io::Result<(Vec<ClaimRecord>, u64)> {
        let mut file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Vec::new(), offset))
            }
            Err(e) => return Err(e),
        };

        let len = file.metadata()?.len();
        let mut offset = offset;
        if len < offset {
            tracing::warn!(path = %self.path.display(), "claims log shrank, restarting from zero");
            offset = 0;
        }
        if len == offset {
            return Ok((Vec::new(), offset));
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;

        let mut records = Vec::new();
        let mut consumed = 0usize;
        for line in buffer.split_inclusive('\n') {
            if !line.ends_with('\n') {
                break;
            }
            consumed += line.len();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ClaimRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparseable claims line");
                }
            }
        }

        Ok((records, offset + consumed as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wingman_types::ClaimStatus;

    fn claim_line(worker_id: &str, status: ClaimStatus) -> String {
        let record = ClaimRecord::new(worker_id, "restarted the api", status);
        serde_json::to_string(&record).unwrap()
    }

    #[test]
    fn reads_new_lines_and_advances_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.jsonl");
        std::fs::write(
            &path,
            format!(
                "{}\n{}\n",
                claim_line("w1", ClaimStatus::False),
                claim_line("w2", ClaimStatus::True)
            ),
        )
        .unwrap();

        let tailer = ClaimsTailer::new(&path);
        let (records, offset) = tailer.read_from(0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].worker_id, "w1");

        // Nothing new past the cursor.
        let (records, same) = tailer.read_from(offset).unwrap();
        assert!(records.is_empty());
        assert_eq!(same, offset);

        // An appended line is picked up from where we left off.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{}", claim_line("w3", ClaimStatus::Unverifiable)).unwrap();
        let (records, _) = tailer.read_from(offset).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].worker_id, "w3");
    }

    #[test]
    fn partial_trailing_line_is_deferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.jsonl");
        let complete = claim_line("w1", ClaimStatus::False);
        std::fs::write(&path, format!("{complete}\n{{\"worker_id\":\"w2\"")).unwrap();

        let tailer = ClaimsTailer::new(&path);
        let (records, offset) = tailer.read_from(0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(offset, complete.len() as u64 + 1);
    }

    #[test]
    fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tailer = ClaimsTailer::new(dir.path().join("absent.jsonl"));
        let (records, offset) = tailer.read_from(0).unwrap();
        assert!(records.is_empty());
        assert_eq!(offset, 0);
    }

    #[test]
    fn shrunken_file_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.jsonl");
        std::fs::write(&path, format!("{}\n", claim_line("w1", ClaimStatus::False))).unwrap();

        let tailer = ClaimsTailer::new(&path);
        let (_, offset) = tailer.read_from(0).unwrap();

        // Rotation: smaller file, stale offset.
        std::fs::write(&path, format!("{}\n", claim_line("w9", ClaimStatus::True))).unwrap();
        let big_offset = offset + 10_000;
        let (records, new_offset) = tailer.read_from(big_offset).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].worker_id, "w9");
        assert!(new_offset <= offset + 5);
    }

    #[test]
    fn garbage_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.jsonl");
        std::fs::write(
            &path,
            format!("not json at all\n{}\n", claim_line("w1", ClaimStatus::False)),
        )
        .unwrap();

        let tailer = ClaimsTailer::new(&path);
        let (records, _) = tailer.read_from(0).unwrap();
        assert_eq!(records.len(), 1);
    }
}
