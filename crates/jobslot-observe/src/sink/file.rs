use std::{
    fs::{self, File, OpenOptions},
    io::{self, LineWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use jobslot_model::JobId;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;
use uuid::Uuid;

use super::{LogRecord, LogSink, SINK_TARGET, SinkFactory};

/// Writes one job's records to a file, one line per record.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    out: Mutex<LineWriter<File>>,
}

impl FileSink {
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            out: Mutex::new(LineWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write(&self, record: &LogRecord) {
        let ts = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(
            out,
            "{ts} {:>5} {}: {}",
            record.level, record.target, record.message
        ) {
            warn!(target: SINK_TARGET, path = %self.path.display(), error = %e, "job log write failed");
        }
    }

    fn flush(&self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = out.flush();
    }
}

/// [`SinkFactory`] that gives every job a `<dir>/<job-id>-<hash>.log` file.
///
/// The job id is reduced to filename-safe characters; the hash of the raw id keeps ids that reduce to the same name apart.
#[derive(Debug, Clone)]
pub struct FileSinks {
    dir: PathBuf,
}

impl FileSinks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &JobId) -> PathBuf {
        let name: String = id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_str().as_bytes())
            .simple()
            .to_string();
        self.dir.join(format!("{name}-{}.log", &digest[..8]))
    }
}

impl SinkFactory for FileSinks {
    fn for_job(&self, id: &JobId) -> Option<Arc<dyn LogSink>> {
        let path = self.path_for(id);
        let sink = fs::create_dir_all(&self.dir).and_then(|_| FileSink::create(&path));
        match sink {
            Ok(sink) => Some(Arc::new(sink)),
            Err(e) => {
                warn!(target: SINK_TARGET, job_id = %id, path = %path.display(), error = %e, "job log file unavailable; running without sink");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn writes_lines_to_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = FileSinks::new(dir.path().join("logs"));
        let id = JobId::from("train/7");

        let sink = sinks.for_job(&id).expect("sink");
        sink.write(&LogRecord {
            level: Level::INFO,
            target: "job".into(),
            message: "loss=0.25".into(),
        });
        sink.flush();

        let path = sinks.path_for(&id);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("train_7-") && name.ends_with(".log"), "{name}");
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("INFO job: loss=0.25"), "{text}");
    }

    #[test]
    fn ids_that_sanitize_alike_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = FileSinks::new(dir.path());
        let (slash, underscore) = (JobId::from("a/b"), JobId::from("a_b"));

        assert_ne!(sinks.path_for(&slash), sinks.path_for(&underscore));
        assert_eq!(sinks.path_for(&slash), sinks.path_for(&JobId::from("a/b")));

        let first = sinks.for_job(&slash).unwrap();
        let second = sinks.for_job(&underscore).unwrap();
        for (sink, message) in [(&first, "from a/b"), (&second, "from a_b")] {
            sink.write(&LogRecord {
                level: Level::INFO,
                target: "job".into(),
                message: message.into(),
            });
            sink.flush();
        }
        let text = fs::read_to_string(sinks.path_for(&underscore)).unwrap();
        assert!(text.contains("from a_b") && !text.contains("from a/b"), "{text}");
    }
}
