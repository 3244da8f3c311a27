/*!
    Two-pass statistics files.

    The first pass appends encoder statistics to
    `{output}-{vo-lavc|ao-lavc}-pass1.log`; the second pass reads the whole
    file back before the encoder is opened. The statistics are opaque bytes;
    failing to open or use either side only disables that pass.
*/

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use encode_types::Medium;

use crate::options::{Dictionary, value_has_flag};

/**
    Log file name prefix for a medium.
*/
pub fn log_prefix(medium: Medium) -> &'static str {
    match medium {
        Medium::Video => "vo-lavc",
        Medium::Audio => "ao-lavc",
    }
}

/**
    Path of the first-pass log for `medium` next to `output`.
*/
pub fn log_path(output: &str, medium: Medium) -> PathBuf {
    PathBuf::from(format!("{output}-{}-pass1.log", log_prefix(medium)))
}

/**
    First-pass statistics sink.
*/
#[derive(Debug)]
pub struct TwoPassLog {
    medium: Medium,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TwoPassLog {
    /**
        Create (truncate) the log at `path`.
    */
    pub fn create(medium: Medium, path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            medium,
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
        Append statistics text. A write failure closes the log with a warning.
    */
    pub fn write(&mut self, stats: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_all(stats.as_bytes()) {
            warn!(medium = %self.medium, path = %self.path.display(), error = %e, "could not write pass 1 log, closing it");
            self.writer = None;
        }
    }

    /**
        Flush and close the log.
    */
    pub fn close(mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!(medium = %self.medium, path = %self.path.display(), error = %e, "could not flush pass 1 log");
            }
        }
    }
}

/**
    Result of preparing a stream for two-pass encoding.
*/
#[derive(Debug, Default)]
pub struct TwoPassSetup {
    /// Statistics of a previous pass, to hand to the encoder.
    pub stats_in: Option<Vec<u8>>,
    /// Sink for this pass's statistics.
    pub log: Option<TwoPassLog>,
}

/**
    Read and/or create the pass log according to the `flags` option in
    `options`. A pass that cannot get its file is removed from `flags`.
*/
pub fn prepare(output: &str, medium: Medium, options: &mut Dictionary) -> TwoPassSetup {
    let path = log_path(output, medium);
    let flags = options.get("flags").unwrap_or("").to_string();
    let mut setup = TwoPassSetup::default();

    if value_has_flag(&flags, "pass2") {
        match fs::read(&path) {
            Ok(stats) if stats.contains(&0) => {
                warn!(%medium, path = %path.display(), "pass 1 log contains a NUL byte, disabling 2-pass encoding at pass 2");
                options.set("flags", "-pass2", true);
            }
            Ok(stats) => {
                debug!(%medium, path = %path.display(), bytes = stats.len(), "read pass 1 log");
                setup.stats_in = Some(stats);
            }
            Err(e) => {
                warn!(%medium, path = %path.display(), error = %e, "could not open pass 1 log, disabling 2-pass encoding at pass 2");
                options.set("flags", "-pass2", true);
            }
        }
    }

    if value_has_flag(&flags, "pass1") {
        match TwoPassLog::create(medium, &path) {
            Ok(log) => setup.log = Some(log),
            Err(e) => {
                warn!(%medium, path = %path.display(), error = %e, "could not open pass 1 log, disabling 2-pass encoding at pass 1");
                options.set("flags", "-pass1", true);
            }
        }
    }

    setup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(value: &str) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("flags", value, false);
        dict
    }

    #[test]
    fn path_layout() {
        assert_eq!(
            log_path("/tmp/out.mkv", Medium::Video),
            PathBuf::from("/tmp/out.mkv-vo-lavc-pass1.log")
        );
        assert_eq!(
            log_path("out.mkv", Medium::Audio),
            PathBuf::from("out.mkv-ao-lavc-pass1.log")
        );
    }

    #[test]
    fn pass1_writes_log() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mkv");
        let output = output.to_str().unwrap();

        let mut options = flags("+pass1");
        let setup = prepare(output, Medium::Video, &mut options);
        let mut log = setup.log.unwrap();
        assert!(setup.stats_in.is_none());
        log.write("frame 0\n");
        log.write("frame 1\n");
        log.close();

        let written = fs::read_to_string(log_path(output, Medium::Video)).unwrap();
        assert_eq!(written, "frame 0\nframe 1\n");
        assert_eq!(options.get("flags"), Some("+pass1"));
    }

    #[test]
    fn pass2_reads_log() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mkv");
        let output = output.to_str().unwrap();
        fs::write(log_path(output, Medium::Audio), "stats").unwrap();

        let mut options = flags("+pass2");
        let setup = prepare(output, Medium::Audio, &mut options);
        assert_eq!(setup.stats_in.as_deref(), Some(&b"stats"[..]));
        assert!(setup.log.is_none());
    }

    #[test]
    fn pass2_keeps_non_utf8_log() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mkv");
        let output = output.to_str().unwrap();
        let stats = b"in:0 out:0 type:1 q:\xff\xfe;\n\x80\x81".to_vec();
        fs::write(log_path(output, Medium::Video), &stats).unwrap();

        let mut options = flags("+pass2");
        let setup = prepare(output, Medium::Video, &mut options);
        assert_eq!(setup.stats_in, Some(stats));
        assert_eq!(options.get("flags"), Some("+pass2"));
    }

    #[test]
    fn nul_in_pass2_log_disables_pass2() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mkv");
        let output = output.to_str().unwrap();
        fs::write(log_path(output, Medium::Video), b"in:0\0out:0;\n").unwrap();

        let mut options = flags("+pass2");
        let setup = prepare(output, Medium::Video, &mut options);
        assert!(setup.stats_in.is_none());
        assert!(!value_has_flag(options.get("flags").unwrap(), "pass2"));
    }

    #[test]
    fn missing_pass2_log_disables_pass2() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing.mkv");

        let mut options = flags("+pass2");
        let setup = prepare(output.to_str().unwrap(), Medium::Video, &mut options);
        assert!(setup.stats_in.is_none());
        assert!(!value_has_flag(options.get("flags").unwrap(), "pass2"));
    }

    #[test]
    fn unwritable_pass1_log_disables_pass1() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("no/such/dir/out.mkv");

        let mut options = flags("+pass1");
        let setup = prepare(output.to_str().unwrap(), Medium::Video, &mut options);
        assert!(setup.log.is_none());
        assert_eq!(options.get("flags"), Some("+pass1-pass1"));
    }

    #[test]
    fn no_flags_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mkv");
        let mut options = Dictionary::new();
        let setup = prepare(output.to_str().unwrap(), Medium::Video, &mut options);
        assert!(setup.log.is_none() && setup.stats_in.is_none());
        assert!(!log_path(output.to_str().unwrap(), Medium::Video).exists());
    }
}
