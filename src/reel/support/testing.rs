//! Scripted media engine for tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::ffmpeg::{FfmpegFailure, FfmpegRunOptions, FfmpegRunner};

/// What the fake saw when ffmpeg would have run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub args: Vec<String>,
    /// Files in the watched directory at call time, by file name
    pub watched: BTreeMap<String, String>,
    /// Contents of the concat list passed with `-f concat`, if any
    pub concat_list: Option<String>,
}

type FailRule = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// Records every invocation and writes a plausible output file.
///
/// Segment runs write `segment:<audio file name>`; concat runs write the
/// inputs' contents joined by `|`, in list order.
pub struct ScriptedRunner {
    records: Mutex<Vec<RunRecord>>,
    fail_when: Option<FailRule>,
    timeout_when: Option<FailRule>,
    probe: Option<f64>,
    watch_dir: Option<PathBuf>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_when: None,
            timeout_when: None,
            probe: None,
            watch_dir: None,
        }
    }

    pub fn probing(mut self, seconds: f64) -> Self {
        self.probe = Some(seconds);
        self
    }

    pub fn failing_when(mut self, rule: impl Fn(&[String]) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(rule));
        self
    }

    /// Report a timeout, as a killed ffmpeg would, for matching calls.
    pub fn timing_out_when(mut self, rule: impl Fn(&[String]) -> bool + Send + Sync + 'static) -> Self {
        self.timeout_when = Some(Box::new(rule));
        self
    }

    pub fn watching(mut self, dir: &Path) -> Self {
        self.watch_dir = Some(dir.to_path_buf());
        self
    }

    pub fn records(&self) -> Vec<RunRecord> {
        self.records.lock().expect("records lock").clone()
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        let Some(dir) = &self.watch_dir else {
            return files;
        };
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                let contents = std::fs::read_to_string(entry.path()).unwrap_or_default();
                files.insert(name, contents);
            }
        }
        files
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn inputs(args: &[String]) -> Vec<&str> {
    args.iter()
        .enumerate()
        .filter(|(_, a)| *a == "-i")
        .filter_map(|(i, _)| args.get(i + 1).map(String::as_str))
        .collect()
}

fn list_paths(list: &str) -> Vec<PathBuf> {
    list.lines()
        .filter_map(|line| line.strip_prefix("file '"))
        .filter_map(|rest| rest.strip_suffix('\''))
        .map(|escaped| PathBuf::from(escaped.replace("'\\''", "'")))
        .collect()
}

#[async_trait]
impl FfmpegRunner for ScriptedRunner {
    async fn run(&self, args: &[String], _options: FfmpegRunOptions) -> Result<(), FfmpegFailure> {
        let concat_list = (value_after(args, "-f") == Some("concat"))
            .then(|| inputs(args).first().map(|p| std::fs::read_to_string(p).unwrap_or_default()))
            .flatten();

        self.records.lock().expect("records lock").push(RunRecord {
            args: args.to_vec(),
            watched: self.snapshot(),
            concat_list: concat_list.clone(),
        });

        if let Some(rule) = &self.timeout_when
            && rule(args)
        {
            return Err(FfmpegFailure::Timeout { seconds: 5 });
        }
        if let Some(rule) = &self.fail_when
            && rule(args)
        {
            return Err(FfmpegFailure::Exit {
                code: Some(1),
                diagnostic: "Error: scripted failure".to_string(),
            });
        }

        let output = PathBuf::from(args.last().cloned().unwrap_or_default());
        let contents = match concat_list {
            Some(list) => list_paths(&list)
                .iter()
                .map(|p| std::fs::read_to_string(p).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("|"),
            None => {
                let audio = inputs(args).get(1).copied().unwrap_or_default();
                let name = Path::new(audio)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("segment:{name}")
            }
        };
        std::fs::write(&output, contents)?;
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        self.probe
            .ok_or_else(|| anyhow!("probe disabled for {}", path.display()))
    }
}
