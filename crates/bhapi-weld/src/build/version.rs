//! Version resolution
//!
//! The version comes from `git describe` restricted to `v<digit>*` tags,
//! reduced to `<version>-<commits-since-tag>`. When git is missing, fails,
//! times out or prints something unrecognizable, the first line of a
//! static version file is used instead.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

lazy_static! {
    /// Captures `1.2.3-47` from `v1.2.3-47-gabc1234`
    static ref DESCRIBE_REGEX: Regex = Regex::new(r".*v(.+-\d+)-").unwrap();
}

/// Arguments passed to git
pub const DESCRIBE_ARGS: &[&str] = &["describe", "--tags", "--long", "--match", "v[0-9]*"];

/// Default bound on the git invocation
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors that can occur during version resolution
#[derive(Debug, Error)]
pub enum VersionError {
    /// Neither git nor the fallback file produced a version
    #[error(
        "version unavailable: {reason}; fallback file {path} could not be read: {source}",
        path = .path.display()
    )]
    Unavailable {
        reason: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The fallback file exists but holds no version
    #[error("version unavailable: {reason}; fallback file {path} is empty", path = .path.display())]
    EmptyFallback { reason: String, path: PathBuf },
}

/// Where a resolved version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// `git describe` output
    Git,
    /// The fallback version file
    File,
}

/// Resolver for the generated version string
///
/// Runs one bounded git invocation; there are no retries.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    src_root: PathBuf,
    fallback_file: PathBuf,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl VersionResolver {
    /// Create a resolver for the repository at `src_root`
    ///
    /// The fallback file defaults to `<src_root>/VERSION`.
    pub fn new(src_root: impl AsRef<Path>) -> Self {
        let src_root = src_root.as_ref().to_path_buf();
        Self {
            fallback_file: src_root.join("VERSION"),
            src_root,
            program: "git".to_string(),
            args: DESCRIBE_ARGS.iter().map(|a| a.to_string()).collect(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    /// Set the fallback version file
    pub fn fallback_file(mut self, path: impl AsRef<Path>) -> Self {
        self.fallback_file = path.as_ref().to_path_buf();
        self
    }

    /// Replace the describe command (program looked up on `PATH`)
    pub fn command(mut self, program: impl Into<String>, args: &[&str]) -> Self {
        self.program = program.into();
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Set the bound on the describe command
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the version string
    pub fn resolve(&self) -> Result<String, VersionError> {
        self.resolve_with_source().map(|(version, _)| version)
    }

    /// Resolve the version string and report which path produced it
    pub fn resolve_with_source(&self) -> Result<(String, VersionSource), VersionError> {
        match self.describe() {
            Ok(version) => {
                info!(version = %version, "resolved version from git describe");
                Ok((version, VersionSource::Git))
            }
            Err(reason) => {
                warn!(
                    reason = %reason,
                    file = %self.fallback_file.display(),
                    "couldn't find the version through git describe, using the version file instead"
                );
                self.read_fallback(reason)
                    .map(|version| (version, VersionSource::File))
            }
        }
    }

    fn describe(&self) -> Result<String, String> {
        let program = which::which(&self.program)
            .map_err(|e| format!("{} not found: {}", self.program, e))?;
        debug!(program = %program.display(), args = ?self.args, "running describe");

        let mut child = Command::new(&program)
            .args(&self.args)
            .current_dir(&self.src_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to run {}: {}", self.program, e))?;

        // Drain stdout while waiting so a full pipe cannot stall the child
        let reader = child.stdout.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut stdout = String::new();
                pipe.read_to_string(&mut stdout).map(|_| stdout)
            })
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!(
                        "{} timed out after {:?}",
                        self.program, self.timeout
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(format!("failed to wait for {}: {}", self.program, e)),
            }
        };

        if !status.success() {
            return Err(format!("{} exited with {}", self.program, status));
        }

        let stdout = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| format!("reading {} output panicked", self.program))?
                .map_err(|e| format!("failed to read {} output: {}", self.program, e))?,
            None => String::new(),
        };

        parse_describe(&stdout)
            .ok_or_else(|| format!("unrecognized describe output: {:?}", stdout.trim()))
    }

    fn read_fallback(&self, reason: String) -> Result<String, VersionError> {
        let content =
            fs::read_to_string(&self.fallback_file).map_err(|source| VersionError::Unavailable {
                reason: reason.clone(),
                path: self.fallback_file.clone(),
                source,
            })?;

        match content.trim().lines().next() {
            Some(line) if !line.trim().is_empty() => Ok(line.trim().to_string()),
            _ => Err(VersionError::EmptyFallback {
                reason,
                path: self.fallback_file.clone(),
            }),
        }
    }
}

/// Extract `<version>-<commits>` from `git describe --long` output
pub fn parse_describe(output: &str) -> Option<String> {
    DESCRIBE_REGEX
        .captures(output.trim())
        .map(|caps| caps[1].to_string())
}
