use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;

use super::{excerpt, CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::{CheckResult, Findings};
use crate::domain::entities::host::{FileIdentity, LogOffset};
use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::store::{get_json_state, set_json_state};
use crate::domain::ports::CollectionError;
use crate::domain::value_objects::{MetricUnit, Severity};

/// Bytes scanned per file and run unless configured otherwise.
pub const DEFAULT_READ_LIMIT: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub path: PathBuf,
    pub pattern: String,
}

/// Incremental scan of log files for error markers.
///
/// Targets naming the same file share one read and one stored offset.
pub struct LogTailCheck {
    pub targets: Vec<LogTarget>,
    /// Most bytes read per file in one run; the rest waits for the next run
    pub read_limit: u64,
}

impl LogTailCheck {
    #[must_use]
    pub const fn new(targets: Vec<LogTarget>) -> Self {
        Self {
            targets,
            read_limit: DEFAULT_READ_LIMIT,
        }
    }
}

#[must_use]
pub fn offset_key(path: &Path) -> String {
    format!("log_offset:{}", path.display())
}

/// Where reading resumes: the stored offset, or 0 after rotation or truncation.
#[must_use]
pub fn resume_offset(stored: Option<LogOffset>, current: FileIdentity) -> u64 {
    match stored {
        Some(s) if s.fingerprint == Some(current.fingerprint) && s.offset <= current.len => {
            s.offset
        }
        _ => 0,
    }
}

/// Patterns per file, in first-seen order, duplicates dropped.
fn by_file(targets: &[LogTarget]) -> Vec<(&Path, Vec<&str>)> {
    let mut files: Vec<(&Path, Vec<&str>)> = Vec::new();
    for target in targets {
        let idx = match files.iter().position(|(p, _)| *p == target.path.as_path()) {
            Some(idx) => idx,
            None => {
                files.push((target.path.as_path(), Vec::new()));
                files.len() - 1
            }
        };
        let patterns = &mut files[idx].1;
        if !patterns.contains(&target.pattern.as_str()) {
            patterns.push(target.pattern.as_str());
        }
    }
    files
}

/// A chunk that hit the read limit is cut back to its last complete line.
fn complete_lines(chunk: &[u8], limit: u64) -> &[u8] {
    if (chunk.len() as u64) < limit {
        return chunk;
    }
    chunk
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(chunk, |i| &chunk[..=i])
}

#[async_trait]
impl HealthCheck for LogTailCheck {
    fn name(&self) -> &'static str {
        "logs"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let mut findings = Findings::new();
        for (path, patterns) in by_file(&self.targets) {
            let label = path.display();
            let mut matchers = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                match Regex::new(pattern) {
                    Ok(re) => matchers.push((pattern, re)),
                    Err(e) => findings.push(
                        Severity::Critical,
                        format!("{label}: invalid pattern {pattern:?}: {e}"),
                    ),
                }
            }
            if matchers.is_empty() {
                continue;
            }
            let identity = match ctx.collector.file_identity(path) {
                Ok(identity) => identity,
                Err(CollectionError::NotFound(_)) => {
                    findings.push(Severity::Ok, format!("{label}: not present, skipped"));
                    continue;
                }
                Err(e) => {
                    findings.push(Severity::Critical, format!("{label}: {e}"));
                    continue;
                }
            };

            let key = offset_key(path);
            let stored: Option<LogOffset> = get_json_state(ctx.state, &key)?;
            let start = resume_offset(stored, identity);
            if stored.is_some_and(|s| s.offset != start) {
                tracing::info!(path = %label, "log rotated or truncated, rereading from start");
            }

            let chunk = ctx.collector.read_file_from(path, start, self.read_limit)?;
            let scanned = complete_lines(&chunk, self.read_limit);
            let end = start + scanned.len() as u64;
            if end < identity.len {
                tracing::info!(
                    path = %label,
                    pending = identity.len - end,
                    "read limit reached, remainder is scanned next run"
                );
            }
            set_json_state(
                ctx.state,
                &key,
                &LogOffset {
                    offset: end,
                    fingerprint: Some(identity.fingerprint),
                },
            )?;

            let text = String::from_utf8_lossy(scanned);
            let lines: Vec<&str> = text.lines().collect();
            for (pattern, re) in &matchers {
                let hits: Vec<&str> = lines.iter().copied().filter(|l| re.is_match(l)).collect();
                if !hits.is_empty() {
                    findings.push(
                        Severity::Critical,
                        format!(
                            "{label}: {} line(s) matching {pattern:?}:\n{}",
                            hits.len(),
                            excerpt(&hits)
                        ),
                    );
                }
            }
            let matched = lines
                .iter()
                .filter(|l| matchers.iter().any(|(_, re)| re.is_match(l)))
                .count();
            findings.metric(MetricSample::new(
                format!("log_matches:{label}"),
                matched as f64,
                MetricUnit::Count,
                ctx.now,
            ));
            if matched == 0 {
                findings.push(Severity::Ok, format!("{label}: no new matches"));
            }
        }
        Ok(findings.into_result(self.name(), "no log files configured"))
    }
}
