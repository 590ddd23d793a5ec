//! Module name derivation
//!
//! Job names follow the upstream scheduler convention
//! `<prefix>-<module>-<words>-<suffix>...`; the module identifier is a fixed
//! slice of the hyphen-separated segments. Map-run identifiers carry the
//! module in their path segment. Both rules live here and nowhere else.

use crate::config::ReportConfig;
use std::collections::HashSet;
use std::ops::Range;

/// Join the `segments` slice of a hyphen-separated job name
///
/// Short names yield whatever segments exist within the range.
pub fn job_identifier(job_name: &str, segments: Range<usize>) -> String {
    job_name
        .split('-')
        .skip(segments.start)
        .take(segments.end.saturating_sub(segments.start))
        .collect::<Vec<_>>()
        .join("-")
}

/// Module identifier embedded in a map-run identifier
///
/// `arn:...:mapRun:<workflow>/<module_label>:<uuid>` yields `module_label`.
pub fn map_run_identifier(map_run_id: &str) -> &str {
    let segments: Vec<&str> = map_run_id.split(':').collect();
    let path = match segments.as_slice() {
        [.., path, _] => path,
        _ => map_run_id,
    };
    path.rsplit('/').next().unwrap_or(path)
}

/// Separator between words of a job identifier
pub const TASK_SEPARATOR: char = '-';
/// Separator between words of a map-run label
pub const MAP_RUN_SEPARATOR: char = '_';

/// Turn an identifier into a display name: `separator` becomes a space and
/// every word is title-cased
///
/// Other punctuation is kept and, like a space, starts a new word.
pub fn humanize(identifier: &str, separator: char) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut previous_is_letter = false;

    for ch in identifier.chars() {
        let ch = if ch == separator { ' ' } else { ch };
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }

    out
}

/// Naming convention for task modules
#[derive(Debug, Clone)]
pub struct ModuleNaming {
    segments: Range<usize>,
    recognized: HashSet<String>,
}

impl ModuleNaming {
    pub fn new<I, S>(segments: Range<usize>, recognized: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments,
            recognized: recognized.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(
            config.job_name_segments.as_range(),
            config.recognized_modules.iter().cloned(),
        )
    }

    /// Display name of the module a job belongs to, if it is recognized
    pub fn task_module(&self, job_name: &str) -> Option<String> {
        let identifier = job_identifier(job_name, self.segments.clone());
        self.recognized
            .contains(&identifier)
            .then(|| humanize(&identifier, TASK_SEPARATOR))
    }

    /// Display name of the module a map run belongs to
    pub fn map_run_module(&self, map_run_id: &str) -> String {
        humanize(map_run_identifier(map_run_id), MAP_RUN_SEPARATOR)
    }
}
