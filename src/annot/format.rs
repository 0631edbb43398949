// Per-corpus annotation formats
// Each supported corpus ships beat annotations in its own schema; the
// DatasetKind variants carry the line-parsing and path-derivation rules

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotError {
    #[error("No annotation file found for {0}")]
    MissingAnnotation(PathBuf),

    #[error("Malformed annotation at {file}:{line}: {reason}")]
    FormatError {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Supported annotation corpora
///
/// Each variant fixes two rules: how a single annotation line splits into
/// (seconds, beat ordinal), and how the annotation path derives from the
/// audio filename. Ordinal 1 always denotes a downbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Space-separated `seconds ordinal`, annotations as `<stem>.beats`
    Ballroom,

    /// Space-separated with stray tabs and double spaces,
    /// annotations as `<album>/<stem>.txt`
    Beatles,

    /// Space-separated `seconds ordinal`, annotations as `<stem>.txt`
    Hainsworth,

    /// Tab-separated with centisecond integer timestamps; field 2 encodes the
    /// beat type (384 = downbeat); annotations as `<stem>.BEAT.TXT`
    RwcPopular,

    /// Tab-separated `seconds ordinal`, annotations as
    /// `gtzan_<genre>_<number>.beats` derived from the audio stem
    Gtzan,

    /// Single column of seconds, beats only; annotations located by
    /// `<stem>*.txt` wildcard. Every line carries ordinal 1, so this corpus
    /// is suitable for beat evaluation only.
    Smc,

    /// Comma-separated `seconds,ordinal`, annotations as `<stem>.beats`
    Carnatic,
}

impl DatasetKind {
    /// Parse one annotation line into (seconds, beat ordinal).
    pub fn parse_line(&self, line: &str) -> Result<(f64, u32), String> {
        let line = line.trim_end_matches('\r');

        match self {
            DatasetKind::Ballroom => {
                let cleaned = line.replace('\t', " ");
                let (time, ordinal) = split_two(&cleaned, ' ')?;
                Ok((parse_seconds(time)?, parse_ordinal(ordinal)?))
            }
            DatasetKind::Beatles => {
                let cleaned = line.replace('\t', " ").replace("  ", " ");
                let (time, ordinal) = split_two(&cleaned, ' ')?;
                Ok((parse_seconds(time)?, parse_ordinal(ordinal)?))
            }
            DatasetKind::Hainsworth => {
                let (time, ordinal) = split_two(line, ' ')?;
                Ok((parse_seconds(time)?, parse_ordinal(ordinal)?))
            }
            DatasetKind::RwcPopular => {
                let fields: Vec<&str> = line.split('\t').collect();
                if fields.len() < 3 {
                    return Err(format!("expected 3 tab-separated fields, got {}", fields.len()));
                }
                let centiseconds: i64 = fields[0]
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid centisecond timestamp `{}`", fields[0]))?;
                let beat_code: i64 = fields[2]
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid beat code `{}`", fields[2]))?;
                let ordinal = if beat_code == 384 { 1 } else { 2 };
                Ok((centiseconds as f64 / 100.0, ordinal))
            }
            DatasetKind::Gtzan => {
                let (time, ordinal) = split_two(line, '\t')?;
                Ok((parse_seconds(time)?, parse_ordinal(ordinal)?))
            }
            DatasetKind::Smc => Ok((parse_seconds(line)?, 1)),
            DatasetKind::Carnatic => {
                let (time, ordinal) = split_two(line, ',')?;
                Ok((parse_seconds(time)?, parse_ordinal(ordinal)?))
            }
        }
    }

    /// Derive the annotation path for an audio file and verify it exists.
    pub fn annotation_path(&self, audio_file: &Path, annot_root: &Path) -> Result<PathBuf, AnnotError> {
        let stem = audio_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let path = match self {
            DatasetKind::Ballroom | DatasetKind::Carnatic => {
                annot_root.join(format!("{}.beats", stem))
            }
            DatasetKind::Hainsworth => annot_root.join(format!("{}.txt", stem)),
            DatasetKind::Beatles => {
                let album = audio_file
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                annot_root.join(album).join(format!("{}.txt", stem))
            }
            DatasetKind::RwcPopular => annot_root.join(format!("{}.BEAT.TXT", stem)),
            DatasetKind::Gtzan => {
                // Audio stem is `NNNN_<genre>.<number>`; the leading four-digit
                // prefix is dropped and the first `.` becomes `_`, giving
                // `gtzan_<genre>_<number>.beats`.
                let tail = stem.get(4..).unwrap_or("").replacen('.', "_", 1);
                annot_root.join(format!("gtzan{}.beats", tail))
            }
            DatasetKind::Smc => {
                return wildcard_lookup(audio_file, annot_root, stem);
            }
        };

        if path.exists() {
            Ok(path)
        } else {
            Err(AnnotError::MissingAnnotation(audio_file.to_path_buf()))
        }
    }
}

/// Locate `<stem>*.txt` inside the annotation root, first match in name order.
fn wildcard_lookup(audio_file: &Path, annot_root: &Path, stem: &str) -> Result<PathBuf, AnnotError> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(annot_root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|name| name.starts_with(stem) && name.ends_with(".txt"))
                .unwrap_or(false)
        })
        .collect();
    matches.sort();

    matches
        .into_iter()
        .next()
        .ok_or_else(|| AnnotError::MissingAnnotation(audio_file.to_path_buf()))
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ballroom" => Ok(DatasetKind::Ballroom),
            "beatles" => Ok(DatasetKind::Beatles),
            "hainsworth" => Ok(DatasetKind::Hainsworth),
            "rwc_popular" => Ok(DatasetKind::RwcPopular),
            "gtzan" => Ok(DatasetKind::Gtzan),
            "smc" => Ok(DatasetKind::Smc),
            "carnatic" => Ok(DatasetKind::Carnatic),
            other => Err(format!("Invalid dataset: {}", other)),
        }
    }
}

/// Split a line on `sep`, requiring exactly two fields.
/// Empty fields (from doubled separators) count and therefore fail.
fn split_two<'a>(line: &'a str, sep: char) -> Result<(&'a str, &'a str), String> {
    let fields: Vec<&str> = line.split(sep).collect();
    if fields.len() != 2 {
        return Err(format!("expected 2 fields, got {}", fields.len()));
    }
    Ok((fields[0], fields[1]))
}

fn parse_seconds(field: &str) -> Result<f64, String> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid timestamp `{}`", field))
}

fn parse_ordinal(field: &str) -> Result<u32, String> {
    field
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid beat ordinal `{}`", field))
}
