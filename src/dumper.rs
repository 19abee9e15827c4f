//! Corpus dumping into a uniform JSON-lines format.
//!
//! Every output line carries a `text` field and a `source` tag. These
//! functions are best-effort bulk converters: a failure is logged with the
//! offending path and the call returns normally.

use crate::error::{JudgeError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// Name of the aggregate file written by the directory dumpers.
pub const AGGREGATE_FILENAME: &str = "tmp.jsonl";

/// Source tag used when the caller has none.
pub const DEFAULT_SOURCE_TAG: &str = ".tmp";

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Keep existing lines and add to the end.
    #[default]
    Append,
    /// Start from an empty file.
    Truncate,
}

impl WriteMode {
    fn open(self, path: &Path) -> Result<File> {
        let mut options = OpenOptions::new();
        options.create(true);
        match self {
            WriteMode::Append => options.append(true),
            WriteMode::Truncate => options.write(true).truncate(true),
        };
        options.open(path).map_err(|e| JudgeError::io(path, e))
    }
}

/// One item handed to [`dump_jsonl`].
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusInput {
    /// Bare text, wrapped as `{text, source}`.
    Text(String),
    /// Structured record.
    Record(Map<String, Value>),
}

impl From<String> for CorpusInput {
    fn from(text: String) -> Self {
        CorpusInput::Text(text)
    }
}

impl From<&str> for CorpusInput {
    fn from(text: &str) -> Self {
        CorpusInput::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for CorpusInput {
    fn from(record: Map<String, Value>) -> Self {
        CorpusInput::Record(record)
    }
}

/// Reduced `{text, source}` line.
#[derive(Serialize)]
struct TextLine<'a, T: Serialize> {
    text: T,
    source: &'a str,
}

/// Append `records` to the JSON-lines file at `path`, tagging each with `source_tag`.
///
/// Text inputs become `{text, source}`. Records get their `source`
/// overwritten; with `keep_text_only` they are reduced to
/// `{text: record[text_field], source}`.
pub fn dump_jsonl<I>(
    path: &Path,
    records: I,
    keep_text_only: bool,
    text_field: &str,
    mode: WriteMode,
    source_tag: &str,
) where
    I: IntoIterator<Item = CorpusInput>,
{
    match try_dump_jsonl(path, records, keep_text_only, text_field, mode, source_tag) {
        Ok(written) => info!(path = %path.display(), written, "dumped records"),
        Err(e) => error!(path = %path.display(), error = %e, "bad file"),
    }
}

fn try_dump_jsonl<I>(
    path: &Path,
    records: I,
    keep_text_only: bool,
    text_field: &str,
    mode: WriteMode,
    source_tag: &str,
) -> Result<usize>
where
    I: IntoIterator<Item = CorpusInput>,
{
    let mut writer = BufWriter::new(mode.open(path)?);
    let mut written = 0;

    for input in records {
        let line = match input {
            CorpusInput::Text(text) => serde_json::to_string(&TextLine {
                text,
                source: source_tag,
            })?,
            CorpusInput::Record(mut record) => {
                if keep_text_only {
                    let text = record.remove(text_field).ok_or_else(|| {
                        JudgeError::Serialization(format!("record has no '{}' field", text_field))
                    })?;
                    serde_json::to_string(&TextLine {
                        text,
                        source: source_tag,
                    })?
                } else {
                    record.insert("source".to_string(), Value::from(source_tag));
                    serde_json::to_string(&record)?
                }
            }
        };
        writeln!(writer, "{}", line).map_err(|e| JudgeError::io(path, e))?;
        written += 1;
    }

    writer.flush().map_err(|e| JudgeError::io(path, e))?;
    Ok(written)
}

/// Write one `{text, source}` line per `.txt` file under `input_dir`
/// into `output_dir/tmp.jsonl`.
pub fn dump_raw_text_files(input_dir: &Path, output_dir: &Path, mode: WriteMode, source_tag: &str) {
    match try_dump_raw_text_files(input_dir, output_dir, mode, source_tag) {
        Ok(written) => info!(input = %input_dir.display(), written, "dumped text files"),
        Err(e) => error!(input = %input_dir.display(), error = %e, "text dump failed"),
    }
}

fn try_dump_raw_text_files(
    input_dir: &Path,
    output_dir: &Path,
    mode: WriteMode,
    source_tag: &str,
) -> Result<usize> {
    let output_path = prepare_output(output_dir)?;
    let files = collect_files(input_dir, "txt", &output_path)?;

    let mut writer = BufWriter::new(mode.open(&output_path)?);
    for file in &files {
        let text = fs::read_to_string(file).map_err(|e| JudgeError::io(file, e))?;
        let line = serde_json::to_string(&TextLine {
            text,
            source: source_tag,
        })?;
        writeln!(writer, "{}", line).map_err(|e| JudgeError::io(&output_path, e))?;
    }
    writer.flush().map_err(|e| JudgeError::io(&output_path, e))?;

    Ok(files.len())
}

/// Concatenate every record of every `.jsonl` file under `input_dir`
/// into `output_dir/tmp.jsonl`.
///
/// With `keep_text_only` each record is reduced to `{text, source}`;
/// otherwise it passes through and only a missing `source` is filled in.
pub fn dump_jsonl_files(
    input_dir: &Path,
    output_dir: &Path,
    keep_text_only: bool,
    mode: WriteMode,
    source_tag: &str,
) {
    match try_dump_jsonl_files(input_dir, output_dir, keep_text_only, mode, source_tag) {
        Ok(written) => info!(input = %input_dir.display(), written, "dumped jsonl files"),
        Err(e) => error!(input = %input_dir.display(), error = %e, "jsonl dump failed"),
    }
}

fn try_dump_jsonl_files(
    input_dir: &Path,
    output_dir: &Path,
    keep_text_only: bool,
    mode: WriteMode,
    source_tag: &str,
) -> Result<usize> {
    let output_path = prepare_output(output_dir)?;
    let files = collect_files(input_dir, "jsonl", &output_path)?;

    let mut writer = BufWriter::new(mode.open(&output_path)?);
    let mut written = 0;

    for file in &files {
        let content = fs::read_to_string(file).map_err(|e| JudgeError::io(file, e))?;

        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut record: Map<String, Value> = serde_json::from_str(line).map_err(|e| {
                JudgeError::Serialization(format!("{}: line {}: {}", file.display(), line_num + 1, e))
            })?;

            let out = if keep_text_only {
                let text = record.remove("text").ok_or_else(|| {
                    JudgeError::Serialization(format!(
                        "{}: line {}: record has no 'text' field",
                        file.display(),
                        line_num + 1
                    ))
                })?;
                serde_json::to_string(&TextLine {
                    text,
                    source: source_tag,
                })?
            } else {
                record
                    .entry("source")
                    .or_insert_with(|| Value::from(source_tag));
                serde_json::to_string(&record)?
            };

            writeln!(writer, "{}", out).map_err(|e| JudgeError::io(&output_path, e))?;
            written += 1;
        }
    }
    writer.flush().map_err(|e| JudgeError::io(&output_path, e))?;

    Ok(written)
}

/// Create `output_dir` if needed and return the aggregate file path.
fn prepare_output(output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| JudgeError::io(output_dir, e))?;
    Ok(output_dir.join(AGGREGATE_FILENAME))
}

/// Files under `dir` with extension `ext`, sorted by path, skipping `exclude`.
fn collect_files(dir: &Path, ext: &str, exclude: &Path) -> Result<Vec<PathBuf>> {
    let exclude = exclude.canonicalize().ok();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            JudgeError::io(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        if exclude.is_some() && entry.path().canonicalize().ok() == exclude {
            continue;
        }
        files.push(entry.into_path());
    }

    Ok(files)
}
