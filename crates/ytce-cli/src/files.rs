use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context as _, Result, bail};
use serde_json::{Map, Value};
use ytce_core::merge::tabular_rows;
use ytce_core::models::{AnalysisResult, Comment, JobSpec};

pub fn load_job(path: &Path) -> Result<JobSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read job file {}", path.display()))?;
    parse_job(&content).with_context(|| format!("failed to parse job file {}", path.display()))
}

pub fn parse_job(content: &str) -> Result<JobSpec> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn load_comments(path: &Path) -> Result<Vec<Comment>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    read_comments(BufReader::new(file))
        .with_context(|| format!("failed to read input file {}", path.display()))
}

/// Reads JSONL records. `text` and an id (`id`, or `cid` from comment
/// exports) are required; every other field is carried through as metadata.
pub fn read_comments(reader: impl BufRead) -> Result<Vec<Comment>> {
    let mut comments = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields: Map<String, Value> = serde_json::from_str(&line)
            .with_context(|| format!("line {line_number} is not a JSON object"))?;

        let id = match fields.remove("id").or_else(|| fields.remove("cid")) {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => bail!("line {line_number} has no string or numeric `id` or `cid`"),
        };
        let text = match fields.remove("text") {
            Some(Value::String(text)) => text,
            _ => bail!("line {line_number} has no string `text`"),
        };

        comments.push(Comment {
            id,
            text,
            metadata: fields.into_iter().collect(),
        });
    }
    Ok(comments)
}

pub fn write_results(path: &Path, result: &AnalysisResult) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_rows(&mut writer, result)
        .with_context(|| format!("failed to write output file {}", path.display()))
}

pub fn write_rows(writer: &mut impl Write, result: &AnalysisResult) -> Result<()> {
    for row in tabular_rows(result) {
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
