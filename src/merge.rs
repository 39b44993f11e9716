use anyhow::{bail, Context, Result};
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Merges per-split shards into `revisions.csv` (and `text.jsonl` when text
/// shards exist). Shards are concatenated in split order.
pub fn merge_shards(output_dir: &str) -> Result<()> {
    println!("Detecting shards in: {}", output_dir);

    let row_shards = find_shards(output_dir, "revisions_", ".csv")?;
    if row_shards.is_empty() {
        bail!("No revision shards found (expected revisions_00000.csv, etc.)");
    }
    println!("  Found {} revision shards", row_shards.len());

    let rows = merge_csv(output_dir, "revisions", &row_shards)?;
    println!("    Revisions: {}", rows);

    let text_shards = find_shards(output_dir, "text_", ".jsonl")?;
    if !text_shards.is_empty() {
        println!("  Found {} text shards", text_shards.len());
        merge_lines(output_dir, "text", &text_shards)?;
    }

    println!("Merge complete.");
    Ok(())
}

/// Shard files named `<prefix>NNNNN<suffix>`, sorted by shard number
fn find_shards(output_dir: &str, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut shards = Vec::new();
    for entry in fs::read_dir(output_dir)
        .with_context(|| format!("Failed to read directory: {}", output_dir))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(number) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        shards.push((number, path));
    }
    shards.sort_by_key(|(number, _)| *number);
    Ok(shards.into_iter().map(|(_, path)| path).collect())
}

/// Concatenates CSV shards under one header. Returns the number of data rows.
fn merge_csv(output_dir: &str, base_name: &str, shards: &[PathBuf]) -> Result<u64> {
    info!(base_name, shards = shards.len(), "Merging CSV shards");

    let output_path = Path::new(output_dir).join(format!("{}.csv", base_name));
    let mut writer = Writer::from_writer(BufWriter::with_capacity(
        256 * 1024,
        File::create(&output_path)?,
    ));

    let mut header: Option<StringRecord> = None;
    let mut rows = 0u64;

    for shard in shards {
        let mut reader = Reader::from_reader(BufReader::new(
            File::open(shard).with_context(|| format!("Failed to open shard: {}", shard.display()))?,
        ));

        // shards of windows without revisions are empty
        let shard_header = reader.headers()?.clone();
        if shard_header.is_empty() {
            continue;
        }
        match &header {
            None => {
                writer.write_record(&shard_header)?;
                header = Some(shard_header);
            }
            Some(h) if *h != shard_header => {
                bail!("Shard {} has a different header", shard.display());
            }
            Some(_) => {}
        }

        for result in reader.records() {
            writer.write_record(&result?)?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Concatenates line-oriented shards byte for byte.
fn merge_lines(output_dir: &str, base_name: &str, shards: &[PathBuf]) -> Result<()> {
    info!(base_name, shards = shards.len(), "Merging JSONL shards");

    let output_path = Path::new(output_dir).join(format!("{}.jsonl", base_name));
    let mut writer = BufWriter::with_capacity(256 * 1024, File::create(&output_path)?);

    for shard in shards {
        let mut reader = BufReader::new(
            File::open(shard).with_context(|| format!("Failed to open shard: {}", shard.display()))?,
        );
        io::copy(&mut reader, &mut writer)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_shard(dir: &Path, name: &str, lines: &[&str]) -> Result<()> {
        let mut file = File::create(dir.join(name))?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    #[test]
    fn find_shards_sorts_numerically() -> Result<()> {
        let temp_dir = TempDir::new()?;
        create_shard(temp_dir.path(), "revisions_00010.csv", &[])?;
        create_shard(temp_dir.path(), "revisions_00002.csv", &[])?;
        create_shard(temp_dir.path(), "revisions.csv", &[])?;
        create_shard(temp_dir.path(), "text_00001.jsonl", &[])?;

        let shards = find_shards(temp_dir.path().to_str().unwrap(), "revisions_", ".csv")?;
        let names: Vec<_> = shards
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["revisions_00002.csv", "revisions_00010.csv"]);
        Ok(())
    }

    #[test]
    fn merge_csv_skips_empty_shards() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        create_shard(dir, "revisions_00000.csv", &["key,title", "10_1,A", "10_2,A"])?;
        create_shard(dir, "revisions_00001.csv", &[])?;
        create_shard(dir, "revisions_00002.csv", &["key,title", "12_5,B"])?;

        let shards = find_shards(dir.to_str().unwrap(), "revisions_", ".csv")?;
        let rows = merge_csv(dir.to_str().unwrap(), "revisions", &shards)?;
        assert_eq!(rows, 3);

        let content = fs::read_to_string(dir.join("revisions.csv"))?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["key,title", "10_1,A", "10_2,A", "12_5,B"]);
        Ok(())
    }

    #[test]
    fn merge_csv_rejects_mismatched_headers() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        create_shard(dir, "revisions_00000.csv", &["key,title", "10_1,A"])?;
        create_shard(dir, "revisions_00001.csv", &["key,sha1", "12_5,x"])?;

        let shards = find_shards(dir.to_str().unwrap(), "revisions_", ".csv")?;
        assert!(merge_csv(dir.to_str().unwrap(), "revisions", &shards).is_err());
        Ok(())
    }

    #[test]
    fn merge_lines_concatenates() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        create_shard(dir, "text_00000.jsonl", &[r#"{"key":"10_1"}"#])?;
        create_shard(dir, "text_00001.jsonl", &[r#"{"key":"12_5"}"#])?;

        let shards = find_shards(dir.to_str().unwrap(), "text_", ".jsonl")?;
        merge_lines(dir.to_str().unwrap(), "text", &shards)?;

        let content = fs::read_to_string(dir.join("text.jsonl"))?;
        assert_eq!(content, "{\"key\":\"10_1\"}\n{\"key\":\"12_5\"}\n");
        Ok(())
    }

    #[test]
    fn merge_without_shards_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(merge_shards(temp_dir.path().to_str().unwrap()).is_err());
    }
}
