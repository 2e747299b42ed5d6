use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Removes `path` and everything below it when it exists, then recreates it empty.
pub fn reset_directory(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to wipe directory: {}", path.display()))?;
    }
    ensure_directory(path)
}

/// Removes the file at `path`. Returns whether there was one.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to remove file: {}", path.display())),
    }
}

/// `<path>.tmp`, next to `path`.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Runs `write` against a staging file beside `path` and renames it over
/// `path` only when `write` succeeds. On failure the staging file is removed
/// and `path` is left untouched.
pub fn write_staged<T, F>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(BufWriter<File>) -> Result<T>,
{
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let staging = staging_path(path);
    let file = File::create(&staging)
        .with_context(|| format!("failed to create staging file: {}", staging.display()))?;

    let outcome = write(BufWriter::new(file)).and_then(|value| {
        fs::rename(&staging, path).with_context(|| {
            format!("failed to move {} into place at {}", staging.display(), path.display())
        })?;
        Ok(value)
    });
    if outcome.is_err() {
        let _ = fs::remove_file(&staging);
    }
    outcome
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Number of decimal digits needed to print `value`.
pub fn digit_count(value: usize) -> usize {
    let mut digits = 1;
    let mut rest = value / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits
}

/// Renders `index` of `total` with `index` right-aligned to the width of `total`.
pub fn progress_label(index: usize, total: usize) -> String {
    format!("{index:>width$}/{total}", width = digit_count(total))
}

pub fn format_score(score: f64) -> String {
    if score != 0.0 && score.abs() < 1e-3 {
        format!("{score:e}")
    } else {
        format!("{score}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_count_matches_decimal_width() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(1000), 4);
        assert_eq!(digit_count(usize::MAX), usize::MAX.to_string().len());
    }

    #[test]
    fn progress_label_pads_to_total_width() {
        assert_eq!(progress_label(7, 120), "  7/120");
        assert_eq!(progress_label(12, 12), "12/12");
    }

    #[test]
    fn format_score_uses_exponent_for_small_values() {
        assert_eq!(format_score(1.2e-5), "1.2e-5");
        assert_eq!(format_score(0.5), "0.5");
        assert_eq!(format_score(0.0), "0");
        assert_eq!(format_score(31.4), "31.4");
    }

    #[test]
    fn reset_directory_clears_previous_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("fas");
        ensure_directory(&target).expect("create");
        fs::write(target.join("stale.fa"), ">x\n").expect("write");

        reset_directory(&target).expect("reset");

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).expect("read_dir").count(), 0);
    }

    #[test]
    fn write_staged_replaces_target_only_on_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out/merged.pfsout");

        write_staged(&target, |mut writer| {
            writer.write_all(b"first\n")?;
            writer.flush()?;
            Ok(())
        })
        .expect("first write");
        assert_eq!(fs::read_to_string(&target).expect("read"), "first\n");

        let err = write_staged(&target, |mut writer| -> Result<()> {
            writer.write_all(b"partial")?;
            writer.flush()?;
            anyhow::bail!("scanner output truncated")
        })
        .expect_err("second write fails");

        assert!(err.to_string().contains("truncated"));
        assert_eq!(fs::read_to_string(&target).expect("read"), "first\n");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn staging_path_is_a_sibling() {
        assert_eq!(
            staging_path(Path::new("results/all.pfsout")),
            PathBuf::from("results/all.pfsout.tmp")
        );
    }

    #[test]
    fn remove_file_if_exists_tolerates_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stale.xdom");
        fs::write(&path, ">x\n").expect("write");

        assert!(remove_file_if_exists(&path).expect("remove"));
        assert!(!remove_file_if_exists(&path).expect("remove again"));
    }

    #[test]
    fn sha256_file_hashes_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").expect("write");
        assert_eq!(
            sha256_file(&path).expect("hash"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
