use super::*;

pub const COMMENT_MARKER: u8 = b'#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub path: PathBuf,
    pub lines_written: usize,
    pub header_lines: usize,
}

/// Concatenates per-chunk results in the given (ordinal) order.
///
/// Blank lines are dropped. Comment lines are kept only from the first file,
/// so exactly one header block leads the merged output. Every file is checked
/// before the output is created: a missing result means a job failure went
/// unnoticed and the merge refuses to paper over it.
///
/// Lines are copied as raw bytes, line endings and all. The merged file is
/// staged beside `merged_path` and only renamed into place once complete.
pub fn merge_results(result_paths: &[PathBuf], merged_path: &Path) -> Result<MergeSummary> {
    for (ordinal, path) in result_paths.iter().enumerate() {
        if !path.is_file() {
            return Err(PipelineError::MissingResult {
                ordinal,
                path: path.clone(),
            }
            .into());
        }
    }

    info!(files = result_paths.len(), path = %merged_path.display(), "merging result files");

    let (lines_written, header_lines) = write_staged(merged_path, |mut writer| {
        let mut lines_written = 0;
        let mut header_lines = 0;
        for (ordinal, path) in result_paths.iter().enumerate() {
            let (lines, headers) = append_result(&mut writer, path, ordinal == 0)
                .with_context(|| format!("failed to write merged file: {}", merged_path.display()))?;
            lines_written += lines;
            header_lines += headers;
            debug!(ordinal, path = %path.display(), "merged result file");
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush merged file: {}", merged_path.display()))?;
        Ok((lines_written, header_lines))
    })?;

    info!(lines = lines_written, path = %merged_path.display(), "merge complete");

    Ok(MergeSummary {
        path: merged_path.to_path_buf(),
        lines_written,
        header_lines,
    })
}

/// Copies one result file into `writer`. Returns `(lines, header lines)` written.
fn append_result<W: Write>(writer: &mut W, path: &Path, keep_headers: bool) -> Result<(usize, usize)> {
    let file = File::open(path).map_err(|err| {
        PipelineError::io(format!("failed to open result file: {}", path.display()), err)
    })?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut lines = 0;
    let mut headers = 0;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("failed to read result file: {}", path.display()))?;
        if read == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let is_header = line.first() == Some(&COMMENT_MARKER);
        if is_header && !keep_headers {
            continue;
        }

        writer.write_all(&line)?;
        if line.last() != Some(&b'\n') {
            writer.write_all(b"\n")?;
        }
        lines += 1;
        if is_header {
            headers += 1;
        }
    }

    Ok((lines, headers))
}
