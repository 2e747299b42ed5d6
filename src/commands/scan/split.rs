use super::*;

const RECORD_MARKER: u8 = b'>';

struct OpenChunk {
    ordinal: usize,
    path: PathBuf,
    writer: BufWriter<File>,
    record_count: usize,
}

impl OpenChunk {
    fn create(chunk_dir: &Path, stem: &str, ordinal: usize) -> Result<Self> {
        let path = chunk_dir.join(format!("{stem}-{ordinal}.fa"));
        let file = File::create(&path)
            .with_context(|| format!("failed to create chunk file: {}", path.display()))?;
        Ok(Self {
            ordinal,
            path,
            writer: BufWriter::new(file),
            record_count: 0,
        })
    }

    /// Copies `line` byte for byte, terminating an unterminated final line.
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.writer
            .write_all(line)
            .with_context(|| format!("failed to write chunk file: {}", self.path.display()))?;
        if line.last() != Some(&b'\n') {
            self.writer
                .write_all(b"\n")
                .with_context(|| format!("failed to write chunk file: {}", self.path.display()))?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Chunk> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush chunk file: {}", self.path.display()))?;
        info!(
            part = self.ordinal,
            records = self.record_count,
            path = %self.path.display(),
            "wrote fasta chunk"
        );
        Ok(Chunk {
            ordinal: self.ordinal,
            path: self.path,
            record_count: self.record_count,
        })
    }
}

/// Streams `fasta` into files of at most `chunk_size` records under `chunk_dir`.
///
/// A new chunk is opened only at a record header line once the current chunk
/// already holds `chunk_size` records, so record bodies never straddle two
/// files. Lines preceding the first header belong to chunk 0.
pub fn split_fasta(fasta: &Path, chunk_dir: &Path, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(PipelineError::configuration("chunk size must be a positive integer").into());
    }

    let file = File::open(fasta).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => PipelineError::configuration(format!(
            "fasta file does not exist: {}",
            fasta.display()
        )),
        _ => PipelineError::io(format!("failed to open fasta: {}", fasta.display()), err),
    })?;
    let stem = fasta
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("sequences");

    ensure_directory(chunk_dir)?;

    let mut reader = BufReader::new(file);
    let mut chunks = Vec::new();
    let mut current: Option<OpenChunk> = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("failed to read fasta: {}", fasta.display()))?;
        if read == 0 {
            break;
        }

        let starts_record = line.first() == Some(&RECORD_MARKER);
        if starts_record {
            if let Some(full) = current.take_if(|open| open.record_count >= chunk_size) {
                chunks.push(full.finish()?);
            }
        }

        let mut open = match current.take() {
            Some(open) => open,
            None => OpenChunk::create(chunk_dir, stem, chunks.len())?,
        };
        if starts_record {
            open.record_count += 1;
        }
        open.write_line(&line)?;
        current = Some(open);
    }

    if let Some(last) = current.take() {
        chunks.push(last.finish()?);
    }

    info!(
        fasta = %fasta.display(),
        chunks = chunks.len(),
        records = chunks.iter().map(|chunk| chunk.record_count).sum::<usize>(),
        "split complete"
    );

    Ok(chunks)
}
