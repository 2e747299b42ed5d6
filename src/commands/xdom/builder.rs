use super::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XdomSummary {
    pub records_seen: usize,
    pub records_written: usize,
    pub hits_kept: usize,
    pub hits_dropped_by_cutoff: usize,
    pub hits_dropped_by_overlap: usize,
    pub empty_records_omitted: usize,
}

/// Groups consecutive hits by sequence id and writes each finished record.
pub struct RecordBuilder<W: Write> {
    writer: W,
    score_cutoff: Option<f64>,
    omit_empty: bool,
    resolve: bool,
    current: Option<SequenceRecord>,
    summary: XdomSummary,
}

impl<W: Write> RecordBuilder<W> {
    pub fn new(writer: W, config: &XdomConfig) -> Self {
        Self {
            writer,
            score_cutoff: config.score_cutoff,
            omit_empty: config.omit_empty,
            resolve: config.resolve_overlaps,
            current: None,
            summary: XdomSummary::default(),
        }
    }

    pub fn push(&mut self, parsed: ParsedHit) -> Result<()> {
        let same_record = self
            .current
            .as_ref()
            .is_some_and(|record| record.sequence_id == parsed.sequence_id);
        if !same_record {
            self.flush_record()?;
            self.current = Some(SequenceRecord::new(parsed.sequence_id));
            self.summary.records_seen += 1;
        }

        // Scores above the cutoff are worse and never enter the record.
        if self.score_cutoff.is_some_and(|cutoff| parsed.hit.score > cutoff) {
            self.summary.hits_dropped_by_cutoff += 1;
            return Ok(());
        }
        if let Some(record) = self.current.as_mut() {
            record.hits.push(parsed.hit);
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<XdomSummary> {
        self.flush_record()?;
        self.writer.flush().context("failed to flush xdom output")?;
        Ok(self.summary)
    }

    fn flush_record(&mut self) -> Result<()> {
        let Some(mut record) = self.current.take() else {
            return Ok(());
        };

        if self.resolve {
            let before = record.hits.len();
            record.hits = resolve_overlaps(record.hits);
            self.summary.hits_dropped_by_overlap += before - record.hits.len();
        }

        if self.omit_empty && record.hits.is_empty() {
            self.summary.empty_records_omitted += 1;
            return Ok(());
        }

        write_record(&mut self.writer, &record)?;
        self.summary.records_written += 1;
        self.summary.hits_kept += record.hits.len();
        Ok(())
    }
}

pub fn write_record<W: Write>(writer: &mut W, record: &SequenceRecord) -> Result<()> {
    writeln!(writer, ">{}", record.sequence_id)
        .with_context(|| format!("failed to write xdom record {}", record.sequence_id))?;
    for hit in &record.hits {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            hit.start,
            hit.end,
            hit.name,
            format_score(hit.score)
        )
        .with_context(|| format!("failed to write xdom record {}", record.sequence_id))?;
    }
    Ok(())
}

/// Streams `reader` through a [`HitParser`] into a [`RecordBuilder`].
pub fn build_records<R: BufRead, W: Write>(
    mut reader: R,
    writer: W,
    config: &XdomConfig,
) -> Result<XdomSummary> {
    let parser = HitParser::new(config)?;
    let mut builder = RecordBuilder::new(writer, config);

    // Lossy decoding keeps one stray byte in a description from failing the file.
    let mut buffer = Vec::new();
    let mut line_number = 0;
    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .context("failed to read merged results")?;
        if read == 0 {
            break;
        }
        line_number += 1;
        let line = String::from_utf8_lossy(&buffer);
        if let Some(parsed) = parser.parse_line(line.trim_end_matches(['\r', '\n']), line_number)? {
            builder.push(parsed)?;
        }
    }

    builder.finish()
}

pub fn build_xdom_file(merged_path: &Path, output_path: &Path, config: &XdomConfig) -> Result<XdomSummary> {
    let input = File::open(merged_path)
        .with_context(|| format!("failed to open merged results: {}", merged_path.display()))?;

    let summary = write_staged(output_path, |writer| {
        build_records(BufReader::new(input), writer, config)
            .with_context(|| format!("failed to build xdom records from {}", merged_path.display()))
    })?;

    info!(
        path = %output_path.display(),
        records_seen = summary.records_seen,
        records = summary.records_written,
        hits = summary.hits_kept,
        dropped_by_cutoff = summary.hits_dropped_by_cutoff,
        dropped_by_overlap = summary.hits_dropped_by_overlap,
        omitted = summary.empty_records_omitted,
        "wrote xdom records"
    );

    Ok(summary)
}
