use super::*;

// Whitespace-separated columns of a scanner result line.
const SEQ_ID: usize = 0;
const ALIGNMENT_START: usize = 1;
const ALIGNMENT_END: usize = 2;
const ENVELOPE_START: usize = 3;
const ENVELOPE_END: usize = 4;
const HMM_ACCESSION: usize = 5;
const HMM_NAME: usize = 6;
const BIT_SCORE: usize = 11;
const E_VALUE: usize = 12;
const CLAN: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHit {
    pub sequence_id: String,
    pub hit: DomainHit,
}

/// Extracts domain hits from result lines according to an [`XdomConfig`].
#[derive(Debug, Clone)]
pub struct HitParser {
    pattern: Regex,
    coordinates: CoordinateMode,
    domain_field: DomainField,
    clan_mode: bool,
    clan_sentinel: String,
    score_field: ScoreField,
}

impl HitParser {
    pub fn new(config: &XdomConfig) -> Result<Self> {
        let pattern = Regex::new(&config.pattern)
            .with_context(|| format!("failed to compile record pattern: {}", config.pattern))?;
        Ok(Self {
            pattern,
            coordinates: config.coordinates,
            domain_field: config.domain_field,
            clan_mode: config.clan_mode,
            clan_sentinel: config.clan_sentinel.clone(),
            score_field: config.score_field,
        })
    }

    /// Returns `None` for comment lines and lines the pattern does not match.
    pub fn parse_line(&self, line: &str, line_number: usize) -> Result<Option<ParsedHit>> {
        if line.starts_with('#') || !self.pattern.is_match(line) {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let field = |index: usize, label: &str| column(&fields, index, label, line_number);

        let (start_index, end_index) = match self.coordinates {
            CoordinateMode::Envelope => (ENVELOPE_START, ENVELOPE_END),
            CoordinateMode::Alignment => (ALIGNMENT_START, ALIGNMENT_END),
        };
        let start = parse_number::<u64>(field(start_index, "start")?, "start", line_number)?;
        let end = parse_number::<u64>(field(end_index, "end")?, "end", line_number)?;

        let name = match self.domain_field {
            DomainField::Accession => field(HMM_ACCESSION, "hmm accession")?,
            DomainField::Name => field(HMM_NAME, "hmm name")?,
        };
        let name = if self.clan_mode {
            match fields.get(CLAN) {
                Some(&clan) if !clan.eq_ignore_ascii_case(&self.clan_sentinel) => clan,
                _ => name,
            }
        } else {
            name
        };

        let score_index = match self.score_field {
            ScoreField::Evalue => E_VALUE,
            ScoreField::Bitscore => BIT_SCORE,
        };
        let score = parse_number::<f64>(field(score_index, "score")?, "score", line_number)?;

        Ok(Some(ParsedHit {
            sequence_id: field(SEQ_ID, "sequence id")?.to_string(),
            hit: DomainHit::new(start, end, name, score),
        }))
    }
}

fn column<'a>(fields: &[&'a str], index: usize, label: &str, line_number: usize) -> Result<&'a str> {
    fields
        .get(index)
        .copied()
        .with_context(|| format!("line {line_number}: missing {label} column"))
}

fn parse_number<T: std::str::FromStr>(raw: &str, label: &str, line_number: usize) -> Result<T> {
    match raw.parse::<T>() {
        Ok(value) => Ok(value),
        Err(_) => bail!("line {line_number}: invalid {label} value '{raw}'"),
    }
}
