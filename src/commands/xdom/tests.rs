use std::fs;
use std::io::Cursor;

use super::*;
use crate::cli::XdomArgs;

fn hit(start: u64, end: u64, name: &str, score: f64) -> DomainHit {
    DomainHit::new(start, end, name, score)
}

fn render(input: &str, config: &XdomConfig) -> (String, XdomSummary) {
    let mut output = Vec::new();
    let summary = build_records(Cursor::new(input), &mut output, config).expect("build records");
    (String::from_utf8(output).expect("utf8 output"), summary)
}

const MERGED: &str = "\
# pfam_scan.pl, run at Tue Oct  6 10:00:00 2026
# <seq id> <alignment start> <alignment end> <envelope start> <envelope end> <hmm acc> <hmm name> <type> <hmm start> <hmm end> <hmm length> <bit score> <E-value> <significance> <clan>
sp|P1|A 3 40 1 42 PF00069.25 Pkinase Domain 1 40 264 50.2 1.5e-10 1 CL0016
sp|P1|A 60 90 58 95 PF00017.24 SH2 Domain 1 77 77 40.0 2.0e-8 1 No_clan
sp|P2|B 5 25 4 30 PF00018.28 SH3_1 Domain 1 48 48 30.5 0.5 1 CL0010
sp|P3|C 1 10 1 12 PF00001.1 7tm_1 Family 1 10 268 9.9 2.0 0 CL0192
";

#[test]
fn resolve_drops_lower_scoring_overlap() {
    let hits = vec![hit(1, 10, "A", 5.0), hit(5, 15, "B", 3.0), hit(20, 30, "C", 1.0)];

    let resolved = resolve_overlaps(hits);

    assert_eq!(resolved, vec![hit(1, 10, "A", 5.0), hit(20, 30, "C", 1.0)]);
}

#[test]
fn resolve_replaces_previous_when_current_scores_higher() {
    let hits = vec![hit(1, 10, "A", 1.0), hit(8, 20, "B", 4.0)];
    assert_eq!(resolve_overlaps(hits), vec![hit(8, 20, "B", 4.0)]);
}

#[test]
fn resolve_ties_keep_earlier_hit() {
    let hits = vec![hit(1, 10, "A", 2.0), hit(10, 20, "B", 2.0)];
    assert_eq!(resolve_overlaps(hits), vec![hit(1, 10, "A", 2.0)]);
}

#[test]
fn resolve_touching_end_counts_as_overlap_but_adjacent_does_not() {
    let touching = vec![hit(1, 10, "A", 1.0), hit(10, 12, "B", 0.5)];
    assert_eq!(resolve_overlaps(touching).len(), 1);

    let adjacent = vec![hit(1, 10, "A", 1.0), hit(11, 12, "B", 0.5)];
    assert_eq!(resolve_overlaps(adjacent).len(), 2);
}

#[test]
fn resolve_single_and_empty_records_unchanged() {
    assert!(resolve_overlaps(Vec::new()).is_empty());
    assert_eq!(
        resolve_overlaps(vec![hit(4, 9, "A", 0.1)]),
        vec![hit(4, 9, "A", 0.1)]
    );
}

#[test]
fn resolve_chain_is_local_not_global() {
    // B beats A and is then compared only with C; it never looks back at X.
    let hits = vec![
        hit(1, 5, "X", 1.0),
        hit(10, 20, "A", 2.0),
        hit(15, 30, "B", 3.0),
        hit(25, 40, "C", 9.0),
    ];

    let resolved = resolve_overlaps(hits);

    assert_eq!(resolved, vec![hit(1, 5, "X", 1.0), hit(25, 40, "C", 9.0)]);
}

#[test]
fn resolve_keeps_previous_through_a_run_of_weaker_overlaps() {
    let hits = vec![
        hit(1, 50, "LONG", 10.0),
        hit(5, 10, "S1", 1.0),
        hit(20, 30, "S2", 2.0),
        hit(45, 60, "S3", 3.0),
        hit(70, 80, "D", 0.1),
    ];

    let resolved = resolve_overlaps(hits);

    assert_eq!(resolved, vec![hit(1, 50, "LONG", 10.0), hit(70, 80, "D", 0.1)]);
}

#[test]
fn resolve_is_idempotent_on_sorted_input() {
    let inputs = vec![
        vec![hit(1, 10, "A", 5.0), hit(5, 15, "B", 3.0), hit(20, 30, "C", 1.0)],
        vec![hit(1, 5, "X", 1.0), hit(10, 20, "A", 2.0), hit(15, 30, "B", 3.0), hit(25, 40, "C", 9.0)],
        vec![hit(1, 3, "A", 1.0), hit(2, 4, "B", 2.0), hit(3, 5, "C", 3.0), hit(4, 6, "D", 4.0)],
        (0..20)
            .map(|index| hit(index * 7, index * 7 + 10, "R", ((index * 13) % 5) as f64))
            .collect(),
    ];

    for hits in inputs {
        let once = resolve_overlaps(hits);
        let twice = resolve_overlaps(once.clone());
        assert_eq!(once, twice);
    }
}

#[test]
fn resolve_preserves_relative_order() {
    let hits: Vec<DomainHit> = (0..10).map(|index| hit(index * 10, index * 10 + 5, "D", 1.0)).collect();
    let resolved = resolve_overlaps(hits.clone());
    assert_eq!(resolved, hits);
}

#[test]
fn parser_uses_envelope_coordinates_and_names_by_default() {
    let parser = HitParser::new(&XdomConfig::default()).expect("parser");
    let line = "sp|P1|A 3 40 1 42 PF00069.25 Pkinase Domain 1 40 264 50.2 1.5e-10 1 CL0016";

    let parsed = parser.parse_line(line, 1).expect("parse").expect("matching line");

    assert_eq!(parsed.sequence_id, "sp|P1|A");
    assert_eq!(parsed.hit, hit(1, 42, "Pkinase", 1.5e-10));
}

#[test]
fn parser_supports_alignment_accession_and_bitscore() {
    let config = XdomConfig {
        coordinates: CoordinateMode::Alignment,
        domain_field: DomainField::Accession,
        score_field: ScoreField::Bitscore,
        ..XdomConfig::default()
    };
    let parser = HitParser::new(&config).expect("parser");
    let line = "sp|P1|A 3 40 1 42 PF00069.25 Pkinase Domain 1 40 264 50.2 1.5e-10 1 CL0016";

    let parsed = parser.parse_line(line, 1).expect("parse").expect("matching line");

    assert_eq!(parsed.hit, hit(3, 40, "PF00069.25", 50.2));
}

#[test]
fn parser_substitutes_clan_unless_sentinel() {
    let config = XdomConfig {
        clan_mode: true,
        ..XdomConfig::default()
    };
    let parser = HitParser::new(&config).expect("parser");

    let clan = "q 1 9 1 9 PF00017.24 SH2 Domain 1 9 77 40.0 2.0e-8 1 CL0541";
    let no_clan = "q 1 9 1 9 PF00017.24 SH2 Domain 1 9 77 40.0 2.0e-8 1 No_clan";
    let missing = "q 1 9 1 9 PF00017.24 SH2 Domain 1 9 77 40.0 2.0e-8 1";

    let name = |line: &str| parser.parse_line(line, 1).expect("parse").expect("match").hit.name;
    assert_eq!(name(clan), "CL0541");
    assert_eq!(name(no_clan), "SH2");
    assert_eq!(name(missing), "SH2");
}

#[test]
fn parser_skips_comments_and_non_matching_lines() {
    let parser = HitParser::new(&XdomConfig::default()).expect("parser");
    assert!(parser.parse_line("# <seq id> 1 2 3 4 x", 1).expect("parse").is_none());
    assert!(parser.parse_line("random trailer text", 2).expect("parse").is_none());
}

#[test]
fn parser_reports_line_of_malformed_score() {
    let parser = HitParser::new(&XdomConfig::default()).expect("parser");
    let err = parser
        .parse_line("q 1 9 1 9 PF1 SH2 Domain 1 9 77 40.0 n/a 1 No_clan", 17)
        .expect_err("bad score");
    assert!(err.to_string().contains("line 17"));
}

#[test]
fn builder_groups_consecutive_lines_and_resolves() {
    let (output, summary) = render(MERGED, &XdomConfig::default());

    assert_eq!(
        output,
        "\
>sp|P1|A
1\t42\tPkinase\t1.5e-10
58\t95\tSH2\t2e-8
>sp|P2|B
4\t30\tSH3_1\t0.5
>sp|P3|C
1\t12\t7tm_1\t2
"
    );
    assert_eq!(summary.records_seen, 3);
    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.hits_kept, 4);
}

#[test]
fn builder_cutoff_drops_worse_scores_and_omit_empty_suppresses_records() {
    let config = XdomConfig {
        score_cutoff: Some(1e-3),
        omit_empty: true,
        ..XdomConfig::default()
    };

    let (output, summary) = render(MERGED, &config);

    assert_eq!(output, ">sp|P1|A\n1\t42\tPkinase\t1.5e-10\n58\t95\tSH2\t2e-8\n");
    assert_eq!(summary.hits_dropped_by_cutoff, 2);
    assert_eq!(summary.empty_records_omitted, 2);
}

#[test]
fn builder_writes_empty_records_when_not_omitting() {
    let config = XdomConfig {
        score_cutoff: Some(1e-3),
        ..XdomConfig::default()
    };

    let (output, summary) = render(MERGED, &config);

    assert!(output.ends_with(">sp|P2|B\n>sp|P3|C\n"));
    assert_eq!(summary.records_written, 3);
}

#[test]
fn omit_empty_never_drops_single_hit_record() {
    let config = XdomConfig {
        omit_empty: true,
        ..XdomConfig::default()
    };
    let input = "solo 1 9 1 9 PF1 SH2 Domain 1 9 77 40.0 0.01 1 No_clan\n";

    let (output, summary) = render(input, &config);

    assert_eq!(output, ">solo\n1\t9\tSH2\t0.01\n");
    assert_eq!(summary.empty_records_omitted, 0);
}

#[test]
fn builder_without_resolution_keeps_overlaps() {
    let input = "\
q 1 10 1 10 PF1 A Domain 1 9 77 40.0 5.0 1 No_clan
q 5 15 5 15 PF2 B Domain 1 9 77 40.0 3.0 1 No_clan
";
    let config = XdomConfig {
        resolve_overlaps: false,
        ..XdomConfig::default()
    };

    let (output, summary) = render(input, &config);

    assert_eq!(output, ">q\n1\t10\tA\t5\n5\t15\tB\t3\n");
    assert_eq!(summary.hits_dropped_by_overlap, 0);

    let (resolved, summary) = render(input, &XdomConfig::default());
    assert_eq!(resolved, ">q\n1\t10\tA\t5\n");
    assert_eq!(summary.hits_dropped_by_overlap, 1);
}

#[test]
fn build_xdom_file_creates_output_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let merged = dir.path().join("merged.pfsout");
    fs::write(&merged, MERGED).expect("write merged");
    let output = dir.path().join("records/out.xdom");

    let summary = build_xdom_file(&merged, &output, &XdomConfig::default()).expect("xdom");

    assert_eq!(summary.records_written, 3);
    let text = fs::read_to_string(&output).expect("read xdom");
    assert!(text.starts_with(">sp|P1|A\n"));
}

#[test]
fn builder_accepts_crlf_and_non_utf8_lines() {
    let input: &[u8] = b"# header\r\nq\xe9 1 9 1 9 PF1 SH2 Domain 1 9 77 40.0 0.01 1 No_clan\r\n";
    let mut output = Vec::new();

    let summary = build_records(input, &mut output, &XdomConfig::default()).expect("build records");

    assert_eq!(output, ">q\u{FFFD}\n1\t9\tSH2\t0.01\n".as_bytes());
    assert_eq!(summary.records_written, 1);
}

#[test]
fn build_xdom_file_failure_keeps_previous_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let merged = dir.path().join("merged.pfsout");
    fs::write(&merged, "q 1 9 1 9 PF1 SH2 Domain 1 9 77 40.0 n/a 1 No_clan\n").expect("write merged");
    let output = dir.path().join("out.xdom");
    fs::write(&output, ">previous\n").expect("write xdom");

    build_xdom_file(&merged, &output, &XdomConfig::default()).expect_err("bad score");

    assert_eq!(fs::read_to_string(&output).expect("read xdom"), ">previous\n");
    assert!(!dir.path().join("out.xdom.tmp").exists());
}

#[test]
fn xdom_command_needs_only_the_xdom_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let merged = dir.path().join("merged.pfsout");
    fs::write(&merged, MERGED).expect("write merged");
    let output = dir.path().join("records.xdom");
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "files:\n  fasta: {}\n  resultfile: {}\n  xdomfile: {}\nxdom:\n  omit_empty: true\n",
            dir.path().join("deleted.fa").display(),
            merged.display(),
            output.display()
        ),
    )
    .expect("write config");

    run(XdomArgs {
        config,
        merged: None,
        output: None,
    })
    .expect("xdom without fasta or jobcontrol");

    let text = fs::read_to_string(&output).expect("read xdom");
    assert!(text.starts_with(">sp|P1|A\n1\t42\tPkinase\t1.5e-10\n"));
}
