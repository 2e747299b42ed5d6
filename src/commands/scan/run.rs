use chrono::Utc;

use super::*;

use crate::cli::RunArgs;
use crate::commands::xdom::build_xdom_file;
use crate::model::{PlannedJob, ScanRunCounts, ScanRunManifest, ScanRunPaths};
use crate::util::{now_utc_string, reset_directory, sha256_file, utc_compact_string, write_json_pretty};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub manifest_path: Option<PathBuf>,
    pub command: String,
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = ScanConfig::load(&args.config)?;
    let options = RunOptions {
        dry_run: args.dry_run,
        manifest_path: args.manifest_path.clone(),
        command: render_run_command(&args),
    };

    let manifest = run_pipeline(&config, &options, &PfamScanner)?;
    info!(
        run_id = %manifest.run_id,
        chunks = manifest.counts.chunks,
        merged_lines = manifest.counts.merged_lines,
        "run completed"
    );
    Ok(())
}

/// Split, scan, merge and optionally build xdom records.
///
/// A run manifest is written whether the pipeline succeeds or not. A failed
/// run never records a merged output path.
pub fn run_pipeline<S>(config: &ScanConfig, options: &RunOptions, scanner: &S) -> Result<ScanRunManifest>
where
    S: Scanner + ?Sized,
{
    let started_ts = Utc::now();
    let run_id = format!("scan-{}", utc_compact_string(started_ts));
    let manifest_path = options.manifest_path.clone().unwrap_or_else(|| {
        config
            .manifest_dir()
            .join(format!("scan_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(run_id = %run_id, fasta = %config.fasta_path().display(), "starting scan run");

    let mut manifest = ScanRunManifest {
        manifest_version: 1,
        run_id,
        status: "running".to_string(),
        started_at: now_utc_string(),
        updated_at: String::new(),
        dry_run: options.dry_run,
        command: options.command.clone(),
        fasta_sha256: sha256_file(config.fasta_path())?,
        chunk_size: config.jobcontrol.chunk_size,
        workers: config.jobcontrol.max_thread,
        paths: ScanRunPaths {
            fasta: config.fasta_path().display().to_string(),
            chunk_dir: config.chunk_dir().display().to_string(),
            result_dir: config.result_dir().display().to_string(),
            merged_path: None,
            xdom_path: None,
        },
        current_step: "prepare".to_string(),
        chunks: Vec::new(),
        jobs: Vec::new(),
        counts: ScanRunCounts::default(),
        failed_step: None,
        failure_reason: None,
    };

    let outcome = execute_steps(config, options, scanner, &mut manifest);
    manifest.updated_at = now_utc_string();

    match outcome {
        Ok(()) => {
            manifest.status = "completed".to_string();
            manifest.current_step = "complete".to_string();
            write_json_pretty(&manifest_path, &manifest)?;
            info!(path = %manifest_path.display(), "wrote scan run manifest");
            Ok(manifest)
        }
        Err(err) => {
            manifest.status = "failed".to_string();
            manifest.failed_step = Some(manifest.current_step.clone());
            manifest.failure_reason = Some(format!("{err:#}"));
            manifest.paths.merged_path = None;
            manifest.paths.xdom_path = None;
            if let Err(write_err) = write_json_pretty(&manifest_path, &manifest) {
                warn!(error = %write_err, path = %manifest_path.display(), "failed to write scan run manifest");
            }
            Err(err)
        }
    }
}

fn execute_steps<S>(
    config: &ScanConfig,
    options: &RunOptions,
    scanner: &S,
    manifest: &mut ScanRunManifest,
) -> Result<()>
where
    S: Scanner + ?Sized,
{
    let chunk_dir = config.chunk_dir();
    let result_dir = config.result_dir();
    let merged_path = config.merged_path();
    let xdom_path = config.xdom_path();

    // Outputs of an earlier run must not survive a run that fails.
    if !options.dry_run {
        for stale in [&merged_path, &xdom_path] {
            if remove_file_if_exists(stale)? {
                info!(path = %stale.display(), "removed previous output");
            }
        }
    }

    manifest.current_step = "split".to_string();
    prepare_directory(&chunk_dir, config.files.wipe)?;
    let chunks = split_fasta(config.fasta_path(), &chunk_dir, config.jobcontrol.chunk_size)?;
    manifest.counts.chunks = chunks.len();
    manifest.counts.records = chunks.iter().map(|chunk| chunk.record_count).sum();
    manifest.chunks = chunks.clone();

    manifest.current_step = "schedule".to_string();
    prepare_directory(&result_dir, config.files.wipe)?;
    let jobs = build_jobs(config, &chunks, &result_dir);
    manifest.counts.jobs = jobs.len();
    manifest.jobs = jobs.iter().map(PlannedJob::from).collect();

    if options.dry_run {
        for job in &jobs {
            info!(ordinal = job.ordinal(), command = %job.command_line(), "planned scan job");
        }
        return Ok(());
    }

    let result_paths = run_jobs(&jobs, config.jobcontrol.max_thread, scanner)?;

    manifest.current_step = "merge".to_string();
    let merged = merge_results(&result_paths, &merged_path)?;
    manifest.counts.merged_lines = merged.lines_written;
    manifest.counts.header_lines = merged.header_lines;
    manifest.paths.merged_path = Some(merged.path.display().to_string());

    if config.xdom.enabled {
        manifest.current_step = "xdom".to_string();
        let summary = build_xdom_file(&merged.path, &xdom_path, &config.xdom)?;
        manifest.counts.xdom_records_written = summary.records_written;
        manifest.counts.hits_kept = summary.hits_kept;
        manifest.counts.hits_dropped_by_cutoff = summary.hits_dropped_by_cutoff;
        manifest.counts.hits_dropped_by_overlap = summary.hits_dropped_by_overlap;
        manifest.counts.empty_records_omitted = summary.empty_records_omitted;
        manifest.paths.xdom_path = Some(xdom_path.display().to_string());
    }

    Ok(())
}

fn prepare_directory(path: &Path, wipe: bool) -> Result<()> {
    if wipe {
        info!(path = %path.display(), "wiping directory");
        reset_directory(path)
    } else {
        ensure_directory(path)
    }
}

fn render_run_command(args: &RunArgs) -> String {
    let mut command = vec![
        "dncscan".to_string(),
        "run".to_string(),
        args.config.display().to_string(),
    ];
    if args.dry_run {
        command.push("--dry-run".to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    command.join(" ")
}
