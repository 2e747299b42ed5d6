use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::*;

/// Result file for `chunk`, keyed by the chunk file's name so it never
/// depends on which worker finishes first.
pub fn result_path_for(result_dir: &Path, chunk: &Chunk) -> PathBuf {
    let base = chunk
        .path
        .file_stem()
        .and_then(|value| value.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("chunk-{}", chunk.ordinal));
    result_dir.join(format!("{base}.pfsout"))
}

/// One job per chunk, in ordinal order.
pub fn build_jobs(config: &ScanConfig, chunks: &[Chunk], result_dir: &Path) -> Vec<ScanJob> {
    chunks
        .iter()
        .map(|chunk| {
            let output_path = result_path_for(result_dir, chunk);
            ScanJob {
                chunk: chunk.clone(),
                command: scanner_command(config, chunk, &output_path),
                output_path,
            }
        })
        .collect()
}

enum JobFailure {
    Exit {
        ordinal: usize,
        command: String,
        code: Option<i32>,
    },
    Launch {
        ordinal: usize,
        error: anyhow::Error,
    },
}

impl JobFailure {
    fn into_error(self) -> anyhow::Error {
        match self {
            Self::Exit {
                ordinal,
                command,
                code,
            } => PipelineError::Process {
                ordinal,
                command,
                code,
            }
            .into(),
            Self::Launch { ordinal, error } => {
                error.context(format!("scanner could not be started for chunk {ordinal}"))
            }
        }
    }
}

struct WorkerShared<'a, S: ?Sized> {
    scanner: &'a S,
    cancelled: &'a AtomicBool,
    started: &'a AtomicUsize,
    total: usize,
}

/// Runs every job on `workers` threads pulling from one FIFO queue.
///
/// The first failing job raises a shared cancel flag: no queued job starts
/// afterwards, jobs already running are waited for, and the first reported
/// failure is returned. On success the output paths come back in ordinal
/// order, whatever order the jobs finished in.
pub fn run_jobs<S>(jobs: &[ScanJob], workers: usize, scanner: &S) -> Result<Vec<PathBuf>>
where
    S: Scanner + ?Sized,
{
    if workers == 0 {
        return Err(PipelineError::configuration("worker count must be at least 1").into());
    }
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let (job_tx, job_rx) = unbounded::<&ScanJob>();
    for job in jobs {
        job_tx
            .send(job)
            .map_err(|_| anyhow!("job queue closed while loading chunk {}", job.ordinal()))?;
    }
    drop(job_tx);

    let (failure_tx, failure_rx) = unbounded::<JobFailure>();
    let cancelled = AtomicBool::new(false);
    let started = AtomicUsize::new(0);
    let shared = WorkerShared {
        scanner,
        cancelled: &cancelled,
        started: &started,
        total: jobs.len(),
    };
    let worker_count = workers.min(jobs.len());

    info!(jobs = jobs.len(), workers = worker_count, "starting scan jobs");

    thread::scope(|scope| {
        for worker in 0..worker_count {
            let queue = job_rx.clone();
            let failures = failure_tx.clone();
            let shared = &shared;
            scope.spawn(move || worker_loop(worker, queue, failures, shared));
        }
    });
    drop(failure_tx);

    if let Ok(failure) = failure_rx.try_recv() {
        let skipped = jobs.len().saturating_sub(started.load(Ordering::SeqCst));
        warn!(skipped, "scan aborted after job failure");
        return Err(failure.into_error());
    }

    info!(jobs = jobs.len(), "all scan jobs completed");
    Ok(jobs.iter().map(|job| job.output_path.clone()).collect())
}

fn worker_loop<S>(
    worker: usize,
    queue: Receiver<&ScanJob>,
    failures: Sender<JobFailure>,
    shared: &WorkerShared<'_, S>,
) where
    S: Scanner + ?Sized,
{
    while !shared.cancelled.load(Ordering::SeqCst) {
        let Ok(job) = queue.recv() else {
            break;
        };
        if shared.cancelled.load(Ordering::SeqCst) {
            break;
        }

        let index = shared.started.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            worker,
            chunk = %progress_label(index, shared.total),
            ordinal = job.ordinal(),
            "scanning chunk"
        );

        let failure = match shared.scanner.run(job) {
            Ok(status) if status.is_success() => {
                debug!(worker, ordinal = job.ordinal(), "chunk finished");
                continue;
            }
            Ok(status) => JobFailure::Exit {
                ordinal: job.ordinal(),
                command: job.command_line(),
                code: status.code,
            },
            Err(error) => JobFailure::Launch {
                ordinal: job.ordinal(),
                error,
            },
        };

        shared.cancelled.store(true, Ordering::SeqCst);
        let _ = failures.send(failure);
        break;
    }
}
