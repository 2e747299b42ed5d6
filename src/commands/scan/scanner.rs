use std::process::Command;

use super::*;

/// Runs the external domain scanner for one job.
///
/// Implementations must be shareable across worker threads. A returned
/// `Err` means the scanner could not be launched at all; a non-zero
/// [`ScanStatus`] means it ran and failed. Both are fatal to the run.
pub trait Scanner: Sync {
    fn run(&self, job: &ScanJob) -> Result<ScanStatus>;
}

/// Executes the argv stored on each job as a child process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PfamScanner;

impl Scanner for PfamScanner {
    fn run(&self, job: &ScanJob) -> Result<ScanStatus> {
        let (program, args) = job
            .command
            .split_first()
            .ok_or_else(|| anyhow!("empty scanner command for chunk {}", job.ordinal()))?;

        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute {program} for chunk {}", job.ordinal()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                chunk = job.ordinal(),
                code = ?output.status.code(),
                stderr = %stderr.trim(),
                "scanner returned non-zero exit status"
            );
        }

        Ok(ScanStatus {
            code: output.status.code(),
        })
    }
}

/// Builds the scanner argv for `chunk`, writing its report to `output_path`.
pub fn scanner_command(config: &ScanConfig, chunk: &Chunk, output_path: &Path) -> Vec<String> {
    let scanner = &config.pfamscan;
    let mut command = vec![
        scanner.bin.display().to_string(),
        "-fasta".to_string(),
        chunk.path.display().to_string(),
        "-dir".to_string(),
        config.files.dir.display().to_string(),
    ];
    if scanner.clans {
        command.push("-clan_overlap".to_string());
    }
    command.push("-cpu".to_string());
    command.push(scanner.cpu.to_string());
    command.push("-outfile".to_string());
    command.push(output_path.display().to_string());
    command.extend(scanner.extra_args.iter().cloned());
    command
}
