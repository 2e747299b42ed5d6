use super::*;

use crate::cli::XdomArgs;
use crate::config::XdomSettings;
use crate::error::PipelineError;

pub fn run(args: XdomArgs) -> Result<()> {
    let settings = XdomSettings::load(&args.config)?;
    let merged_path = args.merged.or(settings.merged_path).ok_or_else(|| {
        PipelineError::configuration("files.resultfile or files.fasta must name the merged results")
    })?;
    let output_path = args.output.or(settings.xdom_path).ok_or_else(|| {
        PipelineError::configuration("files.xdomfile or files.fasta must name the xdom output")
    })?;
    if !merged_path.is_file() {
        bail!("merged result file not found: {}", merged_path.display());
    }

    info!(merged = %merged_path.display(), output = %output_path.display(), "building xdom records");
    build_xdom_file(&merged_path, &output_path, &settings.xdom)?;
    Ok(())
}
