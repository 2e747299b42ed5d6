use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::PipelineError;
use crate::model::{Chunk, ScanJob, ScanStatus};
use crate::util::{ensure_directory, progress_label, remove_file_if_exists, write_staged};

mod merge;
mod run;
mod scanner;
mod scheduler;
mod split;

pub use run::run;

pub use merge::*;
pub use run::{RunOptions, run_pipeline};
pub use scanner::*;
pub use scheduler::*;
pub use split::*;
