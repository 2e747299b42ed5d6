use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;

use crate::error::PipelineError;

pub const DEFAULT_XDOM_PATTERN: &str = r"^\S+\s+\d+\s+\d+\s+\d+\s+\d+\s+\S+";

/// A validated run configuration. Only [`ScanConfig::load`] and
/// [`ScanConfig::from_yaml`] construct one.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub fasta: PathBuf,
    pub files: FilesConfig,
    pub jobcontrol: JobControlConfig,
    pub pfamscan: PfamScanConfig,
    pub xdom: XdomConfig,
}

/// The YAML document as written, before any field is required.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    files: FilesConfig,
    jobcontrol: Option<JobControlConfig>,
    #[serde(default)]
    pfamscan: PfamScanConfig,
    #[serde(default)]
    xdom: XdomConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    pub fasta: Option<PathBuf>,
    #[serde(default = "default_wdir")]
    pub wdir: PathBuf,
    #[serde(default = "default_fadir")]
    pub fadir: String,
    #[serde(default = "default_pfsdir")]
    pub pfsdir: String,
    #[serde(default = "default_db_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub wipe: bool,
    pub resultfile: Option<PathBuf>,
    pub xdomfile: Option<PathBuf>,
    pub manifest_dir: Option<PathBuf>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            fasta: None,
            wdir: default_wdir(),
            fadir: default_fadir(),
            pfsdir: default_pfsdir(),
            dir: default_db_dir(),
            wipe: false,
            resultfile: None,
            xdomfile: None,
            manifest_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobControlConfig {
    pub chunk_size: usize,
    #[serde(default = "default_max_thread")]
    pub max_thread: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PfamScanConfig {
    #[serde(default = "default_scanner_bin")]
    pub bin: PathBuf,
    #[serde(default = "default_true")]
    pub clans: bool,
    #[serde(default = "default_cpu")]
    pub cpu: usize,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for PfamScanConfig {
    fn default() -> Self {
        Self {
            bin: default_scanner_bin(),
            clans: true,
            cpu: default_cpu(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMode {
    #[default]
    Envelope,
    Alignment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DomainField {
    Accession,
    #[default]
    Name,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    #[default]
    Evalue,
    Bitscore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XdomConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_xdom_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub coordinates: CoordinateMode,
    #[serde(default)]
    pub domain_field: DomainField,
    #[serde(default)]
    pub clan_mode: bool,
    #[serde(default = "default_clan_sentinel")]
    pub clan_sentinel: String,
    #[serde(default)]
    pub score_field: ScoreField,
    pub score_cutoff: Option<f64>,
    #[serde(default)]
    pub omit_empty: bool,
    #[serde(default = "default_true")]
    pub resolve_overlaps: bool,
}

impl Default for XdomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: default_xdom_pattern(),
            coordinates: CoordinateMode::default(),
            domain_field: DomainField::default(),
            clan_mode: false,
            clan_sentinel: default_clan_sentinel(),
            score_field: ScoreField::default(),
            score_cutoff: None,
            omit_empty: false,
            resolve_overlaps: true,
        }
    }
}

fn default_wdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_fadir() -> String {
    "fas".to_string()
}

fn default_pfsdir() -> String {
    "pfsouts".to_string()
}

fn default_db_dir() -> PathBuf {
    PathBuf::from("pfam_scan_db")
}

fn default_max_thread() -> usize {
    8
}

fn default_scanner_bin() -> PathBuf {
    PathBuf::from("pfam_scan.pl")
}

fn default_cpu() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_xdom_pattern() -> String {
    DEFAULT_XDOM_PATTERN.to_string()
}

fn default_clan_sentinel() -> String {
    "No_clan".to_string()
}

fn read_config(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|err| {
        PipelineError::configuration(format!("failed to read {}: {err}", path.display()))
    })
}

fn parse_raw(raw: &str, origin: &Path) -> Result<RawConfig, PipelineError> {
    serde_yaml::from_str(raw).map_err(|err| {
        PipelineError::configuration(format!("failed to parse {}: {err}", origin.display()))
    })
}

fn validate_pattern(xdom: &XdomConfig) -> Result<(), PipelineError> {
    Regex::new(&xdom.pattern)
        .map(|_| ())
        .map_err(|err| PipelineError::configuration(format!("invalid xdom.pattern: {err}")))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("sequences")
        .to_string()
}

/// `explicit` when configured, otherwise `<fasta stem>.<extension>`.
fn output_path(explicit: Option<&PathBuf>, fasta: &Path, extension: &str) -> PathBuf {
    explicit
        .cloned()
        .unwrap_or_else(|| PathBuf::from(format!("{}.{extension}", file_stem(fasta))))
}

impl ScanConfig {
    /// Reads and validates a YAML config. Every failure is a
    /// [`PipelineError::Configuration`] so the run stops before any work.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_config(path)?;
        Self::from_yaml(&raw, path)
    }

    pub fn from_yaml(raw: &str, origin: &Path) -> Result<Self> {
        let raw = parse_raw(raw, origin)?;
        Ok(Self::validate(raw, origin)?)
    }

    fn validate(raw: RawConfig, origin: &Path) -> Result<Self, PipelineError> {
        let fasta = raw.files.fasta.clone().ok_or_else(|| {
            PipelineError::configuration(format!(
                "at least a fasta sequence must be provided (see {})",
                origin.display()
            ))
        })?;
        if !fasta.exists() {
            return Err(PipelineError::configuration(format!(
                "fasta file does not exist: {}",
                fasta.display()
            )));
        }
        let jobcontrol = raw.jobcontrol.ok_or_else(|| {
            PipelineError::configuration(format!(
                "jobcontrol.chunk_size must be provided (see {})",
                origin.display()
            ))
        })?;
        if jobcontrol.chunk_size == 0 {
            return Err(PipelineError::configuration(
                "jobcontrol.chunk_size must be a positive integer",
            ));
        }
        if jobcontrol.max_thread == 0 {
            return Err(PipelineError::configuration(
                "jobcontrol.max_thread must be at least 1",
            ));
        }
        if raw.pfamscan.cpu == 0 {
            return Err(PipelineError::configuration(
                "pfamscan.cpu must be at least 1",
            ));
        }
        validate_pattern(&raw.xdom)?;

        Ok(Self {
            fasta,
            files: raw.files,
            jobcontrol,
            pfamscan: raw.pfamscan,
            xdom: raw.xdom,
        })
    }

    pub fn fasta_path(&self) -> &Path {
        &self.fasta
    }

    pub fn chunk_dir(&self) -> PathBuf {
        self.files.wdir.join(&self.files.fadir)
    }

    pub fn result_dir(&self) -> PathBuf {
        self.files.wdir.join(&self.files.pfsdir)
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.files
            .manifest_dir
            .clone()
            .unwrap_or_else(|| self.files.wdir.join("manifests"))
    }

    pub fn merged_path(&self) -> PathBuf {
        output_path(self.files.resultfile.as_ref(), &self.fasta, "pfsout")
    }

    pub fn xdom_path(&self) -> PathBuf {
        output_path(self.files.xdomfile.as_ref(), &self.fasta, "xdom")
    }
}

/// The part of a run configuration that record building needs.
///
/// Loading it checks only the xdom section, so records can be rebuilt from a
/// merged file after the input fasta or the job settings are gone.
#[derive(Debug, Clone)]
pub struct XdomSettings {
    pub merged_path: Option<PathBuf>,
    pub xdom_path: Option<PathBuf>,
    pub xdom: XdomConfig,
}

impl XdomSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_config(path)?;
        Self::from_yaml(&raw, path)
    }

    pub fn from_yaml(raw: &str, origin: &Path) -> Result<Self> {
        let raw = parse_raw(raw, origin)?;
        validate_pattern(&raw.xdom)?;

        let files = &raw.files;
        let (merged_path, xdom_path) = match files.fasta.as_deref() {
            Some(fasta) => (
                Some(output_path(files.resultfile.as_ref(), fasta, "pfsout")),
                Some(output_path(files.xdomfile.as_ref(), fasta, "xdom")),
            ),
            None => (files.resultfile.clone(), files.xdomfile.clone()),
        };
        Ok(Self {
            merged_path,
            xdom_path,
            xdom: raw.xdom,
        })
    }
}
