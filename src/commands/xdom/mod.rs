use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::info;

use crate::config::{CoordinateMode, DomainField, ScoreField, XdomConfig};
use crate::model::{DomainHit, SequenceRecord};
use crate::util::{format_score, write_staged};

mod builder;
mod parse;
mod resolve;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;

pub use builder::*;
pub use parse::*;
pub use resolve::*;
