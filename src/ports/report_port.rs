//! Export port for finished model runs.

use crate::domain::error::NextOpenError;
use crate::domain::model::ModelRun;
use std::path::{Path, PathBuf};

pub trait ReportPort {
    /// Write the run's artifacts under `output_dir`, returning the files written.
    fn write(&self, run: &ModelRun, output_dir: &Path) -> Result<Vec<PathBuf>, NextOpenError>;
}
