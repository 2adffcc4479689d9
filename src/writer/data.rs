//! Writes each job's variables as pretty JSON.
//!
//! Useful for inspecting the graph and as the reference [`Writer`]: a
//! template engine plugs in at the same seam.

use super::{Lookup, RenderError, RenderJob, Writer};
use crate::content::path;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct DataWriter {
    output: PathBuf,
    templates: PathBuf,
}

impl DataWriter {
    pub fn new(output: PathBuf, templates: PathBuf) -> Self {
        Self { output, templates }
    }
}

impl Writer for DataWriter {
    fn write(&self, job: &RenderJob, _lookup: &Lookup) -> Result<(), RenderError> {
        if self.templates.is_dir() && !self.templates.join(&job.template).is_file() {
            return Err(RenderError::TemplateNotFound(job.template.clone()));
        }

        if path::escapes_root(&path::normalize(&job.path)) {
            return Err(RenderError::OutsideOutput(job.path.clone()));
        }
        let path = self.output.join(&job.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RenderError::Io(parent.to_path_buf(), e))?;
        }
        let body = serde_json::to_string_pretty(&job.vars)?;
        fs::write(&path, body).map_err(|e| RenderError::Io(path, e))
    }
}
