//! Report assembly.
//!
//! Pure aggregation of per-pin results into the final report structure: no
//! I/O happens here, and identical inputs always assemble into an identical
//! report, so rendered output can be snapshot-tested.

pub mod render;

use crate::artifacts::range::{CommitRecord, ProjectDiffResult};
use crate::errors::DifferError;
use derive_new::new;

/// A sub-project whose resolution failed. The failure is reported alongside
/// the successful results instead of aborting the run.
#[derive(Debug, new)]
pub struct ProjectFailure {
    name: String,
    error: DifferError,
}

impl ProjectFailure {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error(&self) -> &DifferError {
        &self.error
    }
}

/// The deployment repository's own side of the report: the requested refs
/// (post swap) and its manifest-external commits between them.
#[derive(Debug, new)]
pub struct DeploymentInfo {
    name: String,
    url: String,
    old_ref: String,
    new_ref: String,
    commits: Vec<CommitRecord>,
}

impl DeploymentInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn old_ref(&self) -> &str {
        &self.old_ref
    }

    pub fn new_ref(&self) -> &str {
        &self.new_ref
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }
}

/// One category of sub-projects (roles, projects), in the name-sorted order
/// the diff calculator produced.
#[derive(Debug, new)]
pub struct ReportSection {
    title: String,
    results: Vec<ProjectDiffResult>,
}

impl ReportSection {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn results(&self) -> &[ProjectDiffResult] {
        &self.results
    }
}

/// The final artifact handed to rendering.
#[derive(Debug)]
pub struct DiffReport {
    deployment: DeploymentInfo,
    sections: Vec<ReportSection>,
    failures: Vec<ProjectFailure>,
}

impl DiffReport {
    pub fn deployment(&self) -> &DeploymentInfo {
        &self.deployment
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn failures(&self) -> &[ProjectFailure] {
        &self.failures
    }
}

/// Merge the per-pin results and failures into one report, preserving the
/// order they were produced in.
pub fn assemble(
    deployment: DeploymentInfo,
    sections: Vec<ReportSection>,
    failures: Vec<ProjectFailure>,
) -> DiffReport {
    DiffReport {
        deployment,
        sections,
        failures,
    }
}
