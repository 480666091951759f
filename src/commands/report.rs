//! The diff-report pipeline.

use crate::areas::mirror::{Mirror, MirrorStore};
use crate::artifacts::diff::diff;
use crate::artifacts::manifest::format::PROJECT_VARS_DIR;
use crate::artifacts::manifest::ManifestSource;
use crate::artifacts::range::RangeResolver;
use crate::artifacts::report::{
    assemble, DeploymentInfo, DiffReport, ProjectFailure, ReportSection,
};
use crate::errors::DifferError;
use anyhow::Context;
use derive_new::new;
use git2::Oid;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub old_ref: String,
    pub new_ref: String,
    pub repo_name: String,
    pub repo_url: String,
    pub role_requirements: String,
    pub skip_projects: bool,
    pub skip_roles: bool,
    pub update: bool,
}

/// Orchestrates one report run against a mirror store.
#[derive(new)]
pub struct Differ {
    store: MirrorStore,
}

impl Differ {
    /// Produce the full diff report for the requested revision pair.
    ///
    /// Everything concerning the deployment repository itself is fatal here:
    /// its mirror, its refs, and its manifests. Per sub-project failures are
    /// collected into the report instead.
    pub fn run(&self, opts: &ReportOptions) -> anyhow::Result<DiffReport> {
        let mirror = self
            .store
            .ensure(&opts.repo_name, &opts.repo_url, opts.update)
            .context("the deployment repository could not be mirrored")?;

        let old_oid = mirror.resolve_commit(&opts.old_ref)?;
        let new_oid = mirror.resolve_commit(&opts.new_ref)?;

        if old_oid == new_oid {
            return Err(DifferError::InvalidCommitRange {
                name: opts.repo_name.clone(),
                old: opts.old_ref.clone(),
                new: opts.new_ref.clone(),
            }
            .into());
        }

        let ((old_ref, old_oid), (new_ref, new_oid)) = order_refs(
            &mirror,
            (opts.old_ref.as_str(), old_oid),
            (opts.new_ref.as_str(), new_oid),
        )?;

        let deployment_commits = mirror
            .commits_between(old_oid, new_oid)?
            .into_iter()
            .filter(|commit| !commit.is_merge())
            .collect();

        let resolver = RangeResolver::new(&self.store, opts.update);
        let mut sections = Vec::new();
        let mut failures = Vec::new();

        if !opts.skip_roles {
            let source = ManifestSource::RoleRequirements {
                path: opts.role_requirements.clone(),
            };
            sections.push(diff_section(
                "Roles", &source, &mirror, old_oid, new_oid, &resolver, &mut failures,
            )?);
        }

        if !opts.skip_projects {
            let source = ManifestSource::ProjectVars {
                dir: PROJECT_VARS_DIR.to_string(),
            };
            sections.push(diff_section(
                "Projects", &source, &mirror, old_oid, new_oid, &resolver, &mut failures,
            )?);
        }

        let deployment = DeploymentInfo::new(
            opts.repo_name.clone(),
            opts.repo_url.clone(),
            old_ref.to_string(),
            new_ref.to_string(),
            deployment_commits,
        );

        Ok(assemble(deployment, sections, failures))
    }
}

/// Put the requested refs in forward order.
///
/// Callers sometimes pass the newer ref first; when ancestry shows the pair
/// is backwards it is flipped so the report reads the same either way. Refs
/// with diverged histories are left as given and reported best-effort.
fn order_refs<'a>(
    mirror: &Mirror,
    old: (&'a str, Oid),
    new: (&'a str, Oid),
) -> Result<((&'a str, Oid), (&'a str, Oid)), DifferError> {
    let forward = mirror.is_ancestor(old.1, new.1)?;
    let backward = mirror.is_ancestor(new.1, old.1)?;

    if backward && !forward {
        tracing::info!(
            old = old.0,
            new = new.0,
            "requested refs are in reverse order; swapping"
        );
        return Ok((new, old));
    }

    if !forward && !backward {
        tracing::warn!(
            old = old.0,
            new = new.0,
            "requested refs have diverged; reporting a best-effort range"
        );
    }

    Ok((old, new))
}

fn diff_section(
    title: &str,
    source: &ManifestSource,
    mirror: &Mirror,
    old: Oid,
    new: Oid,
    resolver: &RangeResolver<'_>,
    failures: &mut Vec<ProjectFailure>,
) -> anyhow::Result<ReportSection> {
    let old_pins = source.read(mirror, old)?;
    let new_pins = source.read(mirror, new)?;
    tracing::debug!(
        section = title,
        old = old_pins.len(),
        new = new_pins.len(),
        "read manifest snapshots"
    );

    let mut results = Vec::new();
    for change in diff(&old_pins, &new_pins) {
        match resolver.resolve(&change) {
            Ok(result) => results.push(result),
            Err(error) => {
                tracing::warn!(project = change.name(), %error, "recording failure and continuing");
                failures.push(ProjectFailure::new(change.name().to_string(), error));
            }
        }
    }

    Ok(ReportSection::new(title.to_string(), results))
}
