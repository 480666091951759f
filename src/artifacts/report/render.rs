//! RST rendering of a [`DiffReport`].
//!
//! Rendering only reads the report; everything it prints is derived from the
//! assembled structure, so equal reports render to equal text.

use crate::artifacts::range::{CommitRecord, Direction, ProjectDiffResult};
use crate::artifacts::report::{DiffReport, ReportSection};
use std::fmt::Write;

pub fn render(report: &DiffReport) -> anyhow::Result<String> {
    let mut out = String::new();

    render_header(&mut out, report)?;
    for section in report.sections() {
        render_section(&mut out, section)?;
    }
    render_failures(&mut out, report)?;

    Ok(out)
}

fn render_header(out: &mut String, report: &DiffReport) -> anyhow::Result<()> {
    let deployment = report.deployment();
    let title = format!(
        "{}: {} -> {}",
        deployment.name(),
        deployment.old_ref(),
        deployment.new_ref()
    );
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(title.len()))?;
    writeln!(out)?;

    render_commit_list(
        out,
        deployment.name(),
        deployment.url(),
        deployment.old_ref(),
        deployment.new_ref(),
        deployment.commits(),
    )?;

    Ok(())
}

fn render_section(out: &mut String, section: &ReportSection) -> anyhow::Result<()> {
    writeln!(out, "{}", section.title())?;
    writeln!(out, "{}", "-".repeat(section.title().len()))?;
    writeln!(out)?;

    if section.results().is_empty() {
        writeln!(out, "No pins changed.")?;
        writeln!(out)?;
        return Ok(());
    }

    for result in section.results() {
        render_result(out, result)?;
    }

    Ok(())
}

fn render_result(out: &mut String, result: &ProjectDiffResult) -> anyhow::Result<()> {
    let heading = match (result.old(), result.new_rev()) {
        (Some(old), Some(new)) => format!("{} ({} -> {})", result.name(), old, new),
        (None, Some(new)) => format!("{} (new pin at {})", result.name(), new),
        (Some(old), None) => format!("{} (pin removed, was {})", result.name(), old),
        (None, None) => result.name().to_string(),
    };
    writeln!(out, "{heading}")?;
    writeln!(out, "{}", "~".repeat(heading.len()))?;
    writeln!(out)?;

    match (result.old(), result.new_rev()) {
        (Some(old), Some(new)) => match result.direction() {
            Direction::Forward => {
                render_commit_list(out, result.name(), result.url(), old, new, result.commits())?;
            }
            Direction::Reversed => {
                writeln!(
                    out,
                    "The pin moved backwards; {} commits were dropped from \
                     `{} <{}>`_ between ``{}`` and ``{}``:",
                    result.commit_count(),
                    result.name(),
                    commit_base_url(result.url()),
                    new,
                    old,
                )?;
                writeln!(out)?;
                render_commit_lines(out, result.url(), result.commits())?;
            }
            Direction::Diverged => {
                writeln!(
                    out,
                    "The histories of ``{}`` and ``{}`` have diverged; showing \
                     {} commits reachable from ``{}`` but not ``{}``:",
                    old,
                    new,
                    result.commit_count(),
                    new,
                    old,
                )?;
                writeln!(out)?;
                render_commit_lines(out, result.url(), result.commits())?;
            }
        },
        (None, Some(_)) => {
            writeln!(out, "No commit range is computed for new pins.")?;
            writeln!(out)?;
        }
        (Some(_), None) | (None, None) => {
            writeln!(out, "No commit range is computed for removed pins.")?;
            writeln!(out)?;
        }
    }

    Ok(())
}

fn render_commit_list(
    out: &mut String,
    name: &str,
    url: &str,
    old: &str,
    new: &str,
    commits: &[CommitRecord],
) -> anyhow::Result<()> {
    writeln!(
        out,
        "{} commits were found in `{} <{}>`_ between ``{}`` and ``{}``:",
        commits.len(),
        name,
        commit_base_url(url),
        old,
        new,
    )?;
    writeln!(out)?;
    render_commit_lines(out, url, commits)
}

fn render_commit_lines(
    out: &mut String,
    url: &str,
    commits: &[CommitRecord],
) -> anyhow::Result<()> {
    let base = commit_base_url(url);
    for commit in commits {
        writeln!(
            out,
            "* `{} <{}/commit/{}>`_ {}",
            commit.short_id(),
            base,
            commit.id(),
            commit.subject(),
        )?;
    }
    if !commits.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

fn render_failures(out: &mut String, report: &DiffReport) -> anyhow::Result<()> {
    if report.failures().is_empty() {
        return Ok(());
    }

    writeln!(out, "Failures")?;
    writeln!(out, "--------")?;
    writeln!(out)?;
    for failure in report.failures() {
        writeln!(
            out,
            "* {}: {}: {}",
            failure.name(),
            failure.error().kind(),
            failure.error(),
        )?;
    }
    writeln!(out)?;

    Ok(())
}

/// Derive the web frontend URL used for commit links.
///
/// GitHub URLs lose a trailing `.git`; legacy `git.openstack.org` URLs map to
/// their GitHub mirror; anything else is used as-is.
pub fn commit_base_url(repo_url: &str) -> String {
    if repo_url.contains("github.com") {
        return repo_url
            .strip_suffix(".git")
            .unwrap_or(repo_url)
            .to_string();
    }

    if repo_url.contains("git.openstack.org") {
        let segments: Vec<&str> = repo_url.split('/').collect();
        if let [.., org, name] = segments.as_slice() {
            return format!("https://github.com/{org}/{name}");
        }
    }

    repo_url.to_string()
}
