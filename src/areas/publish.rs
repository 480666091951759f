//! Report delivery.
//!
//! The rendered report goes to stdout by default, through a pager when stdout
//! is an interactive terminal. `--file` writes it to disk and `--gist`
//! uploads it as a public GitHub Gist; either of those (or `--quiet`)
//! suppresses the stdout copy and only a short delivery summary is printed.

use anyhow::Context;
use derive_new::new;
use is_terminal::IsTerminal;
use minus::Pager;
use std::io::{self, Write};
use std::path::PathBuf;

/// Gist API endpoint for anonymous public uploads.
const GIST_API_URL: &str = "https://api.github.com/gists";

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub quiet: bool,
    pub gist: bool,
    pub file: Option<PathBuf>,
}

/// Deliver the rendered report according to the user's output options.
pub fn deliver(
    report: &str,
    opts: &PublishOptions,
    old_ref: &str,
    new_ref: &str,
) -> anyhow::Result<()> {
    if !opts.quiet && !opts.gist && opts.file.is_none() {
        return page_or_print(report);
    }

    if opts.gist {
        let url = post_gist(report, old_ref, new_ref)?;
        println!("Report posted to GitHub Gist: {url}");
    }

    if let Some(path) = &opts.file {
        std::fs::write(path, report)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to file: {}", path.display());
    }

    Ok(())
}

fn page_or_print(report: &str) -> anyhow::Result<()> {
    if io::stdout().is_terminal() {
        let pager = Pager::new();
        let mut writer = PagerWriter::new(pager.clone());
        writer.write_all(report.as_bytes())?;
        minus::page_all(pager)?;
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(report.as_bytes())?;
        stdout.flush()?;
    }

    Ok(())
}

/// Upload the report as an anonymous public gist and return its URL.
fn post_gist(report: &str, old_ref: &str, new_ref: &str) -> anyhow::Result<String> {
    let payload = serde_json::json!({
        "description": format!("Pinned revision changes between {old_ref} and {new_ref}"),
        "public": true,
        "files": {
            format!("pindiff-{old_ref}-{new_ref}.rst"): { "content": report }
        }
    });

    let response: serde_json::Value = reqwest::blocking::Client::new()
        .post(GIST_API_URL)
        .header(reqwest::header::USER_AGENT, "pindiff")
        .json(&payload)
        .send()
        .context("failed to reach the gist API")?
        .error_for_status()
        .context("gist upload was rejected")?
        .json()
        .context("gist API returned an unreadable response")?;

    response["html_url"]
        .as_str()
        .map(str::to_string)
        .context("gist API response carried no html_url")
}

/// Wrapper that implements `Write` for the minus pager
///
/// The minus pager doesn't implement `std::io::Write` directly, so this
/// wrapper adapts it to be compatible with Rust's standard I/O traits.
#[derive(new)]
pub struct PagerWriter {
    pager: Pager,
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s =
            std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.pager.push_str(s).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
