use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use pindiff::areas::mirror::MirrorStore;
use pindiff::areas::publish::{deliver, PublishOptions};
use pindiff::artifacts::report::render::render;
use pindiff::commands::report::{Differ, ReportOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "pindiff",
    version = "0.1.0",
    about = "Reports pinned sub-project changes between two deployment revisions",
    long_about = "Finds the pinned services and roles that changed between two revisions \
    of a deployment repository, and the commits each changed pin carries. \
    Mirrors of the referenced repositories are kept under a local storage \
    directory and reused across runs.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(index = 1, help = "Revision of the older deployment state")]
    old_ref: String,

    #[arg(index = 2, help = "Revision of the newer deployment state")]
    new_ref: String,

    #[arg(long, help = "URL of the deployment repository")]
    repo_url: String,

    #[arg(
        short,
        long,
        default_value = "~/.pindiff",
        help = "Mirror storage directory"
    )]
    directory: String,

    #[arg(short, long, help = "Fetch the latest refs for every mirror")]
    update: bool,

    #[arg(
        short = 'r',
        long,
        default_value = "ansible-role-requirements.yml",
        help = "Name of the role requirements file to read"
    )]
    role_requirements: String,

    #[arg(long, help = "Skip checking for changes in projects")]
    skip_projects: bool,

    #[arg(long, help = "Skip checking for changes in roles")]
    skip_roles: bool,

    #[arg(long, help = "Enable info output")]
    verbose: bool,

    #[arg(long, help = "Enable debug output")]
    debug: bool,

    #[arg(long, help = "Do not print the report to stdout")]
    quiet: bool,

    #[arg(long, value_name = "FILENAME", help = "Write the report to a file")]
    file: Option<PathBuf>,

    #[arg(long, help = "Upload the report to a GitHub Gist")]
    gist: bool,

    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 120,
        help = "Network timeout for clone and fetch operations"
    )]
    fetch_timeout: u64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let root = expand_home(&cli.directory);
    std::fs::create_dir_all(&root).with_context(|| {
        format!(
            "couldn't create the storage directory {}; please create it manually",
            root.display()
        )
    })?;

    let store = MirrorStore::new(root, Some(Duration::from_secs(cli.fetch_timeout)));
    let differ = Differ::new(store);

    let opts = ReportOptions {
        old_ref: cli.old_ref.clone(),
        new_ref: cli.new_ref.clone(),
        repo_name: deployment_name(&cli.repo_url),
        repo_url: cli.repo_url.clone(),
        role_requirements: cli.role_requirements.clone(),
        skip_projects: cli.skip_projects,
        skip_roles: cli.skip_roles,
        update: cli.update,
    };

    let report = differ.run(&opts)?;
    let text = render(&report)?;

    let publish = PublishOptions {
        quiet: cli.quiet,
        gist: cli.gist,
        file: cli.file.clone(),
    };
    deliver(&text, &publish, &cli.old_ref, &cli.new_ref)
}

fn init_tracing(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "error"
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();
}

/// Expand a leading `~/` against $HOME; anything else passes through.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Mirror directory and report title for the deployment repository, derived
/// from the last segment of its URL.
fn deployment_name(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "deployment".to_string()
    } else {
        name.to_string()
    }
}
