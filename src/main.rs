use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use polyvers::analyzer::VersionResolver;
use polyvers::cli::{self, BumpWorkflowArgs, StatusArgs};
use polyvers::config;
use polyvers::domain::{PreReleaseType, Registry, VersionBump};
use polyvers::git::Git2Repository;
use polyvers::{telemetry, ui, PolyversError};

#[derive(clap::Parser)]
#[command(
    name = "polyvers",
    version,
    about = "Bump PEP-440 versions of sub-projects in a git monorepo, using tags as the source of truth"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "More log output (-v info, -vv debug, -vvv trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current version of projects
    Status {
        #[arg(help = "Projects to show (default: all)")]
        projects: Vec<String>,

        #[arg(long, help = "Show describe-style versions, e.g. 1.0.0+3.gabc1234")]
        describe: bool,

        #[arg(long, help = "Also print the HEAD commit date (RFC-2822)")]
        time: bool,
    },
    /// Bump versions: engrave files, commit, and tag each project
    Bump {
        #[arg(help = "major, minor, patch, prerelease, or an explicit version")]
        kind: String,

        #[arg(help = "Projects to bump")]
        projects: Vec<String>,

        #[arg(long, help = "Bump every configured project")]
        all: bool,

        #[arg(long, value_name = "PHASE", help = "Pre-release phase for prerelease bumps: a, b or rc")]
        pre: Option<String>,

        #[arg(short = 'n', long, help = "Preview what would happen without making changes")]
        dry_run: bool,

        #[arg(short, long, help = "Skip confirmation prompts")]
        yes: bool,
    },
}

fn main() {
    let args = Args::parse();
    telemetry::init(args.verbose);

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        let code = match e.downcast_ref::<PolyversError>() {
            Some(PolyversError::PartialBump {
                commit, missing, ..
            }) => {
                ui::display_partial_bump_recovery(commit, missing);
                4
            }
            Some(err) => err.exit_code(),
            None => 1,
        };
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<()> {
    // Configuration problems are reported before the repository is touched.
    let config = config::load_config(args.config.as_deref())?;
    let registry = Registry::from_config(&config)?;

    match args.command {
        Command::Status {
            projects,
            describe,
            time,
        } => {
            let repo = Git2Repository::open(".")?;
            let entries = cli::run_status(&repo, &registry, &StatusArgs { projects, describe })?;
            ui::display_status_table(&entries);
            if time {
                let time = VersionResolver::new(&repo).polytime();
                ui::display_status(&format!("Last commit: {}", time));
            }
        }
        Command::Bump {
            kind,
            projects,
            all,
            pre,
            dry_run,
            yes,
        } => {
            let phase = pre.as_deref().map(PreReleaseType::parse).transpose()?;
            let kind = kind.parse::<VersionBump>()?.with_phase(phase);
            let repo = Git2Repository::open(".")?;
            let workflow_args = BumpWorkflowArgs {
                kind,
                projects,
                all,
                dry_run,
                yes,
            };

            let result = cli::run_bump_workflow(&repo, &registry, &workflow_args, |preview| {
                for warning in &preview.warnings {
                    ui::display_boundary_warning(warning);
                }
                ui::display_plan(&preview.plan);
                ui::display_engraved(&preview.files);
                ui::confirm_action("Engrave, commit and tag?")
            })?;

            if dry_run {
                for warning in &result.warnings {
                    ui::display_boundary_warning(warning);
                }
                ui::display_plan(&result.plan);
                ui::display_status("Dry run: files that would be engraved:");
                ui::display_engraved(&result.files);
            } else if !result.applied {
                println!("Operation cancelled by user.");
            } else {
                if let Some(commit) = &result.commit {
                    ui::display_success(&format!(
                        "Committed {} engraved file(s) as {}",
                        result.files.len(),
                        commit
                    ));
                }
                for tag in &result.tags {
                    ui::display_success(&format!("Created tag: {}", tag));
                }
            }
        }
    }

    Ok(())
}
