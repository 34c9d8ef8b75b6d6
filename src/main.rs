use std::{io, path::PathBuf, sync::Mutex};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use color_eyre::eyre::{Result, bail};
use todo_organizer::{
	ConfigError, ReconcileOptions, RepoSlug, Settings, Strategy, build_forest, create_tracker,
	reconcile,
	render::{render_json, render_report, render_tree},
	scan_paths,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"), about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
	/// Config file to use instead of `$XDG_CONFIG_HOME/todo-organizer/config.toml`
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the TODO/FIXME/BUG comments found under PATHS
	Scan(ScanArgs),
	/// Reconcile the comments found under PATHS with the repository's open issues
	Sync(SyncArgs),
	/// Generate shell completions
	Completions { shell: Shell },
}

#[derive(Args)]
struct ScanFlags {
	/// Files or directories to scan
	#[arg(default_value = ".")]
	paths: Vec<PathBuf>,
	#[arg(long, short, value_enum, default_value_t)]
	strategy: Strategy,
}

#[derive(Args)]
struct ScanArgs {
	#[clap(flatten)]
	shared: ScanFlags,
	#[arg(long, short, value_enum, default_value_t)]
	format: Format,
}

#[derive(Args)]
struct SyncArgs {
	#[clap(flatten)]
	shared: ScanFlags,
	/// `owner/repo` or a GitHub URL. Falls back to `repo` from the config
	#[arg(long, short)]
	repo: Option<String>,
	/// Close open issues that no comment matches
	#[arg(long)]
	close_unmatched: bool,
	/// Show what would be done without sending anything
	#[arg(long)]
	dry_run: bool,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
	#[default]
	Tree,
	Json,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	init_tracing()?;
	let cli = Cli::parse();

	match cli.command {
		Commands::Scan(args) => {
			let forest = build_forest(scan_paths(&args.shared.paths), args.shared.strategy);
			let rendered = match args.format {
				Format::Tree => render_tree(&forest),
				Format::Json => render_json(&forest)?,
			};
			if !rendered.is_empty() {
				println!("{rendered}");
			}
			let total: usize = forest.iter().map(|c| c.subtree_len()).sum();
			tracing::info!(total, roots = forest.len(), "scan complete");
		}
		Commands::Sync(args) => {
			let settings = Settings::load(cli.config.as_deref())?;
			let repo: RepoSlug = match args.repo.as_deref().or(settings.repo.as_deref()) {
				Some(repo) => repo.parse()?,
				None => return Err(ConfigError::MissingRepo.into()),
			};
			// fail on a missing token before touching the network
			let tracker = create_tracker(&settings)?;

			let forest = build_forest(scan_paths(&args.shared.paths), args.shared.strategy);
			let options = ReconcileOptions {
				close_unmatched: args.close_unmatched || settings.close_unmatched,
				dry_run: args.dry_run,
			};
			let report = reconcile::run(tracker.as_ref(), &repo, &forest, &options).await?;
			println!("{}", render_report(&report));
			if !report.is_success() {
				bail!("{} issue tracker write(s) failed", report.failed);
			}
		}
		Commands::Completions { shell } => {
			let mut cmd = Cli::command();
			let name = cmd.get_name().to_string();
			clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
		}
	}

	Ok(())
}

/// `RUST_LOG` wins, then directives baked in at build time, then `info`.
/// With `TODO_ORGANIZER_TRACE_FILE` set, events go to that file as JSON instead of stderr.
fn init_tracing() -> Result<()> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(option_env!("LOG_DIRECTIVES").unwrap_or("info")));

	match std::env::var_os("TODO_ORGANIZER_TRACE_FILE") {
		Some(path) => {
			let file = std::fs::File::create(path)?;
			tracing_subscriber::fmt().json().with_env_filter(filter).with_writer(Mutex::new(file)).init();
		}
		None => tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(io::stderr).init(),
	}
	Ok(())
}
