use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vltsync::logging::*;
use vltsync::{
	Config, ConnectionInfo, ConnectionProvider, FsRepository, LogProgress, OperationResult,
	Orchestrator, PathMapper,
};

const DEFAULT_CONFIG_FILE: &str = "vltsync.toml";

///////////////////////
// Utility functions //
///////////////////////

fn load_config(explicit: Option<&String>) -> Result<Config, Box<dyn Error>> {
	match explicit {
		Some(path) => Ok(Config::load(Path::new(path))?),
		None => {
			let path = Path::new(DEFAULT_CONFIG_FILE);
			if path.is_file() {
				debug!("Using {}", path.display());
				Ok(Config::load(path)?)
			} else {
				Ok(Config::default())
			}
		}
	}
}

fn resolve_connection(
	config: &Config,
	target: Option<&str>,
	repository: &Path,
) -> Result<ConnectionInfo, Box<dyn Error>> {
	match config.connection(target) {
		Ok(connection) => Ok(connection),
		// Without configured servers the repository directory is the only target
		Err(_) if config.servers.is_empty() && target.is_none() => {
			Ok(ConnectionInfo::new(format!("file://{}", repository.display()), "", ""))
		}
		Err(e) => Err(e.into()),
	}
}

fn operation_args(name: &'static str, about: &'static str) -> Command {
	Command::new(name)
		.about(about)
		.arg(
			Arg::new("path")
				.required(true)
				.value_name("PATH")
				.help("File or directory below a jcr_root directory"),
		)
		.arg(
			Arg::new("repository")
				.long("repository")
				.short('r')
				.required(true)
				.value_name("DIR")
				.help("Directory holding the repository content"),
		)
}

fn print_result(result: &OperationResult, json: bool) -> Result<(), Box<dyn Error>> {
	if json {
		println!("{}", serde_json::to_string_pretty(result)?);
		return Ok(());
	}
	println!("{}", result.message);
	for entry in &result.entries {
		match &entry.message {
			Some(message) => println!("  {} {} ({})", entry.action, entry.path, message),
			None => println!("  {} {}", entry.action, entry.path),
		}
	}
	Ok(())
}

async fn run(matches: &ArgMatches) -> Result<bool, Box<dyn Error>> {
	let config = load_config(matches.get_one::<String>("config"))?;
	let target = matches.get_one::<String>("target").map(|s| s.as_str());
	let json = matches.get_flag("json");

	let (name, sub) = matches.subcommand().ok_or("a subcommand is required")?;
	let path = PathBuf::from(sub.get_one::<String>("path").ok_or("path argument required")?);
	let repository =
		PathBuf::from(sub.get_one::<String>("repository").ok_or("--repository is required")?);

	let connection = resolve_connection(&config, target, &repository)?;
	let remote = Arc::new(FsRepository::new(repository, PathMapper::from_config(&config)));
	let orchestrator = Orchestrator::from_config(&config, remote);

	let cancel = Arc::new(AtomicBool::new(false));
	let flag = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("Interrupted, stopping after the current entry");
			flag.store(true, Ordering::Relaxed);
		}
	});
	let progress = Arc::new(LogProgress::new().with_cancellation(cancel));

	let handle = match name {
		"pull" => orchestrator.spawn_pull(connection, path, progress),
		"push" => orchestrator.spawn_push(connection, path, progress),
		other => return Err(format!("unknown command: {}", other).into()),
	};
	let result = handle.await?;
	print_result(&result, json)?;
	Ok(result.success)
}

#[tokio::main]
async fn main() {
	init_tracing();

	let matches = Command::new("vltsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Sync a jcr_root working copy with a content repository")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("CONFIG")
				.global(true)
				.help("Configuration file (TOML or JSON5)"),
		)
		.arg(
			Arg::new("target")
				.short('t')
				.long("target")
				.value_name("TARGET")
				.global(true)
				.help("Configured server to use"),
		)
		.arg(
			Arg::new("json")
				.long("json")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Print the result as JSON"),
		)
		.subcommand(operation_args("pull", "Export content from the repository into PATH"))
		.subcommand(operation_args("push", "Import PATH into the repository"))
		.get_matches();

	match run(&matches).await {
		Ok(true) => {}
		Ok(false) => std::process::exit(1),
		Err(e) => {
			error!("{}", e);
			std::process::exit(2);
		}
	}
}

// vim: ts=4
