//! Command-line client for the bidboard services marketplace.
//!
//! Loads the configuration, assembles the marketplace (REST backend, or the
//! local ledger with `--offline`) and runs a single command against it.

use bidboard_config::Config;
use bidboard_core::MarketplaceBuilder;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod output;

use commands::Command;
use output::Output;

/// Command-line arguments for the bidboard client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	/// Run against the local ledger instead of the REST backend
	#[arg(long)]
	offline: bool,

	/// Print results as JSON
	#[arg(long)]
	json: bool,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::debug!(path = %args.config.display(), offline = args.offline, "Loaded configuration");

	let built = MarketplaceBuilder::new(config)
		.offline(args.offline)
		.build()?;

	match built.storage.cleanup_expired().await {
		Ok(0) => {},
		Ok(removed) => tracing::debug!(removed, "Dropped expired storage entries"),
		Err(e) => tracing::warn!(error = %e, "Storage cleanup failed"),
	}

	let output = Output::new(args.json);
	let rendered = commands::run(args.command, &built, &output).await.inspect_err(|e| {
		tracing::debug!(kind = e.kind(), retryable = e.is_retryable(), "Command failed");
	})?;
	println!("{}", rendered);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use commands::{OrderCommand, ProposalCommand};

	#[test]
	fn test_global_flags() {
		let args = Args::try_parse_from([
			"bidboard", "--config", "market.toml", "--offline", "--json", "whoami",
		])
		.unwrap();
		assert_eq!(args.config, PathBuf::from("market.toml"));
		assert!(args.offline);
		assert!(args.json);
		assert_eq!(args.log_level, "warn");
		assert!(matches!(args.command, Command::Whoami));
	}

	#[test]
	fn test_order_create_arguments() {
		let args = Args::try_parse_from([
			"bidboard",
			"orders",
			"create",
			"--title",
			"Pintura",
			"--category",
			"pintura",
			"--description",
			"Sala",
			"--budget",
			"3000.50",
			"--deadline",
			"15",
			"--address",
			"Rua A, 1",
		])
		.unwrap();
		match args.command {
			Command::Orders {
				command: OrderCommand::Create(fields),
			} => {
				assert_eq!(fields.budget.to_string(), "3000.50");
				assert_eq!(fields.deadline, 15);
				assert!(fields.attachments.is_empty());
			},
			other => panic!("unexpected command: {:?}", other),
		}
	}

	#[test]
	fn test_proposal_arguments() {
		let args = Args::try_parse_from([
			"bidboard", "proposals", "accept", "12", "40",
		])
		.unwrap();
		assert!(matches!(
			args.command,
			Command::Proposals {
				command: ProposalCommand::Accept { ref order_id, ref proposal_id }
			} if order_id == "12" && proposal_id == "40"
		));

		assert!(Args::try_parse_from(["bidboard", "orders", "create", "--title", "x"]).is_err());
		assert!(Args::try_parse_from(["bidboard", "role", "admin"]).is_err());
	}
}
