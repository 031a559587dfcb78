//! Subcommands and their execution.

use bidboard_core::BuiltMarketplace;
use bidboard_types::{
	AvailableOrderFilter, MarketError, OrderFields, OrderFilter, OrderStatus, ProposalFields,
	ProposedDeadline, Registration, Role, SecretString, Session,
};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use crate::output::Output;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Log in and remember the session
	Login {
		#[arg(long)]
		email: String,
		#[arg(long, env = "BIDBOARD_PASSWORD", hide_env_values = true)]
		password: String,
	},
	/// Create a client account and log in
	Register {
		#[arg(long)]
		name: String,
		#[arg(long)]
		email: String,
		#[arg(long)]
		phone: String,
		#[arg(long, env = "BIDBOARD_PASSWORD", hide_env_values = true)]
		password: String,
		#[arg(long, env = "BIDBOARD_PASSWORD_CONFIRMATION", hide_env_values = true)]
		password_confirmation: String,
	},
	/// End the current session
	Logout,
	/// Show the logged-in user
	Whoami,
	/// Switch between the client and provider profiles
	Role {
		#[arg(value_parser = ["client", "provider"])]
		role: String,
	},
	/// Manage orders
	Orders {
		#[command(subcommand)]
		command: OrderCommand,
	},
	/// Manage proposals
	Proposals {
		#[command(subcommand)]
		command: ProposalCommand,
	},
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
	/// Your own orders
	List {
		#[arg(long)]
		status: Option<OrderStatus>,
		#[arg(long)]
		category: Option<String>,
	},
	/// Open orders you can bid on
	Available {
		#[arg(long)]
		category: Option<String>,
		#[arg(long)]
		cep: Option<String>,
	},
	Show {
		order_id: String,
	},
	Create(CreateOrderArgs),
	StartAuction {
		order_id: String,
	},
	Close {
		order_id: String,
	},
	Complete {
		order_id: String,
	},
}

#[derive(Args, Debug)]
pub struct CreateOrderArgs {
	#[arg(long)]
	pub title: String,
	#[arg(long)]
	pub category: String,
	#[arg(long)]
	pub description: String,
	#[arg(long)]
	pub budget: Decimal,
	/// Days until the service must be done
	#[arg(long)]
	pub deadline: u32,
	#[arg(long)]
	pub address: String,
	#[arg(long = "attachment")]
	pub attachments: Vec<String>,
}

impl From<CreateOrderArgs> for OrderFields {
	fn from(args: CreateOrderArgs) -> Self {
		OrderFields {
			title: args.title,
			category: args.category,
			description: args.description,
			budget: args.budget,
			deadline: args.deadline,
			address: args.address,
			attachments: args.attachments,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum ProposalCommand {
	/// Ranked proposals of an order
	Rank {
		order_id: String,
	},
	/// Submit a proposal, or update your pending one
	Submit {
		order_id: String,
		#[arg(long)]
		price: Decimal,
		/// Proposed completion time, e.g. "10 dias"
		#[arg(long)]
		deadline: String,
		#[arg(long)]
		description: String,
	},
	Accept {
		order_id: String,
		proposal_id: String,
	},
	Reject {
		order_id: String,
		proposal_id: String,
	},
	Withdraw {
		order_id: String,
		proposal_id: String,
	},
}

async fn require_session(built: &BuiltMarketplace) -> Result<Session, MarketError> {
	built
		.sessions
		.initialize()
		.await?
		.ok_or_else(|| MarketError::Unauthorized("not logged in, run `bidboard login`".into()))
}

/// Runs one command and returns what should be printed.
pub async fn run(
	command: Command,
	built: &BuiltMarketplace,
	output: &Output,
) -> Result<String, MarketError> {
	let market = &built.marketplace;

	match command {
		Command::Login { email, password } => {
			let session = built
				.sessions
				.login(&email, &SecretString::new(password))
				.await?;
			Ok(output.user(&session.user))
		},
		Command::Register {
			name,
			email,
			phone,
			password,
			password_confirmation,
		} => {
			let registration = Registration {
				name,
				email,
				phone,
				password: SecretString::new(password),
				password_confirmation: SecretString::new(password_confirmation),
			};
			let session = built.sessions.register(&registration).await?;
			Ok(output.user(&session.user))
		},
		Command::Logout => {
			let session = require_session(built).await?;
			built.sessions.logout(&session).await?;
			Ok(output.message("Logged out"))
		},
		Command::Whoami => {
			let session = require_session(built).await?;
			Ok(output.user(&session.user))
		},
		Command::Role { role } => {
			let role: Role = role
				.parse()
				.map_err(|e: String| MarketError::validation("role", e))?;
			let session = require_session(built).await?;
			let session = built.sessions.switch_role(&session, role).await?;
			Ok(output.user(&session.user))
		},
		Command::Orders { command } => {
			let session = require_session(built).await?;
			match command {
				OrderCommand::List { status, category } => {
					let orders = market
						.list_orders(&session, &OrderFilter { status, category })
						.await?;
					Ok(output.orders(&orders))
				},
				OrderCommand::Available { category, cep } => {
					let orders = market
						.list_available_orders(&session, &AvailableOrderFilter { category, cep })
						.await?;
					Ok(output.orders(&orders))
				},
				OrderCommand::Show { order_id } => {
					Ok(output.order(&market.get_order(&session, &order_id).await?))
				},
				OrderCommand::Create(args) => {
					let order = market.create_order(&session, &args.into()).await?;
					Ok(output.order(&order))
				},
				OrderCommand::StartAuction { order_id } => {
					Ok(output.order(&market.start_auction(&session, &order_id).await?))
				},
				OrderCommand::Close { order_id } => {
					Ok(output.order(&market.close_order(&session, &order_id).await?))
				},
				OrderCommand::Complete { order_id } => {
					Ok(output.order(&market.complete_order(&session, &order_id).await?))
				},
			}
		},
		Command::Proposals { command } => {
			let session = require_session(built).await?;
			match command {
				ProposalCommand::Rank { order_id } => {
					Ok(output.ranking(&market.ranking(&session, &order_id).await?))
				},
				ProposalCommand::Submit {
					order_id,
					price,
					deadline,
					description,
				} => {
					let fields = ProposalFields {
						price,
						deadline: ProposedDeadline::new(deadline),
						description,
					};
					let outcome = market
						.submit_or_update_proposal(&session, &order_id, &fields)
						.await?;
					Ok(output.submission(&outcome))
				},
				ProposalCommand::Accept {
					order_id,
					proposal_id,
				} => {
					let order = market
						.accept_proposal(&session, &order_id, &proposal_id)
						.await?;
					Ok(output.order(&order))
				},
				ProposalCommand::Reject {
					order_id,
					proposal_id,
				} => {
					let proposal = market
						.reject_proposal(&session, &order_id, &proposal_id)
						.await?;
					Ok(output.proposal(&proposal))
				},
				ProposalCommand::Withdraw {
					order_id,
					proposal_id,
				} => {
					let proposal = market
						.withdraw_proposal(&session, &order_id, &proposal_id)
						.await?;
					Ok(output.proposal(&proposal))
				},
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bidboard_config::Config;
	use bidboard_core::MarketplaceBuilder;
	use tempfile::TempDir;

	fn offline(dir: &TempDir) -> BuiltMarketplace {
		let config: Config = format!(
			"[api]\nbase_url = \"http://127.0.0.1:9\"\n[storage]\nprimary = \"file\"\n[storage.implementations.file]\nstorage_path = \"{}\"\n",
			dir.path().display()
		)
		.parse()
		.unwrap();
		MarketplaceBuilder::new(config).offline(true).build().unwrap()
	}

	fn login(email: &str) -> Command {
		Command::Login {
			email: email.into(),
			password: "pw".into(),
		}
	}

	#[tokio::test]
	async fn test_commands_require_login() {
		let dir = TempDir::new().unwrap();
		let built = offline(&dir);
		let err = run(Command::Whoami, &built, &Output::new(false))
			.await
			.unwrap_err();
		assert!(matches!(err, MarketError::Unauthorized(_)));
	}

	#[tokio::test]
	async fn test_register_logs_in() {
		let dir = TempDir::new().unwrap();
		let output = Output::new(false);
		let register = |confirmation: &str| Command::Register {
			name: "Carla".into(),
			email: "carla@example.com".into(),
			phone: "21 97777-6666".into(),
			password: "segredo".into(),
			password_confirmation: confirmation.into(),
		};

		let built = offline(&dir);
		let err = run(register("outro"), &built, &output).await.unwrap_err();
		assert!(matches!(err, MarketError::Validation { ref field, .. } if field == "password"));

		let shown = run(register("segredo"), &built, &output).await.unwrap();
		assert!(shown.starts_with("Carla <carla@example.com> (client"));

		let built = offline(&dir);
		let whoami = run(Command::Whoami, &built, &output).await.unwrap();
		assert_eq!(whoami, shown);
	}

	#[tokio::test]
	async fn test_offline_session_across_invocations() {
		let dir = TempDir::new().unwrap();
		let output = Output::new(false);

		// Each block mimics a separate process run over the same storage.
		{
			let built = offline(&dir);
			let shown = run(login("cliente@example.com"), &built, &output).await.unwrap();
			assert!(shown.contains("cliente@example.com"));
		}
		{
			let built = offline(&dir);
			let created = run(
				Command::Orders {
					command: OrderCommand::Create(CreateOrderArgs {
						title: "Trocar piso".into(),
						category: "reforma".into(),
						description: "Cozinha 12m2".into(),
						budget: Decimal::new(480000, 2),
						deadline: 45,
						address: "Rua B, 2".into(),
						attachments: vec![],
					}),
				},
				&built,
				&output,
			)
			.await
			.unwrap();
			assert!(created.contains("R$ 4.800,00"));
			assert!(created.contains("Aguardando propostas"));
		}
		{
			let built = offline(&dir);
			let switched = run(
				Command::Role {
					role: "provider".into(),
				},
				&built,
				&output,
			)
			.await
			.unwrap();
			assert!(switched.contains("provider"));

			let available = run(
				Command::Orders {
					command: OrderCommand::Available {
						category: None,
						cep: None,
					},
				},
				&built,
				&output,
			)
			.await
			.unwrap();
			assert!(available.contains("Trocar piso"));

			run(Command::Logout, &built, &output).await.unwrap();
			assert!(run(Command::Whoami, &built, &output).await.is_err());
		}
	}
}
