//! Rendering of command results, as text or JSON.

use bidboard_core::{OrderRanking, SubmissionOutcome};
use bidboard_types::{
	format_brl, format_deadline_days, Order, OrderAction, Proposal, ProposedDeadline, User,
};
use serde::Serialize;
use std::fmt::Write;

pub struct Output {
	json: bool,
}

fn deadline_text(deadline: &ProposedDeadline) -> String {
	match deadline.days() {
		Some(days) => format_deadline_days(days),
		None => deadline.to_string(),
	}
}

fn action_label(action: OrderAction) -> &'static str {
	match action {
		OrderAction::StartAuction => "start-auction",
		OrderAction::AcceptProposal => "accept",
		OrderAction::Complete => "complete",
		OrderAction::Close => "close",
	}
}

impl Output {
	pub fn new(json: bool) -> Self {
		Self { json }
	}

	fn to_json<T: Serialize>(value: &T) -> String {
		serde_json::to_string_pretty(value)
			.unwrap_or_else(|e| format!("{{\"error\": \"unserializable result: {}\"}}", e))
	}

	pub fn message(&self, text: &str) -> String {
		if self.json {
			return Self::to_json(&serde_json::json!({ "message": text }));
		}
		text.to_string()
	}

	pub fn user(&self, user: &User) -> String {
		if self.json {
			return Self::to_json(user);
		}
		format!("{} <{}> ({}, id {})", user.name, user.email, user.role, user.id)
	}

	fn order_lines(order: &Order) -> String {
		let mut text = format!(
			"#{} {} [{}]\n  {} | {} | {} | {}",
			order.id,
			order.title,
			order.status.label(),
			order.category,
			format_brl(order.budget),
			format_deadline_days(order.deadline),
			order.address
		);
		if let Some(ends_at) = order.auction_ends_at {
			let _ = write!(text, "\n  auction ends {}", ends_at.format("%d/%m/%Y %H:%M"));
		}
		if let Some(accepted) = &order.accepted_proposal_id {
			let _ = write!(text, "\n  accepted proposal #{}", accepted);
		}
		text
	}

	pub fn order(&self, order: &Order) -> String {
		if self.json {
			return Self::to_json(order);
		}
		Self::order_lines(order)
	}

	pub fn orders(&self, orders: &[Order]) -> String {
		if self.json {
			return Self::to_json(&orders);
		}
		if orders.is_empty() {
			return "No orders".to_string();
		}
		orders
			.iter()
			.map(Self::order_lines)
			.collect::<Vec<_>>()
			.join("\n")
	}

	pub fn proposal(&self, proposal: &Proposal) -> String {
		if self.json {
			return Self::to_json(proposal);
		}
		format!(
			"Proposal #{} on order #{}: {} in {} [{}]",
			proposal.id,
			proposal.order_id,
			format_brl(proposal.price),
			deadline_text(&proposal.deadline),
			proposal.status
		)
	}

	pub fn submission(&self, outcome: &SubmissionOutcome) -> String {
		if self.json {
			return Self::to_json(outcome);
		}
		let verb = match outcome {
			SubmissionOutcome::Created(_) => "Submitted",
			SubmissionOutcome::Updated(_) => "Updated",
		};
		format!("{}: {}", verb, self.proposal(outcome.proposal()))
	}

	pub fn ranking(&self, ranking: &OrderRanking) -> String {
		if self.json {
			return Self::to_json(ranking);
		}

		let mut text = Self::order_lines(&ranking.order);
		if ranking.auction_active {
			text.push_str("\n  auction in progress");
		}

		let insights = &ranking.insights;
		let _ = write!(text, "\n\n{} proposal(s)", insights.count);
		if let (Some(lowest), Some(average)) = (insights.lowest_price, insights.average_price) {
			let _ = write!(
				text,
				", lowest {}, average {}",
				format_brl(lowest),
				format_brl(average)
			);
		}
		if let Some(days) = insights.average_deadline_days {
			let _ = write!(text, ", average deadline {} days", days.round_dp(1));
		}

		for ranked in &ranking.ranked {
			let p = &ranked.proposal;
			let _ = write!(
				text,
				"\n{:>3}. #{} {} in {} [{}]{}{}",
				ranked.rank,
				p.id,
				format_brl(p.price),
				deadline_text(&p.deadline),
				p.status,
				if ranked.is_winning { "" } else { " over budget" },
				if ranked.is_mine { " <- yours" } else { "" },
			);
		}

		if let Some(position) = ranking.my_position {
			let _ = write!(text, "\n\nYour position: {}", position);
		}
		if !ranking.actions.is_empty() {
			let actions: Vec<&str> = ranking.actions.iter().copied().map(action_label).collect();
			let _ = write!(text, "\nAvailable actions: {}", actions.join(", "));
		}
		text
	}
}
