//! Proposal ranking.
//!
//! Rankings are derived on every read from the current proposal set and are
//! never stored. The ordering is total and the sort stable, so identical
//! inputs always produce identical rankings.

use bidboard_types::{Order, Proposal, ProposalInsights, RankedProposal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// `None` sorts after every `Some`.
fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => a.cmp(&b),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

/// Compares ids numerically when both are plain digit strings.
fn compare_ids(a: &str, b: &str) -> Ordering {
	let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
	if numeric(a) && numeric(b) {
		let a = a.trim_start_matches('0');
		let b = b.trim_start_matches('0');
		a.len().cmp(&b.len()).then_with(|| a.cmp(b))
	} else {
		a.cmp(b)
	}
}

fn submission_order(a: &Proposal, b: &Proposal) -> Ordering {
	let created = |p: &Proposal| -> Option<DateTime<Utc>> { p.created_at };
	none_last(created(a), created(b)).then_with(|| compare_ids(&a.id, &b.id))
}

/// Price, then proposed days (unparseable last), then submission order.
fn compare(a: &Proposal, b: &Proposal) -> Ordering {
	a.price
		.cmp(&b.price)
		.then_with(|| none_last(a.deadline.days(), b.deadline.days()))
		.then_with(|| submission_order(a, b))
}

/// Ranks the pending and accepted proposals of an order.
///
/// `viewer` is the provider looking at the ranking, if any; it only drives
/// the `is_mine` flag.
pub fn rank_proposals(
	order: &Order,
	proposals: &[Proposal],
	viewer: Option<&str>,
) -> Vec<RankedProposal> {
	let mut active: Vec<&Proposal> = proposals.iter().filter(|p| p.is_active()).collect();
	active.sort_by(|a, b| compare(a, b));

	active
		.into_iter()
		.enumerate()
		.map(|(index, proposal)| RankedProposal {
			rank: index + 1,
			is_winning: proposal.price <= order.budget,
			is_mine: viewer.is_some_and(|viewer| proposal.provider_id == viewer),
			proposal: proposal.clone(),
		})
		.collect()
}

/// Rank of the viewer's best entry, if they have one.
pub fn my_position(order: &Order, proposals: &[Proposal], viewer: &str) -> Option<usize> {
	rank_proposals(order, proposals, Some(viewer))
		.iter()
		.find(|ranked| ranked.is_mine)
		.map(|ranked| ranked.rank)
}

fn average(sum: Decimal, count: usize) -> Option<Decimal> {
	(count > 0).then(|| (sum / Decimal::from(count)).round_dp(2))
}

/// Aggregates over an already ranked set.
pub fn insights(ranked: &[RankedProposal]) -> ProposalInsights {
	let prices = ranked.iter().map(|r| r.proposal.price);
	let days: Vec<u32> = ranked
		.iter()
		.filter_map(|r| r.proposal.deadline.days())
		.collect();

	ProposalInsights {
		count: ranked.len(),
		lowest_price: prices.clone().min(),
		average_price: average(prices.sum(), ranked.len()),
		average_deadline_days: average(days.iter().copied().map(Decimal::from).sum(), days.len()),
	}
}
