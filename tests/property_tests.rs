//! Property-based tests for the job workflow and order arithmetic.

use garment_factory_api::{
    entities::{order::OrderStatus, production_job::JobStatus},
    services::{
        generate_reference,
        job_status::{self, JobEvent, Transition},
        orders::{compute_totals, line_total},
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use strum::IntoEnumIterator;

fn status_strategy() -> impl Strategy<Value = JobStatus> {
    let all: Vec<JobStatus> = JobStatus::iter().collect();
    prop::sample::select(all)
}

fn event_strategy() -> impl Strategy<Value = JobEvent> {
    let all: Vec<JobEvent> = JobEvent::iter().collect();
    prop::sample::select(all)
}

/// Price with two decimals, up to 9,999.99
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn lines_strategy() -> impl Strategy<Value = Vec<(i32, Decimal)>> {
    prop::collection::vec((1i32..500, price_strategy()), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn cancelled_jobs_accept_no_events(event in event_strategy()) {
        prop_assert!(job_status::next_status(JobStatus::Cancelled, event).is_none());
    }

    #[test]
    fn apply_agrees_with_the_table(from in status_strategy(), event in event_strategy()) {
        match job_status::next_status(from, event) {
            Some(to) => prop_assert_eq!(job_status::apply(from, event).ok(), Some(to)),
            None => prop_assert!(job_status::apply(from, event).is_err()),
        }
    }

    #[test]
    fn target_requests_never_bypass_the_table(from in status_strategy(), to in status_strategy()) {
        match job_status::transition_to(from, to) {
            Ok(Transition::Unchanged) => prop_assert_eq!(from, to),
            Ok(Transition::To(reached)) => {
                prop_assert_eq!(reached, to);
                let event = job_status::event_for_target(to);
                prop_assert!(event.is_some());
                prop_assert_eq!(event.and_then(|e| job_status::next_status(from, e)), Some(to));
            }
            Err(_) => prop_assert!(from != to),
        }
    }

    #[test]
    fn random_walks_stay_inside_the_table(events in prop::collection::vec(event_strategy(), 0..30)) {
        let mut status = JobStatus::Pending;
        for event in events {
            if let Ok(next) = job_status::apply(status, event) {
                prop_assert_ne!(next, JobStatus::Pending);
                status = next;
            }
        }
        prop_assert!(JobStatus::iter().any(|s| s == status));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn totals_add_up(lines in lines_strategy(), rate_bp in 0u32..=2500, discount_pct in 0u32..=100) {
        let subtotal: Decimal = lines.iter().map(|(q, p)| line_total(*q, *p)).sum();
        let discount = (subtotal * Decimal::new(i64::from(discount_pct), 2)).round_dp(2);
        let tax_rate = Decimal::new(i64::from(rate_bp), 4);

        let totals = compute_totals(&lines, discount, tax_rate).expect("valid input");

        prop_assert_eq!(totals.subtotal, subtotal);
        prop_assert_eq!(totals.discount, discount);
        prop_assert_eq!(totals.tax, totals.tax.round_dp(2));
        prop_assert_eq!(totals.total, totals.subtotal - totals.discount + totals.tax);
        prop_assert!(totals.total >= Decimal::ZERO);
    }

    #[test]
    fn discounts_beyond_subtotal_are_rejected(lines in lines_strategy(), extra_cents in 1i64..10_000) {
        let subtotal: Decimal = lines.iter().map(|(q, p)| line_total(*q, *p)).sum();
        let discount = subtotal + Decimal::new(extra_cents, 2);
        prop_assert!(compute_totals(&lines, discount, Decimal::ZERO).is_err());
    }

    #[test]
    fn references_have_a_stable_shape(prefix in "[A-Z]{2,4}") {
        let reference = generate_reference(&prefix);
        let parts: Vec<&str> = reference.split('-').collect();
        prop_assert_eq!(parts.len(), 3);
        prop_assert_eq!(parts[0], prefix.as_str());
        prop_assert_eq!(parts[1].len(), 8);
        prop_assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        prop_assert_eq!(parts[2].len(), 6);
        prop_assert!(parts[2].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}

#[test]
fn delivered_and_cancelled_orders_are_final() {
    for next in OrderStatus::iter() {
        assert!(!OrderStatus::Delivered.can_transition_to(next));
        assert!(!OrderStatus::Cancelled.can_transition_to(next));
    }
}
