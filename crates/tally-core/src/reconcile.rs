//! Reconciliation of AI extractions against real group data
//!
//! Turns a validated candidate into a balanced `ExpenseTemplate`:
//! 1. Category names are matched case-insensitively; unknown names are dropped
//! 2. If nothing matched, the whole amount goes to the group's first category
//! 3. The total is the sum of the resulting category amounts
//! 4. Payer names are matched the same way; a payer without an amount paid it all
//! 5. If no payer matched, the requesting member paid
//! 6. Splits come from the group split policy, one per member
//! 7. The candidate date is shifted by the caller's timezone offset
//!
//! Reconciliation never fails: a draft the user can edit beats a dead end.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::ai::MemberAmountHint;
use crate::models::{
    ContextCategory, ContextMember, ExpenseTemplate, MemberAmount, ReconciliationContext,
    SplitPolicy, TemplateCategoryAmount,
};
use crate::validation::{ValidatedCandidate, ValidatedCategoryAmount};

/// Largest timezone offset honored, in hours
const MAX_OFFSET_HOURS: f64 = 48.0;

/// Naive formats accepted for model dates (read as UTC)
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Reconcile using the current time as the date fallback
pub fn reconcile(
    candidate: &ValidatedCandidate,
    context: &ReconciliationContext,
) -> ExpenseTemplate {
    reconcile_at(candidate, context, Utc::now())
}

/// Reconcile with an explicit "now" (deterministic output)
pub fn reconcile_at(
    candidate: &ValidatedCandidate,
    context: &ReconciliationContext,
    now: DateTime<Utc>,
) -> ExpenseTemplate {
    let category_amounts = match_categories(candidate.category_amounts(), &context.categories);
    let total_amount: f64 = category_amounts.iter().map(|c| c.amount).sum();
    let payments = match_payments(candidate.payments(), context, total_amount);
    let splits = compute_splits(&context.members, context.split_policy, total_amount);
    let date = resolve_date(candidate.date(), context.timezone_offset_hours, now);

    debug!(
        categories = category_amounts.len(),
        payments = payments.len(),
        splits = splits.len(),
        total_amount,
        "Reconciled extraction"
    );

    ExpenseTemplate {
        title: candidate.title().to_string(),
        date,
        description: candidate.description().unwrap_or_default().to_string(),
        category_amounts,
        total_amount,
        payments,
        splits,
    }
}

/// Case-insensitive, otherwise exact name comparison
fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Map candidate category names onto context categories
///
/// Falls back to a single entry on the first context category carrying the sum
/// of every candidate amount when nothing matched.
pub fn match_categories(
    hints: &[ValidatedCategoryAmount],
    categories: &[ContextCategory],
) -> Vec<TemplateCategoryAmount> {
    let mut matched: Vec<TemplateCategoryAmount> = hints
        .iter()
        .filter_map(|hint| {
            let category = categories
                .iter()
                .find(|c| names_match(&c.name, &hint.category_name));
            if category.is_none() {
                debug!(name = %hint.category_name, "Dropping unmatched category");
            }
            category.map(|c| TemplateCategoryAmount {
                category_id: c.category_id.clone(),
                category_name: c.name.clone(),
                amount: hint.amount,
                items: hint.items.clone(),
            })
        })
        .collect();

    if matched.is_empty() {
        if let Some(first) = categories.first() {
            let amount: f64 = hints.iter().map(|h| h.amount).sum();
            debug!(category = %first.name, amount, "No category matched, using fallback");
            matched.push(TemplateCategoryAmount {
                category_id: first.category_id.clone(),
                category_name: first.name.clone(),
                amount,
                items: None,
            });
        }
    }

    matched
}

/// Map candidate payer names onto context members
///
/// A payment without a stated amount is assumed to cover the whole total. If no
/// payer matched, the requesting member is recorded as having paid everything.
pub fn match_payments(
    hints: &[MemberAmountHint],
    context: &ReconciliationContext,
    total_amount: f64,
) -> Vec<MemberAmount> {
    let mut payments: Vec<MemberAmount> = hints
        .iter()
        .filter_map(|hint| {
            let name = hint.member_name.as_deref()?;
            let member = context
                .members
                .iter()
                .find(|m| names_match(&m.display_name, name));
            if member.is_none() {
                debug!(name = %name, "Dropping unmatched payer");
            }
            member.map(|m| MemberAmount {
                member_id: m.member_id.clone(),
                member_name: m.display_name.clone(),
                amount: hint.amount.unwrap_or(total_amount),
            })
        })
        .collect();

    if payments.is_empty() {
        let member_name = match context.requesting_member_name() {
            Some(name) => name.to_string(),
            None => {
                warn!(
                    member_id = %context.requesting_member_id,
                    "Requesting member missing from context members"
                );
                String::new()
            }
        };
        payments.push(MemberAmount {
            member_id: context.requesting_member_id.clone(),
            member_name,
            amount: total_amount,
        });
    }

    payments
}

/// One split per member, in member order, from the group policy alone
pub fn compute_splits(
    members: &[ContextMember],
    policy: SplitPolicy,
    total_amount: f64,
) -> Vec<MemberAmount> {
    let count = members.len() as f64;

    members
        .iter()
        .map(|m| {
            let amount = match policy {
                SplitPolicy::Equal => total_amount / count,
                SplitPolicy::Percentage => m
                    .default_split_percent
                    .map(|percent| total_amount * (percent / 100.0))
                    .unwrap_or(0.0),
            };
            MemberAmount {
                member_id: m.member_id.clone(),
                member_name: m.display_name.clone(),
                amount: round_currency(amount),
            }
        })
        .collect()
}

/// Round to cents, half away from zero
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Parse the candidate date and shift it by the caller's offset
///
/// Falls back to `now` (unshifted) when the date is missing or unparsable.
pub fn resolve_date(
    raw: Option<&str>,
    timezone_offset_hours: Option<f64>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let Some(parsed) = raw.and_then(parse_candidate_date) else {
        if let Some(raw) = raw {
            debug!(date = %raw, "Unparsable date, using now");
        }
        return now;
    };

    shift_by_offset(parsed, timezone_offset_hours)
}

/// Shift an instant by a timezone offset in hours
///
/// Missing, non-finite or out-of-range offsets leave the instant unchanged.
pub fn shift_by_offset(
    instant: DateTime<Utc>,
    timezone_offset_hours: Option<f64>,
) -> DateTime<Utc> {
    match timezone_offset_hours.and_then(offset_delta) {
        Some(delta) => instant.checked_add_signed(delta).unwrap_or(instant),
        None => instant,
    }
}

/// Accepts RFC 3339 and common naive ISO forms
pub fn parse_candidate_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn offset_delta(hours: f64) -> Option<TimeDelta> {
    if !hours.is_finite() || hours.abs() > MAX_OFFSET_HOURS {
        warn!(hours, "Ignoring implausible timezone offset");
        return None;
    }
    TimeDelta::try_milliseconds((hours * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::parsing::parse_extraction_response;
    use crate::validation::{validate, ValidationPolicy};

    fn now() -> DateTime<Utc> {
        "2024-06-01T10:00:00Z".parse().unwrap()
    }

    fn member(id: &str, name: &str, percent: Option<f64>) -> ContextMember {
        ContextMember {
            member_id: id.to_string(),
            display_name: name.to_string(),
            default_split_percent: percent,
        }
    }

    fn category(id: &str, name: &str) -> ContextCategory {
        ContextCategory {
            category_id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn context() -> ReconciliationContext {
        ReconciliationContext {
            members: vec![member("m1", "Ana", None), member("m2", "Beto", None)],
            categories: vec![category("c1", "Comida"), category("c2", "Hogar")],
            split_policy: SplitPolicy::Equal,
            requesting_member_id: "m1".to_string(),
            timezone_offset_hours: None,
        }
    }

    fn candidate(json: &str) -> ValidatedCandidate {
        let parsed = parse_extraction_response(json).unwrap();
        validate(parsed, ValidationPolicy::Strict).unwrap()
    }

    #[test]
    fn test_end_to_end_example() {
        let ctx = ReconciliationContext {
            categories: vec![category("c1", "Comida")],
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "detectedCategoryAmounts": [{"categoryName": "comida", "amount": 40}], "detectedPayments": []}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert_eq!(template.title, "Almuerzo");
        assert_eq!(template.description, "");
        assert_eq!(template.category_amounts.len(), 1);
        assert_eq!(template.category_amounts[0].category_id, "c1");
        assert_eq!(template.category_amounts[0].category_name, "Comida");
        assert_eq!(template.category_amounts[0].amount, 40.0);
        assert_eq!(template.total_amount, 40.0);
        assert_eq!(
            template.payments,
            vec![MemberAmount {
                member_id: "m1".into(),
                member_name: "Ana".into(),
                amount: 40.0
            }]
        );
        assert_eq!(template.splits.len(), 2);
        assert_eq!(template.splits[0].member_id, "m1");
        assert_eq!(template.splits[0].amount, 20.0);
        assert_eq!(template.splits[1].member_id, "m2");
        assert_eq!(template.splits[1].amount, 20.0);
        assert_eq!(template.date, now());
    }

    #[test]
    fn test_only_matched_categories_kept() {
        let c = candidate(
            r#"{"title": "Supermercado", "detectedCategoryAmounts": [
                {"categoryName": "COMIDA", "amount": 30, "items": "fideos"},
                {"categoryName": "Juguetes", "amount": 15},
                {"categoryName": "hogar", "amount": 12.5}
            ]}"#,
        );
        let template = reconcile_at(&c, &context(), now());

        let ids: Vec<&str> = template
            .category_amounts
            .iter()
            .map(|c| c.category_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(template.category_amounts[0].items.as_deref(), Some("fideos"));
        assert_eq!(template.total_amount, 42.5);
    }

    #[test]
    fn test_all_unmatched_falls_back_to_first_category() {
        let c = candidate(
            r#"{"title": "Ferreteria", "detectedCategoryAmounts": [
                {"categoryName": "Herramientas", "amount": 25},
                {"categoryName": "Pintura", "amount": 10}
            ]}"#,
        );
        let template = reconcile_at(&c, &context(), now());

        assert_eq!(template.category_amounts.len(), 1);
        assert_eq!(template.category_amounts[0].category_id, "c1");
        assert_eq!(template.category_amounts[0].amount, 35.0);
        assert_eq!(template.total_amount, 35.0);
    }

    #[test]
    fn test_no_context_categories_gives_empty_amounts() {
        let ctx = ReconciliationContext {
            categories: vec![],
            ..context()
        };
        let c = candidate(
            r#"{"title": "Taxi", "detectedCategoryAmounts": [{"categoryName": "Transporte", "amount": 12}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert!(template.category_amounts.is_empty());
        assert_eq!(template.total_amount, 0.0);
        assert_eq!(template.payments.len(), 1);
        assert_eq!(template.payments[0].amount, 0.0);
    }

    #[test]
    fn test_payments_matched_and_defaulted() {
        let c = candidate(
            r#"{"title": "Almuerzo", "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 60}],
                "detectedPayments": [
                    {"memberName": "beto", "amount": 25},
                    {"memberName": "ANA"},
                    {"memberName": "Carla", "amount": 5}
                ]}"#,
        );
        let template = reconcile_at(&c, &context(), now());

        assert_eq!(template.payments.len(), 2);
        assert_eq!(template.payments[0].member_id, "m2");
        assert_eq!(template.payments[0].member_name, "Beto");
        assert_eq!(template.payments[0].amount, 25.0);
        assert_eq!(template.payments[1].member_id, "m1");
        assert_eq!(template.payments[1].amount, 60.0);
    }

    #[test]
    fn test_unmatched_payments_fall_back_to_requester() {
        let ctx = ReconciliationContext {
            requesting_member_id: "m2".into(),
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 18}],
                "detectedPayments": [{"memberName": "Desconocida", "amount": 18}, {"amount": 3}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert_eq!(
            template.payments,
            vec![MemberAmount {
                member_id: "m2".into(),
                member_name: "Beto".into(),
                amount: 18.0
            }]
        );
    }

    #[test]
    fn test_matching_is_whitespace_exact() {
        let ctx = ReconciliationContext {
            members: vec![member("m1", "maria", None), member("m2", "Maria Lopez", None)],
            requesting_member_id: "m2".into(),
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "detectedCategoryAmounts": [{"categoryName": " Comida", "amount": 10}],
                "detectedPayments": [{"memberName": "Maria"}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert_eq!(template.payments.len(), 1);
        assert_eq!(template.payments[0].member_id, "m1");
        // " Comida" does not match "Comida", so the fallback kicks in
        assert_eq!(template.category_amounts[0].category_id, "c1");
        assert_eq!(template.category_amounts[0].items, None);
    }

    #[test]
    fn test_equal_splits_one_per_member() {
        let ctx = ReconciliationContext {
            members: vec![
                member("m1", "Ana", Some(90.0)),
                member("m2", "Beto", None),
                member("m3", "Carla", None),
            ],
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 100}],
                "detectedSplits": [{"memberName": "Ana", "amount": 100}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert_eq!(template.splits.len(), 3);
        for split in &template.splits {
            assert_eq!(split.amount, round_currency(100.0 / 3.0));
            assert_eq!(split.amount, 33.33);
        }
    }

    #[test]
    fn test_percentage_splits_sum_to_total() {
        let ctx = ReconciliationContext {
            members: vec![
                member("m1", "Ana", Some(60.0)),
                member("m2", "Beto", Some(25.0)),
                member("m3", "Carla", Some(15.0)),
            ],
            split_policy: SplitPolicy::Percentage,
            ..context()
        };
        let c = candidate(
            r#"{"title": "Alquiler", "detectedCategoryAmounts": [{"categoryName": "Hogar", "amount": 1234.57}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert_eq!(template.splits[0].amount, 740.74);
        assert_eq!(template.splits[1].amount, 308.64);
        assert_eq!(template.splits[2].amount, 185.19);
        let sum: f64 = template.splits.iter().map(|s| s.amount).sum();
        assert!((sum - template.total_amount).abs() <= 0.01 * ctx.members.len() as f64);
    }

    #[test]
    fn test_percentage_without_percent_is_zero() {
        let ctx = ReconciliationContext {
            members: vec![member("m1", "Ana", Some(100.0)), member("m2", "Beto", None)],
            split_policy: SplitPolicy::Percentage,
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 50}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());

        assert_eq!(template.splits[0].amount, 50.0);
        assert_eq!(template.splits[1].amount, 0.0);
    }

    #[test]
    fn test_no_members_gives_no_splits() {
        let splits = compute_splits(&[], SplitPolicy::Equal, 10.0);
        assert!(splits.is_empty());
    }

    #[test]
    fn test_date_with_offset() {
        let ctx = ReconciliationContext {
            timezone_offset_hours: Some(-3.0),
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "date": "2024-01-15T12:00:00Z", "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 10}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());
        let expected: DateTime<Utc> = "2024-01-15T09:00:00Z".parse().unwrap();
        assert_eq!(template.date, expected);
    }

    #[test]
    fn test_unparsable_date_uses_now_without_offset() {
        let ctx = ReconciliationContext {
            timezone_offset_hours: Some(5.0),
            ..context()
        };
        let c = candidate(
            r#"{"title": "Almuerzo", "date": "ayer", "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 10}]}"#,
        );
        let template = reconcile_at(&c, &ctx, now());
        assert_eq!(template.date, now());
    }

    #[test]
    fn test_parse_candidate_date_formats() {
        let midnight: DateTime<Utc> = "2024-01-15T00:00:00Z".parse().unwrap();
        assert_eq!(parse_candidate_date("2024-01-15"), Some(midnight));
        assert_eq!(
            parse_candidate_date("2024-01-15T00:00:00.000Z"),
            Some(midnight)
        );
        assert_eq!(
            parse_candidate_date("2024-01-14T21:00:00-03:00"),
            Some(midnight)
        );
        assert_eq!(parse_candidate_date("2024-01-15T00:00:00"), Some(midnight));
        assert_eq!(parse_candidate_date("2024-01-15 00:00:00"), Some(midnight));
        assert_eq!(parse_candidate_date("15/01/2024"), None);
    }

    #[test]
    fn test_offset_delta_bounds() {
        assert_eq!(offset_delta(5.5), TimeDelta::try_minutes(330));
        assert_eq!(offset_delta(f64::NAN), None);
        assert_eq!(offset_delta(1e12), None);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let c = candidate(
            r#"{"title": "Almuerzo", "description": "con amigos", "date": "2024-01-15",
                "detectedCategoryAmounts": [{"categoryName": "Comida", "amount": 33.3}, {"categoryName": "Hogar", "amount": 0.1}],
                "detectedPayments": [{"memberName": "Beto"}]}"#,
        );
        let first = serde_json::to_string(&reconcile_at(&c, &context(), now())).unwrap();
        let second = serde_json::to_string(&reconcile_at(&c, &context(), now())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(10.0 / 3.0), 3.33);
        assert_eq!(round_currency(2.0 / 3.0), 0.67);
        assert_eq!(round_currency(0.125), 0.13);
        assert_eq!(round_currency(-0.125), -0.13);
    }
}
