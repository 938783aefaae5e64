//! Plausibility checks for AI extraction candidates
//!
//! The model is asked to report uncertainty with the `unreadable` sentinel. When
//! it complies with the letter but not the spirit (writing "ilegible" into a
//! category name, or inventing a zero amount), these rules catch it. Every
//! rejection carries the same user-facing message.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::{CategoryAmountHint, ExtractionCandidate, MemberAmountHint};
use crate::error::{Error, Result};

/// Tokens that mean the model was not sure what it read (matched as
/// case-insensitive substrings)
pub const UNCERTAINTY_INDICATORS: &[&str] = &[
    "unknown",
    "desconocido",
    "?",
    "n/a",
    "na",
    "no disponible",
    "no se puede leer",
    "ilegible",
    "unclear",
    "indistinto",
];

/// How much scrutiny a candidate gets before it is trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Structural rules plus the uncertainty vocabulary
    #[default]
    Strict,
    /// Structural rules only: non-empty title, at least one named category
    /// with a positive amount
    Structural,
}

impl ValidationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Structural => "structural",
        }
    }

    fn checks_vocabulary(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl std::str::FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "structural" => Ok(Self::Structural),
            _ => Err(format!("Unknown validation policy: {}", s)),
        }
    }
}

/// A category allocation that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCategoryAmount {
    pub category_name: String,
    pub amount: f64,
    pub items: Option<String>,
}

/// A candidate that passed validation
///
/// Only `validate` can build one, so holding a `ValidatedCandidate` means the
/// title is non-empty and every category amount is named and positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCandidate {
    title: String,
    date: Option<String>,
    description: Option<String>,
    category_amounts: Vec<ValidatedCategoryAmount>,
    payments: Vec<MemberAmountHint>,
}

impl ValidatedCandidate {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Never empty
    pub fn category_amounts(&self) -> &[ValidatedCategoryAmount] {
        &self.category_amounts
    }

    /// Payment hints; names are still untrusted
    pub fn payments(&self) -> &[MemberAmountHint] {
        &self.payments
    }
}

/// Check a decoded candidate against the plausibility rules
///
/// Rules, in order:
/// 1. at least one category amount
/// 2. every category name is non-empty (and free of uncertainty markers under
///    `Strict`)
/// 3. every amount is finite and strictly positive
/// 4. the title is non-empty after trimming (and free of uncertainty markers
///    under `Strict`)
pub fn validate(
    candidate: ExtractionCandidate,
    policy: ValidationPolicy,
) -> Result<ValidatedCandidate> {
    let hints = match candidate.category_amounts {
        Some(hints) if !hints.is_empty() => hints,
        _ => return Err(reject("no category amounts")),
    };

    let category_amounts = hints
        .into_iter()
        .map(|hint| validate_category_amount(hint, policy))
        .collect::<Result<Vec<_>>>()?;

    let title = match candidate.title {
        Some(title) if !title.trim().is_empty() => title,
        _ => return Err(reject("empty title")),
    };
    if policy.checks_vocabulary() && has_uncertainty_marker(&title) {
        return Err(reject("uncertain title"));
    }

    Ok(ValidatedCandidate {
        title,
        date: candidate.date,
        description: candidate.description,
        category_amounts,
        payments: candidate.payments.unwrap_or_default(),
    })
}

fn validate_category_amount(
    hint: CategoryAmountHint,
    policy: ValidationPolicy,
) -> Result<ValidatedCategoryAmount> {
    let category_name = match hint.category_name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(reject("missing category name")),
    };
    if policy.checks_vocabulary() && has_uncertainty_marker(&category_name) {
        return Err(reject("uncertain category name"));
    }

    let amount = match hint.amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => amount,
        _ => return Err(reject("non-positive amount")),
    };

    Ok(ValidatedCategoryAmount {
        category_name,
        amount,
        items: hint.items,
    })
}

/// Whether the text contains any uncertainty indicator
pub fn has_uncertainty_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNCERTAINTY_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

fn reject(reason: &str) -> Error {
    debug!(reason, "Extraction candidate rejected");
    Error::unreadable()
}
