//! Tally Core Library
//!
//! Shared functionality for the Tally shared-expense tool:
//! - Group, member and category storage (SQLite)
//! - Pluggable AI providers (Gemini, mock)
//! - Prompt library for customizable extraction prompts
//! - Decoding and plausibility checks for AI extractions
//! - Reconciliation of extractions against real group data
//! - Expense analysis service tying it all together

pub mod ai;
pub mod analyzer;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod prompts;
pub mod reconcile;
pub mod validation;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, CategoryAmountHint, ExtractionCandidate, ExtractionChannel,
    GeminiBackend, MediaPart, MemberAmountHint, MockBackend, MockCall,
};
pub use analyzer::{ExpenseAnalyzer, MAX_IMAGES};
pub use config::TallyConfig;
pub use context::{ContextBuilder, GroupStore};
pub use db::Database;
pub use error::{Error, ErrorKind, Result, UNREADABLE_MESSAGE};
pub use models::{
    Category, CategoryState, ExpenseTemplate, Group, Member, MemberAmount, MemberRole,
    MemberState, ReconciliationContext, SplitPolicy, TemplateCategoryAmount, User,
};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use reconcile::{reconcile, reconcile_at};
pub use validation::{validate, ValidatedCandidate, ValidationPolicy};
