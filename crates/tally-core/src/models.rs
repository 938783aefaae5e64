//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a group divides an expense among its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitPolicy {
    /// Everyone pays the same share
    #[default]
    Equal,
    /// Each member pays their configured default percentage
    Percentage,
}

impl SplitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage => "percentage",
        }
    }
}

impl std::str::FromStr for SplitPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equal" => Ok(Self::Equal),
            "percentage" | "percent" => Ok(Self::Percentage),
            _ => Err(format!("Unknown split policy: {}", s)),
        }
    }
}

impl std::fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership lifecycle state
///
/// ```text
/// (new) -> ACTIVE -> LEFT    -> (rejoin) ACTIVE
///                 -> REMOVED -> (rejoin) PENDING -> (approve) ACTIVE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberState {
    /// Waiting for an admin to approve the (re)join
    Pending,
    Active,
    /// Left the group voluntarily
    Left,
    /// Removed by an admin
    Removed,
}

impl MemberState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Left => "left",
            Self::Removed => "removed",
        }
    }
}

impl std::str::FromStr for MemberState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "left" => Ok(Self::Left),
            "removed" => Ok(Self::Removed),
            _ => Err(format!("Unknown member state: {}", s)),
        }
    }
}

impl std::fmt::Display for MemberState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Admin,
    #[default]
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            _ => Err(format!("Unknown member role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryState {
    Active,
    Inactive,
}

impl CategoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for CategoryState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("Unknown category state: {}", s)),
        }
    }
}

/// An application user (identity shared across groups)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

/// A group of people sharing expenses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub split_policy: SplitPolicy,
    pub created_at: DateTime<Utc>,
}

/// A user's participation record within one group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    /// Display name, taken from the user record
    pub name: String,
    pub role: MemberRole,
    pub state: MemberState,
    /// Default split percentage (PERCENTAGE groups)
    pub default_split: Option<f64>,
    pub color: String,
    pub background_color: String,
    pub created_at: DateTime<Utc>,
}

/// An expense category within one group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub state: CategoryState,
    pub created_at: DateTime<Utc>,
}

/// Avatar color pair assigned to a member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberColor {
    /// Main color (text/border)
    pub color: &'static str,
    /// Lighter background color
    pub background: &'static str,
}

/// Member avatar palette, assigned round-robin per group
pub const MEMBER_COLORS: &[MemberColor] = &[
    MemberColor {
        color: "#3B82F6",
        background: "#DBEAFE",
    }, // blue
    MemberColor {
        color: "#10B981",
        background: "#D1FAE5",
    }, // green
    MemberColor {
        color: "#F59E0B",
        background: "#FEF3C7",
    }, // amber
    MemberColor {
        color: "#EF4444",
        background: "#FEE2E2",
    }, // red
    MemberColor {
        color: "#8B5CF6",
        background: "#EDE9FE",
    }, // purple
    MemberColor {
        color: "#EC4899",
        background: "#FCE7F3",
    }, // pink
    MemberColor {
        color: "#06B6D4",
        background: "#CFFAFE",
    }, // cyan
    MemberColor {
        color: "#84CC16",
        background: "#ECFCCB",
    }, // lime
    MemberColor {
        color: "#F97316",
        background: "#FFEDD5",
    }, // orange
    MemberColor {
        color: "#6366F1",
        background: "#E0E7FF",
    }, // indigo
    MemberColor {
        color: "#14B8A6",
        background: "#CCFBF1",
    }, // teal
    MemberColor {
        color: "#A855F7",
        background: "#F3E8FF",
    }, // violet
];

/// Categories every new group starts with
pub const INITIAL_CATEGORIES: &[&str] = &[
    "Comida",
    "Educación",
    "Entretenimiento",
    "Hogar",
    "Otros",
    "Salud",
    "Transporte",
    "Transferencias",
];

// =============================================================================
// Reconciliation context
// =============================================================================

/// A member as seen by reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMember {
    pub member_id: String,
    pub display_name: String,
    #[serde(default)]
    pub default_split_percent: Option<f64>,
}

/// A category as seen by reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextCategory {
    pub category_id: String,
    pub name: String,
}

/// Trusted group data that free-text names are reconciled against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationContext {
    /// Active members, in group order
    pub members: Vec<ContextMember>,
    /// Active categories, in group order (the first one is the fallback)
    pub categories: Vec<ContextCategory>,
    pub split_policy: SplitPolicy,
    /// Member who asked for the analysis; the fallback payer
    pub requesting_member_id: String,
    /// Hours to add to model-provided dates
    #[serde(default)]
    pub timezone_offset_hours: Option<f64>,
}

impl ReconciliationContext {
    /// Display name of the requesting member, if they are in the member list
    pub fn requesting_member_name(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.member_id == self.requesting_member_id)
            .map(|m| m.display_name.as_str())
    }

    /// Member display names, in order
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.display_name.as_str()).collect()
    }
}

// =============================================================================
// Expense template (reconciliation output)
// =============================================================================

/// Amount allocated to one real category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCategoryAmount {
    pub category_id: String,
    pub category_name: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
}

/// A payment or split line for one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAmount {
    pub member_id: String,
    pub member_name: String,
    pub amount: f64,
}

/// A balanced expense proposal, ready for the user to confirm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseTemplate {
    pub title: String,
    pub date: DateTime<Utc>,
    pub description: String,
    pub category_amounts: Vec<TemplateCategoryAmount>,
    /// Sum of `category_amounts`; basis for payments and splits
    pub total_amount: f64,
    pub payments: Vec<MemberAmount>,
    pub splits: Vec<MemberAmount>,
}
