//! Reconciliation context builder
//!
//! Fetches the group, its active members and active categories from the store
//! and checks that the requesting user belongs to the group. The result is the
//! trusted side of reconciliation and also feeds the prompt.

use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{
    Category, ContextCategory, ContextMember, Group, Member, ReconciliationContext, SplitPolicy,
};

/// Tolerance when checking that default percentages add up to 100
const PERCENT_TOLERANCE: f64 = 0.01;

/// Read access to group data needed for reconciliation
pub trait GroupStore {
    fn get_group(&self, group_id: &str) -> Result<Option<Group>>;

    /// The user's ACTIVE membership in the group, if any
    fn find_active_member(&self, group_id: &str, user_id: &str) -> Result<Option<Member>>;

    /// ACTIVE members in creation order
    fn list_active_members(&self, group_id: &str) -> Result<Vec<Member>>;

    /// ACTIVE categories in creation order
    fn list_active_categories(&self, group_id: &str) -> Result<Vec<Category>>;
}

/// Builds reconciliation contexts from a group store
pub struct ContextBuilder<'a, S: GroupStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GroupStore + ?Sized> ContextBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Assemble the context for one analysis request
    ///
    /// Fails with `GroupNotFound` if the group does not exist and `NotAMember`
    /// if the user has no active membership in it.
    pub fn build(
        &self,
        group_id: &str,
        user_id: &str,
        timezone_offset_hours: Option<f64>,
    ) -> Result<ReconciliationContext> {
        let group = self
            .store
            .get_group(group_id)?
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))?;

        let requester = self
            .store
            .find_active_member(group_id, user_id)?
            .ok_or_else(|| Error::NotAMember {
                group_id: group_id.to_string(),
                user_id: user_id.to_string(),
            })?;

        let members: Vec<ContextMember> = self
            .store
            .list_active_members(group_id)?
            .into_iter()
            .map(|m| ContextMember {
                member_id: m.id,
                display_name: m.name,
                default_split_percent: m.default_split,
            })
            .collect();

        let categories = self
            .store
            .list_active_categories(group_id)?
            .into_iter()
            .map(|c| ContextCategory {
                category_id: c.id,
                name: c.name,
            })
            .collect();

        if group.split_policy == SplitPolicy::Percentage {
            check_percentages(&group, &members);
        }

        Ok(ReconciliationContext {
            members,
            categories,
            split_policy: group.split_policy,
            requesting_member_id: requester.id,
            timezone_offset_hours,
        })
    }
}

/// Warn when a PERCENTAGE group's defaults won't cover the whole expense
fn check_percentages(group: &Group, members: &[ContextMember]) {
    let missing = members
        .iter()
        .filter(|m| m.default_split_percent.is_none())
        .count();
    let total: f64 = members.iter().filter_map(|m| m.default_split_percent).sum();

    if missing > 0 || (total - 100.0).abs() > PERCENT_TOLERANCE {
        warn!(
            group_id = %group.id,
            total_percent = total,
            members_without_percent = missing,
            "Default split percentages do not add up to 100"
        );
    }
}
