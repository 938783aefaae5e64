//! User and group operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::context::GroupStore;
use crate::error::Result;
use crate::models::{Category, Group, Member, SplitPolicy, User, INITIAL_CATEGORIES};

impl Database {
    /// Create a user, returning its ID
    pub fn create_user(&self, name: &str, email: Option<&str>) -> Result<String> {
        let conn = self.conn()?;
        let id = conn.query_row(
            "INSERT INTO users (name, email) VALUES (?, ?) RETURNING id",
            params![name, email],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, email FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Create a group, returning its ID
    pub fn create_group(&self, name: &str, split_policy: SplitPolicy) -> Result<String> {
        let conn = self.conn()?;
        let id = conn.query_row(
            "INSERT INTO expense_groups (name, split_type) VALUES (?, ?) RETURNING id",
            params![name, split_policy.as_str()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Add the default category set to a group
    pub fn seed_default_categories(&self, group_id: &str) -> Result<Vec<String>> {
        INITIAL_CATEGORIES
            .iter()
            .map(|name| self.add_category(group_id, name))
            .collect()
    }

    /// Change how a group divides expenses
    pub fn set_split_policy(&self, group_id: &str, split_policy: SplitPolicy) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE expense_groups SET split_type = ? WHERE id = ?",
            params![split_policy.as_str(), group_id],
        )?;
        Ok(updated > 0)
    }

    /// List all groups
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, split_type, created_at FROM expense_groups ORDER BY created_at, rowid",
        )?;
        let groups = stmt
            .query_map([], row_to_group)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(groups)
    }
}

fn row_to_group(row: &rusqlite::Row) -> rusqlite::Result<Group> {
    let split_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        split_policy: split_str.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
    })
}

impl GroupStore for Database {
    fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        let conn = self.conn()?;
        let group = conn
            .query_row(
                "SELECT id, name, split_type, created_at FROM expense_groups WHERE id = ?",
                params![group_id],
                row_to_group,
            )
            .optional()?;
        Ok(group)
    }

    fn find_active_member(&self, group_id: &str, user_id: &str) -> Result<Option<Member>> {
        self.find_member(group_id, user_id)
            .map(|m| m.filter(|m| m.state == crate::models::MemberState::Active))
    }

    fn list_active_members(&self, group_id: &str) -> Result<Vec<Member>> {
        self.list_members_in_state(group_id, crate::models::MemberState::Active)
    }

    fn list_active_categories(&self, group_id: &str) -> Result<Vec<Category>> {
        self.list_categories_in_state(group_id, crate::models::CategoryState::Active)
    }
}
