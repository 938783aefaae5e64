//! Group membership operations

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Member, MemberRole, MemberState, MEMBER_COLORS};

const MEMBER_COLUMNS: &str = "m.id, m.group_id, m.user_id, u.name, m.role, m.state, \
     m.default_split, m.color, m.background_color, m.created_at";

impl Database {
    /// Add a user to a group, returning the member ID
    ///
    /// New members join ACTIVE with the group's next palette color. A user who
    /// already has a membership rejoins with their old color: LEFT goes back
    /// to ACTIVE, REMOVED goes to PENDING until an admin approves. Rejoining
    /// while PENDING or ACTIVE is rejected.
    pub fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        role: MemberRole,
        default_split: Option<f64>,
    ) -> Result<String> {
        if let Some(percent) = default_split {
            if !(0.0..=100.0).contains(&percent) {
                return Err(Error::InvalidInput(format!(
                    "Default split must be between 0 and 100, got {}",
                    percent
                )));
            }
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<(String, String)> = tx
            .query_row(
                "SELECT id, state FROM members WHERE group_id = ? AND user_id = ?",
                params![group_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, state_str)) = existing {
            let next = match state_str.parse().unwrap_or(MemberState::Removed) {
                MemberState::Left => MemberState::Active,
                MemberState::Removed => MemberState::Pending,
                MemberState::Pending => {
                    return Err(Error::InvalidInput(
                        "User is already a pending member of this group".to_string(),
                    ))
                }
                MemberState::Active => {
                    return Err(Error::InvalidInput(
                        "User is already a member of this group".to_string(),
                    ))
                }
            };
            tx.execute(
                "UPDATE members SET state = ?, default_split = COALESCE(?, default_split) \
                 WHERE id = ?",
                params![next.as_str(), default_split, id],
            )?;
            tx.commit()?;
            debug!(member_id = %id, state = %next, "Rejoined existing membership");
            return Ok(id);
        }

        let color_index: i64 = tx
            .query_row(
                "SELECT next_color_index FROM expense_groups WHERE id = ?",
                params![group_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))?;

        let palette = &MEMBER_COLORS[color_index.rem_euclid(MEMBER_COLORS.len() as i64) as usize];

        tx.execute(
            "UPDATE expense_groups SET next_color_index = next_color_index + 1 WHERE id = ?",
            params![group_id],
        )?;

        let id: String = tx.query_row(
            r#"
            INSERT INTO members (group_id, user_id, role, state, default_split, color, background_color)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
            params![
                group_id,
                user_id,
                role.as_str(),
                MemberState::Active.as_str(),
                default_split,
                palette.color,
                palette.background,
            ],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(id)
    }

    /// Get a member by ID
    pub fn get_member(&self, member_id: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let member = conn
            .query_row(
                &format!(
                    "SELECT {} FROM members m JOIN users u ON m.user_id = u.id WHERE m.id = ?",
                    MEMBER_COLUMNS
                ),
                params![member_id],
                row_to_member,
            )
            .optional()?;
        Ok(member)
    }

    /// A user's membership in a group, in any state
    pub fn find_member(&self, group_id: &str, user_id: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let member = conn
            .query_row(
                &format!(
                    "SELECT {} FROM members m JOIN users u ON m.user_id = u.id \
                     WHERE m.group_id = ? AND m.user_id = ?",
                    MEMBER_COLUMNS
                ),
                params![group_id, user_id],
                row_to_member,
            )
            .optional()?;
        Ok(member)
    }

    /// All members of a group, in creation order
    pub fn list_members(&self, group_id: &str) -> Result<Vec<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM members m JOIN users u ON m.user_id = u.id \
             WHERE m.group_id = ? ORDER BY m.rowid",
            MEMBER_COLUMNS
        ))?;
        let members = stmt
            .query_map(params![group_id], row_to_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    pub(crate) fn list_members_in_state(
        &self,
        group_id: &str,
        state: MemberState,
    ) -> Result<Vec<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM members m JOIN users u ON m.user_id = u.id \
             WHERE m.group_id = ? AND m.state = ? ORDER BY m.rowid",
            MEMBER_COLUMNS
        ))?;
        let members = stmt
            .query_map(params![group_id, state.as_str()], row_to_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    /// Approve a PENDING member, making them ACTIVE
    pub fn approve_member(&self, member_id: &str) -> Result<()> {
        self.transition_member(member_id, &[MemberState::Pending], MemberState::Active)
    }

    /// An ACTIVE member leaves the group
    pub fn leave_group(&self, member_id: &str) -> Result<()> {
        self.transition_member(member_id, &[MemberState::Active], MemberState::Left)
    }

    /// An admin removes an ACTIVE or PENDING member
    pub fn remove_member(&self, member_id: &str) -> Result<()> {
        self.transition_member(
            member_id,
            &[MemberState::Active, MemberState::Pending],
            MemberState::Removed,
        )
    }

    fn transition_member(
        &self,
        member_id: &str,
        from: &[MemberState],
        to: MemberState,
    ) -> Result<()> {
        let conn = self.conn()?;
        let current: String = conn
            .query_row(
                "SELECT state FROM members WHERE id = ?",
                params![member_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("member {}", member_id)))?;

        let current: MemberState = current.parse().map_err(Error::InvalidInput)?;
        if !from.contains(&current) {
            return Err(Error::InvalidInput(format!(
                "Member {} is {}, can't move to {}",
                member_id, current, to
            )));
        }

        conn.execute(
            "UPDATE members SET state = ? WHERE id = ?",
            params![to.as_str(), member_id],
        )?;
        debug!(member_id = %member_id, from = %current, to = %to, "Member state changed");
        Ok(())
    }

    /// Move a member to a new state without checking the lifecycle
    pub fn set_member_state(&self, member_id: &str, state: MemberState) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE members SET state = ? WHERE id = ?",
            params![state.as_str(), member_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("member {}", member_id)));
        }
        Ok(())
    }

    /// Set or clear a member's default split percentage
    pub fn set_member_default_split(&self, member_id: &str, percent: Option<f64>) -> Result<()> {
        if let Some(p) = percent {
            if !(0.0..=100.0).contains(&p) {
                return Err(Error::InvalidInput(format!(
                    "Default split must be between 0 and 100, got {}",
                    p
                )));
            }
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE members SET default_split = ? WHERE id = ?",
            params![percent, member_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("member {}", member_id)));
        }
        Ok(())
    }
}

fn row_to_member(row: &rusqlite::Row) -> rusqlite::Result<Member> {
    let role_str: String = row.get(4)?;
    let state_str: String = row.get(5)?;
    let created_at_str: String = row.get(9)?;
    Ok(Member {
        id: row.get(0)?,
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        role: role_str.parse().unwrap_or_default(),
        state: state_str.parse().unwrap_or(MemberState::Removed),
        default_split: row.get(6)?,
        color: row.get(7)?,
        background_color: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
    })
}
