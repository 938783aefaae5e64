//! Category operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryState};

impl Database {
    /// Add an ACTIVE category to a group, returning its ID
    ///
    /// Names are unique among the group's active categories, ignoring case.
    pub fn add_category(&self, group_id: &str, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Category name cannot be empty".to_string(),
            ));
        }

        let conn = self.conn()?;
        ensure_name_free(&conn, group_id, name, None)?;

        let id = conn.query_row(
            "INSERT INTO categories (group_id, name, state) VALUES (?, ?, ?) RETURNING id",
            params![group_id, name, CategoryState::Active.as_str()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All categories of a group, in creation order
    pub fn list_categories(&self, group_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, group_id, name, state, created_at FROM categories WHERE group_id = ? ORDER BY rowid",
        )?;
        let categories = stmt
            .query_map(params![group_id], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub(crate) fn list_categories_in_state(
        &self,
        group_id: &str,
        state: CategoryState,
    ) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, group_id, name, state, created_at FROM categories \
             WHERE group_id = ? AND state = ? ORDER BY rowid",
        )?;
        let categories = stmt
            .query_map(params![group_id, state.as_str()], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Activate or deactivate a category
    ///
    /// Reactivating fails with `InvalidInput` if an active category of the
    /// same group already uses the name.
    pub fn set_category_state(&self, category_id: &str, state: CategoryState) -> Result<()> {
        let conn = self.conn()?;

        if state == CategoryState::Active {
            let (group_id, name): (String, String) = conn
                .query_row(
                    "SELECT group_id, name FROM categories WHERE id = ?",
                    params![category_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| Error::NotFound(format!("category {}", category_id)))?;
            ensure_name_free(&conn, &group_id, &name, Some(category_id))?;
        }

        let updated = conn.execute(
            "UPDATE categories SET state = ? WHERE id = ?",
            params![state.as_str(), category_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("category {}", category_id)));
        }
        Ok(())
    }
}

/// Reject a name already used by another active category of the group
fn ensure_name_free(
    conn: &Connection,
    group_id: &str,
    name: &str,
    except_id: Option<&str>,
) -> Result<()> {
    let duplicate: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories \
         WHERE group_id = ? AND state = ? AND lower(name) = lower(?) AND id IS NOT ?)",
        params![group_id, CategoryState::Active.as_str(), name, except_id],
        |row| row.get(0),
    )?;
    if duplicate {
        return Err(Error::InvalidInput(format!(
            "Category '{}' already exists in this group",
            name
        )));
    }
    Ok(())
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    let state_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    Ok(Category {
        id: row.get(0)?,
        group_id: row.get(1)?,
        name: row.get(2)?,
        state: state_str.parse().unwrap_or(CategoryState::Inactive),
        created_at: parse_datetime(&created_at_str),
    })
}
