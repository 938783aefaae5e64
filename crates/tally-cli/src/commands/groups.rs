//! Group, user, membership and category commands

use anyhow::{Context, Result};
use tally_core::{CategoryState, Database, Member, MemberRole, MemberState, SplitPolicy};

use super::truncate;

/// Create a group, optionally seeded with the default categories
pub fn cmd_group_create(db: &Database, name: &str, split: &str, seed: bool) -> Result<String> {
    let policy: SplitPolicy = split.parse().map_err(anyhow::Error::msg)?;
    let group_id = db
        .create_group(name, policy)
        .context("Failed to create group")?;

    println!("✅ Created group '{}' ({})", name, policy);
    println!("   ID: {}", group_id);

    if seed {
        let categories = db
            .seed_default_categories(&group_id)
            .context("Failed to seed categories")?;
        println!("   Seeded {} default categories", categories.len());
    }

    Ok(group_id)
}

pub fn cmd_group_list(db: &Database) -> Result<()> {
    let groups = db.list_groups()?;

    if groups.is_empty() {
        println!("No groups yet. Create one with: tally group create --name <NAME>");
        return Ok(());
    }

    println!("{:<34} {:<25} {:<12}", "ID", "NAME", "SPLIT");
    println!("{}", "-".repeat(72));
    for group in groups {
        println!(
            "{:<34} {:<25} {:<12}",
            group.id,
            truncate(&group.name, 25),
            group.split_policy.as_str()
        );
    }

    Ok(())
}

pub fn cmd_user_create(db: &Database, name: &str, email: Option<&str>) -> Result<String> {
    let user_id = db
        .create_user(name, email)
        .context("Failed to create user")?;

    println!("✅ Created user '{}'", name);
    println!("   ID: {}", user_id);

    Ok(user_id)
}

pub fn cmd_user_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Create one with: tally user create --name <NAME>");
        return Ok(());
    }

    println!("{:<34} {:<25} {}", "ID", "NAME", "EMAIL");
    println!("{}", "-".repeat(80));
    for user in users {
        println!(
            "{:<34} {:<25} {}",
            user.id,
            truncate(&user.name, 25),
            user.email.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// Add a user to a group; a former member rejoins with their old color
pub fn cmd_member_add(
    db: &Database,
    group_id: &str,
    user_id: &str,
    percent: Option<f64>,
    admin: bool,
) -> Result<String> {
    db.get_user(user_id)?
        .with_context(|| format!("User not found: {}", user_id))?;

    let role = if admin {
        MemberRole::Admin
    } else {
        MemberRole::Member
    };
    let member_id = db
        .add_member(group_id, user_id, role, percent)
        .context("Failed to add member")?;

    let state = db
        .get_member(&member_id)?
        .map(|m| m.state)
        .unwrap_or(MemberState::Active);
    match state {
        MemberState::Pending => println!("⏳ Member {} is pending approval", member_id),
        _ => println!("✅ Added member {}", member_id),
    }
    Ok(member_id)
}

pub fn cmd_member_list(db: &Database, group_id: &str) -> Result<()> {
    let members = db.list_members(group_id)?;

    if members.is_empty() {
        println!("No members in group {}", group_id);
        return Ok(());
    }

    println!(
        "{:<34} {:<20} {:<8} {:<10} {:>7}  {}",
        "ID", "NAME", "ROLE", "STATE", "SPLIT%", "COLOR"
    );
    println!("{}", "-".repeat(92));
    for member in members {
        let split = member
            .default_split
            .map(|p| format!("{:.1}", p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<34} {:<20} {:<8} {:<10} {:>7}  {}",
            member.id,
            truncate(&member.name, 20),
            member.role.as_str(),
            member.state.as_str(),
            split,
            member.color
        );
    }

    Ok(())
}

pub fn cmd_member_leave(db: &Database, group_id: &str, user_id: &str) -> Result<()> {
    let member = membership(db, group_id, user_id)?;
    db.leave_group(&member.id)?;
    println!("✅ {} left the group", member.name);
    Ok(())
}

pub fn cmd_member_remove(db: &Database, group_id: &str, user_id: &str) -> Result<()> {
    let member = membership(db, group_id, user_id)?;
    db.remove_member(&member.id)?;
    println!("✅ {} was removed from the group", member.name);
    Ok(())
}

pub fn cmd_member_approve(db: &Database, group_id: &str, user_id: &str) -> Result<()> {
    let member = membership(db, group_id, user_id)?;
    db.approve_member(&member.id)?;
    println!("✅ {} is now an active member", member.name);
    Ok(())
}

fn membership(db: &Database, group_id: &str, user_id: &str) -> Result<Member> {
    db.find_member(group_id, user_id)?
        .with_context(|| format!("User {} is not a member of group {}", user_id, group_id))
}

pub fn cmd_category_add(db: &Database, group_id: &str, name: &str) -> Result<String> {
    let category_id = db
        .add_category(group_id, name)
        .context("Failed to add category")?;

    println!("✅ Added category '{}'", name.trim());
    println!("   ID: {}", category_id);

    Ok(category_id)
}

pub fn cmd_category_list(db: &Database, group_id: &str) -> Result<()> {
    let categories = db.list_categories(group_id)?;

    if categories.is_empty() {
        println!("No categories in group {}", group_id);
        return Ok(());
    }

    println!("{:<34} {:<25} {}", "ID", "NAME", "STATE");
    println!("{}", "-".repeat(70));
    for category in categories {
        println!(
            "{:<34} {:<25} {}",
            category.id,
            truncate(&category.name, 25),
            category.state.as_str()
        );
    }

    Ok(())
}

pub fn cmd_category_disable(db: &Database, category_id: &str) -> Result<()> {
    db.set_category_state(category_id, CategoryState::Inactive)
        .context("Failed to disable category")?;
    println!("✅ Category {} disabled", category_id);
    Ok(())
}
