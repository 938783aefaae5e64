//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Provider-backed extraction and offline replay of saved replies
//! - `core` - Core commands (init) and shared utilities (open_db, load_config)
//! - `groups` - Group, user, member and category management
//! - `prompts` - Prompt library management commands

pub mod analyze;
pub mod core;
pub mod groups;
pub mod prompts;

// Re-export command functions for main.rs
pub use analyze::*;
pub use core::*;
pub use groups::*;
pub use prompts::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
