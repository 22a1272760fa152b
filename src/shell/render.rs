//! Plain text views of the board

use crate::domain::board::{CategoryFilter, TaskBoard};
use crate::domain::category::{Category, PALETTE};
use crate::domain::profile::{Profile, ProfileDraft};
use crate::domain::todo::Todo;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use uuid::Uuid;

const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..SHORT_ID_LEN].to_owned()
}

/// "Oct 19" style date
pub fn task_date(created_at: DateTime<Utc>) -> String {
    created_at.format("%b %-d").to_string()
}

fn filter_label(board: &TaskBoard) -> String {
    match board.view().filter {
        CategoryFilter::All => "All tasks".to_owned(),
        CategoryFilter::Uncategorized => "Uncategorized".to_owned(),
        CategoryFilter::Category(id) => board
            .category(id)
            .map(|category| category.name.clone())
            .unwrap_or_else(|| "Unknown category".to_owned()),
    }
}

fn task_line(board: &TaskBoard, todo: &Todo) -> String {
    let check = if todo.completed { "[x]" } else { "[ ]" };
    let mut line = format!("  {check} {}  {}", short_id(todo.id), todo.text);
    if let Some(category) = todo.category_id.and_then(|id| board.category(id)) {
        let _ = write!(line, "  #{}", category.name);
    }
    let _ = write!(line, "  ({})", task_date(todo.created_at));

    line
}

/// The visible tasks, active ones first, under a header naming the filter, search and sort
pub fn task_list(board: &TaskBoard) -> String {
    let view = board.view();
    let mut out = filter_label(board);
    if !view.search.is_empty() {
        let _ = write!(out, ", matching \"{}\"", view.search);
    }
    let _ = writeln!(out, ", by {} {}", view.sort_key, view.direction);

    if board.todos().is_empty() {
        out.push_str("No tasks yet. Add one with: add <text>\n");
        return out;
    }

    let visible = board.visible_todos();
    if visible.is_empty() {
        out.push_str("No tasks match.\n");
        return out;
    }

    let (completed, active): (Vec<&Todo>, Vec<&Todo>) =
        visible.into_iter().partition(|todo| todo.completed);
    for (title, section) in [("Active Tasks", active), ("Completed Tasks", completed)] {
        if section.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{title}");
        for todo in section {
            let _ = writeln!(out, "{}", task_line(board, todo));
        }
    }

    out
}

/// Counts for every filter, marking the active one
pub fn sidebar(board: &TaskBoard) -> String {
    let counts = board.counts();
    let current = board.view().filter;
    let marker = |filter: CategoryFilter| if filter == current { '*' } else { ' ' };

    let mut out = String::new();
    let _ = writeln!(out, "{} All tasks ({})", marker(CategoryFilter::All), counts.total);
    let _ = writeln!(
        out,
        "{} Uncategorized ({})",
        marker(CategoryFilter::Uncategorized),
        counts.uncategorized
    );
    for category in board.categories() {
        let _ = writeln!(
            out,
            "{} {} ({})  {} {}",
            marker(CategoryFilter::Category(category.id)),
            category.name,
            counts.for_category(category.id),
            category.color,
            short_id(category.id)
        );
    }
    let _ = writeln!(out, "Active: {}  Completed: {}", counts.active, counts.completed);

    out
}

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories yet. Add one with: category add <name>\n".to_owned();
    }

    categories
        .iter()
        .map(|category| {
            format!(
                "{}  {}  {}\n",
                short_id(category.id),
                category.color,
                category.name
            )
        })
        .collect()
}

pub fn palette() -> String {
    let mut out = String::new();
    for (index, color) in PALETTE.iter().enumerate() {
        let default = if index == 0 { "  (default)" } else { "" };
        let _ = writeln!(out, "{color}{default}");
    }

    out
}

/// The profile card. [email] stands in for a missing name.
pub fn profile_card(profile: Option<&Profile>, email: &str) -> String {
    let empty = Profile::default();
    let profile = profile.unwrap_or(&empty);

    let mut out = String::new();
    let _ = writeln!(out, "{}", profile.display_name(email));
    if let Some(tagline) = profile.tagline.as_deref().filter(|text| !text.is_empty()) {
        let _ = writeln!(out, "  {tagline}");
    }
    if let Some(location) = profile.location() {
        let _ = writeln!(out, "  Location: {location}");
    }
    if let Some(about) = profile.about.as_deref().filter(|text| !text.is_empty()) {
        let _ = writeln!(out, "  About: {about}");
    }
    for (network, link) in profile.social_links() {
        let _ = writeln!(out, "  {network}: {link}");
    }
    if let Some(avatar_url) = &profile.avatar_url {
        let _ = writeln!(out, "  Avatar: {avatar_url}");
    }
    if profile.is_empty() {
        out.push_str("Your profile is empty. Use \"profile edit\" to add your details!\n");
    }

    out
}

pub fn draft(draft: &ProfileDraft) -> String {
    let mut out = "Editing profile (profile save / profile discard):\n".to_owned();
    for (field, value) in draft.fields() {
        let _ = writeln!(out, "  {:<9} {value}", field.to_string());
    }

    out
}
