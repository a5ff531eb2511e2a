pub mod report;

use crate::model::User;
use crate::utils;

pub const NO_USERS_MESSAGE: &str = "No users found and/or an error occurred.";
pub const NO_USER_MESSAGE: &str = "Error loading user.";

const TABLE_HEADERS: [&str; 5] = ["ID", "Avatar URL", "First name", "Last name", "Email"];
const MAX_CELL_WIDTH: usize = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Cards,
    Table,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cards" | "card" | "text" | "txt" => Some(Self::Cards),
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cards => "cards",
            Self::Table => "table",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Cards);
    }
    None
}

/// Render a listing in the requested format.
pub fn render_users(users: &[User], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Cards => render_cards(users),
        OutputFormat::Table => render_table(users),
        OutputFormat::Json => render_json(users),
        OutputFormat::Html => render_html(users),
    }
}

/// Render a single user. Cards and table both fall back to the detail view.
pub fn render_user(user: Option<&User>, format: OutputFormat) -> Vec<u8> {
    match (format, user) {
        (OutputFormat::Json, Some(user)) => {
            serde_json::to_vec_pretty(user).unwrap_or_else(|_| b"null\n".to_vec())
        }
        (OutputFormat::Json, None) => b"null\n".to_vec(),
        (OutputFormat::Html, user) => {
            report::render_html(user.map(std::slice::from_ref).unwrap_or(&[]))
        }
        (_, user) => render_detail(user),
    }
}

pub fn render_cards(users: &[User]) -> Vec<u8> {
    if users.is_empty() {
        return format!("{NO_USERS_MESSAGE}\n").into_bytes();
    }
    let mut out = String::new();
    for u in users {
        out.push_str(&format!("[#{}] {}\n", u.id, u.display_name()));
        if !u.avatar().is_empty() {
            out.push_str(&format!("      {}\n", u.avatar()));
        }
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render_detail(user: Option<&User>) -> Vec<u8> {
    let Some(u) = user else {
        return format!("{NO_USER_MESSAGE}\n").into_bytes();
    };
    let mut out = String::new();
    out.push_str(&format!("{}\n", u.display_name()));
    out.push_str(&format!("{}\n", "-".repeat(u.display_name().chars().count())));
    out.push_str(&format!("{:<11}{}\n", "First name:", u.first_name()));
    out.push_str(&format!("{:<11}{}\n", "Last name:", u.last_name()));
    out.push_str(&format!("{:<11}{}\n", "Email:", u.email()));
    out.push_str(&format!("{:<11}{}\n", "Avatar:", u.avatar()));
    out.into_bytes()
}

fn table_row(u: &User) -> [String; 5] {
    [
        u.id.to_string(),
        utils::truncate(u.avatar(), MAX_CELL_WIDTH),
        utils::truncate(u.first_name(), MAX_CELL_WIDTH),
        utils::truncate(u.last_name(), MAX_CELL_WIDTH),
        utils::truncate(u.email(), MAX_CELL_WIDTH),
    ]
}

pub fn render_table(users: &[User]) -> Vec<u8> {
    if users.is_empty() {
        return format!("{NO_USERS_MESSAGE}\n").into_bytes();
    }

    let rows: Vec<[String; 5]> = users.iter().map(table_row).collect();
    let mut widths: [usize; 5] = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = TABLE_HEADERS
        .iter()
        .zip(widths.iter())
        .map(|(h, &w)| format!("{h:<w$}"))
        .collect();
    out.push_str(header.join(" | ").trim_end());
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i == 0 {
                    format!("{cell:>w$}")
                } else {
                    format!("{cell:<w$}")
                }
            })
            .collect();
        out.push_str(cells.join(" | ").trim_end());
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render_json(users: &[User]) -> Vec<u8> {
    serde_json::to_vec_pretty(users).unwrap_or_else(|_| b"[]\n".to_vec())
}

pub fn render_html(users: &[User]) -> Vec<u8> {
    report::render_html(users)
}
