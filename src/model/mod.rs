use serde::{Deserialize, Serialize};

/// One page of a paginated listing.
///
/// The wire body looks like `{"page": 1, "per_page": 6, "total": 12,
/// "total_pages": 2, "data": [...]}`. Only `page`, `total_pages` and `data`
/// are required; anything else the server adds (e.g. `support`) is ignored.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PageResponse<R> {
    #[serde(rename = "page")]
    pub current_page: u32,
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(rename = "data")]
    pub records: Vec<R>,
}

impl<R> PageResponse<R> {
    pub fn new(current_page: u32, total_pages: u32, records: Vec<R>) -> Self {
        Self {
            current_page,
            total_pages,
            per_page: None,
            total: None,
            records,
        }
    }

    /// True when the server reports pages after this one.
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Body of the single-record endpoint. `data` is absent or null when the
/// record does not exist.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SingleResponse<R> {
    pub data: Option<R>,
}

/// A user record as served by the demo API.
///
/// Fields the renderers know about are typed but optional; every other field
/// is kept in `extra` so the record serialises back out unchanged.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn first_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or_default()
    }

    pub fn last_name(&self) -> &str {
        self.last_name.as_deref().unwrap_or_default()
    }

    pub fn avatar(&self) -> &str {
        self.avatar.as_deref().unwrap_or_default()
    }

    pub fn full_name(&self) -> String {
        match (self.first_name().trim(), self.last_name().trim()) {
            ("", "") => String::new(),
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }

    /// Name used for greetings and titles; falls back when the record has none.
    pub fn display_name(&self) -> &str {
        let first = self.first_name().trim();
        if first.is_empty() {
            "unknown user"
        } else {
            first
        }
    }
}
