use serde::{Deserialize, Serialize};

use super::format_timestamp;

/// Default page size used by the backend when `limit` is not given
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(format!("priority must be between 1 and 3, got {}", other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "completado", default)]
    pub completed: bool,
    #[serde(rename = "prioridad", default)]
    pub priority: Priority,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Task {
    pub fn status_marker(&self) -> &'static str {
        if self.completed {
            "[x]"
        } else {
            "[ ]"
        }
    }

    pub fn formatted_created(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// Payload for `POST /tareas`
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "completado")]
    pub completed: bool,
    #[serde(rename = "prioridad")]
    pub priority: Priority,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
            priority: Priority::default(),
        }
    }
}

/// Payload for `PUT /tareas/{id}`. Fields left as `None` are not sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "completado", skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(rename = "prioridad", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TaskUpdate {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
    }
}

/// Paginated response of `GET /tareas`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            pages: 0,
        }
    }
}

impl From<&TaskPage> for Pagination {
    fn from(page: &TaskPage) -> Self {
        Self {
            total: page.total,
            page: page.page,
            size: page.size,
            pages: page.pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filters and pagination for `GET /tareas`
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub skip: u32,
    pub limit: u32,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// Matched against title and description
    pub search: Option<String>,
    pub sort_by: String,
    pub order: SortOrder,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
            completed: None,
            priority: None,
            search: None,
            sort_by: "created_at".to_string(),
            order: SortOrder::Desc,
        }
    }
}

impl TaskQuery {
    /// Select a 1-based page of `size` items
    pub fn page(mut self, page: u32, size: u32) -> Self {
        let size = size.max(1);
        self.limit = size;
        self.skip = page.saturating_sub(1).saturating_mul(size);
        self
    }

    /// Flatten into the backend's query parameter names
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("skip".to_string(), self.skip.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(completed) = self.completed {
            pairs.push(("completado".to_string(), completed.to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("prioridad".to_string(), u8::from(priority).to_string()));
        }
        if let Some(ref search) = self.search {
            if !search.trim().is_empty() {
                pairs.push(("buscar".to_string(), search.trim().to_string()));
            }
        }
        pairs.push(("ordenar_por".to_string(), self.sort_by.clone()));
        pairs.push(("orden".to_string(), self.order.as_str().to_string()));
        pairs
    }
}
