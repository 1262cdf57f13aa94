//! Plain-text rendering of tasks and users for the terminal.

use tareas_core::models::{Pagination, PasswordRequirements, PasswordStrength, Task, User};

/// Longest title shown in list rows
const MAX_TITLE_WIDTH: usize = 48;

/// Truncate a string to a maximum character count, adding ellipsis if needed
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn task_row(task: &Task) -> String {
    format!(
        "{:>5}  {}  {:<6}  {}",
        task.id,
        task.status_marker(),
        task.priority.to_string(),
        truncate_string(&task.title, MAX_TITLE_WIDTH)
    )
}

pub fn task_list(tasks: &[Task], pagination: &Pagination) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }
    let mut lines: Vec<String> = tasks.iter().map(task_row).collect();
    lines.push(format!(
        "\nPage {} of {} ({} tasks)",
        pagination.page,
        pagination.pages.max(1),
        pagination.total
    ));
    lines.join("\n")
}

pub fn task_detail(task: &Task) -> String {
    let mut lines = vec![
        format!("#{} {} {}", task.id, task.status_marker(), task.title),
        format!("Priority: {}", task.priority),
        format!("Created:  {}", task.formatted_created()),
    ];
    if let Some(ref description) = task.description {
        if !description.is_empty() {
            lines.push(String::new());
            lines.push(description.clone());
        }
    }
    lines.join("\n")
}

pub fn user_summary(user: &User) -> String {
    format!(
        "{} <{}>\nMember since {}\nLast login: {}",
        user.username,
        user.email,
        user.member_since(),
        user.last_login_display()
    )
}

pub fn requirements(req: &PasswordRequirements) -> String {
    let mut lines = vec![format!(
        "Passwords must be {} to {} characters.",
        req.min_length, req.max_length
    )];
    lines.extend(req.requirements.iter().map(|r| format!("  - {}", r)));
    lines.join("\n")
}

pub fn strength(analysis: &PasswordStrength) -> String {
    let check = |ok: bool| if ok { "yes" } else { "no" };
    format!(
        "Strength: {} (score {})\n  uppercase: {}\n  lowercase: {}\n  digit: {}\n  symbol: {}\n  common password: {}",
        analysis.strength,
        analysis.score,
        check(analysis.has_uppercase),
        check(analysis.has_lowercase),
        check(analysis.has_digit),
        check(analysis.has_symbol),
        check(analysis.is_common)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tareas_core::models::Priority;

    fn task(id: i64, title: &str, completed: bool) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: None,
            completed,
            priority: Priority::High,
            user_id: 1,
            created_at: "2024-01-01T12:00:00Z".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("corto", 10), "corto");
        assert_eq!(truncate_string("una tarea larguísima", 8), "una t...");
        assert_eq!(truncate_string("tarea", 2), "ta");
    }

    #[test]
    fn test_task_row() {
        assert_eq!(task_row(&task(12, "Informe", true)), "   12  [x]  High    Informe");
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(task_list(&[], &Pagination::default()), "No tasks found.");
    }

    #[test]
    fn test_list_footer() {
        let pagination = Pagination {
            total: 1,
            page: 1,
            size: 10,
            pages: 1,
        };
        let rendered = task_list(&[task(1, "Uno", false)], &pagination);
        assert!(rendered.ends_with("Page 1 of 1 (1 tasks)"));
    }
}
