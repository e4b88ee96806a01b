use serde_json::Value;
use tracing::info;

use crate::task::SweBenchTaskRef;

/// Derives the `owner/repo` slug from an issue record.
///
/// Prefers `repository.full_name`; falls back to the last two path segments
/// of `repository_url` (e.g. `https://api.github.com/repos/psf/requests`),
/// else an empty string.
pub fn issue_repo_slug(issue: &Value) -> String {
    if let Some(full_name) = issue
        .pointer("/repository/full_name")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
    {
        return full_name.to_string();
    }
    let repo_url = issue
        .get("repository_url")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let trimmed = repo_url.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    let mut segments = trimmed.rsplit('/');
    match (segments.next(), segments.next()) {
        (Some(repo), Some(owner)) => format!("{owner}/{repo}"),
        _ => String::new(),
    }
}

/// True when `issue` is the active task's own issue and must be hidden.
///
/// Always false while filtering is disabled (no task set, or the instance
/// id did not parse). Matching is exact string/integer equality.
pub fn should_block_issue(task: &SweBenchTaskRef, issue: &Value) -> bool {
    let (Some(owner_repo), Some(issue_number)) = (task.owner_repo.as_deref(), task.issue_number)
    else {
        return false;
    };

    let record_repo = issue_repo_slug(issue);
    let record_number = issue.get("number").and_then(Value::as_u64);

    if record_repo == owner_repo && record_number == Some(issue_number) {
        info!(
            repo = record_repo.as_str(),
            issue_number, "blocking SWE-Bench task issue"
        );
        return true;
    }
    false
}

/// Returns `issues` minus the active task's own issue, preserving order.
///
/// The input is never mutated; an empty input comes back empty.
pub fn filter_issues(task: &SweBenchTaskRef, issues: &[Value]) -> Vec<Value> {
    if issues.is_empty() {
        return Vec::new();
    }

    let mut filtered = Vec::with_capacity(issues.len());
    let mut blocked_count = 0usize;
    for issue in issues {
        if should_block_issue(task, issue) {
            blocked_count += 1;
        } else {
            filtered.push(issue.clone());
        }
    }

    if blocked_count > 0 {
        info!(
            blocked_count,
            "filtered SWE-Bench task issue(s) from search results"
        );
    }
    filtered
}
