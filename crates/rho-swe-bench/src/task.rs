use std::sync::OnceLock;

use regex::Regex;

/// Instance ids look like `{org}__{repo}-{number}`, e.g. `django__django-11099`.
fn instance_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^_]+)__([^-]+)-(\d+)$").expect("instance id pattern must compile")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Identity of the benchmark task currently under evaluation.
///
/// Invariant: `owner_repo` and `issue_number` are either both present or
/// both absent. Both absent means issue filtering is disabled, either
/// because no task was set or because the instance id did not parse.
pub struct SweBenchTaskRef {
    pub instance_id: Option<String>,
    pub owner_repo: Option<String>,
    pub issue_number: Option<u64>,
}

impl SweBenchTaskRef {
    /// Parses an instance id, keeping the raw id even when the repo/issue
    /// parts cannot be extracted.
    pub fn parse(instance_id: &str) -> Self {
        let parsed = instance_id_pattern()
            .captures(instance_id)
            .and_then(|captures| {
                let issue_number = captures[3].parse::<u64>().ok()?;
                Some((format!("{}/{}", &captures[1], &captures[2]), issue_number))
            });
        match parsed {
            Some((owner_repo, issue_number)) => Self {
                instance_id: Some(instance_id.to_string()),
                owner_repo: Some(owner_repo),
                issue_number: Some(issue_number),
            },
            None => Self {
                instance_id: Some(instance_id.to_string()),
                owner_repo: None,
                issue_number: None,
            },
        }
    }

    /// True when the task carries enough identity to filter issues.
    pub fn filtering_enabled(&self) -> bool {
        self.owner_repo.is_some() && self.issue_number.is_some()
    }
}
