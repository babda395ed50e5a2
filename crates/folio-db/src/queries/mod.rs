mod content;
mod messages;
mod projects;
mod sessions;
mod users;

/// Placeholder list `?1, ?2, ...` for an `IN (...)` clause.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
