//! SeaORM entities backing the grant core and the directory it reads from.

pub mod application;
pub mod authorization;
pub mod configuration;
pub mod group;
pub mod ticket;
pub mod user;

/// Splits a space-separated set column into its members.
pub(crate) fn split_set(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Joins set members into the space-separated column form, dropping duplicates.
pub(crate) fn join_set<I, S>(members: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for member in members {
        let member = member.as_ref().trim();
        if !member.is_empty() && !out.iter().any(|m| m == member) {
            out.push(member.to_string());
        }
    }
    out.join(" ")
}
