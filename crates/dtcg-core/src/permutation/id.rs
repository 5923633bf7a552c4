//! Stable permutation ids

/// Id of a selection.
///
/// Modifier names are sorted, each rendered as `<name>-<value>` and joined
/// with `&`. Multi-value selections are sorted and comma-joined; empty
/// selections are left out. An empty selection overall is `default`.
pub fn permutation_id<'a, I, V>(assignment: I) -> String
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: IntoIterator<Item = &'a String>,
{
    let mut parts: Vec<(&str, Vec<&str>)> = assignment
        .into_iter()
        .map(|(name, values)| {
            let mut values: Vec<&str> = values.into_iter().map(String::as_str).collect();
            values.sort_unstable();
            (name, values)
        })
        .filter(|(_, values)| !values.is_empty())
        .collect();
    parts.sort_by(|a, b| a.0.cmp(b.0));

    if parts.is_empty() {
        return "default".to_string();
    }
    parts
        .iter()
        .map(|(name, values)| format!("{name}-{}", values.join(",")))
        .collect::<Vec<_>>()
        .join("&")
}
