/// Return `base` if it is free, otherwise the first `"{base} ({n})"` with
/// `n = 2, 3, …` that is not already taken.
pub fn resolve_unique_name(base: &str, existing: &[String]) -> String {
    let taken = |name: &str| existing.iter().any(|e| e == name);
    if !taken(base) {
        return base.to_string();
    }
    // At most existing.len() candidates can collide, so this terminates
    (2..)
        .map(|n| format!("{} ({})", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
