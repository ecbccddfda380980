//! Small shared helpers.

/// Returns `base` if unused, otherwise `base (k)` for the smallest `k >= 1`
/// that is not taken. Used for source batch and category names.
pub fn find_new_name(base: &str, taken: &[&str]) -> String {
    let mut candidate = base.to_string();
    let mut index = 1;
    while taken.contains(&candidate.as_str()) {
        candidate = format!("{base} ({index})");
        index += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_base_name_when_unused() {
        assert_eq!(find_new_name("data.csv", &[]), "data.csv");
        assert_eq!(find_new_name("data.csv", &["other.csv"]), "data.csv");
    }

    #[test]
    fn suffixes_with_the_smallest_free_index() {
        assert_eq!(find_new_name("data.csv", &["data.csv"]), "data.csv (1)");
        assert_eq!(
            find_new_name("data.csv", &["data.csv", "data.csv (1)"]),
            "data.csv (2)"
        );
    }
}
