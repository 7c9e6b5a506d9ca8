//! Line-level diff for incremental summary updates.

use std::collections::HashSet;

/// Lines present in `new` but not in `old`, concatenated in `new`'s
/// order. Membership is set-based: moved or duplicated lines that
/// already existed anywhere in `old` are not additions.
pub fn compute_diff(old: &str, new: &str) -> String {
    if old.is_empty() {
        return new.to_string();
    }

    let old_lines: HashSet<&str> = old.lines().collect();

    let added: Vec<&str> = new
        .lines()
        .filter(|line| !old_lines.contains(line))
        .collect();

    added.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_lines_in_new_order() {
        let old = "alpha\nbeta";
        let new = "alpha\ngamma\nbeta\ndelta";
        assert_eq!(compute_diff(old, new), "gamma\ndelta");
    }

    #[test]
    fn test_empty_old_returns_new() {
        assert_eq!(compute_diff("", "a\nb"), "a\nb");
    }

    #[test]
    fn test_empty_new_returns_empty() {
        assert_eq!(compute_diff("a\nb", ""), "");
    }

    #[test]
    fn test_identical_content_is_empty() {
        assert_eq!(compute_diff("a\nb", "a\nb"), "");
    }

    #[test]
    fn test_moved_lines_are_not_additions() {
        assert_eq!(compute_diff("a\nb", "b\na"), "");
    }

    #[test]
    fn test_duplicated_existing_line_is_not_addition() {
        assert_eq!(compute_diff("a", "a\na"), "");
    }

    #[test]
    fn test_removed_lines_ignored() {
        assert_eq!(compute_diff("a\nb\nc", "a\nd"), "d");
    }
}
