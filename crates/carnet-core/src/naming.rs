//! Default-name generation for folders and notes.
//!
//! When a create request arrives without a name, the stores fall back to a
//! fixed base ("New Folder" / "New Note") and suffix it with the smallest
//! counter that clears every sibling already using that base.

use regex::Regex;

/// Base used when a folder is created without a name.
pub const DEFAULT_FOLDER_BASE: &str = "New Folder";

/// Base used when a note is created without a title.
pub const DEFAULT_NOTE_BASE: &str = "New Note";

/// Picks the first free name derived from `base` among `siblings`.
///
/// A sibling counts as occupying the base when it is exactly `base` or
/// `base N` for a decimal N; the bare form occupies slot 1. If nothing
/// occupies the base, the bare base is returned; otherwise the result is
/// `base (max occupied + 1)`. Gaps below the maximum are not reused, so
/// deleting "New Note 2" while "New Note 5" exists still yields
/// "New Note 6".
pub fn next_available_name<S: AsRef<str>>(base: &str, siblings: &[S]) -> String {
    let pattern = Regex::new(&format!(r"^{}(?: (\d+))?$", regex::escape(base))).unwrap();

    let mut max_index: u64 = 0;
    let mut found = false;
    for sibling in siblings {
        if let Some(caps) = pattern.captures(sibling.as_ref()) {
            found = true;
            let index = match caps.get(1) {
                Some(m) => m.as_str().parse::<u64>().unwrap_or(0),
                None => 1,
            };
            if index > max_index {
                max_index = index;
            }
        }
    }

    if !found {
        base.to_string()
    } else {
        format!("{} {}", base, max_index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_siblings_returns_bare_base() {
        let siblings: Vec<String> = vec![];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note");
    }

    #[test]
    fn test_unrelated_siblings_ignored() {
        let siblings = ["Groceries", "Meeting notes"];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note");
    }

    #[test]
    fn test_bare_base_occupies_slot_one() {
        let siblings = ["New Note"];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note 2");
    }

    #[test]
    fn test_counts_past_highest_suffix() {
        let siblings = ["New Note", "New Note 2"];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note 3");
    }

    #[test]
    fn test_gaps_are_not_reused() {
        let siblings = ["New Note 5"];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note 6");
    }

    #[test]
    fn test_prefix_with_extra_words_does_not_count() {
        let siblings = ["New Note ideas", "New Note 2 final"];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note");
    }

    #[test]
    fn test_folder_base() {
        let siblings = ["New Folder", "New Folder 3"];
        assert_eq!(
            next_available_name(DEFAULT_FOLDER_BASE, &siblings),
            "New Folder 4"
        );
    }

    #[test]
    fn test_base_with_regex_metacharacters() {
        let siblings = ["Q+A (draft)", "Q+A (draft) 2"];
        assert_eq!(next_available_name("Q+A (draft)", &siblings), "Q+A (draft) 3");
    }

    #[test]
    fn test_non_decimal_suffix_ignored() {
        let siblings = ["New Note two"];
        assert_eq!(next_available_name(DEFAULT_NOTE_BASE, &siblings), "New Note");
    }
}
