//! Text rendering utilities for human-friendly diagnostics.
//!
//! Formats cycle chains, "did you mean?" suggestions and the indented
//! trees used when printing runtime snapshots.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use mawrid_support::rendering::render_chain;
///
/// let chain = vec!["UserService", "UserRepo", "Database", "UserService"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "UserService → UserRepo → Database → UserService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// One line of an indented tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    /// Nesting level, `0` for roots.
    pub depth: usize,
    /// Main text of the line.
    pub label: String,
    /// Optional trailing annotation, rendered in parentheses.
    pub detail: Option<String>,
}

impl TreeLine {
    pub fn new(depth: usize, label: impl Into<String>) -> Self {
        Self {
            depth,
            label: label.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Renders tree lines with two spaces of indentation per level.
///
/// ```text
/// container (active)
///   singleton Logger  (#0)
///   scope-1 (active)
///     scoped RequestContext  (#0)
/// ```
pub fn render_tree(lines: &[TreeLine]) -> String {
    let mut result = String::new();

    for line in lines {
        result.push_str(&"  ".repeat(line.depth));
        result.push_str(&line.label);

        if let Some(ref detail) = line.detail {
            result.push_str(&format!("  ({detail})"));
        }

        result.push('\n');
    }

    result
}

/// Suggests registered names that look like `requested`.
///
/// Substring matches rank first, then long common prefixes, then
/// near-misses caught by [`is_close`].
///
/// ```
/// use mawrid_support::rendering::suggest_similar;
///
/// let available = ["UserService", "Logger", "Database"];
/// assert_eq!(suggest_similar("UserServise", &available, 3), vec!["UserService"]);
/// ```
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();

            if name_lower == requested_lower {
                return None;
            }

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            if is_close(&requested_lower, &name_lower) {
                return Some((name, 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Quick "close enough" check: lengths within 3 and at least 60% of
/// positions equal. Not a full edit distance.
pub fn is_close(a: &str, b: &str) -> bool {
    let len_diff = a.len().abs_diff(b.len());
    if len_diff > 3 {
        return false;
    }

    let common: usize = a
        .chars()
        .zip(b.chars())
        .filter(|(ca, cb)| ca == cb)
        .count();

    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return true;
    }

    common * 100 / max_len >= 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["A", "B", "C", "A"];
        assert_eq!(render_chain(&chain), "A → B → C → A");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn render_owned_strings() {
        let chain = vec![String::from("Logger"), String::from("Logger")];
        assert_eq!(render_chain(&chain), "Logger → Logger");
    }

    #[test]
    fn suggest_typo() {
        let available = vec!["UserService", "UserRepository", "Logger", "Database"];

        let suggestions = suggest_similar("UserServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0], "UserService");
    }

    #[test]
    fn suggest_skips_exact_name() {
        let available = vec!["Logger"];
        assert!(suggest_similar("Logger", &available, 3).is_empty());
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["Database"];
        assert!(suggest_similar("XyzAbcDef", &available, 3).is_empty());
    }

    #[test]
    fn suggest_respects_limit() {
        let available = vec!["CacheA", "CacheB", "CacheC"];
        assert_eq!(suggest_similar("Cache", &available, 2).len(), 2);
    }

    #[test]
    fn close_check() {
        assert!(is_close("userservice", "userservise"));
        assert!(is_close("database", "databse"));
        assert!(!is_close("database", "logger"));
    }

    #[test]
    fn tree_rendering() {
        let lines = vec![
            TreeLine::new(0, "container").with_detail("active"),
            TreeLine::new(1, "singleton Logger"),
            TreeLine::new(1, "scope-1"),
            TreeLine::new(2, "scoped RequestContext").with_detail("#0"),
        ];

        let rendered = render_tree(&lines);
        assert_eq!(
            rendered,
            "container  (active)\n  singleton Logger\n  scope-1\n    scoped RequestContext  (#0)\n"
        );
    }
}
