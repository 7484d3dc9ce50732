//! Static reference extraction from transform text
//!
//! Handles templated references like `{{ ref('orders') }}` and infers column
//! names from `SELECT ... FROM` projection lists. This is a lexical scan, not
//! a grammar: dynamically built references are invisible to it.

use assetgraph_core::{Diagnostic, DiagnosticCode};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{.*?\}\}").unwrap());
static STATEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{%.*?%\}|\{#.*?#\}").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--[^\n]*").unwrap());
static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static STRING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());
static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\sas\s+"?([A-Za-z_][A-Za-z0-9_]*)"?\s*$"#).unwrap()
});
static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"?[A-Za-z_][A-Za-z0-9_]*"?\.)*"?([A-Za-z_][A-Za-z0-9_]*)"?$"#).unwrap()
});

/// Stand-in for a template expression once the text is stripped
const TEMPLATE_PLACEHOLDER: &str = "__template__";

/// Bare words that look like columns but are not
const NON_COLUMNS: &[&str] = &["null", "true", "false", "distinct", TEMPLATE_PLACEHOLDER];

/// Result of scanning one transform body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Upstream asset ids referenced by the transform
    pub dependencies: BTreeSet<String>,

    /// Column names in order of first appearance (uncapped)
    pub columns: Vec<String>,

    /// Non-fatal findings about the scan
    pub warnings: Vec<Diagnostic>,
}

/// Pluggable strategy for finding references in transform text.
///
/// Implementations must never fail: unreadable input degrades to an empty
/// extraction plus warnings.
pub trait ReferenceExtractor: Send + Sync {
    fn extract(&self, transform: &str) -> Extraction;
}

/// Template/keyword scanner for `{{ ref('...') }}` references and projection lists
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalExtractor;

impl LexicalExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract referenced asset ids from all `{{ }}` blocks
    ///
    /// Returns the references and whether an unterminated `{{` was found.
    pub fn references(text: &str) -> (BTreeSet<String>, bool) {
        let mut references = BTreeSet::new();

        let mut start = 0;
        while let Some(open) = text[start..].find("{{") {
            let open_pos = start + open;
            let Some(close) = text[open_pos..].find("}}") else {
                return (references, true);
            };
            let close_pos = open_pos + close;
            let content = text[open_pos + 2..close_pos].trim();

            if let Some(id) = Self::parse_ref(content) {
                references.insert(id.to_string());
            }

            start = close_pos + 2;
        }

        (references, false)
    }

    /// Parse ref() function
    ///
    /// Examples:
    /// - ref('orders')
    /// - ref("orders")
    fn parse_ref(content: &str) -> Option<&str> {
        let inner = content
            .strip_prefix("ref")?
            .trim_start()
            .strip_prefix('(')?
            .strip_suffix(')')?;

        Self::extract_string_literal(inner).filter(|id| !id.is_empty())
    }

    /// Extract string literal from quoted string
    ///
    /// Handles both single and double quotes.
    fn extract_string_literal(s: &str) -> Option<&str> {
        let trimmed = s.trim();

        if let Some(content) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            return Some(content.trim());
        }

        if let Some(content) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return Some(content.trim());
        }

        None
    }

    /// Infer column names from every projection list in the text
    pub fn columns(text: &str) -> Vec<String> {
        let stripped = Self::strip_noise(text);
        let mut seen = BTreeSet::new();
        let mut columns = Vec::new();

        for projection in projection_lists(&stripped) {
            for item in split_top_level(projection) {
                if let Some(name) = column_name(item) {
                    if seen.insert(name.to_ascii_lowercase()) {
                        columns.push(name.to_string());
                    }
                }
            }
        }

        columns
    }

    /// Remove templates, comments and string literals so keywords scan cleanly
    fn strip_noise(text: &str) -> String {
        let text = TEMPLATE_RE.replace_all(text, format!(" {} ", TEMPLATE_PLACEHOLDER));
        let text = STATEMENT_RE.replace_all(&text, " ");
        let text = BLOCK_COMMENT_RE.replace_all(&text, " ");
        let text = LINE_COMMENT_RE.replace_all(&text, " ");
        STRING_RE.replace_all(&text, "''").into_owned()
    }
}

impl ReferenceExtractor for LexicalExtractor {
    fn extract(&self, transform: &str) -> Extraction {
        let mut warnings = Vec::new();

        let (dependencies, unterminated) = Self::references(transform);
        if unterminated {
            warnings.push(Diagnostic::warn(
                DiagnosticCode::UnterminatedTemplate,
                "transform contains an unterminated '{{' template expression; later references were not scanned",
            ));
        }

        Extraction {
            dependencies,
            columns: Self::columns(transform),
            warnings,
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether `keyword` starts at `pos` as a whole word. `lower` must be ASCII-lowercased.
fn keyword_at(lower: &str, pos: usize, keyword: &str) -> bool {
    let bytes = lower.as_bytes();
    let end = pos + keyword.len();
    bytes[pos..].starts_with(keyword.as_bytes())
        && (pos == 0 || !is_ident_byte(bytes[pos - 1]))
        && (end >= bytes.len() || !is_ident_byte(bytes[end]))
}

/// Slices between each `SELECT` and the `FROM` at the same nesting depth
fn projection_lists(sql: &str) -> Vec<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `sql`
    let lower = sql.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut lists = Vec::new();

    let mut pos = 0;
    while pos < bytes.len() {
        if !keyword_at(&lower, pos, "select") {
            pos += 1;
            continue;
        }

        let body_start = pos + "select".len();
        let mut depth = 0usize;
        let mut end = bytes.len();
        let mut i = body_start;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' if depth == 0 => {
                    end = i;
                    break;
                }
                b')' => depth -= 1,
                b'f' if depth == 0 && keyword_at(&lower, i, "from") => {
                    end = i;
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        lists.push(&sql[body_start..end]);
        pos = body_start;
    }

    lists
}

/// Split a projection list on commas outside parentheses
fn split_top_level(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);

    items.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// `text` without an ASCII-case-insensitive `prefix`; never splits a character
fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .and_then(|_| text.get(prefix.len()..))
}

/// Output column name of one projection item, if statically visible
fn column_name(item: &str) -> Option<&str> {
    let mut item = item.trim();
    for modifier in ["distinct ", "all "] {
        if let Some(rest) = strip_prefix_ignore_ascii_case(item, modifier) {
            item = rest.trim_start();
        }
    }

    if item == "*" || item.ends_with(".*") {
        return None;
    }

    let name = ALIAS_RE
        .captures(item)
        .or_else(|| COLUMN_RE.captures(item))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())?;

    if NON_COLUMNS.iter().any(|word| word.eq_ignore_ascii_case(name)) {
        return None;
    }

    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deps(text: &str) -> Vec<String> {
        LexicalExtractor::references(text).0.into_iter().collect()
    }

    #[test]
    fn extract_ref_quotes_and_spacing() {
        let sql = r#"
            SELECT * FROM {{ ref('orders') }}
            JOIN {{ref("customers")}} USING (customer_id)
            JOIN {{   ref( 'orders' )   }} o2 ON true
        "#;

        assert_eq!(deps(sql), vec!["customers", "orders"]);
    }

    #[test]
    fn source_placeholder_is_not_a_dependency() {
        assert!(deps("SELECT * FROM {{ source }}").is_empty());
        assert!(deps("SELECT {{ var('x') }} FROM t").is_empty());
    }

    #[test]
    fn unterminated_template_stops_scan_with_warning() {
        let sql = "SELECT * FROM {{ ref('a') }} JOIN {{ ref('b') ";
        let extraction = LexicalExtractor.extract(sql);

        assert_eq!(extraction.dependencies.into_iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(extraction.warnings.len(), 1);
        assert_eq!(extraction.warnings[0].code, DiagnosticCode::UnterminatedTemplate);
    }

    #[test]
    fn columns_from_projection() {
        let sql = "SELECT o.order_id, customer_id AS buyer, SUM(amount) AS total, amount * 2, 'x' AS label FROM {{ ref('orders') }} o";
        assert_eq!(
            LexicalExtractor::columns(sql),
            vec!["order_id", "buyer", "total", "label"]
        );
    }

    #[test]
    fn columns_skip_wildcards_and_literals() {
        let sql = "SELECT DISTINCT *, t.*, NULL, 42, id FROM t";
        assert_eq!(LexicalExtractor::columns(sql), vec!["id"]);
    }

    #[test]
    fn columns_from_nested_selects_are_deduplicated() {
        let sql = r#"
            WITH base AS (SELECT id, name FROM {{ ref('users') }})
            SELECT id, (SELECT max(ts) FROM events e WHERE e.user_id = id) AS last_seen, name
            FROM base
        "#;

        assert_eq!(LexicalExtractor::columns(sql), vec!["id", "name", "last_seen"]);
    }

    #[test]
    fn columns_ignore_comments_and_strings() {
        let sql = "SELECT -- from here\n  a, /* select b from */ c AS \"Total\", 'from' AS kind FROM t";
        assert_eq!(LexicalExtractor::columns(sql), vec!["a", "Total", "kind"]);
    }

    #[test]
    fn malformed_text_degrades_to_empty() {
        let extraction = LexicalExtractor.extract("this is (((not sql at all");
        assert!(extraction.dependencies.is_empty());
        assert!(extraction.columns.is_empty());
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn non_ascii_text_is_safe() {
        let sql = "SELECT prénom AS first_name, naïve FROM {{ ref('personnes') }}";
        let extraction = LexicalExtractor.extract(sql);

        assert_eq!(extraction.columns, vec!["first_name"]);
        assert_eq!(extraction.dependencies.len(), 1);
    }

    #[test]
    fn multibyte_identifiers_near_modifier_offsets() {
        // "café" puts a character boundary inside the length of "all "
        let extraction = LexicalExtractor.extract("SELECT café FROM t");
        assert!(extraction.columns.is_empty());

        for sql in [
            "SELECT café, id FROM t",
            "SELECT ALL café AS cafe FROM t",
            "SELECT distincté, naïveté AS n FROM t",
            "SELECT éé FROM {{ ref('ü') }}",
        ] {
            let extraction = LexicalExtractor.extract(sql);
            assert!(extraction.warnings.is_empty(), "{}", sql);
        }

        assert_eq!(LexicalExtractor::columns("SELECT café, id FROM t"), vec!["id"]);
        assert_eq!(LexicalExtractor::columns("SELECT ALL café AS cafe FROM t"), vec!["cafe"]);
    }

    #[test]
    fn modifier_prefix_is_case_insensitive() {
        assert_eq!(strip_prefix_ignore_ascii_case("DISTINCT id", "distinct "), Some("id"));
        assert_eq!(strip_prefix_ignore_ascii_case("café", "all "), None);
        assert_eq!(strip_prefix_ignore_ascii_case("al", "all "), None);
    }
}
