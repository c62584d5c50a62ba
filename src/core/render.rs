use crate::core::rule::ResolvedRule;

/// Serialize rules to robots.txt text: one `Directive: value` line per rule,
/// values trimmed, newline separated, no trailing newline.
pub fn render(rules: &[ResolvedRule]) -> String {
    rules
        .iter()
        .map(|rule| format!("{}: {}", rule.directive.name(), rule.value.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
