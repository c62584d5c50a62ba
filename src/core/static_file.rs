use crate::core::rule::{RuleItem, RuleValue};

/// Parse the contents of a hand-written robots.txt into single-entry items.
///
/// Each non-empty line is split on its first colon. The key is kept verbatim
/// and the remainder becomes a literal value, untrimmed (rendering trims it).
/// Lines without a colon or with nothing before it are skipped. Keys are not
/// checked here: unknown ones, including `#` comments, fall out during
/// resolution.
pub fn parse_static_file(content: &str) -> Vec<RuleItem> {
    content
        .split('\n')
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.is_empty() {
                return None;
            }
            Some(RuleItem::new().with(key, RuleValue::Literal(value.to_string())))
        })
        .collect()
}
