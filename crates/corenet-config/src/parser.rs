// Path: crates/corenet-config/src/parser.rs
//! The INI-like grammar: `[section]` headers, `key = value` assignments,
//! `#`-comments, and arrays that may span multiple lines.

use corenet_types::ConfigValue;

/// Parses one file's contents into an ordered list of
/// `(section, key, Some(value) | None)` entries. `None` marks a removal
/// (`key =` with nothing after the `=`, or an empty array).
pub fn parse(contents: &str) -> Vec<(String, String, Option<ConfigValue>)> {
    let mut out = Vec::new();
    let mut section = String::new();
    let mut pending_array: Option<(String, String, Vec<String>)> = None;

    for raw_line in contents.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() && pending_array.is_none() {
            continue;
        }

        if let Some((sect, key, mut items)) = pending_array.take() {
            let closed = line.contains(']');
            let body = line.trim_end_matches(']');
            items.extend(
                body.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            );
            if closed {
                if items.is_empty() {
                    out.push((sect, key, None));
                } else {
                    out.push((sect, key, Some(ConfigValue::Array(items))));
                }
            } else {
                pending_array = Some((sect, key, items));
            }
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') && !line.contains('=') {
            section = line[1..line.len() - 1].to_string();
            continue;
        }

        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim().replace('-', "_");
            let value_str = line[eq_pos + 1..].trim();

            if value_str.is_empty() {
                out.push((section.clone(), key, None));
                continue;
            }

            if value_str.starts_with('[') {
                let closed = value_str.ends_with(']');
                let body = value_str.trim_start_matches('[').trim_end_matches(']');
                let items: Vec<String> = body
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if closed {
                    if items.is_empty() {
                        out.push((section.clone(), key, None));
                    } else {
                        out.push((section.clone(), key, Some(ConfigValue::Array(items))));
                    }
                } else {
                    pending_array = Some((section.clone(), key, items));
                }
                continue;
            }

            out.push((section.clone(), key, Some(ConfigValue::parse(value_str))));
        }
    }

    out
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_assignment() {
        let entries = parse("[general]\ndebug-config = true\n");
        assert_eq!(
            entries,
            vec![(
                "general".to_string(),
                "debug_config".to_string(),
                Some(ConfigValue::Bool(true))
            )]
        );
    }

    #[test]
    fn bare_key_removes() {
        let entries = parse("[s]\nk =\n");
        assert_eq!(entries, vec![("s".to_string(), "k".to_string(), None)]);
    }

    #[test]
    fn multiline_array() {
        let entries = parse("[s]\nk = [a,\nb,\nc]\n");
        assert_eq!(
            entries,
            vec![(
                "s".to_string(),
                "k".to_string(),
                Some(ConfigValue::Array(vec!["a".into(), "b".into(), "c".into()]))
            )]
        );
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let entries = parse("# comment\n[s]\n\nk = 1 # trailing comment\n");
        assert_eq!(
            entries,
            vec![("s".to_string(), "k".to_string(), Some(ConfigValue::Int(1)))]
        );
    }
}
