/// Escape a string for double-quoted output.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    escape_into(&mut out, s);
    out
}

pub fn escape_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            _ => out.push(ch),
        }
    }
}

/// Whether `s` is a bare identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_ident(s: &str) -> bool {
    let bytes = s.as_bytes();
    let Some(&first) = bytes.first() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != b'_' {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

/// Render a key as a path segment: bare when it is a plain identifier,
/// quoted otherwise (`users`, `"my key"`).
pub fn path_segment(key: &str) -> String {
    if is_valid_ident(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape(key))
    }
}

/// Append `segment` to `path` with a dot separator, handling the empty root.
pub fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        path_segment(key)
    } else {
        format!("{path}.{}", path_segment(key))
    }
}

pub fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_escape_round_trip_set() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a\"b"), "a\\\"b");
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape("\u{0008}\u{000C}"), "\\b\\f");
    }

    #[rstest::rstest]
    fn test_is_valid_ident() {
        assert!(is_valid_ident("user_name"));
        assert!(is_valid_ident("_x9"));
        assert!(!is_valid_ident(""));
        assert!(!is_valid_ident("9lives"));
        assert!(!is_valid_ident("has space"));
        assert!(!is_valid_ident("dash-ed"));
    }

    #[rstest::rstest]
    fn test_path_building() {
        assert_eq!(join_path("", "users"), "users");
        assert_eq!(join_path("users", "name"), "users.name");
        assert_eq!(join_path("config", "my key"), "config.\"my key\"");
        assert_eq!(index_path("users", 1), "users[1]");
        assert_eq!(join_path(&index_path("users", 1), "zip"), "users[1].zip");
    }
}
