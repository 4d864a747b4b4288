//! Minimal comma-separated record handling shared by the catalog loader and
//! the rating-log export. Records are single-line; quoted fields may contain
//! commas and doubled quotes.

/// Quote a field when it contains a delimiter, quote or line break.
pub fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one record line (no trailing newline).
pub fn join_record<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| quote_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split one record line into fields.
///
/// Returns `None` when a quoted field is left unterminated.
pub fn split_record(line: &str) -> Option<Vec<String>> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(current);
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        assert_eq!(
            split_record("1,Toy Story (1995),Adventure|Animation").unwrap(),
            vec!["1", "Toy Story (1995)", "Adventure|Animation"]
        );
    }

    #[test]
    fn test_quoted_comma() {
        let fields = split_record("11,\"American President, The (1995)\",Comedy").unwrap();
        assert_eq!(fields[1], "American President, The (1995)");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_escaped_quotes_survive_join_and_split() {
        let title = "The \"Best\" Movie, Part 2";
        let line = join_record(&["3", title, "4"]);
        assert_eq!(line, "3,\"The \"\"Best\"\" Movie, Part 2\",4");
        assert_eq!(split_record(&line).unwrap(), vec!["3", title, "4"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(split_record("1,\"open").is_none());
    }

    #[test]
    fn test_crlf_and_empty_fields() {
        assert_eq!(split_record("a,,b\r").unwrap(), vec!["a", "", "b"]);
    }
}
