//! Inline `style` attribute parsing.

/// Split a declaration block into `(property, value)` pairs.
///
/// Semicolons inside quotes or parentheses (`url("data:...;base64,...")`)
/// do not end a declaration.
pub fn parse_declarations(css: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in css.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push_declaration(&css[start..i], &mut out);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_declaration(&css[start..], &mut out);
    out
}

fn push_declaration(chunk: &str, out: &mut Vec<(String, String)>) {
    let Some((property, value)) = chunk.split_once(':') else {
        return;
    };
    let property = property.trim();
    let value = value.trim();
    if property.is_empty() || value.is_empty() {
        return;
    }
    out.push((property.to_ascii_lowercase(), value.to_string()));
}

/// Inverse of [`parse_declarations`], in the `prop: value;` form browsers emit
pub fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{}: {};", property, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_block() {
        let decls = parse_declarations("color: red; Font-Size : 12px ;;");
        assert_eq!(
            decls,
            vec![
                ("color".to_string(), "red".to_string()),
                ("font-size".to_string(), "12px".to_string()),
            ]
        );
    }

    #[test]
    fn test_semicolon_inside_url_is_kept() {
        let decls = parse_declarations("background: url(\"data:image/png;base64,AA\"); opacity: 1");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].1, "url(\"data:image/png;base64,AA\")");
    }

    #[test]
    fn test_colon_in_value() {
        let decls = parse_declarations("background-image: url(https://x.test/a.png)");
        assert_eq!(decls[0].1, "url(https://x.test/a.png)");
    }

    #[test]
    fn test_serialize_block() {
        let decls = vec![
            ("opacity".to_string(), "0.7".to_string()),
            ("cursor".to_string(), "grab".to_string()),
        ];
        assert_eq!(serialize_declarations(&decls), "opacity: 0.7; cursor: grab;");
    }
}
