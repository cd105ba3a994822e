use logos::{Lexer, Logos};

/// Markup tokens for arbitrary, unvalidated HTML.
///
/// Every input lexes: anything that is not well-formed markup falls back to
/// [`Token::Text`] or [`Token::Lt`], so the tree builder never sees an error.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// Comment body, without the `<!--` / `-->` delimiters
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    /// `<!DOCTYPE ...>` and other markup declarations
    #[regex(r"<![^>\-][^>]*>", |lex| lex.slice())]
    Declaration(&'src str),

    #[regex(r#"<[a-zA-Z][^\s/>]*(\s*("[^"]*"|'[^']*'|[^"'>\s]+))*\s*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"</[a-zA-Z][^\s>]*\s*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that does not open any markup
    #[token("<", |lex| lex.slice())]
    Lt(&'src str),
}

fn lex_comment<'src>(lex: &mut Lexer<'src, Token<'src>>) -> &'src str {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            let slice = lex.slice();
            &slice[4..slice.len() - 3]
        }
        None => {
            lex.bump(rest.len());
            &lex.slice()[4..]
        }
    }
}

/// Tokenize a complete source string
pub fn tokenize(source: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => tokens.push((Token::Text(lexer.slice()), span)),
        }
    }

    tokens
}

/// A start tag split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Split a `<tag a="1" b c=d>` slice into name, raw attribute values and the
/// self-closing flag. Attribute values are returned undecoded.
pub fn parse_start_tag(slice: &str) -> StartTag {
    let inner = slice
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(slice);

    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_string();

    let bytes = inner.as_bytes();
    let mut pos = name_end;
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    while pos < bytes.len() {
        let ch = bytes[pos];
        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if ch == b'/' {
            self_closing = inner[pos + 1..].trim().is_empty();
            pos += 1;
            continue;
        }

        let start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && bytes[pos] != b'='
            && bytes[pos] != b'/'
        {
            pos += 1;
        }
        let attr_name = &inner[start..pos];

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let mut value = String::new();
        if pos < bytes.len() && bytes[pos] == b'=' {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos < bytes.len() && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                let quote = bytes[pos];
                pos += 1;
                let value_start = pos;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += 1;
                }
                value = inner[value_start..pos].to_string();
                pos = (pos + 1).min(bytes.len());
            } else {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                value = inner[value_start..pos].to_string();
            }
        }

        if attr_name.is_empty() {
            continue;
        }
        // first occurrence wins, as in browsers
        if !attributes
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(attr_name))
        {
            attributes.push((attr_name.to_string(), value));
        }
    }

    StartTag {
        name,
        attributes,
        self_closing,
    }
}

/// Tag name of an end tag slice such as `</div >`
pub fn end_tag_name(slice: &str) -> &str {
    let inner = slice
        .strip_prefix("</")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(slice);
    inner.trim_end()
}

/// Doctype name from a declaration slice, if it is one
pub fn doctype_name(slice: &str) -> Option<String> {
    let inner = slice.strip_prefix("<!")?.strip_suffix('>')?;
    let keyword = inner.get(..7)?;
    if !keyword.eq_ignore_ascii_case("doctype") {
        return None;
    }
    let name = inner[7..].trim();
    Some(if name.is_empty() {
        "html".to_string()
    } else {
        name.to_string()
    })
}
