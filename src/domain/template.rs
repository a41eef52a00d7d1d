//! `{field}` interpolation for tag formats, tag regexes, markers and messages
//!
//! Only identifier-shaped brace groups are fields. `{{` and `}}` render a
//! single brace, and anything else in braces (such as the `{2,3}` quantifier
//! of a regex) is kept verbatim.

use crate::error::{PolyversError, Result};

#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Literal(&'a str),
    Field(&'a str),
}

fn identifier_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
            1 + bytes[1..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count()
        }
        _ => 0,
    }
}

fn pieces(template: &str) -> Vec<Piece<'_>> {
    let bytes = template.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                out.push(Piece::Literal(&template[start..=i]));
                i += 2;
                start = i;
            }
            b'{' => {
                let len = identifier_len(&bytes[i + 1..]);
                if len > 0 && bytes.get(i + 1 + len) == Some(&b'}') {
                    out.push(Piece::Literal(&template[start..i]));
                    out.push(Piece::Field(&template[i + 1..i + 1 + len]));
                    i += len + 2;
                    start = i;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out.push(Piece::Literal(&template[start..]));
    out
}

/// Field names referenced by `template`, in order of appearance
pub fn fields(template: &str) -> Vec<&str> {
    pieces(template)
        .into_iter()
        .filter_map(|p| match p {
            Piece::Field(name) => Some(name),
            Piece::Literal(_) => None,
        })
        .collect()
}

/// Reject templates referencing fields outside `allowed`.
pub fn check_fields(template: &str, allowed: &[&str]) -> Result<()> {
    match fields(template).into_iter().find(|f| !allowed.contains(f)) {
        Some(unknown) => Err(PolyversError::template(
            template,
            format!(
                "unknown field '{{{}}}', expected one of: {}",
                unknown,
                allowed.join(", ")
            ),
        )),
        None => Ok(()),
    }
}

/// Render `template`; fields without a value are kept as written.
///
/// Callers validate templates with [`check_fields`] when loading them.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    for piece in pieces(template) {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Field(name) => match values.iter().find(|(k, _)| *k == name) {
                Some((_, value)) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fields() {
        let out = render(
            "{pname}-{vprefix}{version}",
            &[("pname", "foo"), ("vprefix", "v"), ("version", "1.0")],
        );
        assert_eq!(out, "foo-v1.0");
    }

    #[test]
    fn test_render_keeps_quantifiers_and_escapes() {
        let out = render(r"^{pname}\d{2,3}{{x}}", &[("pname", "p")]);
        assert_eq!(out, r"^p\d{2,3}{x}");
    }

    #[test]
    fn test_render_leaves_missing_fields() {
        assert_eq!(render("{a}-{b}", &[("a", "1")]), "1-{b}");
    }

    #[test]
    fn test_fields_in_order() {
        assert_eq!(
            fields("{vprefix}{version} {x{2}} {_y1}"),
            vec!["vprefix", "version", "_y1"]
        );
    }

    #[test]
    fn test_check_fields_rejects_unknown() {
        assert!(check_fields("{pname}-{version}", &["pname", "version"]).is_ok());
        let err = check_fields("{pname}-{build}", &["pname", "version"]).unwrap_err();
        assert!(err.to_string().contains("{build}"));
    }

    #[test]
    fn test_unterminated_brace_is_literal() {
        assert_eq!(render("{pname", &[("pname", "x")]), "{pname");
        assert!(fields("{pname").is_empty());
    }
}
