// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use thiserror::Error;

/// Errors which can happen when parsing a replacement [`Template`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template never references the captured group
    #[error("the template does not contain a `$1` placeholder")]
    MissingPlaceholder,

    /// The template references the captured group more than once
    #[error("the template contains {count} placeholders, expected exactly one")]
    TooManyPlaceholders {
        /// How many placeholders were found
        count: usize,
    },

    /// The template references something else than the first group
    #[error(
        "unsupported reference `{reference}` at byte {position}, only `$1` (or `${{1}}`) is available"
    )]
    UnsupportedReference {
        /// The name or index which was referenced
        reference: String,

        /// Byte offset of the `$` in the template
        position: usize,
    },

    /// A `${` was never closed
    #[error("unterminated `${{` at byte {position}")]
    Unterminated {
        /// Byte offset of the `$` in the template
        position: usize,
    },

    /// The template ends with a lone `$`
    #[error("dangling `$` at the end of the template, use `$$` for a literal dollar sign")]
    TrailingDollar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture,
}

/// A replacement path template with a single placeholder for the captured
/// part of the specifier.
///
/// The placeholder is written `$1` or `${1}`, and `$$` stands for a literal
/// `$`. Note that `$1ts` is read as a reference to a group named `1ts`, so
/// `${1}ts` must be used when the placeholder is directly followed by a
/// letter, a digit or an underscore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Template {
    /// Parse a replacement template
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not contain exactly one `$1`
    /// placeholder, or if it contains any other `$` reference.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut placeholders = 0;
        let mut chars = source.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            if c != '$' {
                literal.push(c);
                continue;
            }

            let reference = match chars.peek().copied() {
                None => return Err(TemplateError::TrailingDollar),

                Some((_, '$')) => {
                    chars.next();
                    literal.push('$');
                    continue;
                }

                Some((_, '{')) => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::Unterminated { position }),
                        }
                    }
                    name
                }

                Some((_, c)) if is_name_char(c) => {
                    let mut name = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if !is_name_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    name
                }

                // Something like `$/`, keep it as-is
                Some(_) => {
                    literal.push('$');
                    continue;
                }
            };

            if reference != "1" {
                return Err(TemplateError::UnsupportedReference {
                    reference,
                    position,
                });
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Capture);
            placeholders += 1;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        match placeholders {
            0 => Err(TemplateError::MissingPlaceholder),
            1 => Ok(Self {
                source: source.to_owned(),
                segments,
            }),
            count => Err(TemplateError::TooManyPlaceholders { count }),
        }
    }

    /// The template as it was written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The literal text before the placeholder
    #[must_use]
    pub fn prefix(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Literal(literal)) => literal,
            _ => "",
        }
    }

    /// Substitute the captured value into the template.
    ///
    /// The value is inserted verbatim, without any escaping or path
    /// normalization.
    #[must_use]
    pub fn expand(&self, capture: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + capture.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Capture => out.push_str(capture),
            }
        }
        out
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_simple_placeholder() {
        let template = Template::parse("../shared/src/$1.ts").unwrap();
        assert_eq!(template.expand("foo"), "../shared/src/foo.ts");
        assert_eq!(template.expand("nested/bar"), "../shared/src/nested/bar.ts");
    }

    #[test]
    fn expand_braced_placeholder() {
        let template = Template::parse("src/${1}_impl.ts").unwrap();
        assert_eq!(template.expand("foo"), "src/foo_impl.ts");
    }

    #[test]
    fn placeholder_at_the_edges() {
        assert_eq!(Template::parse("$1").unwrap().expand("x"), "x");
        assert_eq!(Template::parse("$1.ts").unwrap().expand("x"), "x.ts");
        assert_eq!(Template::parse("lib/$1").unwrap().expand("x"), "lib/x");
    }

    #[test]
    fn capture_is_inserted_verbatim() {
        let template = Template::parse("src/$1.ts").unwrap();
        assert_eq!(template.expand("../../$1 ${x}"), "src/../../$1 ${x}.ts");
        assert_eq!(template.expand(""), "src/.ts");
    }

    #[test]
    fn escaped_dollar() {
        let template = Template::parse("$$root/$1").unwrap();
        assert_eq!(template.expand("a"), "$root/a");
    }

    #[test]
    fn dollar_before_punctuation_is_literal() {
        let template = Template::parse("a$/$1").unwrap();
        assert_eq!(template.expand("b"), "a$/b");
    }

    #[test]
    fn missing_placeholder() {
        assert_eq!(
            Template::parse("../shared/src/index.ts"),
            Err(TemplateError::MissingPlaceholder)
        );
        assert_eq!(
            Template::parse("$$1"),
            Err(TemplateError::MissingPlaceholder)
        );
    }

    #[test]
    fn too_many_placeholders() {
        assert_eq!(
            Template::parse("$1/$1.ts"),
            Err(TemplateError::TooManyPlaceholders { count: 2 })
        );
    }

    #[test]
    fn other_groups_are_rejected() {
        assert_eq!(
            Template::parse("src/$2.ts"),
            Err(TemplateError::UnsupportedReference {
                reference: "2".to_owned(),
                position: 4,
            })
        );
        assert_eq!(
            Template::parse("src/${name}.ts"),
            Err(TemplateError::UnsupportedReference {
                reference: "name".to_owned(),
                position: 4,
            })
        );
    }

    #[test]
    fn greedy_reference_names() {
        // `$1ts` is a reference to a group named `1ts`, not `$1` followed by `ts`
        assert_eq!(
            Template::parse("src/$1ts"),
            Err(TemplateError::UnsupportedReference {
                reference: "1ts".to_owned(),
                position: 4,
            })
        );
    }

    #[test]
    fn malformed_templates() {
        assert_eq!(
            Template::parse("src/$1/$"),
            Err(TemplateError::TrailingDollar)
        );
        assert_eq!(
            Template::parse("src/${1"),
            Err(TemplateError::Unterminated { position: 4 })
        );
    }

    #[test]
    fn literal_prefix() {
        let template = Template::parse("../shared/src/$1.ts").unwrap();
        assert_eq!(template.prefix(), "../shared/src/");
        assert_eq!(Template::parse("$$root/${1}.ts").unwrap().prefix(), "$root/");
        assert_eq!(Template::parse("$1.ts").unwrap().prefix(), "");
    }

    #[test]
    fn displays_as_written() {
        let template: Template = "../shared/src/${1}.ts".parse().unwrap();
        assert_eq!(template.to_string(), "../shared/src/${1}.ts");
        assert_eq!(template.as_str(), "../shared/src/${1}.ts");
    }
}
