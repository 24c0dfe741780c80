//! FM-002: Markup reader, raw specification text to an element tree.
//!
//! Reads the XML subset specification documents are written in:
//! declaration, comments, processing instructions and DOCTYPE (skipped),
//! elements, quoted attributes, text, CDATA, predefined entities and numeric
//! character references. No namespaces, no DTD expansion.
//!
//! ```text
//! Source → markup::parse_document → Element tree → parser::normalize → FeatureDefinition
//! ```

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    error::{context, ContextError, ErrorKind, ParseError as NomParseError, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

/// One element of a parsed document.
///
/// Children are kept in document order, so a repeatable slot is always a
/// list, even when exactly one instance is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Element>,
    /// Concatenated text and CDATA content, entities decoded, untrimmed
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete document and return its root element.
pub fn parse_document(input: &str) -> Result<Element, String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    if input.trim().is_empty() {
        return Err("document is empty".to_string());
    }
    match all_consuming(document::<VerboseError<&str>>)(input) {
        Ok((_, root)) => Ok(root),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("incomplete input".to_string()),
    }
}

// ============================================================================
// Internal parsers
// ============================================================================

enum Node {
    Element(Element),
    Text(String),
    Skip,
}

fn document<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Element, E> {
    let (input, _) = misc(input)?;
    let (input, root) = context("root element", element)(input)?;
    let (input, _) = misc(input)?;
    Ok((input, root))
}

/// Whitespace, comments, declarations and DOCTYPE outside the root.
fn misc<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, (), E> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), comment),
            value((), processing_instruction),
            value((), doctype),
        ))),
    )(input)
}

fn comment<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    preceded(
        tag("<!--"),
        cut(context("comment end", terminated(take_until("-->"), tag("-->")))),
    )(input)
}

fn processing_instruction<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    preceded(
        tag("<?"),
        cut(context(
            "processing instruction end",
            terminated(take_until("?>"), tag("?>")),
        )),
    )(input)
}

fn doctype<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    preceded(
        tag("<!DOCTYPE"),
        cut(context("DOCTYPE end", terminated(take_until(">"), char('>')))),
    )(input)
}

fn cdata<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    preceded(
        tag("<![CDATA["),
        cut(context("CDATA end", terminated(take_until("]]>"), tag("]]>")))),
    )(input)
}

fn name<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')),
    ))(input)
}

fn attribute<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, (String, String), E> {
    let (input, _) = multispace1(input)?;
    let (input, key) = name(input)?;
    let (input, _) = delimited(multispace0, char('='), multispace0)(input)?;
    let (input, raw) = cut(context(
        "quoted attribute value",
        alt((
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        )),
    ))(input)?;
    Ok((input, (key.to_string(), unescape(raw))))
}

fn element<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Element, E> {
    let (input, _) = char('<')(input)?;
    let (input, open) = name(input)?;
    let (input, attributes) = many0(attribute)(input)?;
    let (input, _) = multispace0(input)?;

    let mut el = Element::new(open);
    el.attributes = attributes.into_iter().collect();

    let (input, self_closing) = opt(tag("/>"))(input)?;
    if self_closing.is_some() {
        return Ok((input, el));
    }

    let (input, _) = cut(context("end of start tag", char('>')))(input)?;
    let (input, nodes) = many0(node)(input)?;
    for n in nodes {
        match n {
            Node::Element(child) => el.children.push(child),
            Node::Text(t) => el.text.push_str(&t),
            Node::Skip => {}
        }
    }

    let (input, _) = cut(context("closing tag", tag("</")))(input)?;
    let (rest, close) = cut(name)(input)?;
    if close != open {
        return Err(nom::Err::Failure(E::add_context(
            input,
            "matching closing tag",
            E::from_error_kind(input, ErrorKind::Verify),
        )));
    }
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = cut(context("end of closing tag", char('>')))(rest)?;
    Ok((rest, el))
}

fn node<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Node, E> {
    alt((
        map(comment, |_| Node::Skip),
        map(cdata, |s: &str| Node::Text(s.to_string())),
        map(processing_instruction, |_| Node::Skip),
        map(element, Node::Element),
        map(take_while1(|c: char| c != '<'), |s: &str| Node::Text(unescape(s))),
    ))(input)
}

// ============================================================================
// Entities
// ============================================================================

/// Decode predefined entities and numeric character references.
/// Unknown entities are kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail
            .find(';')
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
