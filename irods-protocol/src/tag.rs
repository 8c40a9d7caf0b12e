//! Tag document model.
//!
//! Every request and response body is a tree of named nodes carrying either
//! a scalar value or an ordered list of children. The XML dialect is
//! restricted: no attributes, no self-closing elements, no prolog. Each
//! serialized element is followed by a newline.

use crate::error::ProtocolError;
use std::fmt;

const OPEN_END_TAG: &str = "</";

/// Content of a tag: a scalar value or child tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagContent {
    Value(String),
    Children(Vec<Tag>),
}

/// A named node in a protocol document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    content: TagContent,
}

impl Tag {
    /// Creates a tag with no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: TagContent::Children(Vec::new()),
        }
    }

    /// Creates a scalar tag.
    pub fn with_value(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            content: TagContent::Value(value.to_string()),
        }
    }

    /// Creates a tag with the given children.
    pub fn with_children(name: impl Into<String>, children: Vec<Tag>) -> Self {
        Self {
            name: name.into(),
            content: TagContent::Children(children),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn content(&self) -> &TagContent {
        &self.content
    }

    /// Returns the scalar value, if this tag holds one.
    pub fn value(&self) -> Option<&str> {
        match &self.content {
            TagContent::Value(v) => Some(v),
            TagContent::Children(_) => None,
        }
    }

    /// Returns the scalar value or an empty string.
    pub fn str_value(&self) -> &str {
        self.value().unwrap_or("")
    }

    pub fn int_value(&self) -> Result<i32, ProtocolError> {
        self.parse_value()
    }

    pub fn long_value(&self) -> Result<i64, ProtocolError> {
        self.parse_value()
    }

    fn parse_value<T: std::str::FromStr>(&self) -> Result<T, ProtocolError> {
        let raw = self.str_value();
        raw.trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidValue {
                tag: self.name.clone(),
                value: raw.to_string(),
            })
    }

    /// Replaces the content with a scalar value.
    pub fn set_value(&mut self, value: impl ToString) {
        self.content = TagContent::Value(value.to_string());
    }

    /// Returns the children, empty for scalar tags.
    pub fn children(&self) -> &[Tag] {
        match &self.content {
            TagContent::Children(c) => c,
            TagContent::Value(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    /// First child with the given name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.children().iter().find(|t| t.name == name)
    }

    /// The `index`-th child with the given name.
    pub fn tag_at(&self, name: &str, index: usize) -> Option<&Tag> {
        self.children()
            .iter()
            .filter(|t| t.name == name)
            .nth(index)
    }

    /// First child with the given name, or a `MissingTag` error.
    pub fn require(&self, name: &str) -> Result<&Tag, ProtocolError> {
        self.tag(name).ok_or_else(|| ProtocolError::missing(name))
    }

    /// Integer value of a required child.
    pub fn child_int(&self, name: &str) -> Result<i32, ProtocolError> {
        self.require(name)?.int_value()
    }

    /// Long value of a required child.
    pub fn child_long(&self, name: &str) -> Result<i64, ProtocolError> {
        self.require(name)?.long_value()
    }

    /// String value of a required child.
    pub fn child_str(&self, name: &str) -> Result<&str, ProtocolError> {
        Ok(self.require(name)?.str_value())
    }

    /// Appends a child. A scalar tag becomes a container.
    pub fn add_tag(&mut self, tag: Tag) -> &mut Self {
        match &mut self.content {
            TagContent::Children(c) => c.push(tag),
            TagContent::Value(_) => self.content = TagContent::Children(vec![tag]),
        }
        self
    }

    /// Appends a scalar child.
    pub fn add_value(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.add_tag(Tag::with_value(name, value))
    }

    /// Builder form of [`Tag::add_tag`].
    pub fn child(mut self, tag: Tag) -> Self {
        self.add_tag(tag);
        self
    }

    /// Builder form of [`Tag::add_value`].
    pub fn value_child(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.add_value(name, value);
        self
    }

    /// Builds a `KeyValPair_PI` from keyword/value pairs.
    pub fn key_value_pairs(pairs: &[(&str, &str)]) -> Tag {
        let mut tag = Tag::new("KeyValPair_PI").value_child("ssLen", pairs.len());
        for (key, _) in pairs {
            tag.add_value("keyWord", key);
        }
        for (_, value) in pairs {
            tag.add_value("svalue", value);
        }
        tag
    }

    /// Serializes the tree into the wire dialect.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        out.push('>');
        match &self.content {
            TagContent::Value(v) => escape_into(v, out),
            TagContent::Children(children) => {
                for child in children {
                    child.write_xml(out);
                }
            }
        }
        out.push_str(OPEN_END_TAG);
        out.push_str(&self.name);
        out.push_str(">\n");
    }

    /// Parses the first element found in `data`.
    ///
    /// Returns `Ok(None)` when `data` contains no element at all. Entity
    /// escapes in values are only decoded when `decode` is set.
    pub fn parse(data: &[u8], decode: bool) -> Result<Option<Tag>, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
        let start = match text.find('<') {
            Some(s) => s,
            None => return Ok(None),
        };
        let mut parser = Parser {
            text,
            pos: start,
            decode,
        };
        parser.element().map(Some)
    }

    /// Parses `data`, failing if it holds no element.
    pub fn parse_required(data: &[u8], decode: bool) -> Result<Tag, ProtocolError> {
        Self::parse(data, decode)?
            .ok_or_else(|| ProtocolError::MalformedTag("no element found".to_string()))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    decode: bool,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Steps over the single newline the server may place between markup.
    fn skip_newline(&mut self) {
        if self.rest().starts_with('\n') {
            self.pos += 1;
        }
    }

    fn element(&mut self) -> Result<Tag, ProtocolError> {
        let rest = self.rest();
        if !rest.starts_with('<') || rest.starts_with(OPEN_END_TAG) {
            return Err(ProtocolError::MalformedTag(format!(
                "expected start tag at offset {}",
                self.pos
            )));
        }
        let close = rest
            .find('>')
            .ok_or_else(|| ProtocolError::MalformedTag("unterminated start tag".to_string()))?;
        let name = &rest[1..close];
        if name.is_empty() {
            return Err(ProtocolError::MalformedTag("empty tag name".to_string()));
        }
        self.pos += close + 1;
        let end_tag = format!("{}{}>", OPEN_END_TAG, name);

        // Values never hold a raw '<', so a newline followed by a start tag
        // is layout.
        let rest = self.rest();
        let markup = rest.strip_prefix('\n').unwrap_or(rest);
        let has_children = markup.starts_with('<') && !markup.starts_with(OPEN_END_TAG);
        if has_children {
            self.skip_newline();
        } else {
            let end = rest.find(&end_tag).ok_or_else(|| {
                ProtocolError::MalformedTag(format!("missing end tag for {}", name))
            })?;
            let raw = &rest[..end];
            let value = if self.decode {
                unescape(raw)
            } else {
                raw.to_string()
            };
            self.pos += end + end_tag.len();
            self.skip_newline();
            return Ok(Tag::with_value(name, value));
        }

        let mut tag = Tag::new(name);
        loop {
            let rest = self.rest();
            if rest.starts_with(&end_tag) {
                self.pos += end_tag.len();
                self.skip_newline();
                return Ok(tag);
            }
            if rest.is_empty() {
                return Err(ProtocolError::MalformedTag(format!(
                    "missing end tag for {}",
                    name
                )));
            }
            let child = self.element()?;
            tag.add_tag(child);
        }
    }
}

fn escape_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_serialize_nested() {
        let tag = Tag::new("authResponseInp_PI")
            .value_child("response", "abc")
            .value_child("username", "rods#tempZone");
        assert_eq!(
            tag.to_xml(),
            "<authResponseInp_PI><response>abc</response>\n<username>rods#tempZone</username>\n</authResponseInp_PI>\n"
        );
    }

    #[test]
    fn test_parse_nested_with_newlines() {
        let xml = b"<Version_PI><status>0</status>\n<relVersion>rods4.2.8</relVersion>\n<apiVersion>d</apiVersion>\n<reconnPort>0</reconnPort>\n<reconnAddr></reconnAddr>\n<cookie>400</cookie>\n</Version_PI>\n";
        let tag = Tag::parse(xml, true).unwrap().unwrap();
        assert_eq!(tag.name(), "Version_PI");
        assert_eq!(tag.len(), 6);
        assert_eq!(tag.child_int("status").unwrap(), 0);
        assert_eq!(tag.child_str("relVersion").unwrap(), "rods4.2.8");
        assert_eq!(tag.child_str("reconnAddr").unwrap(), "");
        assert_eq!(tag.child_int("cookie").unwrap(), 400);
    }

    #[test]
    fn test_parse_deeply_nested() {
        let xml = b"<RError_PI><count>1</count><RErrMsg_PI><status>-816000</status><msg>bad arg</msg></RErrMsg_PI></RError_PI>";
        let tag = Tag::parse(xml, true).unwrap().unwrap();
        let err = tag.require("RErrMsg_PI").unwrap();
        assert_eq!(err.child_int("status").unwrap(), -816000);
        assert_eq!(err.child_str("msg").unwrap(), "bad arg");
    }

    #[test]
    fn test_parse_no_element() {
        assert!(Tag::parse(b"   ", true).unwrap().is_none());
        assert!(Tag::parse(b"", false).unwrap().is_none());
    }

    #[test]
    fn test_parse_missing_end_tag() {
        let result = Tag::parse(b"<a><b>1</b>", true);
        assert!(matches!(result, Err(ProtocolError::MalformedTag(_))));
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let result = Tag::parse(&[b'<', 0xff, 0xfe, b'>'], true);
        assert!(matches!(result, Err(ProtocolError::InvalidUtf8)));
    }

    #[test]
    fn test_decode_flag() {
        let xml = b"<msg>a &amp; b &lt;c&gt;</msg>";
        let decoded = Tag::parse(xml, true).unwrap().unwrap();
        assert_eq!(decoded.str_value(), "a & b <c>");
        let raw = Tag::parse(xml, false).unwrap().unwrap();
        assert_eq!(raw.str_value(), "a &amp; b &lt;c&gt;");
    }

    #[test]
    fn test_tag_at_index() {
        let tag = Tag::key_value_pairs(&[("forceFlag", ""), ("destRescName", "demoResc")]);
        assert_eq!(tag.child_int("ssLen").unwrap(), 2);
        assert_eq!(tag.tag_at("keyWord", 1).unwrap().str_value(), "destRescName");
        assert_eq!(tag.tag_at("svalue", 1).unwrap().str_value(), "demoResc");
        assert!(tag.tag_at("keyWord", 2).is_none());
    }

    #[test]
    fn test_empty_key_value_pairs() {
        let tag = Tag::key_value_pairs(&[]);
        assert_eq!(tag.to_xml(), "<KeyValPair_PI><ssLen>0</ssLen>\n</KeyValPair_PI>\n");
    }

    #[test]
    fn test_add_tag_converts_scalar() {
        let mut tag = Tag::with_value("x", 1);
        tag.add_value("y", 2);
        assert!(tag.value().is_none());
        assert_eq!(tag.child_int("y").unwrap(), 2);
    }

    #[test]
    fn test_invalid_int_value() {
        let tag = Tag::with_value("status", "abc");
        assert!(matches!(
            tag.int_value(),
            Err(ProtocolError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_require_missing() {
        let tag = Tag::new("empty");
        assert!(matches!(
            tag.require("status"),
            Err(ProtocolError::MissingTag(name)) if name == "status"
        ));
    }

    #[test]
    fn test_leading_newline_in_value_survives_parse() {
        let rule = "\nmain { writeLine(\"stdout\", \"hi\") }\n";
        let tag = Tag::new("ExecMyRuleInp_PI").value_child("myRule", rule);
        let parsed = Tag::parse(tag.to_xml().as_bytes(), true).unwrap().unwrap();
        assert_eq!(parsed.child_str("myRule").unwrap(), rule);
    }

    #[test]
    fn test_newline_after_start_tag_is_layout() {
        let xml = b"<RError_PI>\n<count>1</count>\n<msg>\n</msg>\n</RError_PI>\n";
        let tag = Tag::parse(xml, true).unwrap().unwrap();
        assert_eq!(tag.len(), 2);
        assert_eq!(tag.child_int("count").unwrap(), 1);
        assert_eq!(tag.child_str("msg").unwrap(), "\n");
    }

    proptest! {
        #[test]
        fn test_escaped_value_survives_parse(value in "\n?[a-zA-Z0-9 &<>\"'/_.#=;\n-]{0,40}") {
            let tag = Tag::new("outer").value_child("v", &value);
            let parsed = Tag::parse(tag.to_xml().as_bytes(), true).unwrap().unwrap();
            prop_assert_eq!(parsed.child_str("v").unwrap(), value.as_str());
        }
    }
}
