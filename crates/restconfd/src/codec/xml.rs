//! XML bodies: a small element tree for decoding and a streaming encoder.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use restconf_tree::{Payload, TreeData};
use serde_json::{Map, Value};

use super::CodecError;
use bytes::Bytes;

/// Generic XML element content.
///
/// Attributes appear as children named `-<attribute>`; mixed text next to
/// child elements is kept under `#text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Element without child elements.
    Text(String),
    /// Child elements (and attributes) in document order.
    Element(Vec<(String, Self)>),
}

impl XmlNode {
    /// Drops every child whose name contains a hyphen, at every depth.
    ///
    /// This removes attributes, which are keyed `-name`, along with any
    /// hyphenated element names.
    #[must_use]
    pub fn without_hyphenated_keys(self) -> Self {
        match self {
            Self::Text(text) => Self::Text(text),
            Self::Element(children) => Self::Element(
                children
                    .into_iter()
                    .filter(|(name, _)| !name.contains('-'))
                    .map(|(name, child)| (name, child.without_hyphenated_keys()))
                    .collect(),
            ),
        }
    }

    /// Drops attributes (children keyed `-name`) at every depth, keeping
    /// hyphenated element names. An element left holding only its text
    /// becomes that text.
    #[must_use]
    pub fn without_attributes(self) -> Self {
        match self {
            Self::Text(text) => Self::Text(text),
            Self::Element(children) => {
                let mut children: Vec<(String, Self)> = children
                    .into_iter()
                    .filter(|(name, _)| !name.starts_with('-'))
                    .map(|(name, child)| (name, child.without_attributes()))
                    .collect();
                match children.as_mut_slice() {
                    [(name, Self::Text(text))] if name == "#text" => {
                        Self::Text(std::mem::take(text))
                    }
                    _ => Self::Element(children),
                }
            }
        }
    }

    /// Converts to JSON. Repeated child names collapse into arrays.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text),
            Self::Element(children) => Value::Object(collect_members(children)),
        }
    }
}

fn collect_members(children: Vec<(String, XmlNode)>) -> Map<String, Value> {
    let mut members = Map::new();
    for (name, child) in children {
        let value = child.into_json();
        match members.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                members.insert(name, value);
            }
        }
    }
    members
}

/// Object content of a parsed root element; an empty element is `{}`.
pub(crate) fn root_object(root: XmlNode) -> Result<Payload, CodecError> {
    match root {
        XmlNode::Element(children) => Ok(collect_members(children)),
        XmlNode::Text(text) if text.is_empty() => Ok(Map::new()),
        XmlNode::Text(_) => Err(CodecError::decode(
            "XML root element must contain child elements",
        )),
    }
}

struct Frame {
    name: String,
    children: Vec<(String, XmlNode)>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut children = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|error| CodecError::decode(error.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|error| CodecError::decode(error.to_string()))?;
            children.push((format!("-{key}"), XmlNode::Text(value.into_owned())));
        }
        Ok(Self {
            name,
            children,
            text: String::new(),
        })
    }

    fn close(self) -> (String, XmlNode) {
        let Self {
            name,
            mut children,
            text,
        } = self;
        let node = if children.is_empty() {
            XmlNode::Text(text)
        } else {
            if !text.is_empty() {
                children.push(("#text".to_owned(), XmlNode::Text(text)));
            }
            XmlNode::Element(children)
        };
        (name, node)
    }
}

/// Parses a document into its root element's local name and content.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed XML or a document without a
/// root element.
pub fn parse(body: &[u8]) -> Result<(String, XmlNode), CodecError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    let mut finish = |stack: &mut Vec<Frame>, frame: Frame| {
        let (name, node) = frame.close();
        match stack.last_mut() {
            Some(parent) => parent.children.push((name, node)),
            None => {
                root.get_or_insert((name, node));
            }
        }
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|error| CodecError::decode(format!("malformed XML: {error}")))?;
        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let frame = Frame::open(&start)?;
                finish(&mut stack, frame);
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    finish(&mut stack, frame);
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|error| CodecError::decode(error.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| CodecError::decode("XML document has no root element"))
}

type XmlWriter = Writer<Vec<u8>>;

fn write_error(error: impl std::fmt::Display) -> CodecError {
    CodecError::encode(error.to_string())
}

fn write_element(
    writer: &mut XmlWriter,
    name: &str,
    namespace: Option<&str>,
    value: &Value,
) -> Result<(), CodecError> {
    if let Value::Array(items) = value {
        for item in items {
            write_element(writer, name, namespace, item)?;
        }
        return Ok(());
    }

    let mut start = BytesStart::new(name);
    if let Some(namespace) = namespace {
        start.push_attribute(("xmlns", namespace));
    }
    match value {
        Value::Null => writer
            .write_event(Event::Empty(start))
            .map_err(write_error)?,
        Value::Object(members) => {
            writer
                .write_event(Event::Start(start))
                .map_err(write_error)?;
            for (child, child_value) in members {
                write_element(writer, child, None, child_value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)?;
        }
        scalar => {
            let text = match scalar {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            writer
                .write_event(Event::Start(start))
                .map_err(write_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(write_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)?;
        }
    }
    Ok(())
}

/// Encodes a node as an element named after it, in its module namespace.
///
/// List content is written as one element per entry.
///
/// # Errors
///
/// Fails when the node's content cannot be read or written.
pub fn encode(data: &dyn TreeData) -> Result<Bytes, CodecError> {
    let meta = data.meta();
    let content = data.content()?;
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, meta.ident(), meta.namespace(), &content)?;
    Ok(Bytes::from(writer.into_inner()))
}
