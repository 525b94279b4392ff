//! Call envelope decoding and validation.
//!
//! A call looks like:
//! ```text
//! <crs:call xmlns:crs="http://v8.1c.ru/8.2/crs" alias="dev" name="DevDepot_enrollDevObjects" version="8.3.18.1208">
//!     <crs:params>
//!         <crs:comment>TASK-42 fix posting</crs:comment>
//!     </crs:params>
//! </crs:call>
//! ```

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Operation whose commit comment is checked against the configured pattern.
pub const ENROLL_OPERATION: &str = "DevDepot_enrollDevObjects";

const ROOT_ELEMENT: &[u8] = b"call";
const PARAMS_ELEMENT: &[u8] = b"params";
const COMMENT_ELEMENT: &[u8] = b"comment";

/// Error returned when the body is not a well-formed call envelope.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("invalid UTF-8 in character data: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("expected element <call>, found <{0}>")]
    UnexpectedRoot(String),

    #[error("document ended before the call element was closed")]
    UnexpectedEof,

    #[error("document contains no call element")]
    MissingRoot,
}

/// Error returned when a decoded envelope lacks a required field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("envelope attribute `{0}` is empty")]
    EmptyField(&'static str),
}

/// Operation parameters carried in `<params>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParams {
    /// Free-text commit comment (raw, untrimmed).
    pub comment: String,
}

/// A parsed inbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallEnvelope {
    pub alias: String,
    pub name: String,
    pub version: String,
    pub params: CallParams,
}

impl CallEnvelope {
    /// Check that alias, name and version are all present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.alias.is_empty() {
            return Err(ValidationError::EmptyField("alias"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.version.is_empty() {
            return Err(ValidationError::EmptyField("version"));
        }
        Ok(())
    }

    /// True for the operation that commits objects into the repository.
    pub fn is_enroll(&self) -> bool {
        self.name == ENROLL_OPERATION
    }
}

/// Decode a call envelope from a request body.
///
/// Only the first top-level element is read; anything after its closing tag
/// is ignored.
pub fn decode(body: &[u8]) -> Result<CallEnvelope, DecodeError> {
    let mut reader = Reader::from_reader(body);
    let mut envelope = CallEnvelope::default();
    // Local names of the currently open elements, root first.
    let mut open: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if open.is_empty() {
                    read_root(&start, &mut envelope)?;
                }
                open.push(start.local_name().as_ref().to_vec());
            }
            Event::Empty(start) => {
                if open.is_empty() {
                    read_root(&start, &mut envelope)?;
                    return Ok(envelope);
                }
            }
            Event::Text(text) if in_comment(&open) => {
                envelope.params.comment.push_str(&text.unescape()?);
            }
            Event::CData(data) if in_comment(&open) => {
                envelope.params.comment.push_str(std::str::from_utf8(&data)?);
            }
            Event::End(_) => {
                open.pop();
                if open.is_empty() {
                    return Ok(envelope);
                }
            }
            Event::Eof if open.is_empty() => return Err(DecodeError::MissingRoot),
            Event::Eof => return Err(DecodeError::UnexpectedEof),
            _ => {}
        }
    }
}

fn read_root(start: &BytesStart<'_>, envelope: &mut CallEnvelope) -> Result<(), DecodeError> {
    let local = start.local_name();
    if local.as_ref() != ROOT_ELEMENT {
        return Err(DecodeError::UnexpectedRoot(
            String::from_utf8_lossy(local.as_ref()).into_owned(),
        ));
    }

    for attr in start.attributes() {
        let attr = attr?;
        let slot = match attr.key.local_name().as_ref() {
            b"alias" => &mut envelope.alias,
            b"name" => &mut envelope.name,
            b"version" => &mut envelope.version,
            _ => continue,
        };
        *slot = attr.unescape_value()?.into_owned();
    }
    Ok(())
}

fn in_comment(open: &[Vec<u8>]) -> bool {
    matches!(open, [_, params, comment] if params == PARAMS_ELEMENT && comment == COMMENT_ELEMENT)
}
