//! Markdown documents with a leading YAML metadata block.

pub mod projection;

use serde_yaml::{Mapping, Value};

pub use projection::{get_dotted, project_from_platform, project_to_platform, set_dotted};

const DELIMITER: &str = "---";

/// A parsed markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// `None` when the document has no metadata block.
    pub metadata: Option<Mapping>,
    pub body: String,
}

impl Document {
    pub fn new(metadata: Mapping, body: impl Into<String>) -> Self {
        Self {
            metadata: Some(metadata),
            body: body.into(),
        }
    }

    /// String value of a metadata field, if present.
    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(field)?.as_str()
    }
}

/// Split `contents` into metadata and body.
///
/// The block must open on the first line and be closed by a second `---`
/// line; otherwise the whole input is the body. Leading blank lines and
/// trailing whitespace of the body are dropped. A leading byte order mark is
/// ignored.
pub fn parse(contents: &str) -> Result<Document, serde_yaml::Error> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut lines = contents.lines();
    let opens = lines.next().is_some_and(|first| first.trim() == DELIMITER);
    if !opens {
        return Ok(Document {
            metadata: None,
            body: normalize_body(contents),
        });
    }

    let mut yaml_lines = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim() == DELIMITER {
            closed = true;
            break;
        }
        yaml_lines.push(line);
    }
    if !closed {
        return Ok(Document {
            metadata: None,
            body: normalize_body(contents),
        });
    }

    let yaml_text = yaml_lines.join("\n");
    let metadata = if yaml_text.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(&yaml_text)? {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => {
                return Err(serde::de::Error::custom(
                    "metadata block must be a mapping",
                ));
            }
        }
    };

    let rest = lines.collect::<Vec<&str>>().join("\n");
    Ok(Document {
        metadata: Some(metadata),
        body: normalize_body(&rest),
    })
}

/// Render a metadata block followed by the body (when `include_body`),
/// ending with exactly one newline.
pub fn serialize(
    metadata: &Mapping,
    body: &str,
    include_body: bool,
) -> Result<String, serde_yaml::Error> {
    let mut out = String::from("---\n");
    if !metadata.is_empty() {
        out.push_str(&serde_yaml::to_string(metadata)?);
    }
    out.push_str("---\n");

    let body = body.trim_end();
    if include_body && !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    Ok(out)
}

fn normalize_body(body: &str) -> String {
    body.trim_start_matches(['\r', '\n']).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_metadata() {
        let doc = parse("---\nname: reviewer\ndescription: Reviews code\n---\n\nYou review code.\n")
            .expect("parse");
        assert_eq!(doc.field_str("name"), Some("reviewer"));
        assert_eq!(doc.field_str("description"), Some("Reviews code"));
        assert_eq!(doc.body, "You review code.");
    }

    #[test]
    fn test_parse_without_metadata() {
        let doc = parse("# Title\n\nJust text\n").expect("parse");
        assert!(doc.metadata.is_none());
        assert_eq!(doc.body, "# Title\n\nJust text");
    }

    #[test]
    fn test_parse_unclosed_block_is_body() {
        let doc = parse("---\nname: x\n").expect("parse");
        assert!(doc.metadata.is_none());
    }

    #[test]
    fn test_parse_empty_block() {
        let doc = parse("---\n---\nbody").expect("parse");
        assert_eq!(doc.metadata, Some(Mapping::new()));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_parse_rejects_scalar_block() {
        assert!(parse("---\njust a string\n---\nbody").is_err());
    }

    #[test]
    fn test_parse_crlf() {
        let doc = parse("---\r\nname: x\r\ndescription: y\r\n---\r\n\r\nBody\r\n").expect("parse");
        assert_eq!(doc.field_str("name"), Some("x"));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_parse_ignores_byte_order_mark() {
        let doc = parse("\u{feff}---\nname: x\ndescription: y\n---\n\nBody\n").expect("parse");
        assert_eq!(doc.field_str("name"), Some("x"));
        assert_eq!(doc.field_str("description"), Some("y"));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_serialize_single_trailing_newline() {
        let mut meta = Mapping::new();
        meta.insert("name".into(), "reviewer".into());
        let out = serialize(&meta, "Prompt\n\n\n", true).expect("serialize");
        assert_eq!(out, "---\nname: reviewer\n---\n\nPrompt\n");
    }

    #[test]
    fn test_serialize_without_body() {
        let mut meta = Mapping::new();
        meta.insert("name".into(), "reviewer".into());
        let out = serialize(&meta, "Prompt", false).expect("serialize");
        assert_eq!(out, "---\nname: reviewer\n---\n");
    }

    #[test]
    fn test_serialize_then_parse() {
        let mut meta = Mapping::new();
        meta.insert("name".into(), "reviewer".into());
        meta.insert("description".into(), "Reviews code".into());
        let out = serialize(&meta, "You review code.", true).expect("serialize");
        let doc = parse(&out).expect("parse");
        assert_eq!(doc.metadata, Some(meta));
        assert_eq!(doc.body, "You review code.");
    }
}
