//! Native EPrints XML.
//!
//! # Responsibility
//! - Write records as `<eprints xmlns=...><eprint id=...>` documents.
//! - Read such documents back into records.
//!
//! # Invariants
//! - Element order follows the native JSON field order.
//! - Item lists are `<list><item>...</item></list>`; documents and files
//!   are `<documents><document>` and `<files><file>`.
//! - Scalars are typed on read through the column registries; unknown
//!   elements read as text.

use super::{CodecError, CodecResult};
use crate::binder::{column_kind, ColumnKind};
use crate::model::{EPrints, Record};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};

pub const EPRINTS_NAMESPACE: &str = "http://eprints.org/ep2/data/2.0";

/// JSON key → element name where they differ.
fn element_name(key: &str) -> &str {
    match key {
        "eprint_id" => "eprintid",
        other => other,
    }
}

fn key_name<'a>(table: &str, element: &'a str) -> &'a str {
    match (table, element) {
        ("eprint", "eprintid") => "eprint_id",
        _ => element,
    }
}

fn child_element(container: &str) -> &'static str {
    match container {
        "documents" => "document",
        "files" => "file",
        _ => "item",
    }
}

/// Serializes `records` as a native XML document with declaration.
pub fn to_native_xml(records: &[Record]) -> CodecResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("eprints").with_attributes([("xmlns", EPRINTS_NAMESPACE)]),
    ))?;
    for record in records {
        let value = serde_json::to_value(record)?;
        write_element(&mut writer, "eprint", &value)?;
    }
    writer.write_event(Event::End(BytesEnd::new("eprints")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|err| CodecError::Malformed(format!("non UTF-8 output: {err}")))
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => Ok(()),
        Value::Object(map) => write_object(writer, name, map),
        Value::Array(list) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for entry in list {
                write_element(writer, child_element(name), entry)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
            Ok(())
        }
        Value::String(text) => write_text(writer, name, text),
        Value::Number(number) => write_text(writer, name, &number.to_string()),
        Value::Bool(flag) => write_text(writer, name, &flag.to_string()),
    }
}

fn write_object(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    map: &Map<String, Value>,
) -> CodecResult<()> {
    // Organisation names carry only a value and are written as text.
    if name == "name" && map.len() == 1 {
        if let Some(Value::String(text)) = map.get("value") {
            return write_text(writer, name, text);
        }
    }
    if let (1, Some(Value::Array(items))) = (map.len(), map.get("items")) {
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        for item in items {
            write_element(writer, "item", item)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        return Ok(());
    }

    let carries_id = matches!(name, "eprint" | "document" | "file");
    let mut start = BytesStart::new(name);
    if carries_id {
        if let Some(Value::String(id)) = map.get("id") {
            start.push_attribute(("id", id.as_str()));
        }
    }
    writer.write_event(Event::Start(start))?;
    for (key, value) in map {
        if carries_id && key == "id" {
            continue;
        }
        write_element(writer, element_name(key), value)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> CodecResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Element tree used while reading.
#[derive(Debug, Default)]
struct Node {
    name: String,
    id: Option<String>,
    text: String,
    children: Vec<Node>,
}

/// Parses a native XML document into records.
///
/// # Errors
/// - `Xml` for syntax errors.
/// - `Malformed` for a wrong root, no records or a non-numeric value in
///   a numeric field.
pub fn from_native_xml(src: &str) -> CodecResult<EPrints> {
    let root = parse_tree(src)?;
    if root.name != "eprints" {
        return Err(CodecError::Malformed(format!(
            "expected <eprints> root, found <{}>",
            root.name
        )));
    }
    let mut records = Vec::new();
    for node in root.children.iter().filter(|node| node.name == "eprint") {
        let value = object_value(node, "eprint")?;
        records.push(serde_json::from_value::<Record>(value)?);
    }
    if records.is_empty() {
        return Err(CodecError::Malformed("no eprint records".to_string()));
    }
    Ok(EPrints { records })
}

fn parse_tree(src: &str) -> CodecResult<Node> {
    let mut reader = Reader::from_str(src);
    reader.trim_text(true);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(open_node(&start)?),
            Event::Empty(start) => {
                let node = open_node(&start)?;
                close_node(&mut stack, &mut root, node);
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    close_node(&mut stack, &mut root, node);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    root.ok_or_else(|| CodecError::Malformed("empty document".to_string()))
}

fn open_node(start: &BytesStart<'_>) -> CodecResult<Node> {
    let mut node = Node {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        ..Node::default()
    };
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.local_name().as_ref() == b"id" {
            node.id = Some(attribute.unescape_value()?.into_owned());
        }
    }
    Ok(node)
}

fn close_node(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn object_value(node: &Node, table: &str) -> CodecResult<Value> {
    let mut map = Map::new();
    if let Some(id) = &node.id {
        map.insert("id".to_string(), Value::String(id.clone()));
    }
    for child in &node.children {
        let key = key_name(table, &child.name);
        let value = match child.name.as_str() {
            "documents" => Value::Array(
                child
                    .children
                    .iter()
                    .map(|document| object_value(document, "document"))
                    .collect::<CodecResult<Vec<_>>>()?,
            ),
            "files" => Value::Array(
                child
                    .children
                    .iter()
                    .map(|file| object_value(file, "file"))
                    .collect::<CodecResult<Vec<_>>>()?,
            ),
            _ if !child.children.is_empty() => item_list_value(child),
            _ if child.text.is_empty() => continue,
            _ => scalar_value(table, key, &child.text)?,
        };
        map.insert(key.to_string(), value);
    }
    Ok(Value::Object(map))
}

fn item_list_value(node: &Node) -> Value {
    let items = node
        .children
        .iter()
        .filter(|child| child.name == "item")
        .map(item_value)
        .collect::<Vec<_>>();
    let mut map = Map::new();
    map.insert("items".to_string(), Value::Array(items));
    Value::Object(map)
}

fn item_value(node: &Node) -> Value {
    let mut map = Map::new();
    for child in &node.children {
        let value = if child.name == "name" {
            let mut name = Map::new();
            if child.children.is_empty() {
                name.insert("value".to_string(), Value::String(child.text.clone()));
            }
            for part in &child.children {
                name.insert(part.name.clone(), Value::String(part.text.clone()));
            }
            Value::Object(name)
        } else {
            Value::String(child.text.clone())
        };
        map.insert(child.name.clone(), value);
    }
    Value::Object(map)
}

fn scalar_value(table: &str, key: &str, text: &str) -> CodecResult<Value> {
    let column = element_name(key);
    let invalid = || CodecError::Malformed(format!("{table}.{column}: {text:?} is not a number"));
    match column_kind(table, column) {
        Some(ColumnKind::Integer) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        Some(ColumnKind::Real) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        Some(ColumnKind::Text) | None => Ok(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{from_native_xml, to_native_xml, EPRINTS_NAMESPACE};
    use crate::crosswalk::CodecError;
    use crate::model::{Document, File, Item, Name, Record};

    fn sample() -> Record {
        let mut record = Record {
            id: "https://authors.example.edu/id/eprint/7".to_string(),
            eprintid: 7,
            eprint_status: "archive".to_string(),
            kind: "article".to_string(),
            title: "Ions & electrons".to_string(),
            pages: 12,
            latitude: 34.5,
            ..Record::default()
        };
        record.creators.push(Item {
            name: Name::person("", "Ada", "Lovelace", ""),
            orcid: "0000-0001".to_string(),
            ..Item::default()
        });
        record.corp_creators.push(Item {
            name: Name::organisation("GALCIT"),
            ..Item::default()
        });
        record.documents.push(Document {
            id: "https://authors.example.edu/id/document/70".to_string(),
            docid: 70,
            pos: 1,
            main: "paper.pdf".to_string(),
            files: vec![File {
                fileid: 700,
                filename: "paper.pdf".to_string(),
                filesize: 2048,
                ..File::default()
            }],
            ..Document::default()
        });
        record
    }

    #[test]
    fn export_writes_namespace_ids_and_nested_lists() {
        let xml = to_native_xml(&[sample()]).expect("xml");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains(&format!("<eprints xmlns=\"{EPRINTS_NAMESPACE}\">")));
        assert!(xml.contains("<eprint id=\"https://authors.example.edu/id/eprint/7\">"));
        assert!(xml.contains("<eprintid>7</eprintid>"));
        assert!(xml.contains("<title>Ions &amp; electrons</title>"));
        assert!(xml.contains("<family>Lovelace</family>"));
        assert!(xml.contains("<name>GALCIT</name>"));
        assert!(xml.contains("<document id=\"https://authors.example.edu/id/document/70\">"));
        assert!(xml.contains("<filename>paper.pdf</filename>"));
    }

    #[test]
    fn import_reads_back_typed_scalars_and_lists() {
        let xml = to_native_xml(&[sample()]).expect("xml");
        let parsed = from_native_xml(&xml).expect("parse");
        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record.eprintid, 7);
        assert_eq!(record.pages, 12);
        assert_eq!(record.latitude, 34.5);
        assert_eq!(record.title, "Ions & electrons");
        assert_eq!(record.creators.items[0].family_name(), "Lovelace");
        assert_eq!(record.creators.items[0].orcid, "0000-0001");
        assert_eq!(
            record.corp_creators.items[0]
                .name
                .as_ref()
                .map(|name| name.value.as_str()),
            Some("GALCIT")
        );
        assert_eq!(record.documents[0].docid, 70);
        assert_eq!(record.documents[0].files[0].filesize, 2048);
    }

    #[test]
    fn import_accepts_hand_written_documents() {
        let xml = r#"<?xml version="1.0"?>
<eprints xmlns="http://eprints.org/ep2/data/2.0">
  <eprint>
    <eprintid>0</eprintid>
    <type>book</type>
    <creators>
      <item><name><family>Hopper</family><given>Grace</given></name><id>Hopper-G</id></item>
    </creators>
    <abstract><![CDATA[<p>Compilers</p>]]></abstract>
    <keywords/>
  </eprint>
</eprints>"#;
        let parsed = from_native_xml(xml).expect("parse");
        let record = &parsed.records[0];
        assert_eq!(record.eprintid, 0);
        assert_eq!(record.kind, "book");
        assert_eq!(record.creators.items[0].id, "Hopper-G");
        assert_eq!(record.abstract_text, "<p>Compilers</p>");
    }

    #[test]
    fn import_rejects_wrong_roots_and_bad_numbers() {
        assert!(matches!(
            from_native_xml("<records><eprint/></records>"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            from_native_xml("<eprints><eprint><pages>many</pages></eprint></eprints>"),
            Err(CodecError::Malformed(_))
        ));
        assert!(from_native_xml("<eprints><eprint>").is_err());
    }
}
