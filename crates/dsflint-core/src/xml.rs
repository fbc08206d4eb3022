//! Namespace-aware XML DOM and the FHIR JSON-to-XML projection
//!
//! All rule traversal runs over this owned DOM. XML is parsed with
//! quick-xml's namespace-resolving reader; FHIR JSON documents are projected
//! into the same DOM so the rule engines see a single document shape.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use serde_json::Value;

use crate::error::DsflintError;
use crate::Result;

/// One XML attribute with its resolved namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

/// One XML element: resolved namespace, local name, attributes, children,
/// and the concatenated direct text content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// First attribute with the given local name, regardless of namespace
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute with the given local name bound to the given namespace
    pub fn attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first traversal of this element and everything below it
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Direct text content, trimmed; `None` when blank
    pub fn text_trim(&self) -> Option<&str> {
        let t = self.text.trim();
        if t.is_empty() { None } else { Some(t) }
    }

    /// FHIR primitive carried in the `value` attribute
    pub fn value(&self) -> Option<&str> {
        self.attr("value")
    }

    /// `value` attribute of the first child with the given name
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.value())
    }

    /// Extensions (children named `extension`) with the given url attribute
    pub fn extensions<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children_named("extension")
            .filter(move |e| e.attr("url") == Some(url))
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parse a namespace-aware XML document and return the root element
pub fn parse_document(file: &str, bytes: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| DsflintError::parse_error(file, e.to_string()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let mut element = Element::new(
                    String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                );
                element.namespace = namespace_uri(&ns);
                for attr in e.attributes() {
                    let attr =
                        attr.map_err(|e| DsflintError::parse_error(file, e.to_string()))?;
                    let (attr_ns, local) = reader.resolve_attribute(attr.key);
                    let value = attr
                        .unescape_value()
                        .map_err(|e| DsflintError::parse_error(file, e.to_string()))?
                        .into_owned();
                    element.attributes.push(Attribute {
                        name: String::from_utf8_lossy(local.as_ref()).into_owned(),
                        namespace: namespace_uri(&attr_ns),
                        value,
                    });
                }
                if empty {
                    attach(&mut stack, &mut root, element, file)?;
                } else {
                    stack.push(element);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DsflintError::parse_error(file, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element, file)?;
            }
            Event::Text(ref t) => {
                if let Some(current) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| DsflintError::parse_error(file, e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(ref t) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| DsflintError::parse_error(file, "document has no root element"))
}

fn namespace_uri(result: &ResolveResult) -> Option<String> {
    match result {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
        _ => None,
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    file: &str,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(DsflintError::parse_error(file, "multiple root elements"))
    }
}

/// Project a FHIR JSON document onto the XML document shape
///
/// Projection rules: an object becomes an element named by its enclosing
/// property (`resourceType` names the root); a primitive property becomes an
/// empty element carrying the primitive in its `value` attribute; arrays
/// become repeated sibling elements; inside an `extension` element the
/// `url` property becomes the `url` attribute, recursively.
pub fn project_json(file: &str, bytes: &[u8]) -> Result<Element> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DsflintError::parse_error(file, e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| DsflintError::parse_error(file, "top-level JSON value is not an object"))?;
    let resource_type = object
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or_else(|| DsflintError::parse_error(file, "missing resourceType"))?;

    let mut root = Element::new(resource_type);
    for (key, value) in object {
        if key == "resourceType" {
            continue;
        }
        project_property(&mut root, key, value);
    }
    Ok(root)
}

fn project_property(parent: &mut Element, key: &str, value: &Value) {
    // Primitive-extension shadow properties ("_status") have no XML position
    if key.starts_with('_') {
        return;
    }
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                project_property(parent, key, item);
            }
        }
        Value::Object(map) => {
            let mut element = Element::new(key);
            for (k, v) in map {
                if element.name == "extension" && k == "url" {
                    if let Some(url) = v.as_str() {
                        element.attributes.push(Attribute {
                            name: "url".to_string(),
                            namespace: None,
                            value: url.to_string(),
                        });
                        continue;
                    }
                }
                project_property(&mut element, k, v);
            }
            parent.children.push(element);
        }
        Value::String(s) => push_primitive(parent, key, s.clone()),
        Value::Bool(b) => push_primitive(parent, key, b.to_string()),
        Value::Number(n) => push_primitive(parent, key, n.to_string()),
    }
}

fn push_primitive(parent: &mut Element, key: &str, value: String) {
    let mut element = Element::new(key);
    element.attributes.push(Attribute {
        name: "value".to_string(),
        namespace: None,
        value,
    });
    parent.children.push(element);
}

#[cfg(test)]
mod tests {
    use super::*;

    const BPMN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:camunda="http://camunda.org/schema/1.0/bpmn">
  <bpmn:process id="org_example" isExecutable="true" camunda:historyTimeToLive="30">
    <bpmn:serviceTask id="Task_1" camunda:class="org.example.Service"/>
  </bpmn:process>
</bpmn:definitions>"#;

    #[test]
    fn parses_namespaced_bpmn() {
        let root = parse_document("test.bpmn", BPMN.as_bytes()).unwrap();
        assert_eq!(root.name, "definitions");
        assert_eq!(
            root.namespace.as_deref(),
            Some("http://www.omg.org/spec/BPMN/20100524/MODEL")
        );
        let process = root.child("process").unwrap();
        assert_eq!(process.attr("id"), Some("org_example"));
        assert_eq!(
            process.attr_ns("http://camunda.org/schema/1.0/bpmn", "historyTimeToLive"),
            Some("30")
        );
        let task = process.child("serviceTask").unwrap();
        assert_eq!(task.attr("class"), Some("org.example.Service"));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse_document("bad.xml", b"<a><b></a>").is_err());
        assert!(parse_document("empty.xml", b"").is_err());
    }

    #[test]
    fn projects_primitives_and_arrays() {
        let json = br#"{
            "resourceType": "ActivityDefinition",
            "url": "http://example.com/ad",
            "status": "unknown",
            "identifier": [{"value": "a"}, {"value": "b"}]
        }"#;
        let root = project_json("ad.json", json).unwrap();
        assert_eq!(root.name, "ActivityDefinition");
        assert_eq!(root.child_value("url"), Some("http://example.com/ad"));
        assert_eq!(root.child_value("status"), Some("unknown"));
        let identifiers: Vec<_> = root.children_named("identifier").collect();
        assert_eq!(identifiers.len(), 2);
        assert_eq!(identifiers[1].child_value("value"), Some("b"));
    }

    #[test]
    fn projects_extension_url_as_attribute_recursively() {
        let json = br#"{
            "resourceType": "ActivityDefinition",
            "extension": [{
                "url": "http://dsf.dev/fhir/StructureDefinition/extension-process-authorization",
                "extension": [{
                    "url": "message-name",
                    "valueString": "ping"
                }]
            }]
        }"#;
        let root = project_json("ad.json", json).unwrap();
        let outer = root.child("extension").unwrap();
        assert_eq!(
            outer.attr("url"),
            Some("http://dsf.dev/fhir/StructureDefinition/extension-process-authorization")
        );
        let inner = outer.child("extension").unwrap();
        assert_eq!(inner.attr("url"), Some("message-name"));
        assert_eq!(inner.child_value("valueString"), Some("ping"));
        // no url child elements were materialised
        assert!(outer.child("url").is_none());
        assert!(inner.child("url").is_none());
    }

    #[test]
    fn url_outside_extension_stays_an_element() {
        let json = br#"{"resourceType": "StructureDefinition", "url": "http://x/sd"}"#;
        let root = project_json("sd.json", json).unwrap();
        assert_eq!(root.child_value("url"), Some("http://x/sd"));
        assert_eq!(root.attr("url"), None);
    }

    #[test]
    fn projection_is_boolean_and_number_aware() {
        let json = br#"{"resourceType": "StructureDefinition", "abstract": false, "min": 1}"#;
        let root = project_json("sd.json", json).unwrap();
        assert_eq!(root.child_value("abstract"), Some("false"));
        assert_eq!(root.child_value("min"), Some("1"));
    }
}
