//! `filter.xml` serialization
//!
//! The remote side parses this file, so the output is byte-stable:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <workspaceFilter version="1.0">
//!     <filter root="/content/en"><exclude pattern="/content/en/nested(/.*)?"/></filter>
//! </workspaceFilter>
//! ```

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;

use crate::error::{SyncError, SyncResult};
use crate::scope::ScopeDescriptor;

const ROOT_ELEMENT: &str = "workspaceFilter";
const FILTER_ELEMENT: &str = "filter";
const INCLUDE_ELEMENT: &str = "include";
const EXCLUDE_ELEMENT: &str = "exclude";
const FORMAT_VERSION: &str = "1.0";

fn xml_error(e: impl Display) -> SyncError {
	SyncError::Descriptor { message: e.to_string() }
}

/// Serialize a scope into the descriptor format
pub fn write(scope: &ScopeDescriptor) -> SyncResult<String> {
	let mut writer = Writer::new(Vec::new());

	writer
		.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
		.map_err(xml_error)?;
	writer.write_event(Event::Text(BytesText::new("\n"))).map_err(xml_error)?;

	let mut root = BytesStart::new(ROOT_ELEMENT);
	root.push_attribute(("version", FORMAT_VERSION));
	writer.write_event(Event::Start(root)).map_err(xml_error)?;
	writer.write_event(Event::Text(BytesText::new("\n    "))).map_err(xml_error)?;

	let mut filter = BytesStart::new(FILTER_ELEMENT);
	filter.push_attribute(("root", scope.root.as_str()));
	if !scope.mode.is_empty() {
		filter.push_attribute(("mode", scope.mode.as_str()));
	}

	if scope.has_rules() {
		writer.write_event(Event::Start(filter)).map_err(xml_error)?;
		let rules = scope
			.include_patterns
			.iter()
			.map(|p| (INCLUDE_ELEMENT, p))
			.chain(scope.exclude_patterns.iter().map(|p| (EXCLUDE_ELEMENT, p)));
		for (element, pattern) in rules {
			let mut rule = BytesStart::new(element);
			rule.push_attribute(("pattern", pattern.as_str()));
			writer.write_event(Event::Empty(rule)).map_err(xml_error)?;
		}
		writer.write_event(Event::End(BytesEnd::new(FILTER_ELEMENT))).map_err(xml_error)?;
	} else {
		writer.write_event(Event::Empty(filter)).map_err(xml_error)?;
	}

	writer.write_event(Event::Text(BytesText::new("\n"))).map_err(xml_error)?;
	writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT))).map_err(xml_error)?;

	String::from_utf8(writer.into_inner()).map_err(xml_error)
}

/// Parse a descriptor into one scope per `filter` element
pub fn parse(xml: &str) -> SyncResult<Vec<ScopeDescriptor>> {
	let mut reader = Reader::from_str(xml);
	let mut scopes: Vec<ScopeDescriptor> = Vec::new();
	let mut seen_root = false;
	let mut in_filter = false;

	loop {
		match reader.read_event().map_err(xml_error)? {
			Event::Start(e) | Event::Empty(e) if e.name().as_ref() == ROOT_ELEMENT.as_bytes() => {
				seen_root = true;
			}
			Event::Start(e) if e.name().as_ref() == FILTER_ELEMENT.as_bytes() => {
				scopes.push(parse_filter(&e)?);
				in_filter = true;
			}
			Event::Empty(e) if e.name().as_ref() == FILTER_ELEMENT.as_bytes() => {
				scopes.push(parse_filter(&e)?);
			}
			Event::Start(e) | Event::Empty(e) if in_filter => {
				let pattern = attribute(&e, "pattern")?.ok_or_else(|| SyncError::Descriptor {
					message: "rule without pattern attribute".to_string(),
				})?;
				if let Some(scope) = scopes.last_mut() {
					match e.name().as_ref() {
						b"include" => scope.include_patterns.push(pattern),
						b"exclude" => scope.exclude_patterns.push(pattern),
						_ => {}
					}
				}
			}
			Event::End(e) if e.name().as_ref() == FILTER_ELEMENT.as_bytes() => {
				in_filter = false;
			}
			Event::Eof => break,
			_ => {}
		}
	}

	if !seen_root {
		return Err(SyncError::Descriptor {
			message: format!("missing <{}> root element", ROOT_ELEMENT),
		});
	}
	Ok(scopes)
}

fn parse_filter(element: &BytesStart) -> SyncResult<ScopeDescriptor> {
	let root = attribute(element, "root")?.ok_or_else(|| SyncError::Descriptor {
		message: "filter without root attribute".to_string(),
	})?;
	let mode = attribute(element, "mode")?.unwrap_or_default();
	Ok(ScopeDescriptor::new(root).with_mode(mode))
}

fn attribute(element: &BytesStart, name: &str) -> SyncResult<Option<String>> {
	for attr in element.attributes() {
		let attr = attr.map_err(xml_error)?;
		if attr.key.as_ref() == name.as_bytes() {
			return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
		}
	}
	Ok(None)
}


// vim: ts=4
