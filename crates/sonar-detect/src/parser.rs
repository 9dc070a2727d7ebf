//! Manifest parsers
//!
//! Each parser turns manifest contents into a flat list of dependency names.
//! A parse failure is reported as [`ParseError`] and the detector treats it
//! as "no labels from this file".

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::fmt::Debug;
use thiserror::Error;

use crate::rule_file::{ManifestDefinition, ManifestFormat};
use crate::Result;

/// Why a manifest could not be parsed
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid markup: {0}")]
    Markup(&'static str),
}

/// Extracts dependency names from one manifest format
pub trait ManifestParser: Send + Sync + Debug {
    /// Format handled by this parser
    fn format(&self) -> ManifestFormat;

    /// Dependency names found in `contents`, in document order
    fn dependencies(&self, contents: &str) -> std::result::Result<Vec<String>, ParseError>;
}

/// Build the parser described by a manifest definition
pub fn parser_for(definition: &ManifestDefinition) -> Result<Box<dyn ManifestParser>> {
    let parser: Box<dyn ManifestParser> = match definition.format {
        ManifestFormat::Json => Box::new(JsonManifestParser {
            sections: definition.sections.clone(),
        }),
        ManifestFormat::Toml => Box::new(TomlManifestParser {
            sections: definition.sections.clone(),
        }),
        ManifestFormat::Xml => Box::new(XmlManifestParser::new(&definition.sections)),
        ManifestFormat::Lines => {
            let line_pattern = definition
                .line_pattern
                .as_deref()
                .map(crate::detection::compile_pattern)
                .transpose()?;
            Box::new(LineManifestParser { line_pattern })
        }
        ManifestFormat::Text => Box::new(TextManifestParser),
    };
    Ok(parser)
}

/// Name portion of a requirement specifier such as `fastapi>=0.100` or
/// `requests[socks] ; python_version > "3"`.
pub fn requirement_name(spec: &str) -> Option<&str> {
    let spec = spec.trim();
    let end = spec
        .find(|c: char| c.is_whitespace() || "=<>!~;[(@,".contains(c))
        .unwrap_or(spec.len());
    let name = &spec[..end];
    (!name.is_empty()).then_some(name)
}

/// JSON manifests (package.json, composer.json)
#[derive(Debug)]
pub struct JsonManifestParser {
    sections: Vec<String>,
}

impl ManifestParser for JsonManifestParser {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Json
    }

    fn dependencies(&self, contents: &str) -> std::result::Result<Vec<String>, ParseError> {
        let document: serde_json::Value = serde_json::from_str(contents)?;
        let mut names = Vec::new();

        for section in &self.sections {
            let found = section
                .split('.')
                .try_fold(&document, |value, key| value.get(key));
            match found {
                Some(serde_json::Value::Object(map)) => names.extend(map.keys().cloned()),
                Some(serde_json::Value::Array(items)) => names.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_str())
                        .filter_map(requirement_name)
                        .map(str::to_string),
                ),
                _ => {}
            }
        }

        Ok(names)
    }
}

/// TOML manifests (Cargo.toml, pyproject.toml, Pipfile)
#[derive(Debug)]
pub struct TomlManifestParser {
    sections: Vec<String>,
}

impl ManifestParser for TomlManifestParser {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Toml
    }

    fn dependencies(&self, contents: &str) -> std::result::Result<Vec<String>, ParseError> {
        let document: toml::Table = toml::from_str(contents)?;
        let document = toml::Value::Table(document);
        let mut names = Vec::new();

        for section in &self.sections {
            let found = section
                .split('.')
                .try_fold(&document, |value, key| value.get(key));
            match found {
                Some(toml::Value::Table(table)) => names.extend(table.keys().cloned()),
                Some(toml::Value::Array(items)) => names.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_str())
                        .filter_map(requirement_name)
                        .map(str::to_string),
                ),
                _ => {}
            }
        }

        Ok(names)
    }
}

/// XML manifests (pom.xml, *.csproj, packages.config)
///
/// Sections name either an element (`artifactId`, its direct text is
/// extracted) or an element attribute (`PackageReference@Include`). Names
/// match on the local part, so namespace prefixes are ignored. Comments are
/// skipped and CDATA counts as text.
#[derive(Debug)]
pub struct XmlManifestParser {
    elements: Vec<String>,
    attributes: Vec<(String, String)>,
}

impl XmlManifestParser {
    fn new(sections: &[String]) -> Self {
        let mut elements = Vec::new();
        let mut attributes = Vec::new();
        for section in sections {
            match section.split_once('@') {
                Some((element, attribute)) => {
                    attributes.push((element.to_string(), attribute.to_string()))
                }
                None => elements.push(section.clone()),
            }
        }
        Self {
            elements,
            attributes,
        }
    }

    fn wants_text(&self, element: &BytesStart<'_>) -> bool {
        let local = element.local_name();
        self.elements
            .iter()
            .any(|name| name.as_bytes() == local.as_ref())
    }

    fn collect_attributes(
        &self,
        element: &BytesStart<'_>,
        names: &mut Vec<String>,
    ) -> std::result::Result<(), ParseError> {
        let local = element.local_name();
        for (wanted_element, wanted_attribute) in &self.attributes {
            if wanted_element.as_bytes() != local.as_ref() {
                continue;
            }
            for attribute in element.attributes() {
                let attribute = attribute.map_err(|e| ParseError::Xml(e.into()))?;
                if attribute.key.local_name().as_ref() == wanted_attribute.as_bytes() {
                    let value = attribute.unescape_value()?;
                    push_trimmed(names, &value);
                }
            }
        }
        Ok(())
    }
}

impl ManifestParser for XmlManifestParser {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Xml
    }

    fn dependencies(&self, contents: &str) -> std::result::Result<Vec<String>, ParseError> {
        let mut reader = Reader::from_str(contents);
        let mut names = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;
        // Depth and accumulated text of the element being captured
        let mut capture: Option<(usize, String)> = None;

        loop {
            match reader.read_event()? {
                Event::Start(element) => {
                    depth += 1;
                    seen_root = true;
                    self.collect_attributes(&element, &mut names)?;
                    if capture.is_none() && self.wants_text(&element) {
                        capture = Some((depth, String::new()));
                    }
                }
                Event::Empty(element) => {
                    seen_root = true;
                    self.collect_attributes(&element, &mut names)?;
                }
                Event::End(_) => {
                    if matches!(&capture, Some((level, _)) if *level == depth) {
                        if let Some((_, text)) = capture.take() {
                            push_trimmed(&mut names, &text);
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Text(text) => {
                    if let Some((level, buffer)) = capture.as_mut() {
                        if *level == depth {
                            buffer.push_str(&text.unescape()?);
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some((level, buffer)) = capture.as_mut() {
                        if *level == depth {
                            buffer.push_str(&String::from_utf8_lossy(&data));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(ParseError::Markup("no root element"));
        }
        if depth > 0 {
            return Err(ParseError::Markup("unclosed element"));
        }
        Ok(names)
    }
}

fn push_trimmed(names: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        names.push(value.to_string());
    }
}

/// Line-oriented dependency lists (requirements.txt, Gemfile, go.mod)
#[derive(Debug)]
pub struct LineManifestParser {
    line_pattern: Option<Regex>,
}

impl ManifestParser for LineManifestParser {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Lines
    }

    fn dependencies(&self, contents: &str) -> std::result::Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            match &self.line_pattern {
                Some(pattern) => {
                    if let Some(name) = pattern.captures(line).and_then(|caps| caps.get(1)) {
                        names.push(name.as_str().to_string());
                    }
                }
                None => {
                    // pip options such as `-r base.txt` or `--index-url`
                    if line.starts_with('-') {
                        continue;
                    }
                    if let Some(name) = requirement_name(line) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        Ok(names)
    }
}

/// Raw text, no dependency extraction
#[derive(Debug)]
pub struct TextManifestParser;

impl ManifestParser for TextManifestParser {
    fn format(&self) -> ManifestFormat {
        ManifestFormat::Text
    }

    fn dependencies(&self, _contents: &str) -> std::result::Result<Vec<String>, ParseError> {
        Ok(Vec::new())
    }
}
