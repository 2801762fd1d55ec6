// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Token source with the denial-of-service and XXE guards applied.

use std::str;

use log::Level;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

use crate::config::Settings;
use crate::error::{Limit, ProtocolError};
use crate::logging::LogSink;

/// What the deserializer sees of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open(String),
    Close(String),
    Text(String),
}

pub struct BoundedReader<'a> {
    events: EventReader<&'a [u8]>,
    settings: &'a Settings,
    sink: &'a dyn LogSink,
    depth: usize,
    nodes: u64,
    /// Literal character data in the input, set only when a DTD may declare entities.
    literal_chars: Option<u64>,
    text_chars: u64,
    finished: bool,
}

fn document_chars(input: &[u8]) -> u64 {
    match str::from_utf8(input) {
        Ok(text) => text.chars().count() as u64,
        Err(_) => input.len() as u64,
    }
}

/// Skips one markup construct starting at `<`, honouring quotes and the
/// brackets of a DOCTYPE internal subset.
fn skip_markup(markup: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut brackets = 0usize;
    for (idx, c) in markup.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => brackets += 1,
            (None, ']') => brackets = brackets.saturating_sub(1),
            (None, '>') if brackets == 0 => return &markup[idx + 1..],
            _ => {}
        }
    }
    ""
}

/// Character data as written: text and CDATA sections, with references
/// counted unexpanded.
fn literal_text_chars(document: &str) -> u64 {
    let mut count = 0u64;
    let mut rest = document;
    while let Some(idx) = rest.find('<') {
        count += rest[..idx].chars().count() as u64;
        rest = &rest[idx..];
        rest = if let Some(body) = rest.strip_prefix("<![CDATA[") {
            let end = body.find("]]>").unwrap_or(body.len());
            count += body[..end].chars().count() as u64;
            body.get(end + 3..).unwrap_or("")
        } else if let Some(body) = rest.strip_prefix("<!--") {
            body.find("-->").map_or("", |end| &body[end + 3..])
        } else {
            skip_markup(rest)
        };
    }
    count + rest.chars().count() as u64
}

impl<'a> BoundedReader<'a> {
    /// Checks the document size up front; every other limit is enforced while reading.
    pub fn new(
        input: &'a [u8],
        settings: &'a Settings,
        sink: &'a dyn LogSink,
    ) -> Result<BoundedReader<'a>, ProtocolError> {
        if document_chars(input) > settings.max_document_chars {
            return Err(ProtocolError::limit(
                Limit::DocumentChars,
                settings.max_document_chars,
            ));
        }
        if settings.allow_external_resolver {
            sink.log(
                Level::Warn,
                "external entity resolution requested; external entities are never fetched",
            );
        }

        let config = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(true)
            .cdata_to_characters(true)
            .ignore_comments(true)
            .coalesce_characters(true)
            .max_entity_expansion_length(
                usize::try_from(settings.max_entity_chars).unwrap_or(usize::MAX),
            );

        let literal_chars = if settings.allow_dtd {
            Some(literal_text_chars(&String::from_utf8_lossy(input)))
        } else {
            None
        };

        Ok(BoundedReader {
            events: EventReader::new_with_config(input, config),
            settings,
            sink,
            depth: 0,
            nodes: 0,
            literal_chars,
            text_chars: 0,
            finished: false,
        })
    }

    fn count_node(&mut self) -> Result<(), ProtocolError> {
        self.nodes += 1;
        if self.nodes > self.settings.max_node_count {
            return Err(ProtocolError::limit(
                Limit::NodeCount,
                self.settings.max_node_count,
            ));
        }
        Ok(())
    }

    /// Text beyond the literal character data can only come from entity
    /// expansion; that surplus is held to `max_entity_chars`.
    fn count_text(&mut self, text: &str) -> Result<(), ProtocolError> {
        let literal = match self.literal_chars {
            Some(literal) => literal,
            None => return Ok(()),
        };
        self.text_chars += text.chars().count() as u64;
        let max = self.settings.max_entity_chars;
        if self.text_chars > literal.saturating_add(max) {
            return Err(ProtocolError::limit(Limit::EntityChars, max));
        }
        Ok(())
    }

    fn trace(&self, what: &str, detail: &str) {
        if self.sink.enabled(Level::Trace) {
            self.sink.log(Level::Trace, &format!("{} {}", what, detail));
        }
    }

    /// Next token, or `None` once the document has ended.
    pub fn next_token(&mut self) -> Result<Option<Token>, ProtocolError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            let event = self.events.next()?;
            // xml-rs reports no DOCTYPE event, only records that one was read
            if !self.settings.allow_dtd && self.events.doctype().is_some() {
                return Err(ProtocolError::DtdProhibited);
            }
            match event {
                XmlEvent::StartElement { name, .. } => {
                    self.count_node()?;
                    self.depth += 1;
                    if self.depth > self.settings.max_depth {
                        return Err(ProtocolError::limit(
                            Limit::Depth,
                            self.settings.max_depth as u64,
                        ));
                    }
                    self.trace("START", &name.local_name);
                    return Ok(Some(Token::Open(name.local_name)));
                }
                XmlEvent::EndElement { name } => {
                    self.depth = self.depth.saturating_sub(1);
                    self.trace("END", &name.local_name);
                    return Ok(Some(Token::Close(name.local_name)));
                }
                XmlEvent::Characters(text) => {
                    self.count_node()?;
                    self.count_text(&text)?;
                    self.trace("TEXT", &text);
                    return Ok(Some(Token::Text(text)));
                }
                XmlEvent::EndDocument => {
                    self.finished = true;
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullSink;

    fn tokens(xml: &str, settings: &Settings) -> Result<Vec<Token>, ProtocolError> {
        let mut reader = BoundedReader::new(xml.as_bytes(), settings, &NullSink)?;
        let mut out = Vec::new();
        while let Some(token) = reader.next_token()? {
            out.push(token);
        }
        Ok(out)
    }

    #[test]
    fn keeps_whitespace_inside_text() {
        let out = tokens("<value><string>  a b </string></value>", &Settings::default()).unwrap();
        assert_eq!(
            vec![
                Token::Open("value".into()),
                Token::Open("string".into()),
                Token::Text("  a b ".into()),
                Token::Close("string".into()),
                Token::Close("value".into()),
            ],
            out
        );
    }

    #[test]
    fn expands_predefined_entities() {
        let out = tokens("<string>a &lt;&amp;&gt; b</string>", &Settings::default()).unwrap();
        assert_eq!(Token::Text("a <&> b".into()), out[1]);
    }

    #[test]
    fn rejects_depth_beyond_limit() {
        let settings = Settings::default().with_max_depth(2);
        assert!(tokens("<a><b></b></a>", &settings).is_ok());
        match tokens("<a><b><c></c></b></a>", &settings) {
            Err(ProtocolError::LimitExceeded { limit: Limit::Depth, max: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_node_count_beyond_limit() {
        let settings = Settings::default().with_max_node_count(3);
        assert!(tokens("<a><b>x</b></a>", &settings).is_ok());
        match tokens("<a><b>x</b><c/></a>", &settings) {
            Err(ProtocolError::LimitExceeded { limit: Limit::NodeCount, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_oversized_documents_before_reading() {
        let settings = Settings::default().with_max_document_chars(8);
        match tokens("<a>123456789</a>", &settings) {
            Err(ProtocolError::LimitExceeded { limit: Limit::DocumentChars, max: 8 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn literal_text_skips_markup() {
        assert_eq!(5, literal_text_chars("<a x='>'>ab<!-- cd -->c<![CDATA[de]]></a>"));
        assert_eq!(3, literal_text_chars("<!DOCTYPE a [<!ENTITY e \"<long>\">]><a>&e;</a>"));
    }

    fn entity_document(replacement: &str, references: usize) -> String {
        format!(
            "<?xml version=\"1.0\"?><!DOCTYPE a [<!ENTITY e \"{}\">]><a>{}</a>",
            replacement,
            "&e;".repeat(references)
        )
    }

    #[test]
    fn caps_characters_produced_by_entities() {
        let settings = Settings::default().allow_dtd(true).with_max_entity_chars(100);
        let small = tokens(&entity_document(&"x".repeat(50), 2), &settings).unwrap();
        assert_eq!(Token::Text("x".repeat(100)), small[1]);

        match tokens(&entity_document(&"x".repeat(1000), 1), &settings) {
            Err(ProtocolError::LimitExceeded { limit: Limit::EntityChars, max: 100 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_doctype_by_default() {
        let xml = "<?xml version=\"1.0\"?><!DOCTYPE a><a/>";
        match tokens(xml, &Settings::default()) {
            Err(ProtocolError::DtdProhibited) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(tokens(xml, &Settings::default().allow_dtd(true)).is_ok());
    }
}
