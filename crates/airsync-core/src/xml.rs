//! Event-level XML rewrites applied to request and response bodies
//!
//! Request and response bodies stay opaque XML text; these helpers stream
//! them through `quick-xml` events so a rewrite never has to track string
//! offsets by hand. Elements are matched by local name, which keeps the
//! helpers working on both prefixed (`airsync:Collection`) and default
//! namespace documents.

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::domain::errors::{AirSyncError, AirSyncResult};

pub(crate) fn next_event<'a>(reader: &mut Reader<&'a [u8]>) -> AirSyncResult<Event<'a>> {
    reader
        .read_event()
        .map_err(|e| AirSyncError::InvalidResponse(format!("malformed XML: {e}")))
}

pub(crate) fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> AirSyncResult<()> {
    writer
        .write_event(event)
        .map_err(|e| AirSyncError::Codec(format!("XML write failed: {e}")))
}

pub(crate) fn finish(writer: Writer<Vec<u8>>) -> AirSyncResult<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| AirSyncError::Codec(format!("XML is not UTF-8: {e}")))
}

pub(crate) fn text_of(event: &BytesText<'_>) -> AirSyncResult<String> {
    event
        .unescape()
        .map(|t| t.into_owned())
        .map_err(|e| AirSyncError::InvalidResponse(format!("bad XML text: {e}")))
}

/// Removes every element whose local name is in `names`, with its subtree
pub fn strip_elements(xml: &str, names: &[&str]) -> AirSyncResult<String> {
    if names.is_empty() || xml.is_empty() {
        return Ok(xml.to_string());
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skip_depth = 0usize;

    loop {
        let event = next_event(&mut reader)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                if skip_depth > 0 || is_named(e.local_name().as_ref(), names) {
                    skip_depth += 1;
                    continue;
                }
            }
            Event::End(_) if skip_depth > 0 => {
                skip_depth -= 1;
                continue;
            }
            Event::Empty(ref e) => {
                if skip_depth > 0 || is_named(e.local_name().as_ref(), names) {
                    continue;
                }
            }
            _ if skip_depth > 0 => continue,
            _ => {}
        }
        write_event(&mut writer, event)?;
    }

    finish(writer)
}

/// Replaces the text of `Data` elements inside `Picture` elements with a
/// `[<n> bytes]` placeholder, n being the payload length
///
/// Already-redacted payloads are left untouched, so the rewrite can run on
/// its own output.
pub fn redact_binary_payloads(xml: &str) -> AirSyncResult<String> {
    if !xml.contains("Picture") {
        return Ok(xml.to_string());
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = next_event(&mut reader)?;
        let in_payload = path.len() >= 2
            && path[path.len() - 1] == b"Data"
            && path[path.len() - 2] == b"Picture";

        match event {
            Event::Eof => break,
            Event::Start(ref e) => path.push(e.local_name().as_ref().to_vec()),
            Event::End(_) => {
                path.pop();
            }
            Event::Text(ref t) if in_payload => {
                let payload = text_of(t)?;
                let payload = payload.trim();
                if !payload.is_empty() && !is_placeholder(payload) {
                    let placeholder = placeholder(payload.len());
                    write_event(&mut writer, Event::Text(BytesText::new(&placeholder)))?;
                    continue;
                }
            }
            Event::CData(ref c) if in_payload => {
                let placeholder = placeholder(c.len());
                write_event(&mut writer, Event::Text(BytesText::new(&placeholder)))?;
                continue;
            }
            _ => {}
        }
        write_event(&mut writer, event)?;
    }

    finish(writer)
}

fn placeholder(len: usize) -> String {
    format!("[{len} bytes]")
}

fn is_placeholder(text: &str) -> bool {
    text.strip_prefix('[')
        .and_then(|t| t.strip_suffix(" bytes]"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Sets the text of the first `child` element directly inside the first
/// `parent` element
///
/// Returns the document unchanged when either element is absent.
pub fn set_first_text(xml: &str, parent: &str, child: &str, value: &str) -> AirSyncResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + value.len()));
    // Depth of the open `parent` element, once found
    let mut parent_depth: Option<usize> = None;
    let mut depth = 0usize;
    let mut replacing = false;
    let mut done = false;

    loop {
        let event = next_event(&mut reader)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                depth += 1;
                let name = e.local_name();
                if !done && parent_depth.is_none() && name.as_ref() == parent.as_bytes() {
                    parent_depth = Some(depth);
                } else if !done
                    && parent_depth == Some(depth - 1)
                    && name.as_ref() == child.as_bytes()
                {
                    write_event(&mut writer, event.clone())?;
                    write_event(&mut writer, Event::Text(BytesText::new(value)))?;
                    replacing = true;
                    done = true;
                    continue;
                }
            }
            Event::Empty(ref e)
                if !done
                    && parent_depth == Some(depth)
                    && e.local_name().as_ref() == child.as_bytes() =>
            {
                let start = e.clone().into_owned();
                let end = start.to_end().into_owned();
                write_event(&mut writer, Event::Start(start))?;
                write_event(&mut writer, Event::Text(BytesText::new(value)))?;
                write_event(&mut writer, Event::End(end))?;
                done = true;
                continue;
            }
            Event::End(_) => {
                if replacing {
                    replacing = false;
                } else if parent_depth == Some(depth) {
                    // Leaving the first parent: later parents are not touched
                    done = true;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(_) | Event::CData(_) if replacing => continue,
            _ => {}
        }
        write_event(&mut writer, event)?;
    }

    finish(writer)
}

/// Counts elements with local name `name`
pub fn count_elements(xml: &str, name: &str) -> AirSyncResult<usize> {
    let mut reader = Reader::from_str(xml);
    let mut count = 0;
    loop {
        match next_event(&mut reader)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == name.as_bytes() => {
                count += 1;
            }
            _ => {}
        }
    }
    Ok(count)
}

/// Text content of the first `Mime` element (CDATA or escaped text)
pub fn extract_mime(xml: &str) -> AirSyncResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut content = String::new();

    loop {
        match next_event(&mut reader)? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"Mime" => inside = true,
            Event::Empty(e) if e.local_name().as_ref() == b"Mime" => return Ok(Some(String::new())),
            Event::Text(t) if inside => content.push_str(&text_of(&t)?),
            Event::CData(c) if inside => content.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if inside && e.local_name().as_ref() == b"Mime" => {
                return Ok(Some(content));
            }
            _ => {}
        }
    }

    Ok(None)
}

fn is_named(name: &[u8], names: &[&str]) -> bool {
    names.iter().any(|n| n.as_bytes() == name)
}
