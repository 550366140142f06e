//! Text charsets for non-binary bodies
//!
//! Plain XML and autodiscover bodies are text in the charset named by the
//! `Content-Type` header. Four are understood: UTF-7, UTF-8, UTF-16 and
//! US-ASCII. Unrecognized labels fall back to ASCII.

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::domain::errors::{AirSyncError, AirSyncResult};

/// Text encoding of a body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf7,
    #[default]
    Utf8,
    /// Little-endian on encode; a byte order mark is honoured on decode
    Utf16,
    Ascii,
}

impl Charset {
    /// Maps a charset label, falling back to ASCII for unknown names
    pub fn from_label(label: &str) -> Self {
        match label.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "utf-7" | "utf7" | "unicode-1-1-utf-7" => Charset::Utf7,
            "utf-8" | "utf8" => Charset::Utf8,
            "utf-16" | "utf16" | "utf-16le" | "unicode" => Charset::Utf16,
            _ => Charset::Ascii,
        }
    }

    /// Charset named by a `Content-Type` value; UTF-8 when none is named
    pub fn from_content_type(content_type: &str) -> Self {
        content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, v)| Self::from_label(v))
            .unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Charset::Utf7 => "utf-7",
            Charset::Utf8 => "utf-8",
            Charset::Utf16 => "utf-16",
            Charset::Ascii => "us-ascii",
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Utf16 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Charset::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Charset::Utf7 => utf7_encode(text).into_bytes(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> AirSyncResult<String> {
        match self {
            Charset::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xef, 0xbb, 0xbf]).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| AirSyncError::Codec(format!("invalid UTF-8 body: {e}")))
            }
            Charset::Utf16 => utf16_decode(bytes),
            Charset::Ascii => Ok(bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '?' })
                .collect()),
            Charset::Utf7 => utf7_decode(bytes),
        }
    }
}

impl Display for Charset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn utf16_decode(bytes: &[u8]) -> AirSyncResult<String> {
    let (big_endian, body) = match bytes {
        [0xfe, 0xff, rest @ ..] => (true, rest),
        [0xff, 0xfe, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };
    if body.len() % 2 != 0 {
        return Err(AirSyncError::Codec("UTF-16 body has an odd length".into()));
    }

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect();

    String::from_utf16(&units).map_err(|e| AirSyncError::Codec(format!("invalid UTF-16 body: {e}")))
}

/// Characters written as themselves in UTF-7
fn is_direct(c: char) -> bool {
    c.is_ascii_alphanumeric() || " \t\r\n'(),-./:?!\"#$%&*;<=>@[]^_`{|}".contains(c)
}

fn is_base64_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

fn utf7_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Vec<u16> = Vec::new();

    let flush = |out: &mut String, pending: &mut Vec<u16>| {
        if pending.is_empty() {
            return;
        }
        let bytes: Vec<u8> = pending.iter().flat_map(|u| u.to_be_bytes()).collect();
        out.push('+');
        out.push_str(&STANDARD_NO_PAD.encode(bytes));
        out.push('-');
        pending.clear();
    };

    for c in text.chars() {
        if c == '+' {
            flush(&mut out, &mut pending);
            out.push_str("+-");
        } else if is_direct(c) {
            flush(&mut out, &mut pending);
            out.push(c);
        } else {
            let mut buf = [0u16; 2];
            pending.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush(&mut out, &mut pending);

    out
}

fn utf7_decode(bytes: &[u8]) -> AirSyncResult<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b != b'+' {
            if !b.is_ascii() {
                return Err(AirSyncError::Codec(format!("byte 0x{b:02x} is not valid UTF-7")));
            }
            out.push(b as char);
            i += 1;
            continue;
        }

        i += 1;
        if bytes.get(i) == Some(&b'-') {
            out.push('+');
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && is_base64_char(bytes[i]) {
            i += 1;
        }
        let decoded = STANDARD_NO_PAD
            .decode(&bytes[start..i])
            .map_err(|e| AirSyncError::Codec(format!("invalid UTF-7 shift sequence: {e}")))?;
        if decoded.len() % 2 != 0 {
            return Err(AirSyncError::Codec(format!(
                "UTF-7 shift sequence at byte {start} decodes to an odd byte count"
            )));
        }
        let units: Vec<u16> = decoded
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        out.push_str(
            &String::from_utf16(&units)
                .map_err(|e| AirSyncError::Codec(format!("invalid UTF-7 text: {e}")))?,
        );

        if bytes.get(i) == Some(&b'-') {
            i += 1;
        }
    }

    Ok(out)
}
