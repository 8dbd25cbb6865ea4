//! Engine.IO v3 polling payload codec.
//!
//! A payload is a concatenation of `<len>:<frame>` entries where `<len>` is
//! the number of *characters* of the frame, not its byte length. The http
//! `Content-Length` of a POST body, on the other hand, is the byte length of
//! the utf-8 encoded payload. The two differ for any non-ascii frame.

use crate::errors::Error;

/// Join wire frames into a single payload body.
pub(crate) fn encode(frames: &[String]) -> String {
    let mut out = String::with_capacity(frames.iter().map(|f| f.len() + 4).sum());
    for frame in frames {
        out.push_str(&frame.chars().count().to_string());
        out.push(':');
        out.push_str(frame);
    }
    out
}

/// Split a payload body back into its frames.
pub(crate) fn decode(body: &str) -> Result<Vec<String>, Error> {
    let mut frames = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        let colon = memchr::memchr(b':', rest.as_bytes()).ok_or(Error::InvalidPayload)?;
        let len: usize = rest[..colon]
            .parse()
            .map_err(|_| Error::InvalidPayload)?;
        let frame = &rest[colon + 1..];
        // `len` counts characters, so the byte end of the frame is the offset
        // of its (len+1)-th character.
        let end = match frame.char_indices().nth(len) {
            Some((offset, _)) => offset,
            None if frame.chars().count() == len => frame.len(),
            None => return Err(Error::InvalidPayload),
        };
        frames.push(frame[..end].to_string());
        rest = &frame[end..];
    }
    Ok(frames)
}
