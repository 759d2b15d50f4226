use tracing::trace;

use crate::error::{Result, WireError};
use crate::types::{check_name, DisplayName, Number, PlayerId};

/// Default maximum frame length in bytes.
pub const MAX_FRAME_LEN: usize = 4096;

/// Maximum display-name length in characters.
pub const MAX_NAME_CHARS: usize = 64;

/// A message with a canonical single-line text representation.
pub trait WireMessage: Sized {
    /// Produce the canonical frame text.
    fn encode(&self) -> String;

    /// Parse one frame. Fails closed on anything it does not recognise.
    fn decode(line: &str) -> Result<Self>;
}

/// Decode a frame after enforcing `max_len`.
pub fn decode_frame<M: WireMessage>(line: &str, max_len: usize) -> Result<M> {
    if line.len() > max_len {
        trace!(len = line.len(), max_len, "rejecting oversized frame");
        return Err(WireError::FrameTooLong {
            len: line.len(),
            max: max_len,
        });
    }
    M::decode(line)
}

/// Strip a trailing line terminator, if the sender added one.
pub(crate) fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Cursor over the fields of a tagged frame.
///
/// Works on the raw line: numeric fields and the tag tolerate a trailing
/// line terminator, while [`Fields::verbatim`] keeps it.
pub(crate) struct Fields<'a> {
    tag: char,
    rest: &'a str,
}

impl<'a> Fields<'a> {
    /// Split off the leading tag. The tag must be exactly one character.
    pub(crate) fn open(line: &'a str) -> Result<Self> {
        if trim_line_end(line).is_empty() {
            return Err(WireError::Empty);
        }
        let (head, rest) = line
            .split_once(' ')
            .unwrap_or((trim_line_end(line), ""));
        let mut chars = head.chars();
        match (chars.next(), chars.next()) {
            (Some(tag), None) => Ok(Self { tag, rest }),
            _ => Err(WireError::UnknownTag(head.to_string())),
        }
    }

    pub(crate) fn tag(&self) -> char {
        self.tag
    }

    pub(crate) fn unknown(&self) -> WireError {
        WireError::UnknownTag(self.tag.to_string())
    }

    fn token(&mut self, field: &str) -> Result<&'a str> {
        let rest = self.rest.trim_start_matches(' ');
        let (token, after) = rest.split_once(' ').unwrap_or((rest, ""));
        let token = trim_line_end(token);
        if token.is_empty() {
            return Err(WireError::malformed(self.tag, format!("missing {field}")));
        }
        self.rest = after;
        Ok(token)
    }

    pub(crate) fn player(&mut self) -> Result<PlayerId> {
        let token = self.token("player id")?;
        token.parse::<u32>().map(PlayerId).map_err(|_| {
            WireError::malformed(self.tag, format!("player id is not an integer: {token:?}"))
        })
    }

    pub(crate) fn number(&mut self, field: &str) -> Result<Number> {
        let token = self.token(field)?;
        token.parse::<Number>().map_err(|_| {
            WireError::malformed(
                self.tag,
                format!("{field} is not a finite number: {token:?}"),
            )
        })
    }

    /// A number in the closed range `[0, 1]`.
    pub(crate) fn unit(&mut self, field: &str) -> Result<Number> {
        let number = self.number(field)?;
        if !(0.0..=1.0).contains(&number.value()) {
            return Err(WireError::malformed(
                self.tag,
                format!("{field} out of range [0, 1]: {number}"),
            ));
        }
        Ok(number)
    }

    /// A display name running to the end of the line.
    pub(crate) fn name(self) -> Result<DisplayName> {
        let tag = self.tag;
        check_name(self.rest).map_err(|reason| WireError::malformed(tag, reason))
    }

    /// Everything after the tag separator, byte for byte.
    pub(crate) fn verbatim(self) -> String {
        self.rest.to_string()
    }

    /// Require that no fields remain.
    pub(crate) fn finish(self) -> Result<()> {
        let rest = trim_line_end(self.rest).trim_matches(' ');
        if rest.is_empty() {
            Ok(())
        } else {
            Err(WireError::malformed(
                self.tag,
                format!("unexpected trailing data: {rest:?}"),
            ))
        }
    }
}

/// Append ` <field>` to a frame under construction.
pub(crate) fn with_tail(head: String, tail: &str) -> String {
    if tail.is_empty() {
        head
    } else {
        format!("{head} {tail}")
    }
}
