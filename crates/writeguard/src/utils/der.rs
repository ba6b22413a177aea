//! Minimal DER reader for walking X.509 certificates
//!
//! Only single-byte tags and definite lengths are supported, which is all
//! DER permits for the structures read here.

use crate::error::{Error, Result};

pub(crate) const TAG_INTEGER: u8 = 0x02;
pub(crate) const TAG_BIT_STRING: u8 = 0x03;
pub(crate) const TAG_OBJECT_IDENTIFIER: u8 = 0x06;
pub(crate) const TAG_SEQUENCE: u8 = 0x30;
/// Context-specific, constructed, tag number 0 (`[0]` explicit)
pub(crate) const TAG_CONTEXT_0: u8 = 0xA0;

/// Largest number of length octets accepted in long form
const MAX_LENGTH_OCTETS: usize = 4;

fn der_error(details: impl std::fmt::Display) -> Error {
    Error::CertificateParse(format!("der: {details}"))
}

/// A single tag-length-value element borrowed from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tlv<'a> {
    pub tag: u8,
    /// Tag, length and content octets
    pub raw: &'a [u8],
    /// Content octets only
    pub content: &'a [u8],
}

/// Sequential reader over concatenated DER elements
#[derive(Debug, Clone)]
pub(crate) struct DerReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Tag of the next element without consuming it
    pub(crate) fn peek_tag(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Read the next element whatever its tag
    pub(crate) fn read_tlv(&mut self) -> Result<Tlv<'a>> {
        let start = self.pos;
        let tag = self
            .peek_tag()
            .ok_or_else(|| der_error("unexpected end of input"))?;

        if tag & 0x1F == 0x1F {
            return Err(der_error(format!("multi-byte tag 0x{tag:02x} not supported")));
        }

        let (length, length_octets) = read_length(&self.input[start + 1..])?;
        let content_start = start + 1 + length_octets;
        let end = content_start
            .checked_add(length)
            .ok_or_else(|| der_error("length overflow"))?;

        if end > self.input.len() {
            return Err(der_error(format!(
                "element of {length} bytes exceeds remaining {} bytes",
                self.input.len() - content_start
            )));
        }

        self.pos = end;

        Ok(Tlv {
            tag,
            raw: &self.input[start..end],
            content: &self.input[content_start..end],
        })
    }

    /// Read the next element and require it to carry `tag`
    ///
    /// `what` names the element in the error message.
    pub(crate) fn expect(&mut self, tag: u8, what: &str) -> Result<Tlv<'a>> {
        match self.peek_tag() {
            Some(found) if found == tag => self.read_tlv(),
            Some(found) => Err(der_error(format!(
                "{what}: expected tag 0x{tag:02x}, found 0x{found:02x}"
            ))),
            None => Err(der_error(format!("{what}: unexpected end of input"))),
        }
    }
}

/// Decode a DER length, returning the length and the number of octets it used
fn read_length(input: &[u8]) -> Result<(usize, usize)> {
    let first = *input
        .first()
        .ok_or_else(|| der_error("missing length octet"))?;

    // Short form
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let count = (first & 0x7F) as usize;
    if count == 0 {
        return Err(der_error("indefinite length not allowed"));
    }
    if count > MAX_LENGTH_OCTETS {
        return Err(der_error(format!("{count} length octets not supported")));
    }

    let octets = input
        .get(1..=count)
        .ok_or_else(|| der_error("truncated long-form length"))?;

    let length = octets
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    Ok((length, 1 + count))
}
