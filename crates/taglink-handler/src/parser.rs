//! Hex payload to identifier conversion.
//!
//! [`TagParser`] is a pure transformation: raw hex in, validated
//! [`ParsedTag`] out (or `None`). It is stateless apart from its
//! configuration (identifier length and the date-prefix formatter) and has
//! no side effects beyond diagnostic logging.
//!
//! # Decode policy
//!
//! Malformed hex (odd length, non-hex characters) fails fast with
//! [`Error::HexDecode`] instead of producing sentinel characters. `parse`
//! converts any decode failure into a logged `None`; it never returns an
//! error or panics.

use chrono::{DateTime, Local};
use std::fmt;
use taglink_core::constants::{DATE_PREFIX_FORMAT, DEFAULT_RFID_LENGTH, DEFAULT_SEPARATOR};
use taglink_core::{Error, ParsedTag, RawDatagram, Result};
use tracing::warn;

/// Produces the calendar prefix prepended to identifiers.
pub type DateFormatter = Box<dyn Fn(DateTime<Local>) -> String>;

/// Options for [`TagParser::format_rfid`].
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// Prefix to use instead of today's date prefix.
    pub prefix: Option<String>,

    /// Separator to use instead of `-`.
    pub separator: Option<String>,
}

/// Converts raw hex payloads into validated, date-qualified identifiers.
pub struct TagParser {
    rfid_length: usize,
    date_formatter: DateFormatter,
}

impl TagParser {
    /// Create a parser expecting identifiers of `rfid_length` decimal
    /// digits, using the default `YYMMDD` date prefix.
    pub fn new(rfid_length: usize) -> Self {
        Self {
            rfid_length,
            date_formatter: Box::new(Self::default_date_prefix),
        }
    }

    /// Create a parser with a custom date-prefix formatter.
    pub fn with_formatter(
        rfid_length: usize,
        formatter: impl Fn(DateTime<Local>) -> String + 'static,
    ) -> Self {
        Self {
            rfid_length,
            date_formatter: Box::new(formatter),
        }
    }

    /// Default prefix: two-digit year, month, day (`%y%m%d`).
    pub fn default_date_prefix(timestamp: DateTime<Local>) -> String {
        timestamp.format(DATE_PREFIX_FORMAT).to_string()
    }

    /// Configured identifier length.
    pub fn rfid_length(&self) -> usize {
        self.rfid_length
    }

    /// Decode a hex-digit string two characters at a time into the
    /// corresponding byte sequence, interpreted as Latin-1 text.
    ///
    /// # Errors
    /// Returns [`Error::HexDecode`] if the payload has odd length or
    /// contains anything but ASCII hex digits.
    pub fn hex_to_ascii(hex: &str) -> Result<String> {
        let bytes = hex.as_bytes();
        if bytes.len() % 2 != 0 {
            return Err(Error::hex_decode(format!(
                "odd payload length: {}",
                bytes.len()
            )));
        }

        let mut decoded = String::with_capacity(bytes.len() / 2);
        for (index, pair) in bytes.chunks_exact(2).enumerate() {
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                return Err(Error::hex_decode(format!(
                    "invalid hex pair at byte {}",
                    index * 2
                )));
            }
            // pair is two ASCII hex digits, so both conversions are total
            let digits = str::from_utf8(pair).map_err(|_| Error::hex_decode("non-UTF-8 pair"))?;
            let byte = u8::from_str_radix(digits, 16)
                .map_err(|_| Error::hex_decode(format!("invalid hex pair: {digits}")))?;
            decoded.push(char::from(byte));
        }
        Ok(decoded)
    }

    /// Validate a candidate identifier: exact configured length, decimal
    /// digits only.
    pub fn validate_rfid(&self, candidate: &str) -> bool {
        !candidate.is_empty()
            && candidate.len() == self.rfid_length
            && candidate.bytes().all(|b| b.is_ascii_digit())
    }

    /// Parse a raw datagram into a [`ParsedTag`].
    ///
    /// Pipeline: reject empty payload/source, decode hex, trim, strip every
    /// non-digit character (the hardware embeds separators and control
    /// characters), validate, prefix with the formatted date of the
    /// datagram's timestamp.
    ///
    /// Returns `None` on any failure; failures are logged, never propagated.
    pub fn parse(&self, raw: &RawDatagram) -> Option<ParsedTag> {
        if raw.hex_payload.is_empty() || raw.source.is_empty() {
            warn!("datagram rejected: missing payload or source");
            return None;
        }

        let decoded = match Self::hex_to_ascii(&raw.hex_payload) {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, source = %raw.source, "hex decode failed");
                return None;
            }
        };

        let candidate: String = decoded
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();

        if !self.validate_rfid(&candidate) {
            warn!(
                candidate = %candidate,
                raw = %raw.hex_payload,
                expected_length = self.rfid_length,
                "invalid identifier"
            );
            return None;
        }

        let prefix = (self.date_formatter)(raw.timestamp);
        Some(ParsedTag {
            formatted: format!("{prefix}{DEFAULT_SEPARATOR}{candidate}"),
            rfid: candidate,
            source: raw.source.clone(),
            timestamp: raw.timestamp,
            raw_hex: raw.hex_payload.clone(),
        })
    }

    /// Re-format an already-extracted identifier with a custom prefix and
    /// separator. Defaults to today's date prefix and `-`.
    pub fn format_rfid(&self, rfid: &str, options: FormatOptions) -> String {
        let prefix = options
            .prefix
            .unwrap_or_else(|| (self.date_formatter)(Local::now()));
        let separator = options.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
        format!("{prefix}{separator}{rfid}")
    }
}

impl Default for TagParser {
    fn default() -> Self {
        Self::new(DEFAULT_RFID_LENGTH)
    }
}

impl fmt::Debug for TagParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagParser")
            .field("rfid_length", &self.rfid_length)
            .finish_non_exhaustive()
    }
}
