//! Streaming reader for zone files in RFC 1035 presentation format.
//!
//! [`ZoneParser`] walks the text lazily and yields one [`ResourceRecord`]
//! per entry it understands. Entries that are malformed, or that name a
//! record type the responder does not serve, are skipped with a debug
//! diagnostic. A parser is single-use: build a new one to read again.

use super::record::{RecordData, ResourceRecord};
use super::{Result, ZoneError, constants};
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use std::str::Lines;
use tracing::{debug, trace};

/// Lazy iterator over the entries of one zone file
pub struct ZoneParser<'a> {
    lines: Lines<'a>,
    /// Current origin for relative names, always fully qualified
    origin: Option<String>,
    /// TTL applied to entries without an explicit one
    default_ttl: u32,
    /// Owner of the previous entry, inherited by indented lines
    last_owner: Option<String>,
    /// Line number for diagnostics
    line_number: usize,
    finished: bool,
}

/// One whitespace-separated field of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    /// Octets of the field; `\DDD` escapes contribute a single byte here
    bytes: Vec<u8>,
    quoted: bool,
}

/// Field being accumulated by the tokenizer
#[derive(Default)]
struct PendingField {
    text: String,
    bytes: Vec<u8>,
}

impl PendingField {
    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        let mut utf8 = [0u8; 4];
        self.bytes.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
    }

    fn push_octet(&mut self, octet: u8) {
        self.text.push(char::from(octet));
        self.bytes.push(octet);
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn take(&mut self, quoted: bool) -> Token {
        let field = std::mem::take(self);
        Token {
            text: field.text,
            bytes: field.bytes,
            quoted,
        }
    }
}

impl<'a> ZoneParser<'a> {
    /// Parser with no initial origin; relative names are rejected until a
    /// `$ORIGIN` directive is seen.
    pub fn new(contents: &'a str) -> Self {
        Self {
            lines: contents.lines(),
            origin: None,
            default_ttl: constants::DEFAULT_TTL,
            last_owner: None,
            line_number: 0,
            finished: false,
        }
    }

    /// Parser that starts with `origin` in effect
    pub fn with_origin(contents: &'a str, origin: &str) -> Self {
        let mut parser = Self::new(contents);
        parser.origin = Some(fully_qualify(origin));
        parser
    }

    /// Next entry together with its parse outcome. `None` at end of input.
    pub fn next_entry(&mut self) -> Option<Result<ResourceRecord>> {
        loop {
            let (entry, indented, start_line) = match self.read_entry()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };

            trace!("Parsing entry at line {}: {}", start_line, entry);

            let tokens = match tokenize(&entry) {
                Ok(tokens) => tokens,
                Err(e) => return Some(Err(e)),
            };
            if tokens.is_empty() {
                continue;
            }

            if !indented && !tokens[0].quoted && tokens[0].text.starts_with('$') {
                if let Err(e) = self.apply_directive(&tokens) {
                    return Some(Err(e));
                }
                continue;
            }

            return Some(self.parse_record(&tokens, indented));
        }
    }

    /// Collect one logical entry, joining lines grouped by parentheses.
    /// Returns the text, whether the entry began with whitespace, and the
    /// line it started on.
    fn read_entry(&mut self) -> Option<Result<(String, bool, usize)>> {
        if self.finished {
            return None;
        }

        let mut buffer = String::new();
        let mut depth: i32 = 0;
        let mut indented = false;
        let mut start_line = 0;

        for raw in self.lines.by_ref() {
            self.line_number += 1;
            let line = strip_comment(raw);

            if buffer.is_empty() {
                if line.trim().is_empty() {
                    continue;
                }
                indented = line.starts_with(' ') || line.starts_with('\t');
                start_line = self.line_number;
            } else {
                buffer.push(' ');
            }

            buffer.push_str(line.trim());
            depth += paren_delta(line);

            if depth <= 0 {
                return Some(Ok((buffer, indented, start_line)));
            }
        }

        self.finished = true;
        if buffer.is_empty() {
            None
        } else {
            Some(Err(ZoneError::ParseError(format!(
                "Unclosed parentheses starting at line {}",
                start_line
            ))))
        }
    }

    fn apply_directive(&mut self, tokens: &[Token]) -> Result<()> {
        let directive = tokens[0].text.to_ascii_uppercase();
        match directive.as_str() {
            "$ORIGIN" => {
                let name = tokens
                    .get(1)
                    .ok_or_else(|| ZoneError::ParseError("$ORIGIN requires domain name".to_string()))?;
                let origin = self.qualify(&name.text)?;
                debug!("Set origin to: {}", origin);
                self.origin = Some(origin);
            }
            "$TTL" => {
                let value = tokens
                    .get(1)
                    .ok_or_else(|| ZoneError::ParseError("$TTL requires value".to_string()))?;
                self.default_ttl = parse_ttl(&value.text)?;
                debug!("Set default TTL to: {}", self.default_ttl);
            }
            _ => {
                debug!("Ignoring directive {} at line {}", tokens[0].text, self.line_number);
            }
        }
        Ok(())
    }

    fn parse_record(&mut self, tokens: &[Token], indented: bool) -> Result<ResourceRecord> {
        let mut idx = 0;

        let owner = if indented {
            self.last_owner
                .clone()
                .ok_or_else(|| ZoneError::ParseError("No previous owner name".to_string()))?
        } else {
            idx += 1;
            let owner = self.qualify(&tokens[0].text)?;
            self.last_owner = Some(owner.clone());
            owner
        };

        let mut ttl = None;
        let mut class = DNSResourceClass::IN;
        let mut rtype = None;

        // TTL and class are optional and may come in either order
        while let Some(field) = tokens.get(idx) {
            idx += 1;
            if ttl.is_none() {
                if let Ok(value) = parse_ttl(&field.text) {
                    ttl = Some(value);
                    continue;
                }
            }
            if let Some(parsed) = DNSResourceClass::from_mnemonic(&field.text) {
                class = parsed;
                continue;
            }
            match DNSResourceType::from_mnemonic(&field.text) {
                Some(parsed) => {
                    rtype = Some(parsed);
                    break;
                }
                None => {
                    return Err(ZoneError::ParseError(format!("Invalid field: {}", field.text)));
                }
            }
        }

        let rtype = rtype.ok_or_else(|| ZoneError::ParseError("Missing record type".to_string()))?;
        let rdata = &tokens[idx..];
        if rdata.is_empty() {
            return Err(ZoneError::ParseError("Missing RDATA".to_string()));
        }

        let data = self.parse_rdata(rtype, rdata)?;

        Ok(ResourceRecord {
            owner,
            class,
            ttl: ttl.unwrap_or(self.default_ttl),
            data,
        })
    }

    fn parse_rdata(&self, rtype: DNSResourceType, rdata: &[Token]) -> Result<RecordData> {
        match rtype {
            DNSResourceType::A => {
                let text = single(rtype, rdata)?;
                text.parse()
                    .map(RecordData::A)
                    .map_err(|_| ZoneError::InvalidRecord(format!("Invalid IPv4 address: {}", text)))
            }
            DNSResourceType::AAAA => {
                let text = single(rtype, rdata)?;
                text.parse()
                    .map(RecordData::AAAA)
                    .map_err(|_| ZoneError::InvalidRecord(format!("Invalid IPv6 address: {}", text)))
            }
            DNSResourceType::NS => {
                let text = single(rtype, rdata)?;
                Ok(RecordData::NS(self.qualify(text)?))
            }
            DNSResourceType::MX => {
                if rdata.len() != 2 {
                    return Err(ZoneError::InvalidRecord(format!(
                        "MX record requires 2 fields, got {}",
                        rdata.len()
                    )));
                }
                let preference = rdata[0].text.parse::<u16>().map_err(|_| {
                    ZoneError::InvalidRecord(format!("Invalid MX preference: {}", rdata[0].text))
                })?;
                Ok(RecordData::MX {
                    preference,
                    exchange: self.qualify(&rdata[1].text)?,
                })
            }
            DNSResourceType::TXT => {
                let text: Vec<u8> = rdata.iter().flat_map(|t| t.bytes.iter().copied()).collect();
                if RecordData::txt_wire_len(&text) > usize::from(u16::MAX) {
                    return Err(ZoneError::InvalidRecord(format!(
                        "TXT data of {} bytes does not fit in one record",
                        text.len()
                    )));
                }
                Ok(RecordData::TXT(text))
            }
            other => Err(ZoneError::UnsupportedType(other.to_string())),
        }
    }

    /// Make `name` fully qualified against the current origin
    fn qualify(&self, name: &str) -> Result<String> {
        if name == "@" {
            return self
                .origin
                .clone()
                .ok_or_else(|| ZoneError::RelativeName(name.to_string()));
        }
        if name.ends_with('.') {
            return Ok(name.to_string());
        }
        match &self.origin {
            Some(origin) if origin == "." => Ok(format!("{}.", name)),
            Some(origin) => Ok(format!("{}.{}", name, origin)),
            None => Err(ZoneError::RelativeName(name.to_string())),
        }
    }
}

impl Iterator for ZoneParser<'_> {
    type Item = ResourceRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_entry()? {
                Ok(record) => return Some(record),
                Err(e) => debug!("Skipping zone entry near line {}: {}", self.line_number, e),
            }
        }
    }
}

fn fully_qualify(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

fn single<'t>(rtype: DNSResourceType, rdata: &'t [Token]) -> Result<&'t str> {
    match rdata {
        [only] => Ok(&only.text),
        _ => Err(ZoneError::InvalidRecord(format!(
            "{} record requires 1 field, got {}",
            rtype,
            rdata.len()
        ))),
    }
}

/// Remove a trailing `;` comment, ignoring semicolons inside quotes
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (pos, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..pos],
            _ => {}
        }
    }
    line
}

/// Net parenthesis depth change of a (comment-free) line
fn paren_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in line.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => delta += 1,
            ')' if !in_quotes => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Split an entry into fields, honouring quotes and escapes and dropping
/// grouping parentheses.
fn tokenize(entry: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current = PendingField::default();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = entry.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let mut digits = String::new();
                while digits.len() < 3 && chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    digits.extend(chars.next());
                }
                if digits.is_empty() {
                    let next = chars
                        .next()
                        .ok_or_else(|| ZoneError::ParseError("Dangling escape".to_string()))?;
                    current.push_char(next);
                } else {
                    let value = digits
                        .parse::<u8>()
                        .map_err(|_| ZoneError::ParseError(format!("Invalid escape \\{}", digits)))?;
                    current.push_octet(value);
                }
            }
            '"' => {
                if in_quotes {
                    tokens.push(current.take(true));
                    quoted = false;
                } else {
                    if !current.is_empty() {
                        tokens.push(current.take(quoted));
                    }
                    quoted = true;
                }
                in_quotes = !in_quotes;
            }
            _ if in_quotes => current.push_char(ch),
            '(' | ')' | ' ' | '\t' => {
                if !current.is_empty() {
                    tokens.push(current.take(quoted));
                }
            }
            _ => current.push_char(ch),
        }
    }

    if in_quotes {
        return Err(ZoneError::ParseError("Unterminated quoted string".to_string()));
    }
    if !current.is_empty() {
        tokens.push(current.take(quoted));
    }

    Ok(tokens)
}

/// Parse TTL value (supports suffixes like 1h, 30m, 1h30m)
fn parse_ttl(s: &str) -> Result<u32> {
    if s.is_empty() || !s.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ZoneError::InvalidTTL(s.to_string()));
    }

    let mut total: u64 = 0;
    let mut number: u64 = 0;
    let mut pending = false;
    for ch in s.chars() {
        if let Some(digit) = ch.to_digit(10) {
            number = number * 10 + u64::from(digit);
            pending = true;
            if number > u64::from(u32::MAX) {
                return Err(ZoneError::InvalidTTL(s.to_string()));
            }
            continue;
        }
        let unit = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return Err(ZoneError::InvalidTTL(s.to_string())),
        };
        if !pending {
            return Err(ZoneError::InvalidTTL(s.to_string()));
        }
        total += number * unit;
        number = 0;
        pending = false;
    }
    total += number;

    u32::try_from(total).map_err(|_| ZoneError::InvalidTTL(s.to_string()))
}
