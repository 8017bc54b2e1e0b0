use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, trace};

use crate::doc::{Document, Kind, NodeId, Scalar};
use crate::escape;

const BLOCK: usize = 8192;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed {charset} byte sequence at offset {offset:#x}")]
    Malformed { charset: Charset, offset: u64 },
    #[error("lone surrogate code unit in input")]
    LoneSurrogate,
    #[error("unexpected character '{found}'")]
    Unexpected { found: char },
    #[error("malformed number literal '{literal}'")]
    BadNumber { literal: String },
    #[error("object member with empty name")]
    EmptyName,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("input does not contain a root container")]
    NoRoot,
}

impl ReadError {
    /// Failure of the underlying source: stream error, undecodable bytes,
    /// broken surrogate pairing.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            ReadError::Io(_) | ReadError::Malformed { .. } | ReadError::LoneSurrogate
        )
    }

    /// Violation of the text grammar; the input was readable but not a
    /// document.
    pub fn is_grammar(&self) -> bool {
        !self.is_source()
    }
}

/// Character set of a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl Charset {
    /// Resolves common labels, ignoring case, '-' and '_'.
    pub fn from_label(label: &str) -> Option<Charset> {
        let key: String = label
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "utf8" => Some(Charset::Utf8),
            "utf16" | "utf16le" => Some(Charset::Utf16Le),
            "utf16be" => Some(Charset::Utf16Be),
            "latin1" | "iso88591" => Some(Charset::Latin1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Charset::Utf8 => "utf-8",
            Charset::Utf16Le => "utf-16le",
            Charset::Utf16Be => "utf-16be",
            Charset::Latin1 => "latin-1",
        })
    }
}

/// Parse options. Strict by default; `relaxed` additionally accepts bare
/// unquoted scalar values terminated by `,` `:` `}` `]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOpts {
    pub relaxed: bool,
}

// A source of UTF-16 code units. Returning 0 units means end of input.
trait UnitSource {
    fn read_units(&mut self, dst: &mut [u16]) -> Result<usize, ReadError>;
}

struct StrUnits<'a> {
    units: std::str::EncodeUtf16<'a>,
}

impl<'a> StrUnits<'a> {
    fn new(text: &'a str) -> Self {
        Self { units: text.encode_utf16() }
    }
}

impl UnitSource for StrUnits<'_> {
    fn read_units(&mut self, dst: &mut [u16]) -> Result<usize, ReadError> {
        let mut n = 0;
        while n < dst.len() {
            let Some(u) = self.units.next() else { break };
            dst[n] = u;
            n += 1;
        }
        Ok(n)
    }
}

// Byte stream decoded per charset. Keeps its own block buffer; a sequence
// split across reads is compacted to the front before the next refill.
struct ByteUnits<R: Read> {
    src: R,
    charset: Charset,
    buf: Vec<u8>,
    pos: usize,
    limit: usize,
    consumed: u64,
    eof: bool,
}

impl<R: Read> ByteUnits<R> {
    fn new(src: R, charset: Charset) -> Self {
        Self {
            src,
            charset,
            buf: vec![0; BLOCK],
            pos: 0,
            limit: 0,
            consumed: 0,
            eof: false,
        }
    }

    fn refill(&mut self) -> Result<(), ReadError> {
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.limit, 0);
            self.limit -= self.pos;
            self.pos = 0;
        }
        while !self.eof && self.limit < self.buf.len() {
            let n = self.src.read(&mut self.buf[self.limit..])?;
            if n == 0 {
                self.eof = true;
            } else {
                self.limit += n;
                break;
            }
        }
        Ok(())
    }

    fn malformed(&self) -> ReadError {
        ReadError::Malformed { charset: self.charset, offset: self.consumed }
    }

    fn take(&mut self, n: usize) -> &[u8] {
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        self.consumed += n as u64;
        bytes
    }

    // Decodes one scalar value from the buffered bytes. Ok(None) with
    // available < needed means the caller should refill first.
    fn next_scalar(&mut self) -> Result<Option<Decoded>, ReadError> {
        let avail = self.limit - self.pos;
        if avail == 0 {
            return Ok(if self.eof { Some(Decoded::End) } else { None });
        }
        match self.charset {
            Charset::Latin1 => {
                let b = self.take(1)[0];
                Ok(Some(Decoded::Unit(b as u16)))
            }
            Charset::Utf16Le | Charset::Utf16Be => {
                if avail < 2 {
                    if self.eof {
                        return Err(self.malformed());
                    }
                    return Ok(None);
                }
                let big = self.charset == Charset::Utf16Be;
                let b = self.take(2);
                let u = if big {
                    u16::from_be_bytes([b[0], b[1]])
                } else {
                    u16::from_le_bytes([b[0], b[1]])
                };
                Ok(Some(Decoded::Unit(u)))
            }
            Charset::Utf8 => {
                let b0 = self.buf[self.pos];
                let need = match b0 {
                    0x00..=0x7F => 1,
                    0xC0..=0xDF => 2,
                    0xE0..=0xEF => 3,
                    0xF0..=0xF7 => 4,
                    _ => return Err(self.malformed()),
                };
                if avail < need {
                    if self.eof {
                        return Err(self.malformed());
                    }
                    return Ok(None);
                }
                let mut seq = [0u8; 4];
                seq[..need].copy_from_slice(&self.buf[self.pos..self.pos + need]);
                self.pos += need;
                self.consumed += need as u64;
                let mut cp = match need {
                    1 => seq[0] as u32,
                    2 => (seq[0] & 0x1F) as u32,
                    3 => (seq[0] & 0x0F) as u32,
                    _ => (seq[0] & 0x07) as u32,
                };
                for &b in &seq[1..need] {
                    if b & 0xC0 != 0x80 {
                        return Err(self.malformed());
                    }
                    cp = (cp << 6) | (b & 0x3F) as u32;
                }
                match char::from_u32(cp) {
                    Some(c) => Ok(Some(Decoded::Char(c))),
                    None => Err(self.malformed()),
                }
            }
        }
    }
}

enum Decoded {
    Unit(u16),
    Char(char),
    End,
}

impl<R: Read> UnitSource for ByteUnits<R> {
    fn read_units(&mut self, dst: &mut [u16]) -> Result<usize, ReadError> {
        let mut n = 0;
        // A supplementary character produces two units; leave room.
        while n + 2 <= dst.len() {
            match self.next_scalar()? {
                Some(Decoded::End) => break,
                Some(Decoded::Unit(u)) => {
                    dst[n] = u;
                    n += 1;
                }
                Some(Decoded::Char(c)) => {
                    n += c.encode_utf16(&mut dst[n..]).len();
                }
                None => {
                    self.refill()?;
                    if n > 0 && self.pos == self.limit && self.eof {
                        break;
                    }
                }
            }
        }
        Ok(n)
    }
}

// One in-progress container during structural scanning, together with the
// pending member name for its next child (empty when none).
struct Frame {
    name: String,
    container: NodeId,
}

enum Tok {
    Str,
    Bool(bool),
    Null,
    Int(i64),
    Float(f64),
}

struct Pending {
    raw: String,
    tok: Tok,
}

impl Pending {
    // The token as member-name text.
    fn text(&self) -> String {
        match self.tok {
            Tok::Str => escape::unescape(&self.raw),
            _ => self.raw.clone(),
        }
    }
}

// Streaming reader: block-buffered code units in front of a single-pass,
// non-recursive structural scanner. Owns its source until read() returns.
struct Reader<S: UnitSource> {
    src: S,
    buf: Vec<u16>,
    pos: usize,
    limit: usize,
    eof: bool,
    peeked: Option<char>,
    opts: ReadOpts,
}

impl<S: UnitSource> Reader<S> {
    fn new(src: S, opts: ReadOpts) -> Self {
        Self {
            src,
            buf: vec![0; BLOCK],
            pos: 0,
            limit: 0,
            eof: false,
            peeked: None,
            opts,
        }
    }

    fn fill(&mut self) -> Result<(), ReadError> {
        if self.eof {
            return Ok(());
        }
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.limit, 0);
            self.limit -= self.pos;
            self.pos = 0;
        }
        let n = self.src.read_units(&mut self.buf[self.limit..])?;
        if n == 0 {
            self.eof = true;
        } else {
            self.limit += n;
            trace!(units = n, "buffer refill");
        }
        Ok(())
    }

    fn next_unit(&mut self) -> Result<Option<u16>, ReadError> {
        if self.pos == self.limit {
            self.fill()?;
            if self.pos == self.limit {
                return Ok(None);
            }
        }
        let u = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(u))
    }

    // One full code point: a BMP unit directly, or a validated surrogate
    // pair combined. None is the end-of-input sentinel.
    fn next_codepoint(&mut self) -> Result<Option<char>, ReadError> {
        if let Some(c) = self.peeked.take() {
            return Ok(Some(c));
        }
        let Some(u) = self.next_unit()? else { return Ok(None) };
        match u {
            0xD800..=0xDBFF => {
                let Some(lo) = self.next_unit()? else {
                    return Err(ReadError::LoneSurrogate);
                };
                if !(0xDC00..=0xDFFF).contains(&lo) {
                    return Err(ReadError::LoneSurrogate);
                }
                let cp = 0x10000 + (((u as u32) - 0xD800) << 10) + ((lo as u32) - 0xDC00);
                Ok(Some(char::from_u32(cp).unwrap_or('\u{fffd}')))
            }
            0xDC00..=0xDFFF => Err(ReadError::LoneSurrogate),
            u => Ok(Some(char::from_u32(u as u32).unwrap_or('\u{fffd}'))),
        }
    }

    fn peek_codepoint(&mut self) -> Result<Option<char>, ReadError> {
        if self.peeked.is_none() {
            self.peeked = self.next_codepoint()?;
        }
        Ok(self.peeked)
    }

    fn read(mut self) -> Result<Document, ReadError> {
        let mut doc = Document::shell();
        let mut frames: Vec<Frame> = Vec::new();
        let mut pending: Option<Pending> = None;

        // Drop exactly one leading byte-order mark.
        if self.peek_codepoint()? == Some('\u{feff}') {
            self.next_codepoint()?;
        }

        loop {
            let Some(c) = self.next_codepoint()? else {
                return Err(if frames.is_empty() {
                    ReadError::NoRoot
                } else {
                    ReadError::UnexpectedEof
                });
            };
            match c {
                c if c.is_whitespace() => {}
                '{' | '[' => {
                    if pending.is_some() {
                        return Err(ReadError::Unexpected { found: c });
                    }
                    if let Some(top) = frames.last()
                        && doc.kind(top.container) == Kind::Object
                        && top.name.is_empty()
                    {
                        return Err(ReadError::EmptyName);
                    }
                    let container =
                        if c == '{' { doc.alloc_object() } else { doc.alloc_array() };
                    frames.push(Frame { name: String::new(), container });
                }
                '}' | ']' => {
                    let Some(top) = frames.last() else {
                        return Err(ReadError::Unexpected { found: c });
                    };
                    let want = if c == '}' { Kind::Object } else { Kind::Array };
                    if doc.kind(top.container) != want {
                        return Err(ReadError::Unexpected { found: c });
                    }
                    Self::commit(&mut doc, &mut frames, pending.take())?;
                    let Some(frame) = frames.pop() else {
                        return Err(ReadError::Unexpected { found: c });
                    };
                    let finished = frame.container;
                    match frames.last_mut() {
                        Some(parent) => {
                            if doc.kind(parent.container) == Kind::Object {
                                let name = std::mem::take(&mut parent.name);
                                doc.attach(parent.container, &name, finished);
                            } else {
                                doc.append(parent.container, finished);
                            }
                        }
                        None => {
                            doc.set_root(finished);
                            debug!(nodes = doc.node_count(), "document read");
                            return Ok(doc);
                        }
                    }
                }
                ':' => {
                    let Some(top) = frames.last_mut() else {
                        return Err(ReadError::Unexpected { found: c });
                    };
                    top.name = pending.take().map(|p| p.text()).unwrap_or_default();
                }
                ',' => {
                    if frames.is_empty() {
                        return Err(ReadError::Unexpected { found: c });
                    }
                    Self::commit(&mut doc, &mut frames, pending.take())?;
                }
                '"' => {
                    if pending.is_some() {
                        return Err(ReadError::Unexpected { found: c });
                    }
                    let raw = self.scan_quoted()?;
                    pending = Some(Pending { raw, tok: Tok::Str });
                }
                c => {
                    if pending.is_some() {
                        return Err(ReadError::Unexpected { found: c });
                    }
                    pending = Some(self.scan_scalar(c)?);
                }
            }
        }
    }

    // Finalize the pending scalar, if any, into the innermost container.
    fn commit(
        doc: &mut Document,
        frames: &mut [Frame],
        pending: Option<Pending>,
    ) -> Result<(), ReadError> {
        let Some(p) = pending else { return Ok(()) };
        let Some(top) = frames.last_mut() else { return Ok(()) };
        let node = match p.tok {
            Tok::Str => {
                let text = escape::unescape(&p.raw);
                doc.alloc(Scalar::Str(text))
            }
            Tok::Bool(b) => doc.alloc(Scalar::Bool(b)),
            Tok::Null => doc.alloc(Scalar::Null),
            Tok::Int(i) => doc.alloc(Scalar::Int(i)),
            Tok::Float(f) => doc.alloc(Scalar::Float(f)),
        };
        if doc.kind(top.container) == Kind::Object {
            let name = std::mem::take(&mut top.name);
            if name.is_empty() {
                return Err(ReadError::EmptyName);
            }
            doc.attach(top.container, &name, node);
        } else {
            doc.append(top.container, node);
        }
        Ok(())
    }

    // Raw capture between quotes; escapes are carried through untouched and
    // resolved by the codec when the value is committed.
    fn scan_quoted(&mut self) -> Result<String, ReadError> {
        let mut raw = String::new();
        loop {
            let Some(c) = self.next_codepoint()? else {
                return Err(ReadError::UnterminatedString);
            };
            match c {
                '"' => return Ok(raw),
                '\\' => {
                    raw.push('\\');
                    let Some(e) = self.next_codepoint()? else {
                        return Err(ReadError::UnterminatedString);
                    };
                    raw.push(e);
                }
                c => raw.push(c),
            }
        }
    }

    fn scan_scalar(&mut self, first: char) -> Result<Pending, ReadError> {
        match first {
            '-' | '0'..='9' => self.scan_number(first),
            't' | 'f' | 'n' => self.scan_keyword(first),
            c if self.opts.relaxed => self.scan_bare(c.to_string()),
            c => Err(ReadError::Unexpected { found: c }),
        }
    }

    fn is_terminator(c: char) -> bool {
        matches!(c, ',' | ':' | '}' | ']')
    }

    fn scan_number(&mut self, first: char) -> Result<Pending, ReadError> {
        let mut raw = String::new();
        raw.push(first);
        let mut digits = usize::from(first != '-');
        let mut frac = false;
        let mut frac_digits = 0;
        let mut exp = false;
        let mut exp_digits = 0;
        loop {
            match self.peek_codepoint()? {
                Some(c) if c.is_ascii_digit() => {
                    self.next_codepoint()?;
                    raw.push(c);
                    if exp {
                        exp_digits += 1;
                    } else if frac {
                        frac_digits += 1;
                    } else {
                        digits += 1;
                    }
                }
                Some('.') => {
                    self.next_codepoint()?;
                    raw.push('.');
                    if frac || exp || digits == 0 {
                        return Err(ReadError::BadNumber { literal: raw });
                    }
                    frac = true;
                }
                Some(c) if c == 'e' || c == 'E' => {
                    self.next_codepoint()?;
                    raw.push(c);
                    if exp || digits == 0 || (frac && frac_digits == 0) {
                        return Err(ReadError::BadNumber { literal: raw });
                    }
                    exp = true;
                    // The exponent sign is not optional.
                    match self.peek_codepoint()? {
                        Some(s @ ('+' | '-')) => {
                            self.next_codepoint()?;
                            raw.push(s);
                        }
                        _ => return Err(ReadError::BadNumber { literal: raw }),
                    }
                }
                Some(c) if c.is_whitespace() || Self::is_terminator(c) => break,
                None => break,
                Some(c) => {
                    raw.push(c);
                    return Err(ReadError::BadNumber { literal: raw });
                }
            }
        }
        let complete = digits > 0
            && (!frac || frac_digits > 0)
            && (!exp || exp_digits > 0);
        if !complete {
            return Err(ReadError::BadNumber { literal: raw });
        }
        let tok = if frac || exp {
            match raw.parse::<f64>() {
                Ok(f) => Tok::Float(f),
                Err(_) => return Err(ReadError::BadNumber { literal: raw }),
            }
        } else {
            match raw.parse::<i64>() {
                Ok(i) => Tok::Int(i),
                Err(_) => return Err(ReadError::BadNumber { literal: raw }),
            }
        };
        Ok(Pending { raw, tok })
    }

    // Shared sequence matcher for the keyword literals.
    fn match_seq(&mut self, raw: &mut String, rest: &str) -> Result<bool, ReadError> {
        for expect in rest.chars() {
            match self.peek_codepoint()? {
                Some(c) if c == expect => {
                    self.next_codepoint()?;
                    raw.push(c);
                }
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    fn scan_keyword(&mut self, first: char) -> Result<Pending, ReadError> {
        let (rest, tok) = match first {
            't' => ("rue", Tok::Bool(true)),
            'f' => ("alse", Tok::Bool(false)),
            _ => ("ull", Tok::Null),
        };
        let mut raw = String::new();
        raw.push(first);
        if self.match_seq(&mut raw, rest)? {
            // The literal must stand alone; anything glued to it is either a
            // bare token (relaxed) or a grammar error (strict).
            match self.peek_codepoint()? {
                None => return Ok(Pending { raw, tok }),
                Some(c) if c.is_whitespace() || Self::is_terminator(c) => {
                    return Ok(Pending { raw, tok });
                }
                Some(c) if !self.opts.relaxed => {
                    return Err(ReadError::Unexpected { found: c });
                }
                Some(_) => {}
            }
        } else if !self.opts.relaxed {
            let found = self.peek_codepoint()?.ok_or(ReadError::UnexpectedEof)?;
            return Err(ReadError::Unexpected { found });
        }
        self.scan_bare(raw)
    }

    // Relaxed-mode bare value: everything up to one of , : } ] with string
    // escaping rules; trailing whitespace is trimmed.
    fn scan_bare(&mut self, mut raw: String) -> Result<Pending, ReadError> {
        loop {
            match self.peek_codepoint()? {
                None => break,
                Some(c) if Self::is_terminator(c) => break,
                Some('\\') => {
                    self.next_codepoint()?;
                    raw.push('\\');
                    let Some(e) = self.next_codepoint()? else {
                        return Err(ReadError::UnexpectedEof);
                    };
                    raw.push(e);
                }
                Some(c) => {
                    self.next_codepoint()?;
                    raw.push(c);
                }
            }
        }
        raw.truncate(raw.trim_end().len());
        Ok(Pending { raw, tok: Tok::Str })
    }
}

/// Parses a document from in-memory text.
pub fn parse_str(text: &str, opts: &ReadOpts) -> Result<Document, ReadError> {
    Reader::new(StrUnits::new(text), *opts).read()
}

/// Parses a document from a byte stream decoded with the given charset. The
/// stream is owned for the duration of the call and released on every path.
pub fn parse_stream<R: Read>(
    stream: R,
    charset: Charset,
    opts: &ReadOpts,
) -> Result<Document, ReadError> {
    Reader::new(ByteUnits::new(stream, charset), *opts).read()
}

/// Parses a document from a file decoded with the given charset.
pub fn parse_file(
    path: &Path,
    charset: Charset,
    opts: &ReadOpts,
) -> Result<Document, ReadError> {
    let file = File::open(path)?;
    parse_stream(file, charset, opts)
}
