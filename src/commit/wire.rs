//! commit/wire — минимальный кодек protobuf wire format для записей коммитов.
//!
//! Поддерживаемые wire types: 0 (varint), 1 (fixed64), 2 (length-delimited), 5 (fixed32).
//! Группы (3/4) и прочие — ошибка. Неизвестные поля пропускаются по wire type.

use thiserror::Error;

pub const WT_VARINT: u8 = 0;
pub const WT_FIXED64: u8 = 1;
pub const WT_LEN: u8 = 2;
pub const WT_FIXED32: u8 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("truncated input at offset {0}")]
    Truncated(usize),
    #[error("varint longer than 10 bytes at offset {0}")]
    VarintOverflow(usize),
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType { field: u32, wire_type: u8 },
    #[error("field {field}: expected wire type {expected}, got {got}")]
    WrongWireType { field: u32, expected: u8, got: u8 },
    #[error("invalid field number 0")]
    ZeroField,
    #[error("field {field}: {reason}")]
    BadValue { field: u32, reason: String },
}

pub type WireResult<T> = std::result::Result<T, WireError>;

/// Последовательный читатель полей сообщения.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_varint(&mut self) -> WireResult<u64> {
        let start = self.pos;
        let mut out: u64 = 0;
        for i in 0..10 {
            let b = *self.buf.get(self.pos).ok_or(WireError::Truncated(self.pos))?;
            self.pos += 1;
            // 10-й байт может нести только младший бит
            if i == 9 && b > 1 {
                return Err(WireError::VarintOverflow(start));
            }
            out |= ((b & 0x7F) as u64) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(out);
            }
        }
        Err(WireError::VarintOverflow(start))
    }

    /// Следующий ключ поля: (номер поля, wire type). None — конец сообщения.
    pub fn next_field(&mut self) -> WireResult<Option<(u32, u8)>> {
        if self.is_eof() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;
        if field == 0 {
            return Err(WireError::ZeroField);
        }
        Ok(Some((field, wire_type)))
    }

    pub fn read_len_delimited(&mut self) -> WireResult<&'a [u8]> {
        let len = self.read_varint()?;
        let start = self.pos;
        let end = usize::try_from(len)
            .ok()
            .and_then(|l| start.checked_add(l))
            .filter(|&e| e <= self.buf.len())
            .ok_or(WireError::Truncated(start))?;
        self.pos = end;
        Ok(&self.buf[start..end])
    }

    fn advance(&mut self, n: usize) -> WireResult<()> {
        if self.pos + n > self.buf.len() {
            return Err(WireError::Truncated(self.pos));
        }
        self.pos += n;
        Ok(())
    }

    pub fn skip(&mut self, field: u32, wire_type: u8) -> WireResult<()> {
        match wire_type {
            WT_VARINT => self.read_varint().map(|_| ()),
            WT_FIXED64 => self.advance(8),
            WT_LEN => self.read_len_delimited().map(|_| ()),
            WT_FIXED32 => self.advance(4),
            other => Err(WireError::UnsupportedWireType {
                field,
                wire_type: other,
            }),
        }
    }
}

/// Проверить wire type известного поля.
#[inline]
pub fn expect_wire_type(field: u32, got: u8, expected: u8) -> WireResult<()> {
    if got != expected {
        return Err(WireError::WrongWireType {
            field,
            expected,
            got,
        });
    }
    Ok(())
}

/// int64 поле версии: отрицательные значения (varint с установленным старшим битом) — ошибка.
pub fn varint_to_version(field: u32, raw: u64) -> WireResult<u64> {
    if raw > i64::MAX as u64 {
        return Err(WireError::BadValue {
            field,
            reason: format!("negative version {}", raw as i64),
        });
    }
    Ok(raw)
}

// ---------- encoding ----------

pub fn put_varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7F) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

#[inline]
pub fn put_key(out: &mut Vec<u8>, field: u32, wire_type: u8) {
    put_varint(out, ((field as u64) << 3) | wire_type as u64);
}

pub fn put_varint_field(out: &mut Vec<u8>, field: u32, v: u64) {
    put_key(out, field, WT_VARINT);
    put_varint(out, v);
}

pub fn put_bytes_field(out: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    put_key(out, field, WT_LEN);
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}
