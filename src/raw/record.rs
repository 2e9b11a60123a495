//! raw/record — кодирование и чтение кадров raw log (SDLOG001) с проверкой CRC32C.
//!
//! Что здесь:
//! - build_hdr_with_crc: заголовок записи (16 байт) с CRC32C по header[0..crc) + key + value.
//! - write_record: записать [header][key][value] в writer по текущей позиции.
//! - read_next_record: разобрать следующую запись из буфера (обычно mmap файла лога).
//!
//! Чтение толерантно к частичному хвосту (Ok(None)); CRC mismatch — ошибка.

use anyhow::{anyhow, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;

use crate::consts::{
    LOG_REC_DELETE, LOG_REC_HDR_SIZE, LOG_REC_OFF_CRC32, LOG_REC_OFF_FLAGS, LOG_REC_OFF_KEY_LEN,
    LOG_REC_OFF_RESERVED, LOG_REC_OFF_TYPE, LOG_REC_OFF_VAL_LEN, LOG_REC_PUT,
};

/// Одна запись лога, заимствованная из буфера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord<'a> {
    pub rec_type: u8,
    pub key: &'a [u8],
    pub value: &'a [u8],
    /// Позиция начала заголовка записи.
    pub pos: usize,
}

impl LogRecord<'_> {
    pub fn is_delete(&self) -> bool {
        self.rec_type == LOG_REC_DELETE
    }
}

/// Инкрементальный CRC32C по трём срезам без аллокаций.
#[inline]
fn crc32c_of_parts(head_without_crc: &[u8], key: &[u8], value: &[u8]) -> u32 {
    let c = crc32c::crc32c_append(0, head_without_crc);
    let c = crc32c::crc32c_append(c, key);
    crc32c::crc32c_append(c, value)
}

/// Построить заголовок записи с заполненным CRC32C.
pub fn build_hdr_with_crc(rec_type: u8, key: &[u8], value: &[u8]) -> [u8; LOG_REC_HDR_SIZE] {
    let mut hdr = [0u8; LOG_REC_HDR_SIZE];
    hdr[LOG_REC_OFF_TYPE] = rec_type;
    hdr[LOG_REC_OFF_FLAGS] = 0;
    LittleEndian::write_u16(&mut hdr[LOG_REC_OFF_RESERVED..LOG_REC_OFF_RESERVED + 2], 0);
    LittleEndian::write_u32(
        &mut hdr[LOG_REC_OFF_KEY_LEN..LOG_REC_OFF_KEY_LEN + 4],
        key.len() as u32,
    );
    LittleEndian::write_u32(
        &mut hdr[LOG_REC_OFF_VAL_LEN..LOG_REC_OFF_VAL_LEN + 4],
        value.len() as u32,
    );

    let crc = crc32c_of_parts(&hdr[..LOG_REC_OFF_CRC32], key, value);
    LittleEndian::write_u32(&mut hdr[LOG_REC_OFF_CRC32..LOG_REC_OFF_CRC32 + 4], crc);
    hdr
}

/// Записать одну запись [header][key][value] в текущую позицию writer’а.
/// Возвращает число записанных байт.
pub fn write_record<W: Write>(writer: &mut W, rec_type: u8, key: &[u8], value: &[u8]) -> Result<u64> {
    if rec_type != LOG_REC_PUT && rec_type != LOG_REC_DELETE {
        return Err(anyhow!("unknown log record type {}", rec_type));
    }
    if key.len() > u32::MAX as usize || value.len() > u32::MAX as usize {
        return Err(anyhow!(
            "record too large for raw log: key {} B, value {} B (max {})",
            key.len(),
            value.len(),
            u32::MAX
        ));
    }

    let hdr = build_hdr_with_crc(rec_type, key, value);
    writer.write_all(&hdr)?;
    writer.write_all(key)?;
    if !value.is_empty() {
        writer.write_all(value)?;
    }
    Ok((LOG_REC_HDR_SIZE + key.len() + value.len()) as u64)
}

/// Считать следующую запись с позиции pos.
///
/// Возвращает:
/// - Ok(Some((rec, next_pos))) — запись валидна;
/// - Ok(None) — EOF или частичный хвост (заголовок/тело не умещаются в буфер);
/// - Err(e) — CRC mismatch или неизвестный тип записи.
pub fn read_next_record(buf: &[u8], pos: usize) -> Result<Option<(LogRecord<'_>, usize)>> {
    if pos + LOG_REC_HDR_SIZE > buf.len() {
        return Ok(None);
    }
    let hdr = &buf[pos..pos + LOG_REC_HDR_SIZE];

    let key_len = LittleEndian::read_u32(&hdr[LOG_REC_OFF_KEY_LEN..LOG_REC_OFF_KEY_LEN + 4]) as usize;
    let val_len = LittleEndian::read_u32(&hdr[LOG_REC_OFF_VAL_LEN..LOG_REC_OFF_VAL_LEN + 4]) as usize;

    let key_start = pos + LOG_REC_HDR_SIZE;
    let val_start = key_start + key_len;
    let next_pos = val_start + val_len;
    if next_pos > buf.len() {
        return Ok(None);
    }

    let key = &buf[key_start..val_start];
    let value = &buf[val_start..next_pos];

    let stored_crc = LittleEndian::read_u32(&hdr[LOG_REC_OFF_CRC32..LOG_REC_OFF_CRC32 + 4]);
    let calc_crc = crc32c_of_parts(&hdr[..LOG_REC_OFF_CRC32], key, value);
    if stored_crc != calc_crc {
        return Err(anyhow!(
            "raw log CRC mismatch at pos {} (stored={}, calc={})",
            pos,
            stored_crc,
            calc_crc
        ));
    }

    let rec_type = hdr[LOG_REC_OFF_TYPE];
    if rec_type != LOG_REC_PUT && rec_type != LOG_REC_DELETE {
        return Err(anyhow!("unknown log record type {} at pos {}", rec_type, pos));
    }

    Ok(Some((
        LogRecord {
            rec_type,
            key,
            value,
            pos,
        },
        next_pos,
    )))
}
