//! dump — текстовый вывод заголовка и всех записей собранных видов.
//!
//! Формат записи:
//!   key(ascii): <module> <key>     — все байты ключа в [32, 127]
//!   key(hex): <module> <hex>       — иначе
//!   value(hex): <hex>
//!   <пустая строка>
//!
//! Значения всегда в hex (lower-case). Пустой ключ считается печатаемым.

use std::io::Write;

use anyhow::{Context, Result};
use log::debug;

use crate::metrics::record_module_dumped;
use crate::snapshot::{Assembly, Snapshot};

/// Все байты в [32, 127] (включая DEL, как в исходном формате вывода).
#[inline]
pub fn is_printable(key: &[u8]) -> bool {
    key.iter().all(|&b| (32..=127).contains(&b))
}

/// Строка ключа без завершающего перевода строки.
pub fn render_key(module: &str, key: &[u8]) -> String {
    if is_printable(key) {
        format!("key(ascii): {} {}", module, String::from_utf8_lossy(key))
    } else {
        format!("key(hex): {} {}", module, hex::encode(key))
    }
}

/// Полный блок записи: ключ, значение, пустая строка.
pub fn render_entry(module: &str, key: &[u8], value: &[u8]) -> String {
    format!(
        "{}\nvalue(hex): {}\n\n",
        render_key(module, key),
        hex::encode(value)
    )
}

pub fn write_header<W: Write>(
    w: &mut W,
    latest: u64,
    target: u64,
    modules: &[String],
) -> Result<()> {
    writeln!(w, "latestVersion:  {}", latest)?;
    writeln!(w, "targetHeight:  {}", target)?;
    writeln!(w, "modules:")?;
    for m in modules {
        writeln!(w, "   {}", m)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Вывести все записи одного модуля по возрастанию ключа. Возвращает число записей.
pub fn write_module<W: Write>(w: &mut W, snap: &Snapshot) -> Result<u64> {
    let mut n = 0u64;
    for e in snap.view.iter() {
        w.write_all(render_entry(&snap.module, &e.key, &e.value).as_bytes())
            .with_context(|| format!("write entry of module {:?}", snap.module))?;
        n += 1;
    }
    record_module_dumped(n);
    debug!("module {:?}: dumped {} entries", snap.module, n);
    Ok(n)
}

/// Все модули сборки в порядке имён. Возвращает общее число записей.
pub fn write_entries<W: Write>(w: &mut W, assembly: &Assembly) -> Result<u64> {
    let mut total = 0u64;
    for snap in assembly.snapshots.values() {
        total += write_module(w, snap)?;
    }
    w.flush().context("flush dump output")?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_boundaries() {
        assert!(is_printable(b""));
        assert!(is_printable(b" ~"));
        assert!(is_printable(&[32, 127]));
        assert!(!is_printable(&[31]));
        assert!(!is_printable(&[128]));
        assert!(!is_printable(b"ab\x00cd"));
        assert!(!is_printable(b"\n"));
    }

    #[test]
    fn renders_ascii_and_hex_keys() {
        assert_eq!(
            render_entry("bank", b"alpha", b"1"),
            "key(ascii): bank alpha\nvalue(hex): 31\n\n"
        );
        assert_eq!(
            render_entry("bank", &[0x00, 0xAB], &[0xFF]),
            "key(hex): bank 00ab\nvalue(hex): ff\n\n"
        );
        assert_eq!(render_entry("m", b"", b""), "key(ascii): m \nvalue(hex): \n\n");
    }

    #[test]
    fn header_layout() -> Result<()> {
        let mut out = Vec::new();
        write_header(&mut out, 5, 3, &["a".to_string(), "b".to_string()])?;
        assert_eq!(
            String::from_utf8(out)?,
            "latestVersion:  5\ntargetHeight:  3\nmodules:\n   a\n   b\n\n"
        );
        Ok(())
    }
}
