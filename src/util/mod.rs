//! util — общие мелкие утилиты.
//!
//! Содержит:
//! - env_flag(): разбор булевых ENV-переключателей (1|true|on|yes / 0|false|off|no).
//! - parse_height(): разбор аргумента высоты CLI (None = latest).

/// Разобрать булев ENV. None — переменная не задана или значение не распознано.
pub fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    parse_flag(&v)
}

#[inline]
fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Аргумент высоты: отсутствует, отрицательный или не число — latest (None).
pub fn parse_height(arg: Option<&str>) -> Option<u64> {
    let s = arg?.trim();
    match s.parse::<i64>() {
        Ok(h) if h >= 0 => Some(h as u64),
        _ => None,
    }
}
