//! Shared helpers for adapter-layer diagnostics.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Printable view of a raw BLE payload for the console, or `None` when it
/// would garble the log (invalid UTF-8 or control bytes).  Trailing CR/LF
/// from terminal-style clients is trimmed first.
pub(super) fn printable_payload(raw: &[u8]) -> Option<&str> {
    let s = core::str::from_utf8(raw).ok()?;
    let s = s.trim_end_matches(['\r', '\n']);
    is_printable_ascii(s).then_some(s)
}
