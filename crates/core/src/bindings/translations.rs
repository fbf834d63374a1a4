use std::collections::HashMap;

use crate::bindings::action_binding::BindingRecord;
use crate::util::text::decode_text;

/// `global.ini` string table. Keys are stored with a leading `@`, as referenced by profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizationTable {
    entries: HashMap<String, String>,
}

impl LocalizationTable {
    /// `key=value` lines. A `,P` suffix on the key is dropped; blank lines and `--`, `//`,
    /// `#`, `;` comments are ignored, as are blank keys and keys without a value.
    /// Later duplicates win.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut entries = HashMap::new();
        for line in text.lines() {
            let t = line.trim();
            if t.is_empty()
                || t.starts_with("--")
                || t.starts_with("//")
                || t.starts_with('#')
                || t.starts_with(';')
            {
                continue;
            }
            if let Some((k, v)) = parse_line(t) {
                let key = if k.starts_with('@') {
                    k.to_string()
                } else {
                    format!("@{k}")
                };
                entries.insert(key, v.to_string());
            }
        }
        Self { entries }
    }

    /// Raw file bytes (BOM / UTF-16 tolerant).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&decode_text(bytes))
    }

    /// Look up with or without the leading `@`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let found = match key.strip_prefix('@') {
            Some(_) => self.entries.get(key),
            None => self.entries.get(&format!("@{key}")),
        };
        found.map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace `value` in place when it is an `@` token naming a key in the table.
    /// Plain text is left alone even if it happens to match a key.
    pub fn localize(&self, value: &mut String) -> bool {
        if !value.trim_start().starts_with('@') {
            return false;
        }
        match self.get(value) {
            Some(text) => {
                *value = text.to_string();
                true
            }
            None => false,
        }
    }
}

/// Localize labels, descriptions and categories; toggle candidacy is re-evaluated against the
/// localized description. Returns how many fields changed.
pub fn apply_localization(
    records: &mut [BindingRecord],
    table: &LocalizationTable,
    toggle_markers: &[String],
) -> usize {
    let mut changed = 0;
    for r in records.iter_mut() {
        for field in [
            &mut r.ui_label,
            &mut r.ui_description,
            &mut r.map_label,
            &mut r.ui_category,
        ] {
            if table.localize(field) {
                changed += 1;
            }
        }
        r.refresh_toggle_candidate(toggle_markers);
    }
    changed
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (k, v) = line.split_once('=')?;
    let k = k.trim();
    let k = k.strip_suffix(",P").unwrap_or(k).trim_end();
    let v = v.trim();
    if k.is_empty() || k == "@" || v.is_empty() {
        return None;
    }
    Some((k, v))
}
