//! Transit string caching.
//!
//! Writers replace repeated map keys and tags with short `^N` references.
//! Readers must track the same set of strings in the same order to resolve
//! them, so both caches share [`is_cacheable`] and the index encoding.

use std::collections::HashMap;

use super::{TransitError, TransitResult};

const CACHE_CODE_DIGITS: usize = 44;
const BASE_CHAR_INDEX: u8 = 48;
const MIN_SIZE_CACHEABLE: usize = 3;

/// Cache capacity; both sides start over once it is reached.
pub const MAX_CACHE_ENTRIES: usize = CACHE_CODE_DIGITS * CACHE_CODE_DIGITS;

/// Whether `s` (in its encoded form) takes part in caching.
pub fn is_cacheable(s: &str, as_map_key: bool) -> bool {
    // lengths are counted in UTF-16 units to agree with JavaScript writers
    if s.len() <= MIN_SIZE_CACHEABLE || s.encode_utf16().count() <= MIN_SIZE_CACHEABLE {
        return false;
    }
    if as_map_key {
        return true;
    }
    let bytes = s.as_bytes();
    bytes[0] == b'~' && matches!(bytes[1], b':' | b'$' | b'#')
}

/// Whether `s` is a cache reference rather than a literal.
pub fn is_cache_code(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty() && bytes[0] == b'^' && bytes.get(1) != Some(&b' ')
}

fn index_to_code(index: usize) -> String {
    let hi = index / CACHE_CODE_DIGITS;
    let lo = index % CACHE_CODE_DIGITS;
    let mut code = String::with_capacity(3);
    code.push('^');
    if hi != 0 {
        code.push((hi as u8 + BASE_CHAR_INDEX) as char);
    }
    code.push((lo as u8 + BASE_CHAR_INDEX) as char);
    code
}

fn code_to_index(code: &str) -> TransitResult<usize> {
    let digit = |b: u8| -> TransitResult<usize> {
        let d = b.checked_sub(BASE_CHAR_INDEX).map(usize::from);
        match d {
            Some(d) if d < CACHE_CODE_DIGITS => Ok(d),
            _ => Err(TransitError::InvalidCacheRef(code.to_string())),
        }
    };
    match code.as_bytes() {
        [b'^', lo] => digit(*lo),
        [b'^', hi, lo] => Ok(digit(*hi)? * CACHE_CODE_DIGITS + digit(*lo)?),
        _ => Err(TransitError::InvalidCacheRef(code.to_string())),
    }
}

/// Reader-side cache of already-parsed entries.
#[derive(Debug)]
pub struct ReadCache<T> {
    entries: Vec<T>,
    next: usize,
}

impl<T: Clone> ReadCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }

    /// Record a parsed entry.
    pub fn write(&mut self, entry: T) {
        if self.next == MAX_CACHE_ENTRIES {
            self.next = 0;
        }
        if self.next < self.entries.len() {
            self.entries[self.next] = entry;
        } else {
            self.entries.push(entry);
        }
        self.next += 1;
    }

    /// Resolve a `^N` reference.
    pub fn read(&self, code: &str) -> TransitResult<T> {
        let index = code_to_index(code)?;
        self.entries
            .get(index)
            .cloned()
            .ok_or_else(|| TransitError::InvalidCacheRef(code.to_string()))
    }
}

impl<T: Clone> Default for ReadCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer-side cache mapping encoded strings to their references.
#[derive(Debug, Default)]
pub struct WriteCache {
    codes: HashMap<String, String>,
}

impl WriteCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the reference for `s` if it was seen before, otherwise record
    /// it (when cacheable) and return it unchanged.
    pub fn write(&mut self, s: String, as_map_key: bool) -> String {
        if !is_cacheable(&s, as_map_key) {
            return s;
        }
        if let Some(code) = self.codes.get(&s) {
            return code.clone();
        }
        if self.codes.len() == MAX_CACHE_ENTRIES {
            self.codes.clear();
        }
        let code = index_to_code(self.codes.len());
        self.codes.insert(s.clone(), code);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(index_to_code(0), "^0");
        assert_eq!(index_to_code(43), "^[");
        assert_eq!(index_to_code(44), "^10");
        assert_eq!(code_to_index("^0").unwrap(), 0);
        assert_eq!(code_to_index("^10").unwrap(), 44);
        for i in [1, 43, 44, 100, MAX_CACHE_ENTRIES - 1] {
            assert_eq!(code_to_index(&index_to_code(i)).unwrap(), i);
        }
        assert!(code_to_index("^").is_err());
        assert!(code_to_index("^\u{7f}").is_err());
    }

    #[test]
    fn test_cacheable() {
        assert!(is_cacheable("name", true));
        assert!(!is_cacheable("abc", true));
        assert!(!is_cacheable("name", false));
        assert!(is_cacheable("~#regex", false));
        assert!(is_cacheable("~:keyword", false));
        assert!(!is_cacheable("~#'", false));
    }

    #[test]
    fn test_write_then_read_agree() {
        let mut writer = WriteCache::new();
        let mut reader = ReadCache::new();

        assert_eq!(writer.write("first".into(), true), "first");
        reader.write("first".to_string());
        assert_eq!(writer.write("second".into(), true), "second");
        reader.write("second".to_string());

        let code = writer.write("second".into(), true);
        assert_eq!(code, "^1");
        assert_eq!(reader.read(&code).unwrap(), "second");
        assert!(reader.read("^2").is_err());
    }
}
