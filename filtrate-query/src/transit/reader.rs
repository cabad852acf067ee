//! Transit-JSON reader.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value as Json;

use super::cache::{ReadCache, is_cache_code, is_cacheable};
use super::{TransitError, TransitResult};
use crate::value::{Map, Pattern, Value};

const MAP_AS_ARRAY: &str = "^ ";

/// What a string decodes to: either a value or the tag of a tagged value.
#[derive(Debug, Clone)]
enum Parsed {
    Value(Value),
    Tag(String),
}

/// Stateful transit-JSON reader.
///
/// Each [`Reader::read`] call starts with a fresh cache, so one reader can be
/// reused for any number of independent payloads.
#[derive(Debug, Default)]
pub struct Reader {
    cache: ReadCache<Parsed>,
}

impl Reader {
    /// Create a reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a complete transit-JSON document.
    pub fn read(&mut self, encoded: &str) -> TransitResult<Value> {
        self.cache = ReadCache::new();
        let json: Json = serde_json::from_str(encoded)?;
        self.decode(&json, false)
    }

    fn decode(&mut self, node: &Json, tag_value: bool) -> TransitResult<Value> {
        match node {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => Ok(number(n)),
            Json::String(s) => match self.decode_string(s, false)? {
                Parsed::Value(v) => Ok(v),
                Parsed::Tag(tag) => Err(TransitError::MisplacedTag(tag)),
            },
            Json::Array(items) => self.decode_array(items, tag_value),
            Json::Object(entries) => self.decode_object(entries),
        }
    }

    fn decode_string(&mut self, s: &str, as_map_key: bool) -> TransitResult<Parsed> {
        if is_cacheable(s, as_map_key) {
            let parsed = parse_string(s)?;
            self.cache.write(parsed.clone());
            Ok(parsed)
        } else if is_cache_code(s) {
            self.cache.read(s)
        } else {
            parse_string(s)
        }
    }

    fn decode_key(&mut self, node: &Json) -> TransitResult<String> {
        match node {
            Json::String(s) => match self.decode_string(s, true)? {
                Parsed::Value(Value::String(key)) => Ok(key),
                Parsed::Value(other) => Err(TransitError::NonStringKey(other.kind())),
                Parsed::Tag(tag) => Err(TransitError::MisplacedTag(tag)),
            },
            Json::Number(_) => Err(TransitError::NonStringKey("number")),
            Json::Bool(_) => Err(TransitError::NonStringKey("boolean")),
            Json::Null => Err(TransitError::NonStringKey("null")),
            Json::Array(_) => Err(TransitError::NonStringKey("array")),
            Json::Object(_) => Err(TransitError::NonStringKey("object")),
        }
    }

    fn decode_array(&mut self, items: &[Json], tag_value: bool) -> TransitResult<Value> {
        if tag_value {
            return items
                .iter()
                .map(|item| self.decode(item, false))
                .collect::<TransitResult<Vec<_>>>()
                .map(Value::List);
        }

        if items.first().and_then(Json::as_str) == Some(MAP_AS_ARRAY) {
            let rest = &items[1..];
            if rest.len() % 2 != 0 {
                return Err(TransitError::OddMapEntries);
            }
            let mut map = Map::with_capacity(rest.len() / 2);
            for pair in rest.chunks(2) {
                let key = self.decode_key(&pair[0])?;
                let value = self.decode(&pair[1], false)?;
                map.insert(key, value);
            }
            return Ok(Value::Map(map));
        }

        let mut out = Vec::with_capacity(items.len());
        let mut rest = items;
        if let Some(Json::String(first)) = items.first() {
            match self.decode_string(first, false)? {
                Parsed::Tag(tag) if items.len() == 2 => {
                    let rep = self.decode(&items[1], true)?;
                    return tagged(tag, rep);
                }
                Parsed::Tag(tag) => return Err(TransitError::MisplacedTag(tag)),
                Parsed::Value(v) => out.push(v),
            }
            rest = &items[1..];
        }
        for item in rest {
            out.push(self.decode(item, false)?);
        }
        Ok(Value::List(out))
    }

    fn decode_object(&mut self, entries: &serde_json::Map<String, Json>) -> TransitResult<Value> {
        let mut map = Map::with_capacity(entries.len());
        for (key, value) in entries {
            match self.decode_string(key, true)? {
                Parsed::Tag(tag) if entries.len() == 1 => {
                    let rep = self.decode(value, true)?;
                    return tagged(tag, rep);
                }
                Parsed::Tag(tag) => return Err(TransitError::MisplacedTag(tag)),
                Parsed::Value(Value::String(key)) => {
                    let value = self.decode(value, false)?;
                    map.insert(key, value);
                }
                Parsed::Value(other) => return Err(TransitError::NonStringKey(other.kind())),
            }
        }
        Ok(Value::Map(map))
    }
}

fn number(n: &serde_json::Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Int(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn invalid(tag: char, value: &str) -> TransitError {
    TransitError::InvalidScalar {
        tag,
        value: value.to_string(),
    }
}

fn parse_string(s: &str) -> TransitResult<Parsed> {
    let mut chars = s.chars();
    if chars.next() != Some('~') {
        return Ok(Parsed::Value(Value::String(s.to_string())));
    }
    let Some(tag) = chars.next() else {
        return Ok(Parsed::Value(Value::String(s.to_string())));
    };
    let rep = chars.as_str();

    let value = match tag {
        '~' | '^' | '`' => Value::String(s[1..].to_string()),
        '#' => return Ok(Parsed::Tag(rep.to_string())),
        '_' => Value::Null,
        '?' => match rep {
            "t" => Value::Bool(true),
            "f" => Value::Bool(false),
            _ => return Err(invalid(tag, rep)),
        },
        'i' | 'n' => Value::Int(rep.parse().map_err(|_| invalid(tag, rep))?),
        'd' | 'f' => Value::Float(rep.parse().map_err(|_| invalid(tag, rep))?),
        'z' => match rep {
            "NaN" => Value::Float(f64::NAN),
            "INF" => Value::Float(f64::INFINITY),
            "-INF" => Value::Float(f64::NEG_INFINITY),
            _ => return Err(invalid(tag, rep)),
        },
        'm' => {
            let millis: i64 = rep.parse().map_err(|_| invalid(tag, rep))?;
            Value::Date(
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| invalid(tag, rep))?,
            )
        }
        't' => Value::Date(
            DateTime::parse_from_rfc3339(rep)
                .map_err(|_| invalid(tag, rep))?
                .with_timezone(&Utc),
        ),
        'u' => Value::String(
            uuid::Uuid::parse_str(rep)
                .map_err(|_| invalid(tag, rep))?
                .hyphenated()
                .to_string(),
        ),
        ':' | '$' | 'r' | 'c' => Value::String(rep.to_string()),
        other => return Err(TransitError::UnknownTag(other.to_string())),
    };
    Ok(Parsed::Value(value))
}

fn tagged(tag: String, rep: Value) -> TransitResult<Value> {
    let bad = |reason: &str| TransitError::InvalidTaggedValue {
        tag: tag.clone(),
        reason: reason.to_string(),
    };
    match tag.as_str() {
        "'" => Ok(rep),
        "set" | "list" => match rep {
            Value::List(_) => Ok(rep),
            _ => Err(bad("expected an array")),
        },
        "cmap" => {
            let Value::List(items) = rep else {
                return Err(bad("expected an array"));
            };
            if items.len() % 2 != 0 {
                return Err(TransitError::OddMapEntries);
            }
            let mut map = Map::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                match key {
                    Value::String(key) => {
                        map.insert(key, value);
                    }
                    other => return Err(TransitError::NonStringKey(other.kind())),
                }
            }
            Ok(Value::Map(map))
        }
        "regex" => match rep {
            Value::String(source) => Pattern::new(&source)
                .map(Value::Regex)
                .map_err(|e| bad(&e.to_string())),
            _ => Err(bad("expected a string")),
        },
        _ => Err(TransitError::UnknownTag(tag)),
    }
}
