//! Transit-JSON writer.

use chrono::SecondsFormat;
use serde_json::Value as Json;

use super::cache::WriteCache;
use crate::value::{Map, Value};

const MAP_AS_ARRAY: &str = "^ ";
/// Integers outside this range do not survive a JavaScript reader as numbers.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Transit-JSON writer with key caching.
#[derive(Debug, Default)]
pub struct Writer {
    cache: WriteCache,
}

impl Writer {
    /// Create a writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a complete document.
    pub fn write(&mut self, value: &Value) -> String {
        self.cache = WriteCache::new();
        let json = match value {
            Value::List(_) | Value::Map(_) | Value::Regex(_) => self.emit(value),
            scalar => Json::Array(vec![Json::String("~#'".into()), self.emit(scalar)]),
        };
        json.to_string()
    }

    fn emit(&mut self, value: &Value) -> Json {
        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) if i.unsigned_abs() > MAX_SAFE_INTEGER as u64 => {
                Json::String(format!("~i{}", i))
            }
            Value::Int(i) => Json::from(*i),
            Value::Float(f) if f.is_nan() => Json::String("~zNaN".into()),
            Value::Float(f) if f.is_infinite() => {
                Json::String(if *f > 0.0 { "~zINF" } else { "~z-INF" }.into())
            }
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(escape(s)),
            // `~m` only carries milliseconds.
            Value::Date(d) if d.timestamp_subsec_nanos() % 1_000_000 != 0 => {
                Json::String(format!("~t{}", d.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            }
            Value::Date(d) => Json::String(format!("~m{}", d.timestamp_millis())),
            Value::Regex(p) => {
                let tag = self.cache.write("~#regex".into(), false);
                Json::Array(vec![Json::String(tag), Json::String(p.as_str().to_string())])
            }
            Value::List(items) => Json::Array(items.iter().map(|v| self.emit(v)).collect()),
            Value::Map(map) => self.emit_map(map),
        }
    }

    fn emit_map(&mut self, map: &Map) -> Json {
        let mut out = Vec::with_capacity(map.len() * 2 + 1);
        out.push(Json::String(MAP_AS_ARRAY.into()));
        for (key, value) in map {
            out.push(Json::String(self.cache.write(escape(key), true)));
            out.push(self.emit(value));
        }
        Json::Array(out)
    }
}

fn escape(s: &str) -> String {
    match s.as_bytes().first() {
        Some(b'~' | b'^' | b'`') => format!("~{}", s),
        _ => s.to_string(),
    }
}
