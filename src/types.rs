//! Log record types and the helpers that turn request/response parts into record fields.

use axum::http::{HeaderMap, Uri};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::Logger;

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
}

/// The value of a single log field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free text: method, URL, body, latency, error descriptions
    Text(String),
    /// Numeric values such as the response status code
    Number(u64),
    /// Name to ordered values, used for headers and query parameters
    Map(BTreeMap<String, Vec<String>>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Number(u64::from(value))
    }
}

impl From<BTreeMap<String, Vec<String>>> for FieldValue {
    fn from(value: BTreeMap<String, Vec<String>>) -> Self {
        FieldValue::Map(value)
    }
}

/// A key/value pair attached to a log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: &'static str, value: impl Into<FieldValue>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Ordered fields rendered as a single JSON object, keys in insertion order.
pub struct Fields<'a>(pub &'a [Field]);

impl Serialize for Fields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in self.0 {
            map.serialize_entry(field.key, &field.value)?;
        }
        map.end()
    }
}

impl fmt::Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// One structured log entry describing half of an HTTP exchange.
///
/// Records are built fresh for every request and response and handed to a [`Logger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fields: Vec<Field>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            level,
            message: message.into(),
            fields,
        }
    }

    /// Returns the value of the first field named `key`.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }

    /// Forwards the record to `logger` at the record's level.
    pub fn emit(&self, logger: &dyn Logger, context: &axum::http::Extensions) {
        match self.level {
            LogLevel::Info => logger.info(context, &self.message, &self.fields),
            LogLevel::Error => logger.error(context, &self.message, &self.fields),
        }
    }
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EPOCH_SECS: std::sync::OnceLock<u64> = std::sync::OnceLock::new();

/// Identifier used to tie a request log line to its response log line.
///
/// Insert one into the request extensions before sending; loggers that understand it (such as
/// [`TracingLogger`](crate::TracingLogger)) report it with every record of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(u64);

impl CorrelationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// A fresh id, unique within this process and unlikely to repeat across restarts.
    ///
    /// Layout: `[ unix seconds at first use : 32 | sequence : 32 ]`.
    pub fn generate() -> Self {
        let epoch = *EPOCH_SECS.get_or_init(|| {
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_or(0, |since| since.as_secs())
        });
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed) & u64::from(u32::MAX);

        Self((epoch << 32) | sequence)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Convert a header map to name -> values, keeping repeated headers in arrival order.
pub(crate) fn header_map(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        result
            .entry(name.as_str().to_owned())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    result
}

/// The path of `uri` with percent-escapes decoded, or the raw path if it does not decode to
/// UTF-8.
pub(crate) fn decoded_path(uri: &Uri) -> String {
    let path = uri.path();
    urlencoding::decode(path).map_or_else(|_| path.to_owned(), |decoded| decoded.into_owned())
}

/// Decode the query string of `uri` into name -> values. Empty when there is no query.
pub(crate) fn query_map(uri: &Uri) -> BTreeMap<String, Vec<String>> {
    let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(query) = uri.query() {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            result
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }
    result
}

/// Formats a duration the way latencies appear in log records: `0s`, `850ns`, `1.5µs`,
/// `12ms`, `2.25s`, `1m30s`, `1h0m5s`.
pub fn format_latency(latency: Duration) -> String {
    const MICRO: u128 = 1_000;
    const MILLI: u128 = 1_000_000;
    const SECOND: u128 = 1_000_000_000;

    let nanos = latency.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < MICRO {
        return format!("{nanos}ns");
    }
    if nanos < MILLI {
        return format!("{}µs", decimal(nanos, MICRO));
    }
    if nanos < SECOND {
        return format!("{}ms", decimal(nanos, MILLI));
    }

    let total_secs = latency.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs_nanos = u128::from(total_secs % 60) * SECOND + u128::from(latency.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", decimal(secs_nanos, SECOND));
    out
}

/// `value / unit` as a decimal without trailing zeros.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }

    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(Duration::ZERO), "0s");
        assert_eq!(format_latency(Duration::from_nanos(850)), "850ns");
        assert_eq!(format_latency(Duration::from_nanos(1_500)), "1.5µs");
        assert_eq!(format_latency(Duration::from_millis(12)), "12ms");
        assert_eq!(format_latency(Duration::from_micros(12_345)), "12.345ms");
        assert_eq!(format_latency(Duration::from_millis(2_250)), "2.25s");
        assert_eq!(format_latency(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_latency(Duration::from_secs(3_605)), "1h0m5s");
        assert_eq!(format_latency(Duration::from_secs(3_600)), "1h0m0s");
    }

    #[test]
    fn test_query_map() {
        let uri: Uri = "http://example.test/v1/items?x=1&tag=a&tag=b%20c"
            .parse()
            .unwrap();

        let query = query_map(&uri);

        assert_eq!(query.len(), 2);
        assert_eq!(query["x"], vec!["1"]);
        assert_eq!(query["tag"], vec!["a", "b c"]);
    }

    #[test]
    fn test_decoded_path() {
        let uri: Uri = "http://example.test/files/a%20b%2Bc?x=1".parse().unwrap();
        assert_eq!(decoded_path(&uri), "/files/a b+c");

        let uri: Uri = "http://example.test/v1/items+all".parse().unwrap();
        assert_eq!(decoded_path(&uri), "/v1/items+all");

        // Not UTF-8 once decoded
        let uri: Uri = "http://example.test/raw/%FF".parse().unwrap();
        assert_eq!(decoded_path(&uri), "/raw/%FF");
    }

    #[test]
    fn test_query_map_without_query() {
        let uri: Uri = "http://example.test/v1/items".parse().unwrap();
        assert!(query_map(&uri).is_empty());

        let uri: Uri = "http://example.test/v1/items?".parse().unwrap();
        assert!(query_map(&uri).is_empty());
    }

    #[test]
    fn test_header_map_keeps_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/plain"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        let map = header_map(&headers);

        assert_eq!(map["accept"], vec!["text/plain", "application/json"]);
        assert_eq!(map["x-request-id"], vec!["abc"]);
    }

    #[test]
    fn test_fields_render_in_order() {
        let fields = vec![
            Field::new("latency", "12ms"),
            Field::new("status", 200u16),
            Field::new(
                "query",
                BTreeMap::from([("x".to_owned(), vec!["1".to_owned()])]),
            ),
        ];

        assert_eq!(
            Fields(&fields).to_string(),
            r#"{"latency":"12ms","status":200,"query":{"x":["1"]}}"#
        );
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let first = CorrelationId::generate();
        let second = CorrelationId::generate();

        assert_ne!(first, second);
        assert_eq!(first.get() >> 32, second.get() >> 32);
    }
}
