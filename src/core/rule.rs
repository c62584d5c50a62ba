//! Rule data model: raw specifications as configured, and the resolved rules
//! produced from them.
use std::{fmt, future::Future, net::SocketAddr, sync::Arc};

use futures_util::future::{BoxFuture, FutureExt};
use http::{HeaderMap, Method};
use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Visitor},
};

use crate::core::directive::Directive;

/// Error type returned by user supplied dynamic values and producers.
pub type DynamicError = Box<dyn std::error::Error + Send + Sync + 'static>;

type DynamicFn =
    dyn Fn(Option<RequestContext>) -> BoxFuture<'static, Result<RuleValue, DynamicError>> + Send + Sync;

/// Information about the request being served, handed to dynamic values.
///
/// Build-time resolution has no request, so dynamic values receive `None` there.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub host: Option<String>,
    pub headers: HeaderMap,
    pub client_addr: Option<SocketAddr>,
}

impl RequestContext {
    /// Context for a `GET` of `path` with no headers.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Header value as UTF-8, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// A value computed from the (optional) request context, possibly asynchronously.
#[derive(Clone)]
pub struct DynamicValue(Arc<DynamicFn>);

impl DynamicValue {
    /// Wrap an async function of the request context.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RuleValue, DynamicError>> + Send + 'static,
    {
        Self(Arc::new(move |context: Option<RequestContext>| f(context).boxed()))
    }

    /// Wrap a synchronous, infallible function of the request context.
    pub fn from_fn<F, V>(f: F) -> Self
    where
        F: Fn(Option<&RequestContext>) -> V + Send + Sync + 'static,
        V: Into<RuleValue>,
    {
        Self(Arc::new(move |context: Option<RequestContext>| {
            let value: RuleValue = f(context.as_ref()).into();
            futures_util::future::ready(Ok::<_, DynamicError>(value)).boxed()
        }))
    }

    pub fn call(
        &self,
        context: Option<RequestContext>,
    ) -> BoxFuture<'static, Result<RuleValue, DynamicError>> {
        (self.0)(context)
    }
}

impl fmt::Debug for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DynamicValue(..)")
    }
}

/// The value side of a rule entry.
#[derive(Debug, Clone)]
pub enum RuleValue {
    Literal(String),
    List(Vec<RuleValue>),
    Dynamic(DynamicValue),
}

impl RuleValue {
    /// Shorthand for an async [`DynamicValue`].
    pub fn dynamic<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RuleValue, DynamicError>> + Send + 'static,
    {
        RuleValue::Dynamic(DynamicValue::new(f))
    }

    /// Shorthand for a synchronous [`DynamicValue`].
    pub fn from_fn<F, V>(f: F) -> Self
    where
        F: Fn(Option<&RequestContext>) -> V + Send + Sync + 'static,
        V: Into<RuleValue>,
    {
        RuleValue::Dynamic(DynamicValue::from_fn(f))
    }

    /// Convert a JSON-like value from a configuration file.
    ///
    /// `null` yields `None` so the key is treated as absent. Nested objects
    /// have no textual form and are rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Option<Self>, String> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(RuleValue::Literal(s))),
            Value::Number(n) => Ok(Some(RuleValue::Literal(n.to_string()))),
            Value::Bool(b) => Ok(Some(RuleValue::Literal(b.to_string()))),
            Value::Array(values) => {
                let mut list = Vec::with_capacity(values.len());
                for value in values {
                    if let Some(v) = RuleValue::from_json(value)? {
                        list.push(v);
                    }
                }
                Ok(Some(RuleValue::List(list)))
            }
            Value::Object(_) => Err("objects are not valid rule values".to_string()),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Literal(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Literal(value)
    }
}

impl From<DynamicValue> for RuleValue {
    fn from(value: DynamicValue) -> Self {
        RuleValue::Dynamic(value)
    }
}

impl<T: Into<RuleValue>> From<Vec<T>> for RuleValue {
    fn from(values: Vec<T>) -> Self {
        RuleValue::List(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! literal_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RuleValue {
                fn from(value: $ty) -> Self {
                    RuleValue::Literal(value.to_string())
                }
            }
        )*
    };
}

literal_from_display!(u8, u16, u32, u64, usize, i32, i64, f32, f64, bool);

/// One mapping from raw keys to values, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RuleItem {
    entries: Vec<(String, RuleValue)>,
}

impl RuleItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{UserAgent: '*', Disallow: '/'}`: block everything for every crawler.
    pub fn defaults() -> Self {
        Self::new().with("UserAgent", "*").with("Disallow", "/")
    }

    /// Builder form of [`RuleItem::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RuleValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an entry. An identical raw key has its value replaced in place;
    /// a new key is appended.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RuleValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// This item laid over the defaults: explicit keys override, defaults
    /// come first.
    pub fn merged_over_defaults(self) -> Self {
        let mut merged = Self::defaults();
        for (key, value) in self.entries {
            merged.insert(key, value);
        }
        merged
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw keys that do not name any directive.
    pub fn unrecognized_keys(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .map(|(key, _)| key)
            .filter(|key| Directive::from_key(key).is_none())
    }
}

impl<K: Into<String>, V: Into<RuleValue>> FromIterator<(K, V)> for RuleItem {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut item = RuleItem::new();
        for (key, value) in iter {
            item.insert(key, value);
        }
        item
    }
}

impl<'de> Deserialize<'de> for RuleItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleItemVisitor;

        impl<'de> Visitor<'de> for RuleItemVisitor {
            type Value = RuleItem;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of directive keys to strings, numbers or lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RuleItem, A::Error> {
                let mut item = RuleItem::new();
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    let value = RuleValue::from_json(value)
                        .map_err(|e| de::Error::custom(format!("key '{key}': {e}")))?;
                    if let Some(value) = value {
                        item.insert(key, value);
                    }
                }
                Ok(item)
            }
        }

        deserializer.deserialize_map(RuleItemVisitor)
    }
}

/// A rule specification: one mapping or an ordered list of mappings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleSpecification {
    List(Vec<RuleItem>),
    Single(RuleItem),
}

impl RuleSpecification {
    /// Items in resolution order.
    pub fn items(&self) -> &[RuleItem] {
        match self {
            RuleSpecification::Single(item) => std::slice::from_ref(item),
            RuleSpecification::List(items) => items,
        }
    }
}

impl From<RuleItem> for RuleSpecification {
    fn from(item: RuleItem) -> Self {
        RuleSpecification::Single(item)
    }
}

impl From<Vec<RuleItem>> for RuleSpecification {
    fn from(items: Vec<RuleItem>) -> Self {
        RuleSpecification::List(items)
    }
}

/// A directive with its final value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRule {
    pub directive: Directive,
    pub value: String,
}

impl ResolvedRule {
    pub fn new(directive: Directive, value: impl Into<String>) -> Self {
        Self {
            directive,
            value: value.into(),
        }
    }
}

/// Ordered resolved rules. Repeated directives are legal and kept.
pub type RuleSet = Vec<ResolvedRule>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let item = RuleItem::new()
            .with("Disallow", "/a")
            .with("Allow", "/b")
            .with("Disallow", "/c");
        let keys: Vec<&str> = item.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Disallow", "Allow"]);
        assert!(matches!(item.entries().next(), Some((_, RuleValue::Literal(v))) if v == "/c"));
    }

    #[test]
    fn test_merged_over_defaults() {
        let item = RuleItem::new()
            .with("Sitemap", "https://example.com/sitemap.xml")
            .with("Disallow", "/admin")
            .merged_over_defaults();
        let entries: Vec<(&str, String)> = item
            .entries()
            .map(|(k, v)| match v {
                RuleValue::Literal(s) => (k, s.clone()),
                other => panic!("unexpected value {other:?}"),
            })
            .collect();
        assert_eq!(
            entries,
            [
                ("UserAgent", "*".to_string()),
                ("Disallow", "/admin".to_string()),
                ("Sitemap", "https://example.com/sitemap.xml".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers_become_literals() {
        assert!(matches!(RuleValue::from(10u32), RuleValue::Literal(s) if s == "10"));
        assert!(matches!(RuleValue::from(0.5f64), RuleValue::Literal(s) if s == "0.5"));
    }

    #[test]
    fn test_from_json() {
        let value = RuleValue::from_json(serde_json::json!(["/a", 2, null]))
            .unwrap()
            .unwrap();
        match value {
            RuleValue::List(values) => assert_eq!(values.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
        assert!(RuleValue::from_json(serde_json::Value::Null).unwrap().is_none());
        assert!(RuleValue::from_json(serde_json::json!({"a": 1})).is_err());
    }

    #[test]
    fn test_deserialize_specification_shapes() {
        let single: RuleSpecification =
            serde_json::from_str(r#"{"UserAgent": "Googlebot", "CrawlDelay": 5}"#).unwrap();
        assert!(matches!(&single, RuleSpecification::Single(item) if item.len() == 2));

        let list: RuleSpecification =
            serde_json::from_str(r#"[{"Disallow": "/admin"}, {"Allow": ["/css", "/js"]}]"#)
                .unwrap();
        assert_eq!(list.items().len(), 2);
    }

    #[test]
    fn test_unrecognized_keys() {
        let item = RuleItem::new()
            .with("User-Agent", "*")
            .with("Noindex", "/x")
            .with("# comment", "y");
        let unknown: Vec<&str> = item.unrecognized_keys().collect();
        assert_eq!(unknown, ["Noindex", "# comment"]);
    }
}
