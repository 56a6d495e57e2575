//! Header sets with deferred values.
//!
//! A header value is either a literal string or a [`HeaderProducer`] that is
//! asked for the value once per request (credentials that rotate, values that
//! must be fetched lazily). [`merge_headers`] layers sets with
//! later-set-wins semantics; [`resolve_headers`] turns a merged set into the
//! concrete strings that go on the wire.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Produces a header value at request time.
///
/// Implement this for values that cannot be captured as plain strings when
/// the client is built. Returning `None` omits the header.
#[async_trait]
pub trait HeaderProducer: Send + Sync {
    /// Produce the current value, or `None` to omit the header.
    async fn produce(&self) -> Option<String>;
}

/// A [`HeaderProducer`] backed by a closure.
///
/// # Example
///
/// ```
/// use diffio::headers::{FnHeaderProducer, HeaderValue};
///
/// let value = HeaderValue::producer(FnHeaderProducer(|| {
///     std::env::var("EXTRA_HEADER").ok()
/// }));
/// ```
pub struct FnHeaderProducer<F: Fn() -> Option<String> + Send + Sync>(pub F);

#[async_trait]
impl<F: Fn() -> Option<String> + Send + Sync> HeaderProducer for FnHeaderProducer<F> {
    async fn produce(&self) -> Option<String> {
        (self.0)()
    }
}

/// A header value: a literal, or a producer resolved once per request.
#[derive(Clone)]
pub enum HeaderValue {
    /// A fixed string.
    Literal(String),
    /// A deferred value, asked for the string each time a request is built.
    Producer(Arc<dyn HeaderProducer>),
}

impl HeaderValue {
    /// Wrap a producer.
    pub fn producer<P: HeaderProducer + 'static>(producer: P) -> Self {
        HeaderValue::Producer(Arc::new(producer))
    }

    /// Resolve to the concrete string, or `None` to omit the header.
    pub async fn resolve(&self) -> Option<String> {
        match self {
            HeaderValue::Literal(value) => Some(value.clone()),
            HeaderValue::Producer(producer) => producer.produce().await,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Literal(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Literal(value)
    }
}

impl std::fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            HeaderValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// An ordered header set. `None` entries are tombstones: a later set can
/// blank out a header from an earlier one, and tombstones are dropped at
/// resolution.
pub type HeaderSet = BTreeMap<String, Option<HeaderValue>>;

/// Merge header sets left to right; later sets win per key.
pub fn merge_headers(sets: &[&HeaderSet]) -> HeaderSet {
    let mut merged = HeaderSet::new();
    for set in sets {
        for (name, value) in set.iter() {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// Resolve a merged set into concrete wire headers. Tombstones and
/// producers that return `None` are omitted.
pub async fn resolve_headers(headers: &HeaderSet) -> BTreeMap<String, String> {
    let mut resolved = BTreeMap::new();
    for (name, value) in headers {
        let Some(value) = value else { continue };
        if let Some(concrete) = value.resolve().await {
            resolved.insert(name.clone(), concrete);
        }
    }
    resolved
}

/// Convenience: build a [`HeaderSet`] from literal pairs.
pub fn header_set<const N: usize>(pairs: [(&str, &str); N]) -> HeaderSet {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), Some(HeaderValue::from(value))))
        .collect()
}
