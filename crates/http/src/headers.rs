//! Request headers: a fixed map or a function evaluated per request.

use std::fmt;
use std::sync::Arc;

use chunkup_transfer::TransportError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Produces headers for one request.
pub type HeaderFn = Arc<dyn Fn() -> HeaderMap + Send + Sync>;

/// Where request headers come from.
#[derive(Clone, Default)]
pub enum HeaderSource {
    #[default]
    None,
    Static(HeaderMap),
    /// Re-evaluated for every request, e.g. to refresh auth tokens per chunk.
    Dynamic(HeaderFn),
}

impl HeaderSource {
    /// Wraps a closure as a dynamic source.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> HeaderMap + Send + Sync + 'static,
    {
        HeaderSource::Dynamic(Arc::new(f))
    }

    /// Builds a static source from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            let header_value = HeaderValue::from_str(value.as_ref())
                .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
            map.insert(header_name, header_value);
        }
        Ok(HeaderSource::Static(map))
    }

    /// Returns the headers for the next request.
    pub fn resolve(&self) -> HeaderMap {
        match self {
            HeaderSource::None => HeaderMap::new(),
            HeaderSource::Static(map) => map.clone(),
            HeaderSource::Dynamic(f) => f(),
        }
    }
}

impl From<HeaderMap> for HeaderSource {
    fn from(map: HeaderMap) -> Self {
        HeaderSource::Static(map)
    }
}

impl fmt::Debug for HeaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderSource::None => f.write_str("None"),
            HeaderSource::Static(map) => f.debug_tuple("Static").field(map).finish(),
            HeaderSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn none_resolves_empty() {
        assert!(HeaderSource::None.resolve().is_empty());
    }

    #[test]
    fn from_pairs_builds_static_map() {
        let source = HeaderSource::from_pairs([("Authorization", "Bearer t"), ("X-App", "1")]).unwrap();
        let headers = source.resolve();
        assert_eq!(headers["authorization"], "Bearer t");
        assert_eq!(headers["x-app"], "1");
    }

    #[test]
    fn from_pairs_rejects_invalid_names() {
        let err = HeaderSource::from_pairs([("bad header", "v")]).unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader(name) if name == "bad header"));
    }

    #[test]
    fn from_pairs_rejects_invalid_values() {
        let err = HeaderSource::from_pairs([("x-token", "line\nbreak")]).unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader(_)));
    }

    #[test]
    fn dynamic_is_evaluated_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = HeaderSource::dynamic(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let mut map = HeaderMap::new();
            map.insert("x-token", HeaderValue::from(n as u64));
            map
        });

        assert_eq!(source.resolve()["x-token"], "0");
        assert_eq!(source.resolve()["x-token"], "1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
