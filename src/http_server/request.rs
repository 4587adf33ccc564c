//! Request target parsing

use axum::http::Uri;
use percent_encoding::percent_decode_str;

use crate::pipeline::QueryMap;

/// Service name, remaining path tokens and query options of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub service: String,
    pub tokens: Vec<String>,
    pub query: QueryMap,
}

impl RequestTarget {
    /// Split the URI into its routing parts
    pub fn parse(uri: &Uri) -> Self {
        let mut segments = uri
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let service = segments.next().unwrap_or_default();
        let tokens = segments.collect();
        let query = uri.query().map(parse_query).unwrap_or_default();

        Self {
            service,
            tokens,
            query,
        }
    }
}

/// Value given to a query key sent without `=`.
pub const FLAG_VALUE: &str = "true";

/// Decode `a=1&b=2` pairs.
///
/// Each pair splits on its first `=`. Values are percent-decoded, keys are
/// kept as sent. A later duplicate key wins. A bare key with no `=` is a
/// flag and carries [`FLAG_VALUE`].
pub fn parse_query(raw: &str) -> QueryMap {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), decode(value)),
            None => (pair.to_string(), FLAG_VALUE.to_string()),
        })
        .collect()
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_tokens() {
        let target = RequestTarget::parse(&Uri::from_static("/data//books/abc/"));
        assert_eq!(target.service, "data");
        assert_eq!(target.tokens, vec!["books", "abc"]);
        assert!(target.query.is_empty());
    }

    #[test]
    fn test_root_has_empty_service() {
        let target = RequestTarget::parse(&Uri::from_static("/"));
        assert_eq!(target.service, "");
        assert!(target.tokens.is_empty());
    }

    #[test]
    fn test_query_values_are_decoded() {
        let target = RequestTarget::parse(&Uri::from_static(
            "/data/books?where=title%3D%22A%20B%22&count&pageSize=3&",
        ));
        assert_eq!(target.query["where"], "title=\"A B\"");
        assert_eq!(target.query["count"], FLAG_VALUE);
        assert_eq!(target.query["pageSize"], "3");
        assert_eq!(target.query.len(), 3);
    }

    #[test]
    fn test_value_keeps_everything_after_first_equals() {
        let query = parse_query("where=a=1&load=author=_ownerId:users");
        assert_eq!(query["where"], "a=1");
        assert_eq!(query["load"], "author=_ownerId:users");
    }
}
