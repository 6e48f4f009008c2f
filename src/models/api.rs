use serde::Deserialize;

/// Request body for creating or updating a joke.
///
/// A missing `joke` field decodes to an empty string so that it is reported
/// by validation rather than as a decode error.
#[derive(Debug, Deserialize)]
pub struct JokeRequest {
    /// The joke text
    #[serde(default)]
    pub joke: String,
}

/// Raw pagination query parameters.
///
/// Kept as strings so that parse failures can name the offending parameter.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PaginationQuery {
    /// 1-based page number (default: 1)
    pub page: Option<String>,
    /// Page size (default: 10)
    pub limit: Option<String>,
}

impl PaginationQuery {
    /// Pick `page` and `limit` out of decoded query pairs.
    ///
    /// When a parameter is repeated the first occurrence wins; unknown
    /// parameters are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_joke_request_deserialization() {
        let json = r#"{"joke": "why did the chicken cross the road"}"#;
        let request: JokeRequest =
            serde_json::from_str(json).expect("Deserialization should succeed");

        assert_eq!(request.joke, "why did the chicken cross the road");
    }

    #[test]
    fn test_joke_request_missing_field_defaults_to_empty() {
        let request: JokeRequest =
            serde_json::from_str("{}").expect("Deserialization should succeed");

        assert!(request.joke.is_empty());
    }

    #[test]
    fn test_joke_request_ignores_unknown_fields() {
        let json = r#"{"joke": "pun", "rating": 5}"#;
        let request: JokeRequest =
            serde_json::from_str(json).expect("Deserialization should succeed");

        assert_eq!(request.joke, "pun");
    }

    #[test]
    fn test_joke_request_wrong_type_fails() {
        let result = serde_json::from_str::<JokeRequest>(r#"{"joke": 42}"#);
        assert!(result.is_err());
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_pagination_from_pairs() {
        let query = PaginationQuery::from_pairs(pairs(&[("limit", "5"), ("page", "2")]));
        assert_eq!(query.page.as_deref(), Some("2"));
        assert_eq!(query.limit.as_deref(), Some("5"));
    }

    #[test]
    fn test_pagination_first_repeated_value_wins() {
        let query = PaginationQuery::from_pairs(pairs(&[("page", "1"), ("page", "2")]));
        assert_eq!(query.page.as_deref(), Some("1"));
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_pagination_ignores_unknown_and_keeps_empty() {
        let query = PaginationQuery::from_pairs(pairs(&[("sort", "asc"), ("page", "")]));
        assert_eq!(query.page.as_deref(), Some(""));
        assert_eq!(query.limit, None);
    }
}
