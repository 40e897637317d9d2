//! API request helpers

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::request::Parts;
use serde::Deserialize;
use serde::Deserializer;
use serde::de::DeserializeOwned;

use crate::diary::MOOD_MAX;
use crate::diary::MOOD_MIN;

use super::Error;

/// Validate a title
///
/// ```rust
/// let title = "Buy milk";
/// assert!(parse_title(title).is_ok())
/// ```
pub fn parse_title(title: &str) -> Result<&str, Error> {
    if title.is_empty() {
        return Err(Error::bad_request("Title can not be empty"));
    }

    Ok(title)
}

/// Validate a mood value
///
/// ```rust
/// let mood = 3;
/// assert!(parse_mood(mood).is_ok())
/// ```
pub fn parse_mood(mood: i32) -> Result<i32, Error> {
    if !(MOOD_MIN..=MOOD_MAX).contains(&mood) {
        return Err(Error::bad_request(format!(
            "Mood must be between {MOOD_MIN} and {MOOD_MAX}"
        )));
    }

    Ok(mood)
}

/// Deserialize a patch field that can be cleared
///
/// Wraps the value one level deeper so an absent key (outer `None`) can be
/// told apart from an explicit `null` (inner `None`); combine with
/// `#[serde(default)]`
pub fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn parse_json<J>(json: Result<Json<J>, JsonRejection>) -> Result<J, Error> {
    match json {
        Ok(Json(json)) => Ok(json),
        Err(err) => match err {
            JsonRejection::JsonDataError(err) => {
                Err(Error::bad_request("Data error").with_description(err))
            }
            JsonRejection::JsonSyntaxError(err) => Err(Error::bad_request("JSON syntax error")
                .with_description(std::error::Error::source(&err).expect("A valid source"))),
            JsonRejection::MissingJsonContentType(_err) => Err(Error::bad_request(
                "Missing `application/json` content type",
            )),
            JsonRejection::BytesRejection(err) => {
                Err(Error::bad_request("Invalid characters in JSON").with_description(err))
            }
            err => Err(Error::bad_request("Unknown JSON error").with_description(err)),
        },
    }
}

/// Wrapper for the JSON extractor
pub struct Form<F>(pub F);

impl<S, F> FromRequest<S> for Form<F>
where
    S: Send + Sync,
    F: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = Json::<F>::from_request(req, state).await;

        parse_json(json).map(Form)
    }
}

fn parse_path<P>(path: Result<Path<P>, PathRejection>) -> Result<P, Error> {
    match path {
        Ok(Path(path)) => Ok(path),
        Err(err) => match err {
            PathRejection::FailedToDeserializePathParams(err) => {
                Err(Error::bad_request("Invalid path parameter").with_description(err))
            }
            PathRejection::MissingPathParams(err) => {
                Err(Error::bad_request("Missing path parameter").with_description(err))
            }
            err => Err(Error::bad_request("Unknown path error").with_description(err)),
        },
    }
}

/// Wrapper for the path extractor
pub struct PathParameters<P>(pub P);

impl<S, P> FromRequestParts<S> for PathParameters<P>
where
    S: Send + Sync,
    P: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path = Path::<P>::from_request_parts(parts, state).await;

        parse_path(path).map(PathParameters)
    }
}

fn parse_query<Q>(query: Result<Query<Q>, QueryRejection>) -> Result<Q, Error> {
    match query {
        Ok(Query(query)) => Ok(query),
        Err(err) => match err {
            QueryRejection::FailedToDeserializeQueryString(err) => {
                Err(Error::bad_request("Invalid query parameter").with_description(err))
            }
            err => Err(Error::bad_request("Unknown query error").with_description(err)),
        },
    }
}

/// Wrapper for the query string extractor
pub struct QueryParameters<Q>(pub Q);

impl<S, Q> FromRequestParts<S> for QueryParameters<Q>
where
    S: Send + Sync,
    Q: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<Q>::from_request_parts(parts, state).await;

        parse_query(query).map(QueryParameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title() {
        let title = "Buy milk";
        assert_eq!(parse_title(title).unwrap(), title);

        let title = "";
        assert!(parse_title(title).is_err());
    }

    #[test]
    fn test_parse_mood() {
        for mood in MOOD_MIN..=MOOD_MAX {
            assert!(parse_mood(mood).is_ok());
        }

        assert!(parse_mood(MOOD_MIN - 1).is_err());
        assert!(parse_mood(MOOD_MAX + 1).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct PatchProbe {
        #[serde(default, deserialize_with = "patch_field")]
        value: Option<Option<i64>>,
    }

    #[test]
    fn test_patch_field() {
        let probe: PatchProbe = serde_json::from_str("{}").unwrap();
        assert_eq!(None, probe.value);

        let probe: PatchProbe = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(Some(None), probe.value);

        let probe: PatchProbe = serde_json::from_str(r#"{"value": 5}"#).unwrap();
        assert_eq!(Some(Some(5)), probe.value);
    }
}
