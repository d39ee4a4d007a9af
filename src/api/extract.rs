use axum::{
    Json,
    extract::{FromRequest, OptionalFromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use super::ApiError;

/// `Json` body whose rejections use the regular error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

fn reject(rejection: JsonRejection) -> ApiError {
    ApiError::validation(format!("Invalid request body: {}", rejection.body_text()))
}

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await.map_err(reject)?;
        Ok(Self(value))
    }
}

/// Absent when the request carries no JSON content type; malformed bodies are still rejected.
impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state)
            .await
            .map_err(reject)?;
        Ok(value.map(|Json(v)| Self(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let err = <ApiJson<Named> as FromRequest<()>>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        match err {
            ApiError::ValidationError(msg) => assert!(msg.contains("name"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    async fn optional(request: Request) -> Result<Option<ApiJson<Named>>, ApiError> {
        <ApiJson<Named> as OptionalFromRequest<()>>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn optional_body_may_be_omitted() {
        let empty = Request::builder().body(Body::empty()).unwrap();
        assert!(optional(empty).await.unwrap().is_none());

        let parsed = optional(json_request(r#"{"name":"x"}"#)).await.unwrap();
        assert_eq!(parsed.unwrap().0.name, "x");

        let err = optional(json_request("{")).await;
        assert!(matches!(err, Err(ApiError::ValidationError(_))));
    }
}
