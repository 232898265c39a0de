use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

/// `Json<T>` whose failures render as the usual field-list error body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|err| AppError::invalid_body(err.to_string()))
    }
}

/// A field of a partial-update body: left out, explicitly null, or set.
#[derive(Debug, PartialEq)]
pub enum Patch<T> {
    Omitted,
    Null,
    Value(T),
}

pub fn classify_field<T: DeserializeOwned>(body: &Value, field: &str) -> Result<Patch<T>, String> {
    match body.get(field) {
        None => Ok(Patch::Omitted),
        Some(Value::Null) => Ok(Patch::Null),
        Some(value) => serde_json::from_value(value.clone())
            .map(Patch::Value)
            .map_err(|err| format!("invalid {field}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Status;
    use axum::{body::Body, http::StatusCode};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Ids {
        ids: Vec<i64>,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn json_body_reads_matching_payloads() {
        let JsonBody(parsed) = JsonBody::<Ids>::from_request(json_request(r#"{"ids":[3,1]}"#), &())
            .await
            .unwrap();
        assert_eq!(parsed.ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn json_body_failures_become_field_errors() {
        let wrong_shape = JsonBody::<Ids>::from_request(json_request(r#"{"ids":"all"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(wrong_shape.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let broken = JsonBody::<Ids>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(broken.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn distinguishes_missing_null_and_set() {
        let body = json!({ "admin_notes": null, "status": "approved" });
        assert_eq!(
            classify_field::<String>(&body, "admin_notes").unwrap(),
            Patch::Null
        );
        assert_eq!(
            classify_field::<Status>(&body, "status").unwrap(),
            Patch::Value(Status::Approved)
        );
        assert_eq!(
            classify_field::<String>(&body, "priority").unwrap(),
            Patch::Omitted
        );
    }

    #[test]
    fn reports_type_mismatches() {
        let body = json!({ "status": "archived" });
        let err = classify_field::<Status>(&body, "status").unwrap_err();
        assert!(err.starts_with("invalid status"));
    }
}
