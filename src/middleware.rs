use axum::{extract::Request, middleware::Next, response::Response};

use crate::app_error::AppError;

/// Guard for back-office routes: the request must carry the shared admin
/// token in `x-admin-token`. The token lives in `ADMIN_API_TOKEN` and is
/// read per request, not through `Config`, so the guard layer stays free
/// of router state. Session handling is out of scope; this is the only
/// authorization layer in the service.
pub async fn admin_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    let expected = std::env::var("ADMIN_API_TOKEN")
        .map_err(|_| AppError::ForbiddenResource("Admin access is not configured".into()))?;

    let provided = req
        .headers()
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok());

    if token_matches(&expected, provided) {
        Ok(next.run(req).await)
    } else {
        Err(AppError::ForbiddenResource("Admin token required".into()))
    }
}

fn token_matches(expected: &str, provided: Option<&str>) -> bool {
    provided == Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing};
    use tower::ServiceExt;

    fn guarded_app() -> Router {
        Router::new()
            .route("/", routing::get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn(admin_authorization))
    }

    #[test]
    fn token_comparison_requires_exact_match() {
        assert!(token_matches("secret", Some("secret")));
        assert!(!token_matches("secret", Some("Secret")));
        assert!(!token_matches("secret", None));
    }

    #[tokio::test]
    async fn requests_without_the_token_are_rejected() {
        let res = guarded_app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn requests_with_the_configured_token_pass() {
        // set_var is process-global; no other test writes this variable
        unsafe { std::env::set_var("ADMIN_API_TOKEN", "test-admin-token") };
        let res = guarded_app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .header("x-admin-token", "test-admin-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
