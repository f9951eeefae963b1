//! Authentication integration tests.

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use signgate_auth::RequestSigner;

    use crate::{
        CORRELATION_HEADER, IDENTITY, SECRET, client, default_store, gateway_config, sign,
        sign_as, spawn_gateway, spawn_upstream,
    };

    async fn assert_unauthorized(response: reqwest::Response) -> serde_json::Value {
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(CORRELATION_HEADER));
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["code"], 401);
        assert_eq!(json["name"], "UNAUTHORIZED");
        json
    }

    #[tokio::test]
    async fn test_should_reject_tampered_body_without_contacting_upstream() {
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), default_store()).await;
        let url = format!("{base}/widgets");

        let response = client()
            .post(&url)
            .headers(sign("POST", &url, br#"{"n":1}"#))
            .body(r#"{"n":2}"#)
            .send()
            .await
            .unwrap();

        let json = assert_unauthorized(response).await;
        assert_eq!(json["metadata"]["method"], "POST");
        assert_eq!(json["metadata"]["path"], "/widgets");
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_identity_with_same_body_as_bad_signature() {
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), default_store()).await;
        let url = format!("{base}/widgets");

        let unknown = client()
            .get(&url)
            .headers(sign_as("svc-unknown", SECRET, "GET", &url, b""))
            .send()
            .await
            .unwrap();
        let wrong_secret = client()
            .get(&url)
            .headers(sign_as(IDENTITY, "not-the-secret", "GET", &url, b""))
            .send()
            .await
            .unwrap();

        let unknown = assert_unauthorized(unknown).await;
        let wrong_secret = assert_unauthorized(wrong_secret).await;
        assert_eq!(unknown, wrong_secret);
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_request() {
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), default_store()).await;

        let response = client()
            .get(format!("{base}/widgets"))
            .send()
            .await
            .unwrap();

        assert_unauthorized(response).await;
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_stale_date() {
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), default_store()).await;
        let url = format!("{base}/widgets");

        let (mut parts, ()) = http::Request::builder()
            .method("GET")
            .uri(&url)
            .body(())
            .unwrap()
            .into_parts();
        let an_hour_ago = Utc::now() - TimeDelta::hours(1);
        RequestSigner::new(IDENTITY, SECRET)
            .sign(&mut parts, b"", an_hour_ago)
            .unwrap();

        let response = client()
            .get(&url)
            .headers(parts.headers)
            .send()
            .await
            .unwrap();

        assert_unauthorized(response).await;
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_body_over_limit() {
        let upstream = spawn_upstream().await;
        let mut config = gateway_config(upstream.addr);
        config.max_body_bytes = 8;
        let base = spawn_gateway(&config, default_store()).await;
        let url = format!("{base}/widgets");
        let body = b"0123456789abcdef";

        let response = client()
            .post(&url)
            .headers(sign("POST", &url, body))
            .body(body.to_vec())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["name"], "BAD_REQUEST");
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_answer_oversized_body_alike_for_known_and_unknown_identity() {
        let upstream = spawn_upstream().await;
        let mut config = gateway_config(upstream.addr);
        config.max_body_bytes = 8;
        let base = spawn_gateway(&config, default_store()).await;
        let url = format!("{base}/widgets");
        let body = b"0123456789abcdef";

        let mut answers = Vec::new();
        for identity in [IDENTITY, "nobody"] {
            let response = client()
                .post(&url)
                .headers(sign_as(identity, "not-the-secret", "POST", &url, body))
                .body(body.to_vec())
                .send()
                .await
                .unwrap();
            let status = response.status();
            let json: serde_json::Value = response.json().await.unwrap();
            answers.push((status, json));
        }

        assert_eq!(answers[0], answers[1]);
        assert_eq!(answers[0].0, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(upstream.calls(), 0);
    }
}
