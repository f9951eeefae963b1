//! Forwarding integration tests.

#[cfg(test)]
mod tests {
    use crate::{
        CORRELATION_HEADER, client, default_store, gateway_config, sign, spawn_gateway,
        spawn_upstream,
    };

    #[tokio::test]
    async fn test_should_forward_signed_request_and_relay_response() {
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), default_store()).await;
        let url = format!("{base}/widgets");
        let body = br#"{"n":1}"#;

        let response = client()
            .post(&url)
            .headers(sign("POST", &url, body))
            .header(CORRELATION_HEADER, "trace-42")
            .body(body.to_vec())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers["x-echo-method"], "POST");
        assert_eq!(headers["x-echo-path"], "/widgets");
        assert_eq!(headers["x-echo-correlation"], "trace-42");
        assert_eq!(headers["x-saw-authorization"], "no");
        assert_eq!(headers[CORRELATION_HEADER], "trace-42");
        assert_eq!(response.bytes().await.unwrap().as_ref(), body);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_should_generate_correlation_id_seen_by_upstream_and_caller() {
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), default_store()).await;
        let url = format!("{base}/widgets?page=2");

        let response = client()
            .get(&url)
            .headers(sign("GET", &url, b""))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["x-echo-path"], "/widgets?page=2");
        let generated = headers[CORRELATION_HEADER].to_str().unwrap();
        assert_eq!(generated.len(), 36);
        assert_eq!(headers["x-echo-correlation"], generated);
    }

    #[tokio::test]
    async fn test_should_return_bad_gateway_when_upstream_unreachable() {
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = closed.local_addr().unwrap();
        drop(closed);

        let base = spawn_gateway(&gateway_config(dead), default_store()).await;
        let url = format!("{base}/widgets");
        let body = br#"{"n":1}"#;

        let response = client()
            .post(&url)
            .headers(sign("POST", &url, body))
            .body(body.to_vec())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key(CORRELATION_HEADER));
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["code"], 502);
        assert_eq!(json["name"], "BAD_GATEWAY");
    }

    #[tokio::test]
    async fn test_should_not_echo_correlation_when_disabled() {
        let upstream = spawn_upstream().await;
        let mut config = gateway_config(upstream.addr);
        config.correlation.enable = false;
        let base = spawn_gateway(&config, default_store()).await;
        let url = format!("{base}/widgets");

        let response = client()
            .get(&url)
            .headers(sign("GET", &url, b""))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(!response.headers().contains_key(CORRELATION_HEADER));
        assert_eq!(response.headers()["x-echo-correlation"], "");
    }
}
