//! Credential reload integration tests.

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use signgate_auth::CredentialStore;

    use crate::{client, gateway_config, sign_as, spawn_gateway, spawn_upstream};

    fn credentials_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn status_as(base: &str, identity: &str, secret: &str) -> reqwest::StatusCode {
        let url = format!("{base}/widgets");
        client()
            .get(&url)
            .headers(sign_as(identity, secret, "GET", &url, b""))
            .send()
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_should_apply_reloaded_credentials_to_new_requests() {
        let file = credentials_file(r#"{"svc-a": "secret-a"}"#);
        let store = Arc::new(CredentialStore::load(file.path()).await.unwrap());
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), Arc::clone(&store)).await;

        assert_eq!(status_as(&base, "svc-a", "secret-a").await, reqwest::StatusCode::OK);
        assert_eq!(
            status_as(&base, "svc-b", "secret-b").await,
            reqwest::StatusCode::UNAUTHORIZED
        );

        std::fs::write(file.path(), r#"{"svc-b": "secret-b"}"#).unwrap();
        assert_eq!(store.reload().await.unwrap(), 1);

        assert_eq!(status_as(&base, "svc-b", "secret-b").await, reqwest::StatusCode::OK);
        assert_eq!(
            status_as(&base, "svc-a", "secret-a").await,
            reqwest::StatusCode::UNAUTHORIZED
        );
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_should_keep_serving_previous_credentials_after_failed_reload() {
        let file = credentials_file(r#"{"svc-a": "secret-a"}"#);
        let store = Arc::new(CredentialStore::load(file.path()).await.unwrap());
        let upstream = spawn_upstream().await;
        let base = spawn_gateway(&gateway_config(upstream.addr), Arc::clone(&store)).await;

        std::fs::write(file.path(), "{ not json").unwrap();
        assert!(store.reload().await.is_err());

        assert_eq!(status_as(&base, "svc-a", "secret-a").await, reqwest::StatusCode::OK);

        let health = client()
            .get(format!("{base}/_gateway/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = health.json().await.unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["credentials"]["identities"], 1);
        assert_eq!(json["credentials"]["reloadFailing"], true);
        assert!(json["credentials"].get("lastLoadError").is_none());
        assert!(json["credentials"].get("sourcePath").is_none());
    }
}
