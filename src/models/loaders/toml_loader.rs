use crate::models::quote::QuoteRequest;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Load one quote request from a `.toml` or `.json` file
pub async fn load_request_file(path: &Path) -> Result<QuoteRequest> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read request file: {}", path.display()))?;

    let mut request: QuoteRequest = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("cannot parse JSON request: {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("cannot parse TOML request: {}", path.display()))?,
    };

    request.file_path = Some(path.to_string_lossy().to_string());

    Ok(request)
}

/// Load every request file in a folder, sorted by file name.
///
/// Files that fail to parse are logged and skipped.
pub async fn load_all_requests(folder_path: &str) -> Result<Vec<QuoteRequest>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("folder does not exist: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("cannot read folder: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("toml") | Some("json")
        ) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut requests = Vec::new();
    for path in paths {
        tracing::info!(
            "loading: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_request_file(&path).await {
            Ok(request) if request.is_start_automation() => {
                tracing::info!("loaded request with {} fields", request.quote_data.len());
                requests.push(request);
            }
            Ok(request) => {
                tracing::warn!(
                    "skipping {}: unknown action '{}'",
                    path.display(),
                    request.action
                );
            }
            Err(e) => {
                tracing::warn!("failed to load {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_toml_and_json_requests_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"task_id":"json-1","quote_data":{"company_name":"Json LLC"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            "task_id = \"toml-1\"\n[quote_data]\ncompany_name = \"Toml LLC\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let requests = load_all_requests(dir.path().to_str().unwrap()).await.unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].task_id.as_deref(), Some("toml-1"));
        assert_eq!(requests[1].task_id.as_deref(), Some("json-1"));
        assert_eq!(requests[0].action, "start_automation");
        assert!(requests[0].file_path.is_some());
    }

    #[tokio::test]
    async fn skips_unknown_actions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("x.json"),
            r#"{"action":"cancel","quote_data":{}}"#,
        )
        .unwrap();

        let requests = load_all_requests(dir.path().to_str().unwrap()).await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let result = load_all_requests("/definitely/not/here").await;
        tokio_test::assert_err!(result);
    }
}
