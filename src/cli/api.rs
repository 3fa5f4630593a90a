//! Raw authenticated API requests

use reqwest::Method;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::client::ApiRequest;
use crate::client::response::check;
use crate::error::{Error, Result};

/// Send `method path` through the authenticated pipeline and print the body
pub async fn run(
    opts: &GlobalOptions,
    method: &str,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let request = build_request(method, path, data, query)?;

    let response = check(ctx.client.send(request).await?).await?;
    let body = response
        .text()
        .await
        .map_err(crate::error::ApiError::from)?;

    // Pretty-print JSON bodies, pass anything else through
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) if body.is_empty() => {}
        Err(_) => println!("{}", body),
    }
    Ok(())
}

fn build_request(
    method: &str,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> Result<ApiRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Other(format!("invalid HTTP method: {}", method)))?;

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let mut request = ApiRequest::new(method, path);
    if let Some(data) = data {
        request = request.json(serde_json::from_str(data)?);
    }
    for pair in query {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| {
                Error::Other(format!(
                    "invalid query parameter (expected KEY=VALUE): {}",
                    pair
                ))
            })?;
        request = request.query(key, value);
    }
    Ok(request)
}
