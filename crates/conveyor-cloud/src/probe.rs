use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct Greeting {
    message: String,
}

/// Call the deployed API once and check it answers `{"message": <expected>}`.
pub async fn verify_api(url: &str, expected: &str) -> Result<(), ProbeError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ProbeError::Request {
            url: url.to_owned(),
            source: e,
        })?;

    let response = client.get(url).send().await.map_err(|e| ProbeError::Request {
        url: url.to_owned(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|e| ProbeError::Request {
        url: url.to_owned(),
        source: e,
    })?;
    match serde_json::from_str::<Greeting>(&body) {
        Ok(greeting) if greeting.message == expected => {
            tracing::debug!(url, "api verified");
            Ok(())
        }
        _ => Err(ProbeError::UnexpectedBody {
            url: url.to_owned(),
            body,
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("request to {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} answered an unexpected body: {body}")]
    UnexpectedBody { url: String, body: String },
}
