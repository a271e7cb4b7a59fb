use async_trait::async_trait;
use batchline_application::RunReportSink;
use batchline_core::{AppError, AppResult};
use batchline_domain::RunReport;
use tracing::debug;

/// Publishes run reports as JSON to an HTTP collector.
pub struct HttpRunReportSink {
    http_client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpRunReportSink {
    /// Creates a sink posting to `endpoint`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            bearer_token,
        }
    }
}

#[async_trait]
impl RunReportSink for HttpRunReportSink {
    async fn publish(&self, report: &RunReport) -> AppResult<()> {
        let mut request = self
            .http_client
            .post(self.endpoint.as_str())
            .header("X-Batchline-Job", report.job_name.as_str())
            .json(report);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            AppError::Unavailable(format!(
                "run report transport error for job '{}': {error}",
                report.job_name
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Unavailable(format!(
                "run report collector rejected job '{}' with status {status}: {body}",
                report.job_name
            )));
        }

        debug!(
            job_name = %report.job_name,
            outcome = report.outcome.as_str(),
            "run report published"
        );
        Ok(())
    }
}
