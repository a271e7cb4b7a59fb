use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::RunReport;

/// External sink receiving one report per coordinator invocation.
#[async_trait]
pub trait RunReportSink: Send + Sync {
    /// Publishes one invocation report.
    async fn publish(&self, report: &RunReport) -> AppResult<()>;
}
