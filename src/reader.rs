use crate::{
    client::{ReportClient, ReportOptions, ReportOutcome, SaintOutcome},
    clock::{Clock, SystemClock},
    error::{Result, SiteCatError},
    flatten,
    model::{DateGranularity, ReportDescription},
    saint,
    table::Table,
    transport::Transport,
};
use serde_json::Value;

/// Table-returning front end over [`ReportClient`].
pub struct SiteCat<T: Transport, C: Clock = SystemClock> {
    client: ReportClient<T, C>,
}

impl<T: Transport, C: Clock> SiteCat<T, C> {
    pub fn new(client: ReportClient<T, C>) -> Self {
        Self { client }
    }

    /// Builds the description from loose arguments, then reads it.
    #[allow(clippy::too_many_arguments)]
    pub fn read_sc<S: AsRef<str>>(
        &self,
        report_suite_id: &str,
        date_from: &str,
        date_to: &str,
        metrics: &[S],
        granularity: DateGranularity,
        elements: &[S],
        options: &ReportOptions,
    ) -> Result<Table> {
        let description = ReportDescription::new(report_suite_id, date_from, date_to, metrics)?
            .with_granularity(granularity)
            .with_elements(elements);
        self.read_report(&description, options)
    }

    /// Submits, waits and flattens. `queue_only` makes no sense here and is ignored.
    pub fn read_report(&self, description: &ReportDescription, options: &ReportOptions) -> Result<Table> {
        let options = ReportOptions {
            queue_only: false,
            ..options.clone()
        };
        match self.client.get_report(description, &options)? {
            ReportOutcome::Finished(raw) => flatten::flatten(&raw),
            ReportOutcome::Queued(id) => Err(SiteCatError::QueueTimeout { job_id: id, checks: 0 }),
        }
    }

    pub fn read_saint_export(
        &self,
        request: &Value,
        only_unclassified: bool,
        options: &ReportOptions,
    ) -> Result<Table> {
        let options = ReportOptions {
            queue_only: false,
            ..options.clone()
        };
        match self.client.get_saint_export(request, &options)? {
            SaintOutcome::Finished(segments) => saint::table_from_segments(&segments, only_unclassified),
            SaintOutcome::Queued(id) => Err(SiteCatError::QueueTimeout { job_id: id, checks: 0 }),
        }
    }
}
