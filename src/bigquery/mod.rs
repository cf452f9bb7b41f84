//! BigQuery access over the v2 REST API.
//!
//! A query is submitted with `jobs.query` and polled with
//! `jobs.getQueryResults` until complete. The finished result can then be read
//! in two ways (see [`ReadPath`]); [`BigQueryClient::executor`] pairs them
//! into a [`QueryExecutor`] with the table read preferred.

pub mod api;
pub mod auth;
pub mod rows;

use crate::config::{FallbackPolicy, StudyConfig};
use crate::error::{CohortError, QueryError, QueryResult, Result};
use crate::query::{QueryBackend, QueryExecutor};
use crate::utils::logging::{create_spinner, finish_and_clear};
use api::{
    FormatOptions, Job, JobReference, QueryRequest, QueryResponse, TableDataList, TableRow,
};
use arrow::record_batch::RecordBatch;
use log::{debug, info};
use serde::de::DeserializeOwned;

/// Root of the BigQuery v2 REST API
pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Server-side wait per poll of a running job
const POLL_TIMEOUT_MS: u32 = 10_000;

/// Query parameter asking for `TIMESTAMP` cells as integer microseconds
const INT64_TIMESTAMP_PARAM: &str = "formatOptions.useInt64Timestamp";

/// How the rows of a finished query are retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPath {
    /// Read the job's destination table with `tabledata.list`
    ///
    /// Requires read access to the (anonymous) destination table.
    TableRead,
    /// Page through `jobs.getQueryResults`
    QueryResults,
}

impl ReadPath {
    /// Name used in log messages
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TableRead => "table read",
            Self::QueryResults => "query results",
        }
    }
}

/// Authenticated client for one billing project
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    project: String,
    page_size: u32,
}

impl BigQueryClient {
    /// Create a client from the study configuration and ambient credentials
    pub async fn connect(config: &StudyConfig) -> Result<Self> {
        let project = auth::resolve_billing_project(
            config.billing_project.as_deref(),
            config.dataset_project(),
        )
        .ok_or_else(|| CohortError::Auth("no billing project could be determined".to_string()))?;

        let http = reqwest::Client::new();
        let token = auth::resolve_access_token(&http).await?;
        info!("Connected to BigQuery, billing project {project}");

        Ok(Self::with_http(
            http,
            DEFAULT_BASE_URL,
            &token,
            &project,
            config.page_size,
        ))
    }

    /// Create a client for an API root with a ready-made token
    #[must_use]
    pub fn new(base_url: &str, token: &str, project: &str, page_size: u32) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, token, project, page_size)
    }

    fn with_http(
        http: reqwest::Client,
        base_url: &str,
        token: &str,
        project: &str,
        page_size: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            project: project.to_string(),
            page_size: page_size.max(1),
        }
    }

    /// A backend reading results through one path
    #[must_use]
    pub const fn reader(&self, path: ReadPath) -> BigQueryReader<'_> {
        BigQueryReader { client: self, path }
    }

    /// Executor preferring the table read and falling back to query results
    #[must_use]
    pub const fn executor(
        &self,
        policy: FallbackPolicy,
    ) -> QueryExecutor<BigQueryReader<'_>, BigQueryReader<'_>> {
        QueryExecutor::new(
            self.reader(ReadPath::TableRead),
            self.reader(ReadPath::QueryResults),
            policy,
        )
    }

    /// Run a query and read its rows through `path`
    pub async fn read(&self, sql: &str, path: ReadPath) -> QueryResult<RecordBatch> {
        // The table read fetches rows separately, so skip them in the job response
        let first_page_rows = match path {
            ReadPath::TableRead => 0,
            ReadPath::QueryResults => self.page_size,
        };
        let response = self.run_job(sql, first_page_rows).await?;

        let fields = response
            .schema
            .as_ref()
            .map(|schema| schema.fields.clone())
            .ok_or_else(|| QueryError::Decode("completed query has no schema".to_string()))?;
        let job = response
            .job_reference
            .clone()
            .ok_or_else(|| QueryError::Decode("query response has no job reference".to_string()))?;

        let table_rows = match path {
            ReadPath::TableRead => self.read_destination_table(&job).await?,
            ReadPath::QueryResults => self.read_query_results(&job, response).await?,
        };
        debug!("Decoding {} rows from job {}", table_rows.len(), job.job_id);

        rows::rows_to_batch(&fields, &table_rows)
    }

    /// Submit a query and wait until the job is complete
    async fn run_job(&self, sql: &str, max_results: u32) -> QueryResult<QueryResponse> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project);
        let request = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            max_results,
            timeout_ms: POLL_TIMEOUT_MS,
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };

        let spinner = create_spinner(Some("Running query"));
        let result = async {
            let mut response: QueryResponse = self.send(self.http.post(&url).json(&request)).await?;
            while !response.job_complete {
                let job = response.job_reference.clone().ok_or_else(|| {
                    QueryError::Decode("pending query has no job reference".to_string())
                })?;
                spinner.set_message(format!("Waiting for job {}", job.job_id));
                response = self.get_query_results(&job, None, max_results).await?;
            }
            Ok::<_, QueryError>(response)
        }
        .await;
        finish_and_clear(&spinner);

        result
    }

    async fn get_query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        max_results: u32,
    ) -> QueryResult<QueryResponse> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.base_url, job.project_id, job.job_id
        );
        let mut query = vec![
            ("maxResults", max_results.to_string()),
            ("timeoutMs", POLL_TIMEOUT_MS.to_string()),
            (INT64_TIMESTAMP_PARAM, "true".to_string()),
        ];
        if let Some(location) = &job.location {
            query.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        self.send(self.http.get(&url).query(&query)).await
    }

    async fn read_query_results(
        &self,
        job: &JobReference,
        first: QueryResponse,
    ) -> QueryResult<Vec<TableRow>> {
        let mut rows = first.rows;
        let mut page_token = first.page_token;

        while let Some(token) = page_token {
            let page = self
                .get_query_results(job, Some(&token), self.page_size)
                .await?;
            rows.extend(page.rows);
            page_token = page.page_token;
        }

        Ok(rows)
    }

    async fn read_destination_table(&self, job: &JobReference) -> QueryResult<Vec<TableRow>> {
        let mut url = format!(
            "{}/projects/{}/jobs/{}",
            self.base_url, job.project_id, job.job_id
        );
        if let Some(location) = &job.location {
            url = format!("{url}?location={location}");
        }
        let details: Job = self.send(self.http.get(&url)).await?;
        let table = details
            .configuration
            .and_then(|c| c.query)
            .and_then(|q| q.destination_table)
            .ok_or_else(|| QueryError::Decode("query job has no destination table".to_string()))?;

        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/data",
            self.base_url, table.project_id, table.dataset_id, table.table_id
        );
        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("maxResults", self.page_size.to_string()),
                (INT64_TIMESTAMP_PARAM, "true".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let page: TableDataList = self.send(self.http.get(&url).query(&query)).await?;
            rows.extend(page.rows);

            match page.page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(rows)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> QueryResult<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| QueryError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(rows::api_error(status.as_u16(), &body))
    }
}

/// [`QueryBackend`] reading through one [`ReadPath`]
#[derive(Debug, Clone, Copy)]
pub struct BigQueryReader<'a> {
    client: &'a BigQueryClient,
    path: ReadPath,
}

impl QueryBackend for BigQueryReader<'_> {
    fn label(&self) -> &str {
        self.path.label()
    }

    async fn fetch(&self, sql: &str) -> QueryResult<RecordBatch> {
        self.client.read(sql, self.path).await
    }
}
