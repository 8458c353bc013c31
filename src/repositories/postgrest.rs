use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, Instrument};

use crate::models::{RepositoryError, RepositoryResult};
use crate::observability::{DatabaseTracingMiddleware, Metrics};

/// Postgres SQLSTATE for unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";

/// Error body returned by PostgREST for failed requests
#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Thin HTTP client for the Supabase PostgREST interface.
///
/// Requests authenticate with the service-role key; row ownership is checked
/// by the services before any write.
pub struct PostgrestClient {
    http: Client,
    rest_url: String,
    service_role_key: String,
    tracer: DatabaseTracingMiddleware,
}

impl PostgrestClient {
    pub fn new(
        http: Client,
        supabase_url: &str,
        service_role_key: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            service_role_key: service_role_key.into(),
            tracer: DatabaseTracingMiddleware::new(metrics),
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn create_postgrest_span(&self, operation: &str, table: &str) -> tracing::Span {
        tracing::info_span!(
            "PostgREST",
            "otel.kind" = "client",
            "otel.name" = format!("PostgREST.{}", operation),
            "db.system" = "postgresql",
            "db.operation" = operation,
            "db.sql.table" = table,
            "http.url" = %self.table_url(table),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    /// Insert one row without asking for it back
    pub async fn insert<B>(&self, table: &str, row: &B) -> RepositoryResult<()>
    where
        B: Serialize + Sync,
    {
        let span = self.create_postgrest_span("insert", table);
        let request = self
            .authorized(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row);

        self.tracer
            .trace_operation("insert", table, async {
                self.send(request).await?;
                Ok(())
            })
            .instrument(span)
            .await
    }

    /// Insert one row and return it as stored
    pub async fn insert_returning<B, T>(&self, table: &str, row: &B) -> RepositoryResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let span = self.create_postgrest_span("insert", table);
        let request = self
            .authorized(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(row);

        self.tracer
            .trace_operation("insert", table, async {
                let response = self.send(request).await?;
                let mut rows: Vec<T> = decode_rows(response).await?;
                if rows.is_empty() {
                    return Err(RepositoryError::Postgrest {
                        status: StatusCode::CREATED.as_u16(),
                        code: String::new(),
                        message: "insert returned no rows".to_string(),
                    });
                }
                Ok(rows.swap_remove(0))
            })
            .instrument(span)
            .await
    }

    /// Fetch at most one row matching every `column=eq.value` filter
    pub async fn select_one<T>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> RepositoryResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let span = self.create_postgrest_span("select", table);
        let mut query = eq_filters(filters);
        query.push(("select".to_string(), columns.to_string()));
        query.push(("limit".to_string(), "1".to_string()));

        let request = self
            .authorized(self.http.get(self.table_url(table)))
            .query(&query);

        self.tracer
            .trace_operation("select", table, async {
                let response = self.send(request).await?;
                let rows: Vec<T> = decode_rows(response).await?;
                Ok(rows.into_iter().next())
            })
            .instrument(span)
            .await
    }

    /// Patch every row matching the filters and return the updated rows
    pub async fn update<B, T>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        patch: &B,
    ) -> RepositoryResult<Vec<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let span = self.create_postgrest_span("update", table);
        let request = self
            .authorized(self.http.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&eq_filters(filters))
            .json(patch);

        self.tracer
            .trace_operation("update", table, async {
                let response = self.send(request).await?;
                decode_rows(response).await
            })
            .instrument(span)
            .await
    }

    async fn send(&self, request: RequestBuilder) -> RepositoryResult<Response> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if status.is_success() {
            debug!(status = status.as_u16(), "PostgREST request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = map_error_response(status, &body);
        error!(status = status.as_u16(), error = %error, "PostgREST request failed");
        Err(error)
    }
}

fn eq_filters(filters: &[(&str, String)]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|(column, value)| (column.to_string(), format!("eq.{}", value)))
        .collect()
}

async fn decode_rows<T: DeserializeOwned + Send>(response: Response) -> RepositoryResult<Vec<T>> {
    let bytes = response.bytes().await.map_err(map_transport_error)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> RepositoryError {
    if error.is_timeout() {
        RepositoryError::Timeout
    } else if error.is_connect() {
        RepositoryError::ConnectionFailed
    } else {
        RepositoryError::Http {
            message: error.to_string(),
        }
    }
}

/// Translate a non-2xx PostgREST response into a repository error
pub(crate) fn map_error_response(status: StatusCode, body: &str) -> RepositoryError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RepositoryError::RateLimitExceeded;
    }

    let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.details)
        .unwrap_or_else(|| body.chars().take(200).collect());

    if code == UNIQUE_VIOLATION {
        RepositoryError::UniqueViolation { message }
    } else if code.starts_with("23") {
        // integrity_constraint_violation class
        RepositoryError::ConstraintViolation { message }
    } else {
        RepositoryError::Postgrest {
            status: status.as_u16(),
            code,
            message,
        }
    }
}
