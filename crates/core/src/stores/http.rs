use crate::models::{IndexInfo, IndexQuery, IndexRecord, SearchResponse};
use crate::traits::{DocumentIndex, IndexProvider};
use crate::IndexError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use url::Url;

const BACKEND: &str = "index-service";

#[derive(Clone)]
struct Connection {
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

impl Connection {
    fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, IndexError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            api_key,
            client: Client::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, IndexError> {
        Ok(self.endpoint.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IndexError::BackendResponse {
        backend: BACKEND.to_string(),
        details: if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{status}: {}", body.trim())
        },
    })
}

/// Handle on one index of a REST index service.
#[derive(Clone)]
pub struct HttpIndex {
    id: String,
    connection: Connection,
}

impl HttpIndex {
    pub fn new(
        endpoint: &str,
        id: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            id: id.into(),
            connection: Connection::new(endpoint, api_key)?,
        })
    }
}

#[async_trait]
impl DocumentIndex for HttpIndex {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &IndexQuery) -> Result<SearchResponse, IndexError> {
        let url = self.connection.url(&format!("indexes/{}/search", self.id))?;
        let request = self.connection.client.post(url).json(query);
        let response = self.connection.authorize(request).send().await?;
        let parsed: Value = ensure_success(response).await?.json().await?;

        let details = parsed
            .pointer("/details")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(SearchResponse { details })
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }

        let url = self.connection.url(&format!("indexes/{}/upsert", self.id))?;
        let request = self
            .connection
            .client
            .post(url)
            .json(&json!({ "records": records }));
        let response = self.connection.authorize(request).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Index lookup and creation against the same REST service.
#[derive(Clone)]
pub struct HttpIndexProvider {
    connection: Connection,
}

impl HttpIndexProvider {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, IndexError> {
        Ok(Self {
            connection: Connection::new(endpoint, api_key)?,
        })
    }

    fn handle(&self, info: IndexInfo) -> HttpIndex {
        HttpIndex {
            id: info.id,
            connection: self.connection.clone(),
        }
    }
}

#[async_trait]
impl IndexProvider for HttpIndexProvider {
    type Handle = HttpIndex;

    async fn get(&self, id: &str) -> Result<HttpIndex, IndexError> {
        let url = self.connection.url(&format!("indexes/{id}"))?;
        let request = self.connection.client.get(url);
        let response = self.connection.authorize(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound(id.to_string()));
        }

        let info: IndexInfo = ensure_success(response).await?.json().await?;
        Ok(self.handle(info))
    }

    async fn list(&self) -> Result<Vec<IndexInfo>, IndexError> {
        let url = self.connection.url("indexes")?;
        let request = self.connection.client.get(url);
        let response = self.connection.authorize(request).send().await?;
        let parsed: Value = ensure_success(response).await?.json().await?;

        let results = parsed.get("results").cloned().unwrap_or(Value::Array(Vec::new()));
        Ok(serde_json::from_value(results)?)
    }

    async fn create(
        &self,
        name: &str,
        description: &str,
        embedding_model: Option<&str>,
    ) -> Result<HttpIndex, IndexError> {
        let url = self.connection.url("indexes")?;
        let request = self.connection.client.post(url).json(&json!({
            "name": name,
            "description": description,
            "embedding_model": embedding_model,
        }));
        let response = self.connection.authorize(request).send().await?;
        let info: IndexInfo = ensure_success(response).await?.json().await?;
        Ok(self.handle(info))
    }
}
