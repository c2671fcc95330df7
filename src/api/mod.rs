// Typed client for the expenses REST backend

mod error;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::listing::{ListQuery, MAX_PAGE_SIZE, Page, PageBody};
use crate::models::{LocalFile, LookupItem, LookupKind, Lookups, StoredFile};
use crate::records::{Record, RecordKind};

pub use error::{ApiError, error_from_body};

pub const UPLOAD_PATH: &str = "/files/upload";
/// Multipart part name the upload endpoint expects, once per file
pub const UPLOAD_FIELD: &str = "files";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::from_reqwest(&config.api_url, e))?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "api request");
        let req = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, req: RequestBuilder, path: &str) -> Result<String, ApiError> {
        let url = self.url(path);
        let resp = req.send().await.map_err(|e| {
            warn!(path, error = %e, "api request failed");
            ApiError::from_reqwest(&url, e)
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&url, e))?;

        if !status.is_success() {
            let err = error_from_body(status, &body);
            warn!(path, status = status.as_u16(), error = %err, "api request rejected");
            return Err(err);
        }
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let body = self.execute(req, path).await?;
        decode_body(&body)
    }

    pub async fn list<R: Record>(&self, query: &ListQuery) -> Result<Page<R>, ApiError> {
        let path = collection_path(R::KIND);
        let req = self
            .request(Method::GET, &path)
            .query(&query.to_params(R::KIND));
        let body = self.execute(req, &path).await?;
        decode_page(&body, query)
    }

    pub async fn get<R: Record>(&self, id: u64) -> Result<R, ApiError> {
        let path = item_path(R::KIND, id);
        self.fetch(self.request(Method::GET, &path), &path).await
    }

    /// Create a record and return it as saved by the server.
    pub async fn create<R: Record>(&self, record: &R) -> Result<R, ApiError> {
        let path = collection_path(R::KIND);
        let req = self.request(Method::POST, &path).json(record);
        let body = self.execute(req, &path).await?;
        let saved = saved_or(&body, record, None)?;
        info!(kind = %R::KIND, id = ?saved.id(), "record created");
        Ok(saved)
    }

    pub async fn update<R: Record>(&self, id: u64, record: &R) -> Result<R, ApiError> {
        let path = item_path(R::KIND, id);
        let req = self.request(Method::PUT, &path).json(record);
        let body = self.execute(req, &path).await?;
        let saved = saved_or(&body, record, Some(id))?;
        info!(kind = %R::KIND, id, "record updated");
        Ok(saved)
    }

    pub async fn delete(&self, kind: RecordKind, id: u64) -> Result<(), ApiError> {
        let path = item_path(kind, id);
        self.execute(self.request(Method::DELETE, &path), &path)
            .await?;
        info!(%kind, id, "record deleted");
        Ok(())
    }

    /// Every record matching the query's filters, walking the pages at the
    /// largest page size.
    pub async fn fetch_all<R: Record>(&self, query: &ListQuery) -> Result<Vec<R>, ApiError> {
        let mut query = query.clone();
        query.page = 1;
        query.per_page = MAX_PAGE_SIZE;

        let mut records = Vec::new();
        loop {
            let page = self.list::<R>(&query).await?;
            let done = is_last_page(&page, records.len() + page.data.len());
            records.extend(page.data);
            if done {
                break;
            }
            query.page += 1;
        }
        debug!(kind = %R::KIND, count = records.len(), "fetched all pages");
        Ok(records)
    }

    pub async fn lookups(&self, kind: LookupKind) -> Result<Vec<LookupItem>, ApiError> {
        let path = format!("/{}", kind.resource());
        self.fetch(self.request(Method::GET, &path), &path).await
    }

    /// Fetch all four lookup lists concurrently.
    pub async fn load_lookups(&self) -> Result<Lookups, ApiError> {
        let (shops, categories, vehicles, employees) = tokio::try_join!(
            self.lookups(LookupKind::Shop),
            self.lookups(LookupKind::Category),
            self.lookups(LookupKind::Vehicle),
            self.lookups(LookupKind::Employee),
        )?;

        let mut lookups = Lookups::default();
        lookups.insert(LookupKind::Shop, shops);
        lookups.insert(LookupKind::Category, categories);
        lookups.insert(LookupKind::Vehicle, vehicles);
        lookups.insert(LookupKind::Employee, employees);
        Ok(lookups)
    }

    /// Upload local files; the server answers with one descriptor per file,
    /// in request order.
    pub async fn upload(&self, files: &[LocalFile]) -> Result<Vec<StoredFile>, ApiError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut form = Form::new();
        for file in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| ApiError::Io {
                    path: file.path.display().to_string(),
                    source,
                })?;
            let part = Part::bytes(bytes)
                .file_name(file.file_name.clone())
                .mime_str(file.mime_type().as_ref())
                .map_err(|e| ApiError::from_reqwest(UPLOAD_PATH, e))?;
            form = form.part(UPLOAD_FIELD, part);
        }

        let req = self.request(Method::POST, UPLOAD_PATH).multipart(form);
        let stored: Vec<StoredFile> = self.fetch(req, UPLOAD_PATH).await?;
        if stored.len() != files.len() {
            return Err(ApiError::Decode(format!(
                "uploaded {} file(s) but the server returned {}",
                files.len(),
                stored.len()
            )));
        }
        info!(count = stored.len(), "attachments uploaded");
        Ok(stored)
    }
}

pub fn collection_path(kind: RecordKind) -> String {
    format!("/{}", kind.resource())
}

pub fn item_path(kind: RecordKind, id: u64) -> String {
    format!("/{}/{id}", kind.resource())
}

/// Decode a response body, unwrapping a `{ "data": ... }` envelope when the
/// bare body does not fit.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(err) => match value {
            Value::Object(mut map) if map.contains_key("data") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
            }
            _ => Err(ApiError::Decode(err.to_string())),
        },
    }
}

/// Decode a list response; a bare array is treated as a single full page.
fn decode_page<T: DeserializeOwned>(body: &str, query: &ListQuery) -> Result<Page<T>, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if value.is_array() {
        let data: Vec<T> =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        return Ok(Page {
            total: data.len() as u64,
            page: 1,
            limit: query.per_page.max(data.len() as u32),
            data,
        });
    }
    let body: PageBody<T> =
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(body.into_page(query))
}

/// Whether walking stops after `page`, with `fetched` records collected so far
/// including this page.
fn is_last_page<T>(page: &Page<T>, fetched: usize) -> bool {
    page.data.is_empty() || !page.has_next() || fetched as u64 >= page.total
}

/// The saved record from a create/update response. Servers that answer with
/// an empty body get the submitted record back.
fn saved_or<R: Record>(body: &str, sent: &R, id: Option<u64>) -> Result<R, ApiError> {
    if body.trim().is_empty() {
        let mut record = sent.clone();
        if id.is_some() {
            record.set_id(id);
        }
        return Ok(record);
    }
    decode_body(body)
}
