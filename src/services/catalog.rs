use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::core::config::Settings;
use crate::db::models::Assessment;

#[derive(Debug, Error)]
pub(crate) enum CatalogError {
    #[error("assessment not found")]
    NotFound,
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog rejected the request: {0}")]
    Rejected(String),
}

/// Read-only view of assessment definitions owned by the content service.
#[async_trait]
pub(crate) trait AssessmentCatalog: Send + Sync {
    async fn assessment(&self, id: &str) -> Result<Assessment, CatalogError>;

    async fn course_assessments(&self, course_id: &str) -> Result<Vec<Assessment>, CatalogError>;
}

/// `{ success, data }` wrapper used by every catalog endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) success: bool,
    pub(crate) data: Option<T>,
    #[serde(default, alias = "error")]
    pub(crate) message: Option<String>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_data(self) -> Result<T, CatalogError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(CatalogError::Rejected("response carried no data".to_string())),
            (false, _) => Err(CatalogError::Rejected(
                self.message.unwrap_or_else(|| "unsuccessful response".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpAssessmentCatalog {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpAssessmentCatalog {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let catalog = settings.catalog();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(catalog.timeout_seconds))
            .build()?;

        let api_token = Some(catalog.api_token.trim().to_string()).filter(|token| !token.is_empty());

        Ok(Self { client, base_url: catalog.base_url.trim_end_matches('/').to_string(), api_token })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound);
        }
        if !status.is_success() {
            return Err(CatalogError::Rejected(format!("{url} responded with {status}")));
        }

        response.json::<Envelope<T>>().await?.into_data()
    }
}

#[async_trait]
impl AssessmentCatalog for HttpAssessmentCatalog {
    async fn assessment(&self, id: &str) -> Result<Assessment, CatalogError> {
        self.fetch(&format!("/assessments/{id}")).await
    }

    async fn course_assessments(&self, course_id: &str) -> Result<Vec<Assessment>, CatalogError> {
        self.fetch(&format!("/assessments/courses/{course_id}")).await
    }
}
