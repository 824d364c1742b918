use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use course_core::model::{
    ApiSettings, ClassId, ComponentKind, Course, CourseClass, CourseId, Fraction,
};

use super::{ContentApi, ProgressApi, ProgressSnapshot};
use crate::error::{ContentApiError, ProgressApiError};

fn build_client(settings: &ApiSettings) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(settings.timeout()).build()
}

fn authorize(settings: &ApiSettings, request: RequestBuilder) -> RequestBuilder {
    match settings.token() {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// `ProgressApi` over the learning backend's REST endpoints.
#[derive(Clone)]
pub struct HttpProgressApi {
    client: Client,
    settings: ApiSettings,
}

impl HttpProgressApi {
    /// # Errors
    ///
    /// Returns `ProgressApiError::Http` if the HTTP client cannot be built.
    pub fn new(settings: ApiSettings) -> Result<Self, ProgressApiError> {
        Ok(Self {
            client: build_client(&settings)?,
            settings,
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), ProgressApiError> {
        let url = self.settings.endpoint(path)?;
        let response = authorize(&self.settings, self.client.post(url))
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProgressApiError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Turn the batched `{ classId: { componentType: fraction } }` payload into a
/// snapshot for `class_id`. Unknown component types and non-finite values are
/// dropped.
#[must_use]
pub fn parse_progress_payload(
    class_id: &ClassId,
    payload: &HashMap<String, HashMap<String, f64>>,
) -> ProgressSnapshot {
    let Some(components) = payload.get(class_id.as_str()) else {
        return ProgressSnapshot::new();
    };
    components
        .iter()
        .filter_map(|(key, value)| {
            let kind = match ComponentKind::from_wire_key(key) {
                Ok(kind) => kind,
                Err(err) => {
                    warn!(%class_id, %err, "dropping progress entry");
                    return None;
                }
            };
            Fraction::clamped(*value).map(|fraction| (kind, fraction))
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    course_id: &'a str,
    class_id: &'a str,
    component_type: u8,
    progress: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest<'a> {
    course_id: &'a str,
    class_id: &'a str,
    component_type: u8,
}

#[async_trait]
impl ProgressApi for HttpProgressApi {
    async fn fetch_progress(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
    ) -> Result<ProgressSnapshot, ProgressApiError> {
        let url = self
            .settings
            .endpoint(&format!("progress/{course_id}/{class_id}"))?;
        let response = authorize(&self.settings, self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%course_id, %class_id, "no stored progress yet");
            return Ok(ProgressSnapshot::new());
        }
        if !response.status().is_success() {
            return Err(ProgressApiError::HttpStatus(response.status()));
        }
        let payload: HashMap<String, HashMap<String, f64>> = response.json().await?;
        Ok(parse_progress_payload(class_id, &payload))
    }

    async fn update_progress(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
        kind: ComponentKind,
        fraction: Fraction,
    ) -> Result<(), ProgressApiError> {
        let body = UpdateRequest {
            course_id: course_id.as_str(),
            class_id: class_id.as_str(),
            component_type: kind.wire_code(),
            progress: fraction.value(),
        };
        self.post("progress/update", &body).await
    }

    async fn mark_complete(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
        kind: ComponentKind,
    ) -> Result<(), ProgressApiError> {
        let body = CompleteRequest {
            course_id: course_id.as_str(),
            class_id: class_id.as_str(),
            component_type: kind.wire_code(),
        };
        self.post("progress/complete", &body).await
    }
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// `ContentApi` over the learning backend's REST endpoints.
#[derive(Clone)]
pub struct HttpContentApi {
    client: Client,
    settings: ApiSettings,
}

impl HttpContentApi {
    /// # Errors
    ///
    /// Returns `ContentApiError::Http` if the HTTP client cannot be built.
    pub fn new(settings: ApiSettings) -> Result<Self, ContentApiError> {
        Ok(Self {
            client: build_client(&settings)?,
            settings,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ContentApiError> {
        let url = self.settings.endpoint(path)?;
        let response = authorize(&self.settings, self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ContentApiError::NotFound);
        }
        if !response.status().is_success() {
            return Err(ContentApiError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseResponse {
    #[serde(alias = "_id")]
    id: String,
    slug: String,
    title: String,
    class_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassResponse {
    #[serde(alias = "_id")]
    id: String,
    title: String,
    components: Vec<u8>,
    #[serde(default)]
    writing_prompts: Vec<String>,
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn course(&self, slug: &str) -> Result<Course, ContentApiError> {
        let body: CourseResponse = self.get_json(&format!("courses/{slug}")).await?;
        let id = CourseId::new(body.id)?;
        Ok(Course::new(id, body.slug, body.title, body.class_count)?)
    }

    async fn class(&self, slug: &str, index: usize) -> Result<CourseClass, ContentApiError> {
        let body: ClassResponse = self
            .get_json(&format!("courses/{slug}/classes/{index}"))
            .await?;
        let id = ClassId::new(body.id)?;
        let mut components = Vec::with_capacity(body.components.len());
        for code in body.components {
            match ComponentKind::from_wire_code(code) {
                Ok(kind) => components.push(kind),
                Err(err) => warn!(slug, index, %err, "skipping unknown class component"),
            }
        }
        Ok(CourseClass::new(
            id,
            index,
            body.title,
            components,
            body.writing_prompts,
        )?)
    }
}
