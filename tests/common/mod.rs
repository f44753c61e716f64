//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use procfile_core::config::AppConfig;
use procfile_core::traits::blob::BlobStore;
use procfile_database::{MemoryStore, ProcessFileStore};
use procfile_entity::approval::ApprovalResult;
use procfile_entity::equipment::Equipment;
use procfile_entity::process_file::{ProcessFile, ProcessFileFilter};
use procfile_service::{CreateProcessFile, Decision, RequestContext, ServiceContainer};
use procfile_storage::MemoryBlobStore;

/// Smallest byte string recognized as a PNG signature image.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// Role decided at each level by the default mapping.
pub const LEVEL_ROLES: [&str; 3] = [
    "WORKSHOP_DIRECTOR",
    "PRODUCTION_TECH_MANAGER",
    "INJECTION_MANAGER",
];

/// Services over the in-memory backends, plus one seeded equipment.
pub struct TestHarness {
    pub services: ServiceContainer,
    pub config: AppConfig,
    pub equipment: Equipment,
    pub creator: RequestContext,
}

impl TestHarness {
    /// Default configuration over fresh in-memory stores.
    pub async fn new() -> Self {
        Self::with_blobs(Arc::new(MemoryBlobStore::new())).await
    }

    /// Default configuration with a caller-supplied blob store.
    pub async fn with_blobs(blobs: Arc<dyn BlobStore>) -> Self {
        Self::build(AppConfig::default(), blobs).await
    }

    /// Custom configuration over fresh in-memory stores.
    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(config, Arc::new(MemoryBlobStore::new())).await
    }

    async fn build(config: AppConfig, blobs: Arc<dyn BlobStore>) -> Self {
        let store: Arc<dyn ProcessFileStore> = Arc::new(MemoryStore::new());
        let services = ServiceContainer::build(&config, store, blobs)
            .await
            .expect("Failed to build services");
        let equipment = services
            .registry
            .register_equipment(&equipment("INJ-01"))
            .await
            .expect("Failed to seed equipment");
        Self {
            services,
            config,
            equipment,
            creator: RequestContext::new(Uuid::new_v4(), "PROCESS_ENGINEER"),
        }
    }

    /// Seed another equipment row.
    pub async fn add_equipment(&self, equipment_no: &str) -> Equipment {
        self.services
            .registry
            .register_equipment(&equipment(equipment_no))
            .await
            .expect("Failed to seed equipment")
    }

    /// Create a lineage root on the seeded equipment.
    pub async fn create_root(&self) -> ProcessFile {
        self.services
            .registry
            .create(&self.creator, root_input(self.equipment.id))
            .await
            .expect("Failed to create process file")
    }

    /// Create a revision of `parent` with a change reason.
    pub async fn create_revision(&self, parent: &ProcessFile) -> ProcessFile {
        self.services
            .registry
            .create(&self.creator, revision_input(parent, "Raise holding pressure"))
            .await
            .expect("Failed to create revision")
    }

    /// Submit as the creator.
    pub async fn submit(&self, file: &ProcessFile) -> ProcessFile {
        self.services
            .approvals
            .submit(&self.creator, file.id, Bytes::from_static(PNG))
            .await
            .expect("Failed to submit")
    }

    /// Approve at `level` as a fresh actor holding that level's role.
    pub async fn approve(&self, file: &ProcessFile, level: u8) -> ProcessFile {
        self.services
            .approvals
            .decide(&approver(level), file.id, approve(level))
            .await
            .expect("Failed to approve")
    }

    /// Create, submit and approve every level.
    pub async fn effective_root(&self) -> ProcessFile {
        let file = self.create_root().await;
        self.drive_to_effective(file).await
    }

    /// Submit and approve every level.
    pub async fn drive_to_effective(&self, file: ProcessFile) -> ProcessFile {
        let mut file = self.submit(&file).await;
        for level in 1..=3 {
            file = self.approve(&file, level).await;
        }
        file
    }

    /// Number of current documents of the seeded equipment.
    pub async fn current_count(&self) -> usize {
        let filter = ProcessFileFilter {
            equipment_id: Some(self.equipment.id),
            is_current: Some(true),
            ..Default::default()
        };
        let page = self
            .services
            .queries
            .list(&filter, Default::default())
            .await
            .expect("Failed to list");
        page.total_items as usize
    }

    /// Router over these services.
    pub fn router(&self) -> Router {
        procfile_api::build_app(procfile_api::AppState::new(
            self.config.clone(),
            self.services.clone(),
        ))
    }
}

/// An equipment row.
pub fn equipment(equipment_no: &str) -> Equipment {
    Equipment {
        id: Uuid::new_v4(),
        equipment_no: equipment_no.to_string(),
        machine_no: Some(format!("M-{equipment_no}")),
        name: format!("Injection molder {equipment_no}"),
        created_at: Utc::now(),
    }
}

/// Input for a lineage root.
pub fn root_input(equipment_id: Uuid) -> CreateProcessFile {
    CreateProcessFile {
        equipment_id,
        file_name: "Barrel and mold temperatures".to_string(),
        content: json!({ "barrel_temp_c": 230, "mold_temp_c": 60, "holding_pressure_bar": 80 }),
        ..Default::default()
    }
}

/// Input for a revision of `parent`.
pub fn revision_input(parent: &ProcessFile, reason: &str) -> CreateProcessFile {
    CreateProcessFile {
        equipment_id: parent.equipment_id,
        file_name: parent.file_name.clone(),
        content: json!({ "barrel_temp_c": 230, "mold_temp_c": 60, "holding_pressure_bar": 85 }),
        parent_file_id: Some(parent.id),
        change_reason: Some(reason.to_string()),
        ..Default::default()
    }
}

/// A fresh actor in the role that decides `level`.
pub fn approver(level: u8) -> RequestContext {
    RequestContext::new(Uuid::new_v4(), LEVEL_ROLES[usize::from(level) - 1])
}

/// An approval at `level`.
pub fn approve(level: u8) -> Decision {
    Decision {
        level,
        result: ApprovalResult::Approve,
        opinion: None,
        signature_image: Bytes::from_static(PNG),
    }
}

/// A rejection at `level`.
pub fn reject(level: u8, opinion: Option<&str>) -> Decision {
    Decision {
        level,
        result: ApprovalResult::Reject,
        opinion: opinion.map(String::from),
        signature_image: Bytes::from_static(PNG),
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
    /// Raw body bytes
    pub bytes: Bytes,
}

/// Send one request through `router` as `actor`.
pub async fn request(
    router: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    actor: Option<&RequestContext>,
) -> TestResponse {
    let body_str = body
        .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
        .unwrap_or_default();

    let mut req = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json");

    if let Some(actor) = actor {
        req = req
            .header("x-actor-id", actor.actor_id.to_string())
            .header("x-actor-role", actor.role.as_str());
    }

    let req = req
        .body(Body::from(body_str))
        .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .expect("Failed to read body");
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        body,
        bytes,
    }
}
