//! Integration tests for the document lifecycle: create, submit, decide,
//! promote, invalidate.

mod common;

use bytes::Bytes;
use uuid::Uuid;

use procfile_core::ErrorKind;
use procfile_core::error::ConflictReason;
use procfile_entity::approval::ApprovalResult;
use procfile_entity::process_file::ProcessFileStatus;
use procfile_entity::signature::SignatureKind;
use procfile_service::{CreateProcessFile, DocumentUpload, RequestContext};

use common::{PNG, TestHarness, approve, approver, reject, revision_input, root_input};

#[tokio::test]
async fn test_full_chain_makes_document_effective_and_sealed() {
    let h = TestHarness::new().await;

    let file = h.create_root().await;
    assert_eq!(file.status, ProcessFileStatus::Draft);
    assert_eq!(file.version, 1);
    assert!(!file.is_current);

    let file = h.submit(&file).await;
    assert_eq!(file.status, ProcessFileStatus::PendingLevel1);
    assert!(file.submit_time.is_some());

    let file = h.approve(&file, 1).await;
    assert_eq!(file.status, ProcessFileStatus::PendingLevel2);
    let file = h.approve(&file, 2).await;
    assert_eq!(file.status, ProcessFileStatus::PendingLevel3);
    let file = h.approve(&file, 3).await;

    assert_eq!(file.status, ProcessFileStatus::Effective);
    assert!(file.is_current);
    assert!(file.approval_time.is_some());
    assert!(file.effective_time.is_some());

    let detail = h.services.queries.get_detail(file.id).await.unwrap();
    let seal = detail.seal.expect("effective document has a seal");
    assert_eq!(Some(seal.id), file.seal_id);
    assert!(seal.seal_no.starts_with("SEAL"));
    assert_eq!(seal.approval_ids.len(), 3);

    let levels: Vec<i16> = detail.approvals.iter().map(|a| a.level).collect();
    assert_eq!(levels, vec![1, 2, 3]);
    assert!(
        detail
            .approvals
            .iter()
            .all(|a| a.result == ApprovalResult::Approve)
    );

    let kinds: Vec<SignatureKind> = detail.signatures.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SignatureKind::Submit,
            SignatureKind::Approve,
            SignatureKind::Approve,
            SignatureKind::Approve,
        ]
    );
    assert_eq!(detail.signatures[0].level, None);
    assert_eq!(detail.signatures[3].level, Some(3));

    let current = h
        .services
        .queries
        .current_for_equipment(h.equipment.id)
        .await
        .unwrap();
    assert_eq!(current.id, file.id);
}

#[tokio::test]
async fn test_seal_numbers_are_unique_across_documents() {
    let h = TestHarness::new().await;
    let first = h.effective_root().await;
    let other = h.add_equipment("INJ-02").await;
    let second = h
        .services
        .registry
        .create(&h.creator, root_input(other.id))
        .await
        .unwrap();
    let second = h.drive_to_effective(second).await;

    let a = h.services.queries.seal(first.id).await.unwrap();
    let b = h.services.queries.seal(second.id).await.unwrap();
    assert_ne!(a.seal_no, b.seal_no);
}

#[tokio::test]
async fn test_reject_terminates_and_blocks_invalidate() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    let file = h.submit(&file).await;
    let file = h.approve(&file, 1).await;
    assert_eq!(file.status, ProcessFileStatus::PendingLevel2);

    let rejected = h
        .services
        .approvals
        .decide(&approver(2), file.id, reject(2, Some("dimensions wrong")))
        .await
        .unwrap();
    assert_eq!(rejected.status, ProcessFileStatus::Rejected);
    assert!(!rejected.is_current);

    let detail = h.services.queries.get_detail(file.id).await.unwrap();
    let last = detail.approvals.last().unwrap();
    assert_eq!(last.result, ApprovalResult::Reject);
    assert_eq!(last.opinion.as_deref(), Some("dimensions wrong"));
    assert!(detail.seal.is_none());

    let err = h
        .services
        .approvals
        .invalidate(&h.creator, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::State);
}

#[tokio::test]
async fn test_revision_requires_change_reason() {
    let h = TestHarness::new().await;
    let v1 = h.effective_root().await;

    let mut input = revision_input(&v1, "ignored");
    input.change_reason = None;
    let err = h
        .services
        .registry
        .create(&h.creator, input)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let mut blank = revision_input(&v1, "   ");
    blank.file_name = "Retry".to_string();
    let err = h
        .services
        .registry
        .create(&h.creator, blank)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_approved_revision_takes_over_current() {
    let h = TestHarness::new().await;
    let v1 = h.effective_root().await;

    let v2 = h.create_revision(&v1).await;
    assert_eq!(v2.version, 2);
    assert_eq!(v2.file_no, v1.file_no);
    assert_eq!(v2.parent_file_id, Some(v1.id));
    assert_eq!(v2.change_reason.as_deref(), Some("Raise holding pressure"));

    let v2 = h.drive_to_effective(v2).await;
    assert!(v2.is_current);

    let v1 = h.services.queries.get(v1.id).await.unwrap();
    assert!(!v1.is_current);
    assert_eq!(v1.status, ProcessFileStatus::Effective);
    assert!(v1.is_superseded());
    assert_eq!(h.current_count().await, 1);

    let lineage = h.services.queries.lineage(v2.id).await.unwrap();
    let versions: Vec<i32> = lineage.iter().map(|f| f.version).collect();
    assert_eq!(versions, vec![1, 2]);
}

#[tokio::test]
async fn test_decide_requires_matching_pending_level() {
    let h = TestHarness::new().await;
    let draft = h.create_root().await;

    let err = h
        .services
        .approvals
        .decide(&approver(1), draft.id, approve(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::State);

    let pending = h.submit(&draft).await;
    let err = h
        .services
        .approvals
        .decide(&approver(2), pending.id, approve(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::State);

    let err = h
        .services
        .approvals
        .decide(&approver(1), pending.id, approve(4))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_reject_without_opinion_leaves_status_unchanged() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    let file = h.submit(&file).await;

    for opinion in [None, Some("  ")] {
        let err = h
            .services
            .approvals
            .decide(&approver(1), file.id, reject(1, opinion))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.is_recoverable());
    }

    let file = h.services.queries.get(file.id).await.unwrap();
    assert_eq!(file.status, ProcessFileStatus::PendingLevel1);
    let detail = h.services.queries.get_detail(file.id).await.unwrap();
    assert!(detail.approvals.is_empty());
    assert_eq!(detail.signatures.len(), 1);
}

#[tokio::test]
async fn test_decider_role_must_match_level() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    let file = h.submit(&file).await;

    let err = h
        .services
        .approvals
        .decide(&approver(3), file.id, approve(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert!(!err.is_recoverable());

    let file = h.services.queries.get(file.id).await.unwrap();
    assert_eq!(file.status, ProcessFileStatus::PendingLevel1);
}

#[tokio::test]
async fn test_submit_rules() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;

    let stranger = RequestContext::new(Uuid::new_v4(), "PROCESS_ENGINEER");
    let err = h
        .services
        .approvals
        .submit(&stranger, file.id, Bytes::from_static(PNG))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    let err = h
        .services
        .approvals
        .submit(&h.creator, file.id, Bytes::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let submitted = h.submit(&file).await;
    let err = h
        .services
        .approvals
        .submit(&h.creator, submitted.id, Bytes::from_static(PNG))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::State);

    let err = h
        .services
        .approvals
        .submit(&h.creator, Uuid::new_v4(), Bytes::from_static(PNG))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_any_actor_submits_when_creator_rule_is_off() {
    let mut config = procfile_core::config::AppConfig::default();
    config.approval.creator_only_submit = false;
    let h = TestHarness::with_config(config).await;
    let file = h.create_root().await;

    let colleague = RequestContext::new(Uuid::new_v4(), "PROCESS_ENGINEER");
    let file = h
        .services
        .approvals
        .submit(&colleague, file.id, Bytes::from_static(PNG))
        .await
        .unwrap();
    assert_eq!(file.status, ProcessFileStatus::PendingLevel1);
}

#[tokio::test]
async fn test_one_open_document_per_equipment() {
    let h = TestHarness::new().await;
    let draft = h.create_root().await;

    let err = h
        .services
        .registry
        .create(&h.creator, root_input(h.equipment.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(err.conflict_reason(), Some(ConflictReason::OpenFileExists));

    let pending = h.submit(&draft).await;
    let err = h
        .services
        .registry
        .create(&h.creator, root_input(h.equipment.id))
        .await
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::OpenFileExists));

    h.services
        .approvals
        .decide(&approver(1), pending.id, reject(1, Some("wrong mold")))
        .await
        .unwrap();
    let next = h
        .services
        .registry
        .create(&h.creator, root_input(h.equipment.id))
        .await
        .unwrap();
    assert_eq!(next.status, ProcessFileStatus::Draft);
}

#[tokio::test]
async fn test_revision_must_come_from_lineage_head() {
    let h = TestHarness::new().await;
    let v1 = h.effective_root().await;
    let v2 = h.create_revision(&v1).await;
    h.drive_to_effective(v2).await;

    let err = h
        .services
        .registry
        .create(&h.creator, revision_input(&v1, "Second branch"))
        .await
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::ParentSuperseded));
}

#[tokio::test]
async fn test_parent_must_belong_to_same_equipment() {
    let h = TestHarness::new().await;
    let v1 = h.effective_root().await;
    let other = h.add_equipment("INJ-02").await;

    let mut input = revision_input(&v1, "Move to other machine");
    input.equipment_id = other.id;
    let err = h
        .services
        .registry
        .create(&h.creator, input)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut input = revision_input(&v1, "Unknown parent");
    input.parent_file_id = Some(Uuid::new_v4());
    let err = h
        .services
        .registry
        .create(&h.creator, input)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_create_validates_input() {
    let h = TestHarness::new().await;

    let err = h
        .services
        .registry
        .create(&h.creator, root_input(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut not_object = root_input(h.equipment.id);
    not_object.content = serde_json::json!([1, 2, 3]);
    let err = h
        .services
        .registry
        .create(&h.creator, not_object)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let mut reason_on_root = root_input(h.equipment.id);
    reason_on_root.change_reason = Some("nothing to change".to_string());
    let err = h
        .services
        .registry
        .create(&h.creator, reason_on_root)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let mut bad_no = root_input(h.equipment.id);
    bad_no.file_no = Some("../etc".to_string());
    let err = h
        .services
        .registry
        .create(&h.creator, bad_no)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_file_numbers_generated_or_supplied() {
    let h = TestHarness::new().await;
    let generated = h.create_root().await;
    let today = chrono::Utc::now().format("%Y%m%d").to_string();
    assert_eq!(generated.file_no, format!("PF{today}001"));

    let other = h.add_equipment("INJ-02").await;
    let second = h
        .services
        .registry
        .create(&h.creator, root_input(other.id))
        .await
        .unwrap();
    assert_eq!(second.file_no, format!("PF{today}002"));

    let third_machine = h.add_equipment("INJ-03").await;
    let supplied = CreateProcessFile {
        file_no: Some("  LEGACY-7 ".to_string()),
        ..root_input(third_machine.id)
    };
    let supplied = h
        .services
        .registry
        .create(&h.creator, supplied)
        .await
        .unwrap();
    assert_eq!(supplied.file_no, "LEGACY-7");

    let fourth = h.add_equipment("INJ-04").await;
    let taken = CreateProcessFile {
        file_no: Some("LEGACY-7".to_string()),
        ..root_input(fourth.id)
    };
    let err = h
        .services
        .registry
        .create(&h.creator, taken)
        .await
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::FileNoTaken));
}

#[tokio::test]
async fn test_generated_number_follows_large_supplied_number() {
    let h = TestHarness::new().await;
    let today = chrono::Utc::now().format("%Y%m%d").to_string();
    let large = CreateProcessFile {
        file_no: Some(format!("PF{today}{}", u32::MAX)),
        ..root_input(h.equipment.id)
    };
    h.services.registry.create(&h.creator, large).await.unwrap();

    let other = h.add_equipment("INJ-02").await;
    let next = h
        .services
        .registry
        .create(&h.creator, root_input(other.id))
        .await
        .unwrap();
    assert_eq!(next.file_no, format!("PF{today}{}", u64::from(u32::MAX) + 1));
}

#[tokio::test]
async fn test_invalidate_retires_current_document() {
    let h = TestHarness::new().await;
    let file = h.effective_root().await;

    let invalidated = h
        .services
        .approvals
        .invalidate(&h.creator, file.id)
        .await
        .unwrap();
    assert_eq!(invalidated.status, ProcessFileStatus::Invalidated);
    assert!(!invalidated.is_current);
    assert!(invalidated.invalid_time.is_some());
    assert_eq!(h.current_count().await, 0);

    // The seal stays as history.
    assert!(h.services.queries.seal(file.id).await.is_ok());

    let err = h
        .services
        .approvals
        .invalidate(&h.creator, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::State);
}

#[tokio::test]
async fn test_invalidate_respects_configured_roles() {
    let mut config = procfile_core::config::AppConfig::default();
    config.approval.invalidate_roles = vec!["INJECTION_MANAGER".to_string()];
    let h = TestHarness::with_config(config).await;
    let file = h.effective_root().await;

    let err = h
        .services
        .approvals
        .invalidate(&h.creator, file.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    let manager = approver(3);
    let file = h.services.approvals.invalidate(&manager, file.id).await.unwrap();
    assert_eq!(file.status, ProcessFileStatus::Invalidated);
}

#[tokio::test]
async fn test_pending_queue_follows_role_mapping() {
    let h = TestHarness::new().await;
    let first = h.create_root().await;
    let first = h.submit(&first).await;

    let other = h.add_equipment("INJ-02").await;
    let second = h
        .services
        .registry
        .create(&h.creator, root_input(other.id))
        .await
        .unwrap();
    let second = h.submit(&second).await;
    let second = h.approve(&second, 1).await;

    let level1 = h
        .services
        .queries
        .list_pending(&approver(1), Default::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = level1.items.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![first.id]);

    let level2 = h
        .services
        .queries
        .list_pending(&approver(2), Default::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = level2.items.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![second.id]);

    let nobody = h
        .services
        .queries
        .list_pending(&h.creator, Default::default())
        .await
        .unwrap();
    assert_eq!(nobody.total_items, 0);
}

#[tokio::test]
async fn test_uploaded_document_is_downloadable() {
    let h = TestHarness::new().await;
    let input = CreateProcessFile {
        document: Some(DocumentUpload {
            name: "barrel-setup.xlsx".to_string(),
            bytes: Bytes::from_static(b"PK\x03\x04 spreadsheet"),
        }),
        ..root_input(h.equipment.id)
    };
    let file = h.services.registry.create(&h.creator, input).await.unwrap();
    assert_eq!(file.document_name.as_deref(), Some("barrel-setup.xlsx"));
    assert_eq!(file.document_size, Some(16));

    let download = h.services.queries.document(file.id).await.unwrap();
    assert_eq!(download.name, "barrel-setup.xlsx");
    assert_eq!(&download.bytes[..], b"PK\x03\x04 spreadsheet");
}

#[tokio::test]
async fn test_document_upload_checks() {
    let h = TestHarness::new().await;

    let wrong_type = CreateProcessFile {
        document: Some(DocumentUpload {
            name: "setup.exe".to_string(),
            bytes: Bytes::from_static(b"MZ"),
        }),
        ..root_input(h.equipment.id)
    };
    let err = h
        .services
        .registry
        .create(&h.creator, wrong_type)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let too_big = CreateProcessFile {
        document: Some(DocumentUpload {
            name: "setup.xls".to_string(),
            bytes: Bytes::from(vec![0u8; (h.config.storage.max_document_bytes + 1) as usize]),
        }),
        ..root_input(h.equipment.id)
    };
    let err = h
        .services
        .registry
        .create(&h.creator, too_big)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let file = h.create_root().await;
    let err = h.services.queries.document(file.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_signature_image_round_trips_through_ledger() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    h.submit(&file).await;

    let signatures = h.services.queries.signatures(file.id).await.unwrap();
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0].signer_id, h.creator.actor_id);
    assert_eq!(signatures[0].signer_role, "PROCESS_ENGINEER");

    let image = h
        .services
        .queries
        .signature_image(signatures[0].id)
        .await
        .unwrap();
    assert_eq!(&image[..], PNG);
}

#[tokio::test]
async fn test_seal_without_stamp_has_no_image() {
    let h = TestHarness::new().await;
    let file = h.effective_root().await;

    let seal = h.services.queries.seal(file.id).await.unwrap();
    assert!(seal.image_ref.is_none());
    let err = h.services.queries.seal_image(file.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
