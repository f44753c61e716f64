//! PostgreSQL store.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use procfile_core::error::{AppError, ConflictReason, ErrorKind};
use procfile_core::result::AppResult;
use procfile_core::types::pagination::{PageRequest, PageResponse};
use procfile_entity::approval::ApprovalRecord;
use procfile_entity::equipment::Equipment;
use procfile_entity::process_file::{ProcessFile, ProcessFileFilter, ProcessFileStatus};
use procfile_entity::seal::Seal;
use procfile_entity::signature::Signature;

use super::{ProcessFileStore, StoreTransaction};
use crate::error::map_sqlx_error;

const FILTER_CLAUSE: &str = "($1::process_file_status IS NULL OR status = $1) \
     AND ($2::uuid IS NULL OR equipment_id = $2) \
     AND ($3::text IS NULL OR strpos(lower(file_no), lower($3)) > 0) \
     AND ($4::uuid IS NULL OR creator_id = $4) \
     AND ($5::int IS NULL OR version = $5) \
     AND ($6::bool IS NULL OR is_current = $6)";

const INSERT_FILE: &str = "INSERT INTO process_files (\
     id, equipment_id, file_no, file_name, version, parent_file_id, is_current, status, \
     content, change_reason, document_ref, document_name, document_size, remark, creator_id, \
     submit_time, approval_time, effective_time, invalid_time, seal_id, row_version, \
     created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
     $18, $19, $20, $21, $22, $23)";

/// Advisory-lock key for an equipment: the high 64 bits of its UUID.
fn equipment_lock_key(equipment_id: Uuid) -> i64 {
    (equipment_id.as_u128() >> 64) as u64 as i64
}

/// Two-key advisory lock guarding file-number allocation. The two-key space
/// does not overlap the single-key space used by equipment locks.
const FILE_NO_LOCK_KEYS: (i32, i32) = (0x5046, 1);

/// Process-file store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessFileStore for PgStore {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn upsert_equipment(&self, equipment: &Equipment) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(
            "INSERT INTO equipment (id, equipment_no, machine_no, name, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET equipment_no = EXCLUDED.equipment_no, \
             machine_no = EXCLUDED.machine_no, name = EXCLUDED.name \
             RETURNING *",
        )
        .bind(equipment.id)
        .bind(&equipment.equipment_no)
        .bind(&equipment.machine_no)
        .bind(&equipment.name)
        .bind(equipment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to upsert equipment", e))
    }

    async fn find_equipment(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find equipment", e))
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>("SELECT * FROM process_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find process file", e))
    }

    async fn list_files(
        &self,
        filter: &ProcessFileFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        let count_sql = format!("SELECT COUNT(*) FROM process_files WHERE {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.status)
            .bind(filter.equipment_id)
            .bind(filter.file_no_needle())
            .bind(filter.creator_id)
            .bind(filter.version)
            .bind(filter.is_current)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count process files", e))?;

        let list_sql = format!(
            "SELECT * FROM process_files WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC, seq DESC LIMIT $7 OFFSET $8"
        );
        let files = sqlx::query_as::<_, ProcessFile>(&list_sql)
            .bind(filter.status)
            .bind(filter.equipment_id)
            .bind(filter.file_no_needle())
            .bind(filter.creator_id)
            .bind(filter.version)
            .bind(filter.is_current)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to list process files", e))?;

        Ok(PageResponse::new(files, *page, total as u64))
    }

    async fn list_by_statuses(
        &self,
        statuses: &[ProcessFileStatus],
        page: &PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM process_files WHERE status::text = ANY($1)")
                .bind(&statuses)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("Failed to count pending process files", e))?;

        let files = sqlx::query_as::<_, ProcessFile>(
            "SELECT * FROM process_files WHERE status::text = ANY($1) \
             ORDER BY submit_time ASC NULLS FIRST, seq ASC LIMIT $2 OFFSET $3",
        )
        .bind(&statuses)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list pending process files", e))?;

        Ok(PageResponse::new(files, *page, total as u64))
    }

    async fn find_current(&self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>(
            "SELECT * FROM process_files WHERE equipment_id = $1 AND is_current",
        )
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to find current process file", e))
    }

    async fn list_lineage(&self, equipment_id: Uuid, file_no: &str) -> AppResult<Vec<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>(
            "SELECT * FROM process_files WHERE equipment_id = $1 AND file_no = $2 \
             ORDER BY version ASC",
        )
        .bind(equipment_id)
        .bind(file_no)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list lineage", e))
    }

    async fn list_approvals(&self, file_id: Uuid) -> AppResult<Vec<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>(
            "SELECT * FROM approval_records WHERE file_id = $1 \
             ORDER BY level ASC, created_at ASC, seq ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list approval records", e))
    }

    async fn list_signatures(&self, file_id: Uuid) -> AppResult<Vec<Signature>> {
        sqlx::query_as::<_, Signature>(
            "SELECT * FROM signatures WHERE file_id = $1 ORDER BY created_at ASC, seq ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list signatures", e))
    }

    async fn find_signature(&self, id: Uuid) -> AppResult<Option<Signature>> {
        sqlx::query_as::<_, Signature>("SELECT * FROM signatures WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find signature", e))
    }

    async fn find_seal_by_file(&self, file_id: Uuid) -> AppResult<Option<Seal>> {
        sqlx::query_as::<_, Seal>("SELECT * FROM seals WHERE file_id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to find seal", e))
    }
}

/// Transaction over a pooled PostgreSQL connection. Rolled back on drop
/// unless committed.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_equipment(&mut self, equipment_id: Uuid) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(equipment_lock_key(equipment_id))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to lock equipment", e))?;
        Ok(())
    }

    async fn lock_file_numbers(&mut self) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(FILE_NO_LOCK_KEYS.0)
            .bind(FILE_NO_LOCK_KEYS.1)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to lock file numbering", e))?;
        Ok(())
    }

    async fn find_equipment(&mut self, id: Uuid) -> AppResult<Option<Equipment>> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to find equipment", e))
    }

    async fn find_file(&mut self, id: Uuid) -> AppResult<Option<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>("SELECT * FROM process_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to find process file", e))
    }

    async fn find_open_file(&mut self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>(
            "SELECT * FROM process_files WHERE equipment_id = $1 \
             AND status IN ('draft', 'pending_level1', 'pending_level2', 'pending_level3') \
             LIMIT 1",
        )
        .bind(equipment_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to find open process file", e))
    }

    async fn find_current(&mut self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>(
            "SELECT * FROM process_files WHERE equipment_id = $1 AND is_current",
        )
        .bind(equipment_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to find current process file", e))
    }

    async fn find_child(&mut self, parent_id: Uuid) -> AppResult<Option<ProcessFile>> {
        sqlx::query_as::<_, ProcessFile>("SELECT * FROM process_files WHERE parent_file_id = $1")
            .bind(parent_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to find revision", e))
    }

    async fn file_no_in_use(&mut self, file_no: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM process_files WHERE file_no = $1)",
        )
        .bind(file_no)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to check file number", e))
    }

    async fn file_nos_with_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT file_no FROM process_files WHERE starts_with(file_no, $1) \
             ORDER BY file_no",
        )
        .bind(prefix)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to list file numbers", e))
    }

    async fn list_approvals(&mut self, file_id: Uuid) -> AppResult<Vec<ApprovalRecord>> {
        sqlx::query_as::<_, ApprovalRecord>(
            "SELECT * FROM approval_records WHERE file_id = $1 \
             ORDER BY level ASC, created_at ASC, seq ASC",
        )
        .bind(file_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to list approval records", e))
    }

    async fn find_seal_by_file(&mut self, file_id: Uuid) -> AppResult<Option<Seal>> {
        sqlx::query_as::<_, Seal>("SELECT * FROM seals WHERE file_id = $1")
            .bind(file_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to find seal", e))
    }

    async fn insert_file(&mut self, file: &ProcessFile) -> AppResult<()> {
        sqlx::query(INSERT_FILE)
            .bind(file.id)
            .bind(file.equipment_id)
            .bind(&file.file_no)
            .bind(&file.file_name)
            .bind(file.version)
            .bind(file.parent_file_id)
            .bind(file.is_current)
            .bind(file.status)
            .bind(&file.content)
            .bind(&file.change_reason)
            .bind(&file.document_ref)
            .bind(&file.document_name)
            .bind(file.document_size)
            .bind(&file.remark)
            .bind(file.creator_id)
            .bind(file.submit_time)
            .bind(file.approval_time)
            .bind(file.effective_time)
            .bind(file.invalid_time)
            .bind(file.seal_id)
            .bind(file.row_version)
            .bind(file.created_at)
            .bind(file.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to insert process file", e))?;
        debug!(file_id = %file.id, "Inserted process file");
        Ok(())
    }

    async fn update_file_checked(
        &mut self,
        file: &ProcessFile,
        expected_status: ProcessFileStatus,
        expected_row_version: i64,
    ) -> AppResult<ProcessFile> {
        // Under READ COMMITTED a concurrent writer holding the row makes this
        // statement wait, then re-evaluate the predicate against its commit.
        let updated = sqlx::query_as::<_, ProcessFile>(
            "UPDATE process_files SET status = $2, is_current = $3, submit_time = $4, \
             approval_time = $5, effective_time = $6, invalid_time = $7, seal_id = $8, \
             row_version = row_version + 1, updated_at = NOW() \
             WHERE id = $1 AND status = $9 AND row_version = $10 \
             RETURNING *",
        )
        .bind(file.id)
        .bind(file.status)
        .bind(file.is_current)
        .bind(file.submit_time)
        .bind(file.approval_time)
        .bind(file.effective_time)
        .bind(file.invalid_time)
        .bind(file.seal_id)
        .bind(expected_status)
        .bind(expected_row_version)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update process file", e))?;

        updated.ok_or_else(|| {
            AppError::conflict(
                ConflictReason::StatusChanged,
                format!(
                    "Process file {} was changed by another operation; reload and retry",
                    file.id
                ),
            )
        })
    }

    async fn set_current_flag(&mut self, file_id: Uuid, is_current: bool) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE process_files SET is_current = $2, row_version = row_version + 1, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(file_id)
        .bind(is_current)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update current flag", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Process file {file_id} not found")));
        }
        Ok(())
    }

    async fn insert_signature(&mut self, signature: &Signature) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO signatures (id, file_id, kind, level, signer_id, signer_role, \
             image_ref, ip_address, device_info, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(signature.id)
        .bind(signature.file_id)
        .bind(signature.kind)
        .bind(signature.level)
        .bind(signature.signer_id)
        .bind(&signature.signer_role)
        .bind(&signature.image_ref)
        .bind(&signature.ip_address)
        .bind(&signature.device_info)
        .bind(signature.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert signature", e))?;
        Ok(())
    }

    async fn insert_approval(&mut self, record: &ApprovalRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO approval_records (id, file_id, level, approver_id, approver_role, \
             result, opinion, signature_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(record.file_id)
        .bind(record.level)
        .bind(record.approver_id)
        .bind(&record.approver_role)
        .bind(record.result)
        .bind(&record.opinion)
        .bind(record.signature_id)
        .bind(record.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert approval record", e))?;
        Ok(())
    }

    async fn insert_seal(&mut self, seal: &Seal) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO seals (id, file_id, seal_no, seal_type, content, image_ref, \
             approval_ids, issued_by, issued_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(seal.id)
        .bind(seal.file_id)
        .bind(&seal.seal_no)
        .bind(&seal.seal_type)
        .bind(&seal.content)
        .bind(&seal.image_ref)
        .bind(&seal.approval_ids)
        .bind(seal.issued_by)
        .bind(seal.issued_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert seal", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit transaction", e))
    }
}
