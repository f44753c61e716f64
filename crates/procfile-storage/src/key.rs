//! Content-addressed blob keys.

use sha2::{Digest, Sha256};

use procfile_core::error::AppError;
use procfile_core::result::AppResult;
use procfile_core::traits::blob::BlobCategory;

const CATEGORIES: [BlobCategory; 3] = [
    BlobCategory::Signature,
    BlobCategory::Seal,
    BlobCategory::Document,
];

/// Key for `data`: `{category}/{first two hex chars}/{sha256 hex}`.
pub fn content_key(category: BlobCategory, data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hex::encode(hasher.finalize());
    format!("{}/{}/{}", category.as_str(), &digest[..2], digest)
}

/// Reject keys that were not produced by [`content_key`].
///
/// Keys reach the stores from database rows and, through them, from
/// request paths, so they are never joined onto a filesystem path
/// unchecked.
pub fn validate_key(key: &str) -> AppResult<()> {
    let mut parts = key.split('/');
    let (Some(category), Some(fanout), Some(digest), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::validation(format!("Malformed blob key: {key}")));
    };

    let known_category = CATEGORIES.iter().any(|c| c.as_str() == category);
    let hex_digest = digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit());
    if !known_category || !hex_digest || !digest.starts_with(fanout) || fanout.len() != 2 {
        return Err(AppError::validation(format!("Malformed blob key: {key}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_bytes_same_key() {
        let a = content_key(BlobCategory::Signature, b"ink");
        let b = content_key(BlobCategory::Signature, b"ink");
        assert_eq!(a, b);
        assert!(a.starts_with("signatures/"));
        assert!(validate_key(&a).is_ok());
    }

    #[test]
    fn test_category_is_part_of_key() {
        let sig = content_key(BlobCategory::Signature, b"x");
        let doc = content_key(BlobCategory::Document, b"x");
        assert_ne!(sig, doc);
    }

    #[test]
    fn test_traversal_keys_are_rejected() {
        assert!(validate_key("../../etc/passwd").is_err());
        assert!(validate_key("documents/ab/../../x").is_err());
        assert!(validate_key("documents/zz/abc").is_err());
        assert!(validate_key("").is_err());
    }
}
