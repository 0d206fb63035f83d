use std::sync::Arc;
use tubely_core::models::AssetRecord;
use tubely_core::AppError;
use tubely_db::AssetRepository;
use uuid::Uuid;

/// Decides whether a principal may write to an asset.
///
/// Runs before any body bytes are read, so a rejected upload costs one
/// metadata lookup and nothing else.
#[derive(Clone)]
pub struct OwnershipGate {
    repository: Arc<dyn AssetRepository>,
}

impl OwnershipGate {
    pub fn new(repository: Arc<dyn AssetRepository>) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip(self), fields(user_id = %principal, asset_id = %asset_id))]
    pub async fn authorize(&self, principal: Uuid, asset_id: Uuid) -> Result<AssetRecord, AppError> {
        let record = self
            .repository
            .get(asset_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

        if !record.is_owned_by(principal) {
            tracing::warn!(owner_id = %record.user_id, "Upload rejected for non-owner");
            return Err(AppError::Forbidden(
                "Not authorized to update this video".to_string(),
            ));
        }

        Ok(record)
    }
}
