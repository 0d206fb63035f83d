use chrono::Utc;
use sqlx::{PgPool, Postgres};
use tubely_core::models::AssetRecord;
use tubely_core::AppError;
use uuid::Uuid;

/// Metadata store for video records.
///
/// `update` replaces the whole record; concurrent writers to the same id are
/// not serialized and the last successful write wins.
#[async_trait::async_trait]
pub trait AssetRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<AssetRecord>, AppError>;

    async fn create(&self, record: &AssetRecord) -> Result<AssetRecord, AppError>;

    /// Persist `record` and return the stored row. Fails with `NotFound` when
    /// the record no longer exists.
    async fn update(&self, record: &AssetRecord) -> Result<AssetRecord, AppError>;
}

#[derive(Clone)]
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AssetRepository for PgAssetRepository {
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<AssetRecord>, AppError> {
        let row: Option<AssetRecord> =
            sqlx::query_as::<Postgres, AssetRecord>("SELECT * FROM videos WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "videos", db.operation = "insert", db.record_id = %record.id))]
    async fn create(&self, record: &AssetRecord) -> Result<AssetRecord, AppError> {
        let row: AssetRecord = sqlx::query_as::<Postgres, AssetRecord>(
            r#"
            INSERT INTO videos (
                id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.thumbnail_url)
        .bind(&record.video_url)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "videos", db.operation = "update", db.record_id = %record.id))]
    async fn update(&self, record: &AssetRecord) -> Result<AssetRecord, AppError> {
        let row: Option<AssetRecord> = sqlx::query_as::<Postgres, AssetRecord>(
            r#"
            UPDATE videos
            SET title = $2,
                description = $3,
                thumbnail_url = $4,
                video_url = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.thumbnail_url)
        .bind(&record.video_url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))
    }
}
