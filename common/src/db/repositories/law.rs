// Law repository implementation

use async_trait::async_trait;
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{Attachment, ContentItem, Law, LawSlugRecord, NewLaw};

const LAW_COLUMNS: &str = r#"
    id, doknr, slug, gii_slug, abbreviation, extra_abbreviations, first_published,
    source_timestamp, title_long, title_short, publication_info, status_info,
    notes_body, notes_footnotes, notes_documentary_footnotes
"#;

const CONTENT_ITEM_COLUMNS: &str = r#"
    id, doknr, item_type, name, title, body, footnotes, documentary_footnotes,
    law_id, parent_id, "order"
"#;

/// Persistence operations the sync pipeline needs
#[async_trait]
pub trait LawStore: Send + Sync {
    /// GII slug → source timestamp of every stored law
    async fn gii_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>, DatabaseError>;

    /// Insert a law, replacing any stored law with the same doknr
    async fn replace_law(&self, law: &NewLaw) -> Result<i32, DatabaseError>;

    /// Groups of laws sharing a slug; each group sorted by GII slug
    async fn duplicate_slug_groups(&self) -> Result<Vec<Vec<LawSlugRecord>>, DatabaseError>;

    async fn update_slug(&self, id: i32, slug: &str) -> Result<(), DatabaseError>;

    /// Delete laws (with their contents and attachments) by GII slug
    async fn delete_laws_by_gii_slug(&self, gii_slugs: &[String]) -> Result<u64, DatabaseError>;
}

/// Repository for law-related database operations
#[derive(Debug, Clone)]
pub struct LawRepository {
    pool: DbPool,
}

impl LawRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find_by_doknr(&self, doknr: &str) -> Result<Option<Law>, DatabaseError> {
        let law = sqlx::query_as::<_, Law>(&format!("SELECT {} FROM laws WHERE doknr = $1", LAW_COLUMNS))
            .bind(doknr)
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(law)
    }

    #[instrument(skip(self))]
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Law>, DatabaseError> {
        let law = sqlx::query_as::<_, Law>(&format!("SELECT {} FROM laws WHERE slug = $1", LAW_COLUMNS))
            .bind(slug)
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(law)
    }

    /// Page through laws ordered by slug
    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Law>, DatabaseError> {
        let laws = sqlx::query_as::<_, Law>(&format!(
            "SELECT {} FROM laws ORDER BY slug, id LIMIT $1 OFFSET $2",
            LAW_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(laws)
    }

    /// All laws ordered by slug
    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<Law>, DatabaseError> {
        let laws = sqlx::query_as::<_, Law>(&format!("SELECT {} FROM laws ORDER BY slug, id", LAW_COLUMNS))
            .fetch_all(self.pool.pool())
            .await?;
        tracing::debug!(count = laws.len(), "Loaded all laws");
        Ok(laws)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM laws")
            .fetch_one(self.pool.pool())
            .await?;
        Ok(count)
    }

    /// Content items of a law in document order
    #[instrument(skip(self))]
    pub async fn find_contents(&self, law_id: i32) -> Result<Vec<ContentItem>, DatabaseError> {
        let items = sqlx::query_as::<_, ContentItem>(&format!(
            r#"SELECT {} FROM content_items WHERE law_id = $1 ORDER BY "order""#,
            CONTENT_ITEM_COLUMNS
        ))
        .bind(law_id)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn find_attachment_names(&self, law_id: i32) -> Result<Vec<String>, DatabaseError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM attachments WHERE law_id = $1 ORDER BY name")
                .bind(law_id)
                .fetch_all(self.pool.pool())
                .await?;
        Ok(names)
    }

    #[instrument(skip(self))]
    pub async fn find_attachment(&self, law_id: i32, name: &str) -> Result<Option<Attachment>, DatabaseError> {
        let attachment = sqlx::query_as::<_, Attachment>(
            "SELECT id, name, data_uri, law_id FROM attachments WHERE law_id = $1 AND name = $2",
        )
        .bind(law_id)
        .bind(name)
        .fetch_optional(self.pool.pool())
        .await?;
        Ok(attachment)
    }
}

#[async_trait]
impl LawStore for LawRepository {
    #[instrument(skip(self))]
    async fn gii_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT gii_slug, source_timestamp FROM laws")
            .fetch_all(self.pool.pool())
            .await?;
        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self, law), fields(doknr = %law.doknr, gii_slug = %law.gii_slug))]
    async fn replace_law(&self, law: &NewLaw) -> Result<i32, DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let replaced = sqlx::query("DELETE FROM laws WHERE doknr = $1")
            .bind(&law.doknr)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let law_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO laws (
                doknr, slug, gii_slug, abbreviation, extra_abbreviations, first_published,
                source_timestamp, title_long, title_short, publication_info, status_info,
                notes_body, notes_footnotes, notes_documentary_footnotes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(&law.doknr)
        .bind(&law.slug)
        .bind(&law.gii_slug)
        .bind(&law.abbreviation)
        .bind(&law.extra_abbreviations)
        .bind(&law.first_published)
        .bind(&law.source_timestamp)
        .bind(&law.title_long)
        .bind(&law.title_short)
        .bind(Json(&law.publication_info))
        .bind(Json(&law.status_info))
        .bind(&law.notes_body)
        .bind(&law.notes_footnotes)
        .bind(&law.notes_documentary_footnotes)
        .fetch_one(&mut *tx)
        .await?;

        // Parents always precede their children in document order
        let mut ids_by_doknr: HashMap<&str, i32> = HashMap::with_capacity(law.contents.len());
        for (order, item) in law.contents.iter().enumerate() {
            let parent_id = item
                .parent_doknr
                .as_deref()
                .and_then(|doknr| ids_by_doknr.get(doknr).copied());

            let item_id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO content_items (
                    doknr, item_type, name, title, body, footnotes, documentary_footnotes,
                    law_id, parent_id, "order"
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id
                "#,
            )
            .bind(&item.doknr)
            .bind(item.item_type.as_str())
            .bind(&item.name)
            .bind(&item.title)
            .bind(&item.body)
            .bind(&item.footnotes)
            .bind(&item.documentary_footnotes)
            .bind(law_id)
            .bind(parent_id)
            .bind(order as i32)
            .fetch_one(&mut *tx)
            .await?;

            ids_by_doknr.insert(item.doknr.as_str(), item_id);
        }

        for attachment in &law.attachments {
            sqlx::query("INSERT INTO attachments (name, data_uri, law_id) VALUES ($1, $2, $3)")
                .bind(&attachment.name)
                .bind(&attachment.data_uri)
                .bind(law_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::info!(
            law_id = law_id,
            replaced = replaced > 0,
            contents = law.contents.len(),
            attachments = law.attachments.len(),
            "Law stored"
        );
        Ok(law_id)
    }

    #[instrument(skip(self))]
    async fn duplicate_slug_groups(&self) -> Result<Vec<Vec<LawSlugRecord>>, DatabaseError> {
        let rows = sqlx::query_as::<_, LawSlugRecord>(
            r#"
            SELECT id, slug, gii_slug
            FROM laws
            WHERE slug IN (SELECT slug FROM laws GROUP BY slug HAVING COUNT(*) > 1)
            ORDER BY slug, gii_slug
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;

        let mut groups: Vec<Vec<LawSlugRecord>> = Vec::new();
        for row in rows {
            match groups.last_mut() {
                Some(group) if group[0].slug == row.slug => group.push(row),
                _ => groups.push(vec![row]),
            }
        }
        Ok(groups)
    }

    #[instrument(skip(self))]
    async fn update_slug(&self, id: i32, slug: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE laws SET slug = $1 WHERE id = $2")
            .bind(slug)
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Law {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, gii_slugs), fields(count = gii_slugs.len()))]
    async fn delete_laws_by_gii_slug(&self, gii_slugs: &[String]) -> Result<u64, DatabaseError> {
        if gii_slugs.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM laws WHERE gii_slug = ANY($1)")
            .bind(gii_slugs)
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
