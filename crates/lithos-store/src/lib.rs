//! Project persistence boundary for Lithos.
//!
//! Handlers depend on the [`ProjectStore`] trait; [`PgProjectStore`] is the
//! production Postgres implementation and [`MemoryProjectStore`] backs tests
//! and local development.

use async_trait::async_trait;
use lithos_core::Project;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use thiserror::Error;

pub const CRATE_NAME: &str = "lithos-store";

/// Hard cap on listing queries so a large table never floods a response.
pub const LIST_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Single project by id, `None` when the id is unknown.
    async fn fetch_project(&self, id: &str) -> Result<Option<Project>, StoreError>;

    /// Every project except `exclude_id`, oldest insert first.
    async fn fetch_candidates(&self, exclude_id: &str) -> Result<Vec<Project>, StoreError>;

    /// Recent projects, newest update first, capped at [`LIST_LIMIT`].
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }
}

fn project_from_row(row: &PgRow) -> Result<Project, sqlx::Error> {
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        commodities: row
            .try_get::<Option<Vec<String>>, _>("commodities")?
            .unwrap_or_default(),
        capex: row.try_get("capex")?,
        npv: row.try_get("npv")?,
        irr: row.try_get("irr")?,
        aisc: row.try_get("aisc")?,
        stage: row.try_get("stage")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        watchlist: row.try_get::<Option<bool>, _>("watchlist")?.unwrap_or(false),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const PROJECT_COLUMNS: &str = r#"
        SELECT id::text AS id,
               name,
               commodities,
               capex,
               npv,
               irr,
               aisc,
               stage,
               location,
               description,
               latitude,
               longitude,
               watchlist,
               created_at,
               updated_at
          FROM projects
"#;

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn fetch_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let query = format!("{PROJECT_COLUMNS} WHERE id::text = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(project_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_candidates(&self, exclude_id: &str) -> Result<Vec<Project>, StoreError> {
        let query = format!("{PROJECT_COLUMNS} WHERE id::text <> $1 ORDER BY created_at");
        let rows = sqlx::query(&query)
            .bind(exclude_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(project_from_row(&row)?);
        }
        Ok(out)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let query = format!(
            "{PROJECT_COLUMNS} ORDER BY updated_at DESC, created_at DESC LIMIT {LIST_LIMIT}"
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(project_from_row(&row)?);
        }
        Ok(out)
    }
}

/// In-memory store with the same ordering contract as the Postgres one.
/// Insertion order stands in for `created_at` order.
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectStore {
    projects: Vec<Project>,
}

impl MemoryProjectStore {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn fetch_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn fetch_candidates(&self, exclude_id: &str) -> Result<Vec<Project>, StoreError> {
        Ok(self
            .projects
            .iter()
            .filter(|p| p.id != exclude_id)
            .cloned()
            .collect())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut out = self.projects.clone();
        out.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        out.truncate(LIST_LIMIT);
        Ok(out)
    }
}
