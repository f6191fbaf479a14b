use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FavoritesError {
    #[error("database operation failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// A saved location. Identity for removal is the exact coordinate pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FavoriteCity {
    pub id: Uuid,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    pub state: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFavorite {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    pub state: Option<String>,
}

pub struct FavoritesStore {
    pool: SqlitePool,
}

impl FavoritesStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), FavoritesError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                country TEXT NOT NULL,
                state TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(lat, lon)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Saves a location. Adding coordinates that are already saved returns
    /// the existing row instead of creating a duplicate.
    pub async fn add(&self, favorite: CreateFavorite) -> Result<FavoriteCity, FavoritesError> {
        if let Some(existing) = self.find_by_coordinates(favorite.lat, favorite.lon).await? {
            return Ok(existing);
        }

        let result = sqlx::query_as::<_, FavoriteCity>(
            r#"
            INSERT INTO favorites (id, name, lat, lon, country, state, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(favorite.name)
        .bind(favorite.lat)
        .bind(favorite.lon)
        .bind(favorite.country)
        .bind(favorite.state)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn list(&self) -> Result<Vec<FavoriteCity>, FavoritesError> {
        let favorites = sqlx::query_as::<_, FavoriteCity>(
            "SELECT * FROM favorites ORDER BY created_at, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }

    /// Removes the favorite at exactly these coordinates. Returns `false`
    /// when nothing matched; that is a recoverable no-op for the caller,
    /// not an error.
    pub async fn remove_by_coordinates(&self, lat: f64, lon: f64) -> Result<bool, FavoritesError> {
        let result = sqlx::query("DELETE FROM favorites WHERE lat = $1 AND lon = $2")
            .bind(lat)
            .bind(lon)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Option<FavoriteCity>, FavoritesError> {
        let favorite = sqlx::query_as::<_, FavoriteCity>(
            "SELECT * FROM favorites WHERE lat = $1 AND lon = $2",
        )
        .bind(lat)
        .bind(lon)
        .fetch_optional(&self.pool)
        .await?;

        Ok(favorite)
    }
}
