use chrono::Utc;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;
use tracing::warn;

#[cfg(test)]
use crate::db::models::ProfileRow;
use crate::db::models::CoinScoreRecord;
use crate::error::Result;
use crate::types::{CoinCandidate, Similarities};

/// Coin, score cache and profile tables. Cheap to clone; shares the process
/// pool.
#[derive(Clone)]
pub struct CoinStore {
    pool: SqlitePool,
}

impl CoinStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cached scores for `address`, only if computed at or after `since_ms`
    /// and carrying a total similarity.
    pub async fn find_fresh(&self, address: &str, since_ms: i64) -> Result<Option<CoinScoreRecord>> {
        let record = sqlx::query_as::<_, CoinScoreRecord>(
            r#"
            SELECT address, sentiment_similarity, embed_similarity,
                   finance_similarity, total_similarity, scraped_at
            FROM coins
            WHERE address = ? AND scraped_at >= ? AND total_similarity IS NOT NULL
            "#,
        )
        .bind(address)
        .bind(since_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Cached scores for `address` regardless of age.
    #[cfg(test)]
    pub(crate) async fn find(&self, address: &str) -> Result<Option<CoinScoreRecord>> {
        let record = sqlx::query_as::<_, CoinScoreRecord>(
            r#"
            SELECT address, sentiment_similarity, embed_similarity,
                   finance_similarity, total_similarity, scraped_at
            FROM coins
            WHERE address = ?
            "#,
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert the coin with its scores, or refresh only the scores and
    /// `scraped_at` if the address is already cached.
    pub async fn upsert_scores(
        &self,
        coin: &CoinCandidate,
        scores: &Similarities,
        scraped_at_ms: i64,
    ) -> Result<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO coins (
                address, name, symbol, description,
                total_supply, total_volume, volume_24h, market_cap, market_cap_delta_24h,
                created_at, creator_address, unique_holders, transfer_count,
                media_mime_type, media_original_uri, media_preview_url,
                sentiment_similarity, embed_similarity, finance_similarity, total_similarity,
                scraped_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                sentiment_similarity = excluded.sentiment_similarity,
                embed_similarity = excluded.embed_similarity,
                finance_similarity = excluded.finance_similarity,
                total_similarity = excluded.total_similarity,
                scraped_at = excluded.scraped_at
            "#,
        );

        bind_details(query, coin)
            .bind(scores.sentiment)
            .bind(scores.embed)
            .bind(scores.finance)
            .bind(scores.total)
            .bind(scraped_at_ms)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert or refresh the coin's descriptive fields. Cached scores and
    /// `scraped_at` of an existing row are left alone; a new row has no
    /// scores and so is never fresh.
    pub async fn upsert_details(&self, coin: &CoinCandidate, seen_at_ms: i64) -> Result<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO coins (
                address, name, symbol, description,
                total_supply, total_volume, volume_24h, market_cap, market_cap_delta_24h,
                created_at, creator_address, unique_holders, transfer_count,
                media_mime_type, media_original_uri, media_preview_url,
                scraped_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                name = excluded.name,
                symbol = excluded.symbol,
                description = excluded.description,
                total_supply = excluded.total_supply,
                total_volume = excluded.total_volume,
                volume_24h = excluded.volume_24h,
                market_cap = excluded.market_cap,
                market_cap_delta_24h = excluded.market_cap_delta_24h,
                created_at = excluded.created_at,
                creator_address = excluded.creator_address,
                unique_holders = excluded.unique_holders,
                transfer_count = excluded.transfer_count,
                media_mime_type = excluded.media_mime_type,
                media_original_uri = excluded.media_original_uri,
                media_preview_url = excluded.media_preview_url
            "#,
        );

        bind_details(query, coin)
            .bind(seen_at_ms)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create the creator's profile if it does not exist yet. A unique-key
    /// conflict is logged and ignored; any other failure is returned.
    pub async fn ensure_profile(&self, address: &str, handle: &str, avatar_url: &str) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO profiles (address, handle, avatar_url, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(address)
        .bind(non_empty(handle))
        .bind(non_empty(avatar_url))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!(address, "Profile with address {address} already exists.");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create the profile, or overwrite handle and avatar of an existing one.
    pub async fn upsert_profile(&self, address: &str, handle: &str, avatar_url: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (address, handle, avatar_url, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                handle = excluded.handle,
                avatar_url = excluded.avatar_url
            "#,
        )
        .bind(address)
        .bind(non_empty(handle))
        .bind(non_empty(avatar_url))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn find_profile(&self, address: &str) -> Result<Option<ProfileRow>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT address, handle, avatar_url, created_at FROM profiles WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

/// Bind the sixteen descriptive columns, `address` through
/// `media_preview_url`, in table order.
fn bind_details<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    coin: &'q CoinCandidate,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let created_at = if coin.created_at.is_empty() {
        Utc::now().to_rfc3339()
    } else {
        coin.created_at.clone()
    };

    query
        .bind(&coin.address)
        .bind(&coin.name)
        .bind(&coin.symbol)
        .bind(&coin.description)
        .bind(coin.total_supply)
        .bind(coin.total_volume)
        .bind(coin.volume_24h)
        .bind(coin.market_cap)
        .bind(coin.market_cap_delta_24h)
        .bind(created_at)
        .bind(non_empty(&coin.creator_address))
        .bind(coin.unique_holders as i64)
        .bind(coin.transfer_count)
        .bind(non_empty(&coin.mime_type))
        .bind(non_empty(&coin.original_image_url))
        .bind(non_empty(&coin.preview_image_url))
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn coin(address: &str) -> CoinCandidate {
        CoinCandidate {
            address: address.to_string(),
            name: "Sunset".to_string(),
            symbol: "SUN".to_string(),
            creator_address: "0xCreator".to_string(),
            mime_type: "image/png".to_string(),
            total_supply: 1_000_000_000.0,
            ..Default::default()
        }
    }

    fn scores(total: f64) -> Similarities {
        Similarities { sentiment: 40.0, embed: 50.0, finance: 60.0, total }
    }

    async fn name_and_market_cap(pool: &SqlitePool, address: &str) -> (String, f64) {
        sqlx::query_as("SELECT name, market_cap FROM coins WHERE address = ?")
            .bind(address)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_then_find_fresh() {
        let store = CoinStore::new(test_pool().await);
        let now = Utc::now().timestamp_millis();
        store.upsert_scores(&coin("0xA"), &scores(55.0), now).await.unwrap();

        let hit = store.find_fresh("0xA", now - 1_000).await.unwrap().unwrap();
        assert_eq!(hit.total_similarity, Some(55.0));
        assert_eq!(hit.similarities().finance, 60.0);

        assert!(store.find_fresh("0xA", now + 1).await.unwrap().is_none());
        assert!(store.find_fresh("0xB", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_refreshes_scores_and_keeps_one_row() {
        let pool = test_pool().await;
        let store = CoinStore::new(pool.clone());
        store.upsert_scores(&coin("0xA"), &scores(10.0), 1_000).await.unwrap();

        let mut renamed = coin("0xA");
        renamed.name = "Renamed".to_string();
        store.upsert_scores(&renamed, &scores(70.0), 2_000).await.unwrap();

        let record = store.find("0xA").await.unwrap().unwrap();
        assert_eq!(record.total_similarity, Some(70.0));
        assert_eq!(record.scraped_at, 2_000);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coins WHERE address = ?")
            .bind("0xA")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        // Descriptive fields are only written on first insert.
        assert_eq!(name_and_market_cap(&pool, "0xA").await.0, "Sunset");
    }

    #[tokio::test]
    async fn null_total_is_never_fresh() {
        let pool = test_pool().await;
        let store = CoinStore::new(pool.clone());
        let now = Utc::now().timestamp_millis();
        sqlx::query(
            "INSERT INTO coins (address, name, symbol, description, created_at, scraped_at)
             VALUES ('0xN', '', '', '', '', ?)",
        )
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        assert!(store.find_fresh("0xN", now - 60_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_details_refreshes_fields_and_keeps_scores() {
        let pool = test_pool().await;
        let store = CoinStore::new(pool.clone());
        store.upsert_scores(&coin("0xA"), &scores(64.0), 5_000).await.unwrap();

        let mut updated = coin("0xA");
        updated.name = "Sunrise".to_string();
        updated.market_cap = 42_000.0;
        store.upsert_details(&updated, 9_000).await.unwrap();

        assert_eq!(name_and_market_cap(&pool, "0xA").await, ("Sunrise".to_string(), 42_000.0));
        let record = store.find("0xA").await.unwrap().unwrap();
        assert_eq!(record.total_similarity, Some(64.0));
        assert_eq!(record.scraped_at, 5_000);
    }

    #[tokio::test]
    async fn detail_only_row_is_not_fresh() {
        let store = CoinStore::new(test_pool().await);
        let now = Utc::now().timestamp_millis();
        store.upsert_details(&coin("0xA"), now).await.unwrap();

        let record = store.find("0xA").await.unwrap().unwrap();
        assert!(record.total_similarity.is_none());
        assert!(store.find_fresh("0xA", now - 60_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_profile_swallows_duplicate_insert() {
        let store = CoinStore::new(test_pool().await);
        store.ensure_profile("0xCreator", "maker", "").await.unwrap();
        // Plain INSERT on an existing key raises a unique violation, which is
        // logged and ignored.
        store.ensure_profile("0xCreator", "other", "x.png").await.unwrap();

        let profile = store.find_profile("0xCreator").await.unwrap().unwrap();
        assert_eq!(profile.address, "0xCreator");
        assert_eq!(profile.handle.as_deref(), Some("maker"));
        assert!(profile.avatar_url.is_none());
    }

    #[tokio::test]
    async fn duplicate_profile_insert_is_a_unique_violation() {
        let pool = test_pool().await;
        let insert = "INSERT INTO profiles (address, handle, avatar_url, created_at) VALUES ('0xC', NULL, NULL, 0)";
        sqlx::query(insert).execute(&pool).await.unwrap();

        match sqlx::query(insert).execute(&pool).await {
            Err(sqlx::Error::Database(e)) => assert!(e.is_unique_violation()),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upsert_profile_overwrites_handle_and_avatar() {
        let store = CoinStore::new(test_pool().await);
        store.ensure_profile("0xCreator", "maker", "").await.unwrap();
        let created = store.find_profile("0xCreator").await.unwrap().unwrap().created_at;

        store.upsert_profile("0xCreator", "renamed", "a.png").await.unwrap();

        let profile = store.find_profile("0xCreator").await.unwrap().unwrap();
        assert_eq!(profile.handle.as_deref(), Some("renamed"));
        assert_eq!(profile.avatar_url.as_deref(), Some("a.png"));
        assert_eq!(profile.created_at, created);
    }
}
