//! SQLite persistence for sources, keywords and articles.
//!
//! The `articles.url` UNIQUE constraint is the only deduplication mechanism.
//! Workers running concurrently may surface the same URL; whichever insert
//! lands first wins and every other attempt comes back as
//! [`MonitorError::DuplicateArticle`], which [`Store::save_candidates`] treats
//! as an expected no-op.

use crate::config::SeedConfig;
use crate::error::{MonitorError, Result};
use crate::expander::infer_media_from_url;
use crate::models::{Article, Keyword, MonitoredSource, NewArticle, NewsCandidate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS monitored_sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        media TEXT NOT NULL,
        region TEXT,
        locality TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sources_media ON monitored_sources(media)",
    r#"
    CREATE TABLE IF NOT EXISTS keywords (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        term TEXT NOT NULL,
        term_key TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        summary TEXT,
        source TEXT NOT NULL,
        region TEXT,
        locality TEXT,
        category TEXT,
        published_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source)",
    "CREATE INDEX IF NOT EXISTS idx_articles_region ON articles(region)",
    "CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at)",
];

/// Outcome of saving one batch of candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub inserted: usize,
    pub duplicates: usize,
    /// Candidates without a URL.
    pub skipped: usize,
}

/// Rows added by [`Store::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub sources_added: usize,
    pub keywords_added: usize,
}

/// Counters for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub article_count: i64,
    pub last_created_at: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub sources_total: i64,
    pub sources_active: i64,
    pub keywords_active: i64,
}

/// Handle to the SQLite database. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) a database and run migrations.
    ///
    /// # Example URLs
    /// - `sqlite://data/news.db?mode=rwc` - file database, created if missing
    /// - `sqlite::memory:` - see [`Store::in_memory`]
    #[instrument(level = "info", skip_all, fields(%database_url))]
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MonitorError::Config(format!(
                        "creating database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Database ready");
        Ok(store)
    }

    /// Single-connection in-memory database, for tests and dry runs.
    ///
    /// The connection is never recycled, otherwise the database would vanish.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read active sources and active keyword terms in one read transaction,
    /// so both belong to the same point in time.
    pub async fn load_cycle_config(
        &self,
    ) -> std::result::Result<(Vec<MonitoredSource>, Vec<String>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let sources = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT id, url, media, region, locality, is_active, created_at, updated_at
            FROM monitored_sources
            WHERE is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let keywords = sqlx::query_as::<_, KeywordRow>(
            "SELECT id, term, is_active, created_at FROM keywords WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let sources = sources
            .into_iter()
            .map(SourceRow::into_source)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let keywords = keywords
            .into_iter()
            .map(|row| row.into_keyword().map(|k| k.term))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok((sources, keywords))
    }

    /// Insert one article. A URL that is already stored yields
    /// [`MonitorError::DuplicateArticle`]; any other failure is
    /// [`MonitorError::Persistence`].
    ///
    /// `created_at` never goes backwards: it is the later of the wall clock
    /// and the newest `created_at` already stored.
    pub async fn insert_article(&self, article: &NewArticle) -> Result<i64> {
        let now = to_db_time(Utc::now());
        let res = sqlx::query(
            r#"
            INSERT INTO articles
                (title, url, summary, source, region, locality, category, published_at, created_at)
            VALUES
                (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                 MAX(?9, COALESCE((SELECT MAX(created_at) FROM articles), ?9)))
            "#,
        )
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.summary)
        .bind(&article.source)
        .bind(&article.region)
        .bind(&article.locality)
        .bind(&article.category)
        .bind(article.published_at.map(to_db_time))
        .bind(now)
        .execute(&self.pool)
        .await;

        match res {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(MonitorError::DuplicateArticle {
                    url: article.url.clone(),
                })
            }
            Err(e) => Err(MonitorError::Persistence(e)),
        }
    }

    /// Persist filtered candidates, one independent insert each.
    ///
    /// Duplicates are counted and skipped. The first non-duplicate failure
    /// stops the batch and is returned; rows inserted before it stay stored.
    #[instrument(level = "debug", skip_all, fields(count = candidates.len()))]
    pub async fn save_candidates(
        &self,
        candidates: Vec<NewsCandidate>,
        default_locality: Option<&str>,
        default_region: Option<&str>,
    ) -> Result<SaveReport> {
        let mut report = SaveReport::default();
        for candidate in candidates {
            if candidate.url.trim().is_empty() {
                report.skipped += 1;
                continue;
            }
            let article = NewArticle::from_candidate(candidate, default_locality, default_region);
            match self.insert_article(&article).await {
                Ok(id) => {
                    debug!(id, url = %article.url, "Stored article");
                    report.inserted += 1;
                }
                Err(MonitorError::DuplicateArticle { url }) => {
                    debug!(%url, "Duplicate article ignored");
                    report.duplicates += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// All articles, newest publication first, undated ones last.
    pub async fn articles_for_export(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, title, url, summary, source, region, locality, category,
                   published_at, created_at
            FROM articles
            ORDER BY published_at IS NULL, published_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.into_article().map_err(MonitorError::Persistence))
            .collect()
    }

    pub async fn article_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert a monitored source unless its URL is already known.
    /// Returns whether a row was added.
    pub async fn add_source(
        &self,
        url: &str,
        media: &str,
        region: Option<&str>,
        locality: Option<&str>,
    ) -> Result<bool> {
        let now = to_db_time(Utc::now());
        let done = sqlx::query(
            r#"
            INSERT OR IGNORE INTO monitored_sources
                (url, media, region, locality, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            "#,
        )
        .bind(url)
        .bind(media)
        .bind(region.map(str::to_uppercase))
        .bind(locality)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    /// Insert a keyword unless the same term (ignoring case) exists.
    ///
    /// Uniqueness is checked on `term_key`, the Unicode lowercase form, so
    /// accented capitals like `Ê` collide with their lowercase forms too.
    pub async fn add_keyword(&self, term: &str) -> Result<bool> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(false);
        }
        let done = sqlx::query(
            r#"
            INSERT OR IGNORE INTO keywords (term, term_key, is_active, created_at)
            VALUES (?1, ?2, 1, ?3)
            "#,
        )
        .bind(term)
        .bind(term.to_lowercase())
        .bind(to_db_time(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    /// Insert the configured seed sources and keywords, leaving existing rows
    /// untouched. A source without `media` gets it inferred from its host.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidUrl`] or [`MonitorError::Config`] for a source
    /// with a malformed URL or an uninferable media; nothing is written then.
    #[instrument(level = "info", skip_all)]
    pub async fn seed(&self, seed: &SeedConfig) -> Result<SeedReport> {
        let mut sources = Vec::with_capacity(seed.sources.len());
        for source in &seed.sources {
            Url::parse(&source.url).map_err(|e| MonitorError::InvalidUrl {
                url: source.url.clone(),
                source: e,
            })?;
            let media = match source.media.as_deref().map(str::trim) {
                Some(media) if !media.is_empty() => media.to_string(),
                _ => infer_media_from_url(&source.url)
                    .ok_or_else(|| {
                        MonitorError::Config(format!(
                            "cannot infer media for seed source {}; set `media`",
                            source.url
                        ))
                    })?
                    .to_string(),
            };
            sources.push((source, media));
        }

        let mut report = SeedReport::default();
        for (source, media) in sources {
            if self
                .add_source(
                    &source.url,
                    &media,
                    source.region.as_deref(),
                    source.locality.as_deref(),
                )
                .await?
            {
                report.sources_added += 1;
            }
        }
        for term in &seed.keywords {
            if self.add_keyword(term).await? {
                report.keywords_added += 1;
            }
        }
        info!(
            sources_added = report.sources_added,
            keywords_added = report.keywords_added,
            "Seeded database"
        );
        Ok(report)
    }

    pub async fn status(&self) -> Result<StoreStatus> {
        let (article_count, last_created, last_published): (i64, Option<String>, Option<String>) =
            sqlx::query_as("SELECT COUNT(*), MAX(created_at), MAX(published_at) FROM articles")
                .fetch_one(&self.pool)
                .await?;
        let (sources_total, sources_active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM monitored_sources",
        )
        .fetch_one(&self.pool)
        .await?;
        let (keywords_active,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM keywords WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(StoreStatus {
            article_count,
            last_created_at: last_created.map(|s| from_db_time(&s)).transpose()?,
            last_published_at: last_published.map(|s| from_db_time(&s)).transpose()?,
            sources_total,
            sources_active,
            keywords_active,
        })
    }
}

/// Fixed-width UTC timestamp, so text order equals time order.
fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn from_db_time(s: &str) -> std::result::Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(format!("invalid timestamp '{s}': {e}").into()))
}

#[derive(Debug, FromRow)]
struct SourceRow {
    id: i64,
    url: String,
    media: String,
    region: Option<String>,
    locality: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl SourceRow {
    fn into_source(self) -> std::result::Result<MonitoredSource, sqlx::Error> {
        Ok(MonitoredSource {
            id: self.id,
            url: self.url,
            media: self.media,
            region: self.region,
            locality: self.locality,
            active: self.is_active,
            created_at: from_db_time(&self.created_at)?,
            updated_at: from_db_time(&self.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct KeywordRow {
    id: i64,
    term: String,
    is_active: bool,
    created_at: String,
}

impl KeywordRow {
    fn into_keyword(self) -> std::result::Result<Keyword, sqlx::Error> {
        Ok(Keyword {
            id: self.id,
            term: self.term,
            active: self.is_active,
            created_at: from_db_time(&self.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    url: String,
    summary: Option<String>,
    source: String,
    region: Option<String>,
    locality: Option<String>,
    category: Option<String>,
    published_at: Option<String>,
    created_at: String,
}

impl ArticleRow {
    fn into_article(self) -> std::result::Result<Article, sqlx::Error> {
        Ok(Article {
            id: self.id,
            title: self.title,
            url: self.url,
            summary: self.summary,
            source: self.source,
            region: self.region,
            locality: self.locality,
            category: self.category,
            published_at: self.published_at.as_deref().map(from_db_time).transpose()?,
            created_at: from_db_time(&self.created_at)?,
        })
    }
}
