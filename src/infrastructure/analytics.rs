//! Analytics query store.
//!
//! Holds every ingested engagement event, one table per kind, plus the
//! per-topic ingestion cursor. All queries return raw counts; the bootstrap
//! correction is applied by the aggregation reader.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE engagement_likes (          -- and engagement_views
//!     position BIGSERIAL PRIMARY KEY,
//!     username TEXT NOT NULL,
//!     task_id BIGINT NOT NULL,
//!     task_author TEXT NOT NULL
//! );
//! CREATE TABLE ingest_cursors (
//!     topic TEXT PRIMARY KEY,
//!     position TEXT NOT NULL
//! );
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use super::{StoreError, StoreFuture};
use crate::domain::{EngagementEvent, EngagementKind, TaskId, Username};

/// A task ranked by raw distinct-actor count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTask {
    pub task_id: TaskId,
    pub author: Username,
    pub distinct_actors: u64,
}

/// Raw like totals of one author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorLikeRows {
    pub author: Username,
    /// Every like row attributed to the author, bootstrap rows included.
    pub like_rows: u64,
    /// Number of distinct tasks of the author that appear in the likes table.
    pub distinct_tasks: u64,
}

/// Columnar-style read store fed by the stream ingestor.
pub trait AnalyticsStore: Send + Sync {
    /// Appends a batch of events and advances the cursor of `kind` atomically.
    fn append(
        &self,
        kind: EngagementKind,
        events: Vec<EngagementEvent>,
        cursor: String,
    ) -> StoreFuture<()>;

    /// Last committed cursor of the topic of `kind`.
    fn cursor(&self, kind: EngagementKind) -> StoreFuture<Option<String>>;

    /// `COUNT(DISTINCT username) WHERE task_id = ?`.
    fn count_distinct_actors(&self, kind: EngagementKind, task_id: TaskId) -> StoreFuture<u64>;

    /// Tasks ordered by distinct-actor count descending, then id ascending.
    fn top_tasks(&self, kind: EngagementKind, limit: usize) -> StoreFuture<Vec<RankedTask>>;

    /// Authors ordered by `like_rows - distinct_tasks` descending, then name.
    fn top_authors_by_likes(&self, limit: usize) -> StoreFuture<Vec<AuthorLikeRows>>;
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

// =============================================================================
// PostgreSQL Analytics Store
// =============================================================================

/// `PostgreSQL` implementation of [`AnalyticsStore`].
#[derive(Debug, Clone)]
pub struct PostgresAnalyticsStore {
    pool: PgPool,
}

impl PostgresAnalyticsStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(super) const fn table_for(kind: EngagementKind) -> &'static str {
    match kind {
        EngagementKind::Like => "engagement_likes",
        EngagementKind::View => "engagement_views",
    }
}

impl AnalyticsStore for PostgresAnalyticsStore {
    fn append(
        &self,
        kind: EngagementKind,
        events: Vec<EngagementEvent>,
        cursor: String,
    ) -> StoreFuture<()> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let count = events.len();
            let mut usernames = Vec::with_capacity(count);
            let mut task_ids = Vec::with_capacity(count);
            let mut authors = Vec::with_capacity(count);
            for event in events {
                usernames.push(event.actor.as_str().to_string());
                task_ids.push(event.task_id.value());
                authors.push(event.task_owner.as_str().to_string());
            }

            let mut transaction = pool.begin().await?;
            if count > 0 {
                let statement = format!(
                    "INSERT INTO {} (username, task_id, task_author) \
                     SELECT * FROM UNNEST($1::TEXT[], $2::BIGINT[], $3::TEXT[])",
                    table_for(kind)
                );
                sqlx::query(&statement)
                    .bind(&usernames)
                    .bind(&task_ids)
                    .bind(&authors)
                    .execute(&mut *transaction)
                    .await?;
            }
            sqlx::query(
                "INSERT INTO ingest_cursors (topic, position) VALUES ($1, $2) \
                 ON CONFLICT (topic) DO UPDATE SET position = EXCLUDED.position",
            )
            .bind(kind.topic())
            .bind(&cursor)
            .execute(&mut *transaction)
            .await?;
            transaction.commit().await?;

            tracing::debug!(topic = kind.topic(), count, %cursor, "appended events");
            Ok(())
        })
    }

    fn cursor(&self, kind: EngagementKind) -> StoreFuture<Option<String>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let position: Option<String> =
                sqlx::query_scalar("SELECT position FROM ingest_cursors WHERE topic = $1")
                    .bind(kind.topic())
                    .fetch_optional(&pool)
                    .await?;
            Ok(position)
        })
    }

    fn count_distinct_actors(&self, kind: EngagementKind, task_id: TaskId) -> StoreFuture<u64> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let statement = format!(
                "SELECT COUNT(DISTINCT username) FROM {} WHERE task_id = $1",
                table_for(kind)
            );
            let count: i64 = sqlx::query_scalar(&statement)
                .bind(task_id.value())
                .fetch_one(&pool)
                .await?;
            Ok(to_count(count))
        })
    }

    fn top_tasks(&self, kind: EngagementKind, limit: usize) -> StoreFuture<Vec<RankedTask>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let statement = format!(
                "SELECT task_id, task_author, COUNT(DISTINCT username) AS actors \
                 FROM {} GROUP BY task_id, task_author \
                 ORDER BY actors DESC, task_id ASC LIMIT $1",
                table_for(kind)
            );
            let rows = sqlx::query(&statement)
                .bind(to_limit(limit))
                .fetch_all(&pool)
                .await?;
            rows.iter()
                .map(|row| -> Result<RankedTask, sqlx::Error> {
                    Ok(RankedTask {
                        task_id: TaskId::new(row.try_get("task_id")?),
                        author: Username::from_trusted(row.try_get::<String, _>("task_author")?),
                        distinct_actors: to_count(row.try_get("actors")?),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(StoreError::from)
        })
    }

    fn top_authors_by_likes(&self, limit: usize) -> StoreFuture<Vec<AuthorLikeRows>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT task_author, COUNT(*) AS like_rows, COUNT(DISTINCT task_id) AS tasks \
                 FROM engagement_likes GROUP BY task_author \
                 ORDER BY COUNT(*) - COUNT(DISTINCT task_id) DESC, task_author ASC LIMIT $1",
            )
            .bind(to_limit(limit))
            .fetch_all(&pool)
            .await?;
            rows.iter()
                .map(|row| -> Result<AuthorLikeRows, sqlx::Error> {
                    Ok(AuthorLikeRows {
                        author: Username::from_trusted(row.try_get::<String, _>("task_author")?),
                        like_rows: to_count(row.try_get("like_rows")?),
                        distinct_tasks: to_count(row.try_get("tasks")?),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(StoreError::from)
        })
    }
}

// =============================================================================
// In-Memory Analytics Store
// =============================================================================

#[derive(Debug, Default)]
struct AnalyticsState {
    events: HashMap<EngagementKind, Vec<EngagementEvent>>,
    cursors: HashMap<EngagementKind, String>,
}

impl AnalyticsState {
    fn events(&self, kind: EngagementKind) -> &[EngagementEvent] {
        self.events.get(&kind).map_or(&[], Vec::as_slice)
    }
}

/// In-memory implementation of [`AnalyticsStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnalyticsStore {
    state: Arc<RwLock<AnalyticsState>>,
}

impl InMemoryAnalyticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalyticsStore for InMemoryAnalyticsStore {
    fn append(
        &self,
        kind: EngagementKind,
        events: Vec<EngagementEvent>,
        cursor: String,
    ) -> StoreFuture<()> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let mut guard = state.write().await;
            guard.events.entry(kind).or_default().extend(events);
            guard.cursors.insert(kind, cursor);
            Ok(())
        })
    }

    fn cursor(&self, kind: EngagementKind) -> StoreFuture<Option<String>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move { Ok(state.read().await.cursors.get(&kind).cloned()) })
    }

    fn count_distinct_actors(&self, kind: EngagementKind, task_id: TaskId) -> StoreFuture<u64> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let guard = state.read().await;
            let actors: BTreeSet<&Username> = guard
                .events(kind)
                .iter()
                .filter(|event| event.task_id == task_id)
                .map(|event| &event.actor)
                .collect();
            Ok(actors.len() as u64)
        })
    }

    fn top_tasks(&self, kind: EngagementKind, limit: usize) -> StoreFuture<Vec<RankedTask>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let guard = state.read().await;
            let mut groups: BTreeMap<(TaskId, &Username), BTreeSet<&Username>> = BTreeMap::new();
            for event in guard.events(kind) {
                groups
                    .entry((event.task_id, &event.task_owner))
                    .or_default()
                    .insert(&event.actor);
            }
            let mut ranked: Vec<RankedTask> = groups
                .into_iter()
                .map(|((task_id, author), actors)| RankedTask {
                    task_id,
                    author: author.clone(),
                    distinct_actors: actors.len() as u64,
                })
                .collect();
            ranked.sort_by(|left, right| {
                right
                    .distinct_actors
                    .cmp(&left.distinct_actors)
                    .then(left.task_id.cmp(&right.task_id))
            });
            ranked.truncate(limit);
            Ok(ranked)
        })
    }

    fn top_authors_by_likes(&self, limit: usize) -> StoreFuture<Vec<AuthorLikeRows>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let guard = state.read().await;
            let mut groups: BTreeMap<&Username, (u64, BTreeSet<TaskId>)> = BTreeMap::new();
            for event in guard.events(EngagementKind::Like) {
                let (rows, tasks) = groups.entry(&event.task_owner).or_default();
                *rows += 1;
                tasks.insert(event.task_id);
            }
            let mut ranked: Vec<AuthorLikeRows> = groups
                .into_iter()
                .map(|(author, (like_rows, tasks))| AuthorLikeRows {
                    author: author.clone(),
                    like_rows,
                    distinct_tasks: tasks.len() as u64,
                })
                .collect();
            ranked.sort_by(|left, right| {
                let left_score = left.like_rows.saturating_sub(left.distinct_tasks);
                let right_score = right.like_rows.saturating_sub(right.distinct_tasks);
                right_score
                    .cmp(&left_score)
                    .then_with(|| left.author.cmp(&right.author))
            });
            ranked.truncate(limit);
            Ok(ranked)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn username(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    fn like(actor: &str, task_id: i64, owner: &str) -> EngagementEvent {
        EngagementEvent::new(username(actor), TaskId::new(task_id), username(owner))
    }

    #[fixture]
    fn store() -> InMemoryAnalyticsStore {
        InMemoryAnalyticsStore::new()
    }

    #[rstest]
    fn tables_are_named_per_kind() {
        assert_eq!(table_for(EngagementKind::Like), "engagement_likes");
        assert_eq!(table_for(EngagementKind::View), "engagement_views");
    }

    #[rstest]
    #[tokio::test]
    async fn append_advances_cursor(store: InMemoryAnalyticsStore) {
        assert_eq!(store.cursor(EngagementKind::Like).await.unwrap(), None);

        store
            .append(EngagementKind::Like, vec![like("bob", 1, "alice")], "1".to_string())
            .await
            .unwrap();

        assert_eq!(
            store.cursor(EngagementKind::Like).await.unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(store.cursor(EngagementKind::View).await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn distinct_actor_count_ignores_repeats(store: InMemoryAnalyticsStore) {
        let events = vec![like("bob", 1, "alice"), like("bob", 1, "alice"), like("carol", 1, "alice")];
        store
            .append(EngagementKind::Like, events, "3".to_string())
            .await
            .unwrap();

        let count = store
            .count_distinct_actors(EngagementKind::Like, TaskId::new(1))
            .await
            .unwrap();

        assert_eq!(count, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn top_tasks_breaks_ties_by_id(store: InMemoryAnalyticsStore) {
        let events = vec![
            like("bob", 2, "alice"),
            like("bob", 1, "alice"),
            like("carol", 3, "dave"),
            like("erin", 3, "dave"),
        ];
        store
            .append(EngagementKind::Like, events, "4".to_string())
            .await
            .unwrap();

        let ranked = store.top_tasks(EngagementKind::Like, 2).await.unwrap();

        let ids: Vec<i64> = ranked.iter().map(|entry| entry.task_id.value()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(ranked[0].distinct_actors, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn top_authors_reports_rows_and_tasks(store: InMemoryAnalyticsStore) {
        let events = vec![
            like("x", 1, "alice"),
            like("y", 1, "alice"),
            like("x", 2, "alice"),
            like("x", 3, "bob"),
        ];
        store
            .append(EngagementKind::Like, events, "4".to_string())
            .await
            .unwrap();

        let ranked = store.top_authors_by_likes(10).await.unwrap();

        assert_eq!(
            ranked[0],
            AuthorLikeRows {
                author: username("alice"),
                like_rows: 3,
                distinct_tasks: 2
            }
        );
        assert_eq!(ranked[1].author, username("bob"));
    }
}
