use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cache::Snapshot;
use super::data::{Project, ProjectDocument, ProjectDraft, ProjectId, ProjectPatch};
use crate::error::{AuthError, PersistenceError};

const IDENTITY_KEY: &str = "anonymous_uid";

/// The Gateway is the app's persistence and identity service.
///
/// It stores per-user document collections in a SQLite database and pushes
/// a fresh snapshot to subscribers after every write. The rest of the app
/// only sees the create/update/delete/subscribe contract; every call is a
/// fallible async operation bounded by a timeout.
///
/// Cloning is cheap; all clones share one connection.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    namespace: String,
    timeout: Duration,
    /// Shared by all collections so a new subscription never rewinds a cache
    revision: AtomicU64,
    watchers: Mutex<HashMap<CollectionPath, watch::Sender<Snapshot>>>,
}

/// Why a gateway task produced no result
enum RunFailure {
    Timeout,
    Join(String),
}

impl Gateway {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path, namespace: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!("📁 Project database at: {}", path.display());
        Self::with_connection(conn, namespace, timeout)
    }

    /// Gateway over a private in-memory database
    pub fn open_in_memory(namespace: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?, namespace, timeout)
    }

    fn with_connection(
        conn: Connection,
        namespace: &str,
        timeout: Duration,
    ) -> Result<Self, PersistenceError> {
        init_schema(&conn)?;

        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                namespace: namespace.to_string(),
                timeout,
                revision: AtomicU64::new(0),
                watchers: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Anonymous sign-in.
    ///
    /// The first call on a device mints a user identifier; later calls return
    /// the same one.
    pub async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        let outcome = self
            .run(|inner| -> Result<Session, AuthError> {
                let conn = inner
                    .conn
                    .lock()
                    .map_err(|_| AuthError::Task("connection lock poisoned".into()))?;

                let stored: Option<String> = conn
                    .query_row(
                        "SELECT value FROM identity WHERE key = ?1",
                        params![IDENTITY_KEY],
                        |row| row.get(0),
                    )
                    .optional()?;

                let user_id = match stored {
                    Some(value) => Uuid::parse_str(&value)
                        .map_err(|_| AuthError::MalformedIdentity(value.clone()))?,
                    None => {
                        let user_id = Uuid::new_v4();
                        conn.execute(
                            "INSERT INTO identity (key, value) VALUES (?1, ?2)",
                            params![IDENTITY_KEY, user_id.to_string()],
                        )?;
                        info!("Created anonymous identity {}", user_id);
                        user_id
                    }
                };

                Ok(Session { user_id })
            })
            .await;

        match outcome {
            Ok(result) => result,
            Err(RunFailure::Timeout) => Err(AuthError::Timeout(self.inner.timeout.as_secs())),
            Err(RunFailure::Join(e)) => Err(AuthError::Task(e)),
        }
    }

    /// Handle to the signed-in user's project collection
    pub fn collection(&self, session: &Session) -> ProjectCollection {
        ProjectCollection {
            gateway: self.clone(),
            path: CollectionPath::projects(&self.inner.namespace, &session.user_id),
        }
    }

    /// Tear down all live subscriptions
    pub fn close(&self) {
        match self.inner.watchers.lock() {
            Ok(mut watchers) => {
                info!("Closing gateway ({} live collections)", watchers.len());
                watchers.clear();
            }
            Err(_) => error!("Watcher registry poisoned during close"),
        }
    }

    /// Run blocking database work off the UI thread, bounded by the timeout
    async fn run<T, F>(&self, work: F) -> Result<T, RunFailure>
    where
        F: FnOnce(&Inner) -> T + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || work(&inner));

        match tokio::time::timeout(self.inner.timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RunFailure::Join(e.to_string())),
            Err(_) => Err(RunFailure::Timeout),
        }
    }

    async fn run_persistence<T, F>(&self, work: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&Inner) -> Result<T, PersistenceError> + Send + 'static,
        T: Send + 'static,
    {
        match self.run(work).await {
            Ok(result) => result,
            Err(RunFailure::Timeout) => Err(PersistenceError::Timeout(self.inner.timeout.as_secs())),
            Err(RunFailure::Join(e)) => Err(PersistenceError::Task(e)),
        }
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("namespace", &self.inner.namespace)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

/// Create all tables and indexes if they don't exist
fn init_schema(conn: &Connection) -> Result<(), PersistenceError> {
    // One row per document; body is the JSON wire shape
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            path            TEXT NOT NULL,
            id              TEXT NOT NULL,
            body_json       TEXT NOT NULL,
            created_at      INTEGER,
            PRIMARY KEY (path, id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_path_created
         ON documents(path, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS identity (
            key             TEXT PRIMARY KEY,
            value           TEXT NOT NULL
        )",
        [],
    )?;

    debug!("Gateway schema initialized");
    Ok(())
}

/// An authenticated anonymous user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: Uuid,
}

impl Session {
    pub fn user_id(&self) -> &Uuid {
        &self.user_id
    }
}

/// Address of a document collection: `artifacts/{namespace}/users/{uid}/projects`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn projects(namespace: &str, user_id: &Uuid) -> Self {
        Self(format!("artifacts/{}/users/{}/projects", namespace, user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user's project collection
#[derive(Debug, Clone)]
pub struct ProjectCollection {
    gateway: Gateway,
    path: CollectionPath,
}

impl ProjectCollection {
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Store a new project under an id minted by the caller.
    /// `createdAt` is stamped here, never by the caller.
    ///
    /// Writing the same id again replaces the body but keeps the first
    /// `createdAt`, so a create retried after a timeout never duplicates
    /// the record.
    pub async fn create(&self, id: &ProjectId, draft: &ProjectDraft) -> Result<(), PersistenceError> {
        let id = id.clone();
        let draft = draft.clone();
        let path = self.path.clone();

        self.gateway
            .run_persistence(move |inner| {
                let conn = lock_conn(inner)?;

                let existing: Option<Option<i64>> = conn
                    .query_row(
                        "SELECT created_at FROM documents WHERE path = ?1 AND id = ?2",
                        params![path.as_str(), id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;

                let created_at = match existing.flatten().and_then(DateTime::from_timestamp_millis) {
                    Some(stamp) => {
                        debug!("Project {} already stored; rewriting it", id);
                        stamp
                    }
                    None => next_timestamp(&conn)?,
                };
                let body = serde_json::to_string(&draft.to_document(created_at))?;

                conn.execute(
                    "INSERT OR REPLACE INTO documents (path, id, body_json, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![path.as_str(), id.as_str(), body, created_at.timestamp_millis()],
                )?;

                info!("Created project {} ({:?})", id, draft.name);
                publish(inner, &conn, &path);
                Ok(())
            })
            .await
    }

    /// Merge `patch` into an existing project; fields absent from the patch keep their value
    pub async fn update(&self, id: &ProjectId, patch: &ProjectPatch) -> Result<(), PersistenceError> {
        let id = id.clone();
        let patch = patch.clone();
        let path = self.path.clone();

        self.gateway
            .run_persistence(move |inner| {
                let conn = lock_conn(inner)?;

                let existing: Option<String> = conn
                    .query_row(
                        "SELECT body_json FROM documents WHERE path = ?1 AND id = ?2",
                        params![path.as_str(), id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                let existing = existing.ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;

                let mut body: serde_json::Value = serde_json::from_str(&existing)?;
                merge_patch(&mut body, serde_json::to_value(&patch)?);

                conn.execute(
                    "UPDATE documents SET body_json = ?1 WHERE path = ?2 AND id = ?3",
                    params![serde_json::to_string(&body)?, path.as_str(), id.as_str()],
                )?;

                info!("Updated project {}", id);
                publish(inner, &conn, &path);
                Ok(())
            })
            .await
    }

    /// Remove a project. Deleting an id that is already gone is not an error.
    pub async fn delete(&self, id: &ProjectId) -> Result<(), PersistenceError> {
        let id = id.clone();
        let path = self.path.clone();

        self.gateway
            .run_persistence(move |inner| {
                let conn = lock_conn(inner)?;

                let removed = conn.execute(
                    "DELETE FROM documents WHERE path = ?1 AND id = ?2",
                    params![path.as_str(), id.as_str()],
                )?;

                if removed == 0 {
                    debug!("Delete of {} matched nothing", id);
                } else {
                    info!("Deleted project {}", id);
                }

                publish(inner, &conn, &path);
                Ok(())
            })
            .await
    }

    /// Subscribe to snapshots of this collection.
    /// The returned subscription already holds the current snapshot.
    pub async fn subscribe(&self) -> Result<Subscription, PersistenceError> {
        let path = self.path.clone();

        self.gateway
            .run_persistence(move |inner| {
                let conn = lock_conn(inner)?;
                let mut watchers = inner
                    .watchers
                    .lock()
                    .map_err(|_| PersistenceError::Task("watcher registry poisoned".into()))?;

                let receiver = match watchers.get(&path) {
                    Some(sender) => sender.subscribe(),
                    None => {
                        let snapshot = load_snapshot(inner, &conn, &path)?;
                        let (sender, receiver) = watch::channel(snapshot);
                        watchers.insert(path.clone(), sender);
                        receiver
                    }
                };

                info!("Subscribed to {}", path);
                Ok(Subscription { path, receiver })
            })
            .await
    }
}

/// Live view of a collection. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    path: CollectionPath,
    receiver: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// The latest snapshot, without waiting
    pub fn current(&mut self) -> Snapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next snapshot
    pub async fn changed(&mut self) -> Result<Snapshot, PersistenceError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| PersistenceError::SubscriptionClosed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        info!("Unsubscribed from {}", self.path);
    }
}

fn lock_conn(inner: &Inner) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
    inner
        .conn
        .lock()
        .map_err(|_| PersistenceError::Task("connection lock poisoned".into()))
}

/// Server clock: wall time, but strictly after every stamp already issued
fn next_timestamp(conn: &Connection) -> Result<DateTime<Utc>, PersistenceError> {
    let last: Option<i64> = conn.query_row("SELECT MAX(created_at) FROM documents", [], |row| row.get(0))?;

    let now = Utc::now().timestamp_millis();
    let stamp = match last {
        Some(last) if last >= now => last + 1,
        _ => now,
    };

    Ok(DateTime::from_timestamp_millis(stamp).unwrap_or_else(Utc::now))
}

/// Shallow merge: top-level keys of `patch` overwrite those of `body`
fn merge_patch(body: &mut serde_json::Value, patch: serde_json::Value) {
    let serde_json::Value::Object(fields) = patch else {
        return;
    };

    match body {
        serde_json::Value::Object(existing) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        other => *other = serde_json::Value::Object(fields),
    }
}

/// Load every document in a collection, oldest first
fn load_snapshot(inner: &Inner, conn: &Connection, path: &CollectionPath) -> Result<Snapshot, PersistenceError> {
    let mut stmt = conn.prepare(
        "SELECT id, body_json FROM documents WHERE path = ?1 ORDER BY created_at, id",
    )?;

    let rows: Vec<(String, String)> = stmt
        .query_map(params![path.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    let mut projects = Vec::with_capacity(rows.len());
    for (id, body) in rows {
        match serde_json::from_str::<ProjectDocument>(&body) {
            Ok(doc) => projects.push(Project::from_document(ProjectId::from(id), doc)),
            Err(e) => warn!("Skipping unreadable document {}: {}", id, e),
        }
    }

    Ok(Snapshot {
        revision: inner.revision.fetch_add(1, Ordering::SeqCst) + 1,
        projects: projects.into(),
    })
}

/// Push a fresh snapshot to the collection's subscribers, if any
fn publish(inner: &Inner, conn: &Connection, path: &CollectionPath) {
    let Ok(mut watchers) = inner.watchers.lock() else {
        error!("Watcher registry poisoned; {} not published", path);
        return;
    };

    let Some(sender) = watchers.get(path) else {
        return;
    };

    if sender.receiver_count() == 0 {
        debug!("No subscribers left for {}", path);
        watchers.remove(path);
        return;
    }

    match load_snapshot(inner, conn, path) {
        Ok(snapshot) => {
            debug!("Publishing r{} ({} projects) to {}", snapshot.revision, snapshot.projects.len(), path);
            sender.send_replace(snapshot);
        }
        Err(e) => error!("Error loading projects for {}: {}", path, e),
    }
}

#[cfg(test)]
impl Gateway {
    /// Hold the connection lock on another thread for `hold`.
    /// Returns once the lock is taken.
    pub(crate) fn hold_connection(&self, hold: Duration) -> std::thread::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let (locked, wait) = std::sync::mpsc::channel();

        let handle = std::thread::spawn(move || {
            let _conn = inner.conn.lock().unwrap();
            locked.send(()).unwrap();
            std::thread::sleep(hold);
        });

        wait.recv().unwrap();
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cache::ProjectCache;
    use crate::state::data::{Category, CategoryTag, ImagePayload};
    use crate::state::query::{collage, Board, DEFAULT_COLLAGE_LIMIT};

    fn gateway() -> Gateway {
        Gateway::open_in_memory("crochet-tracker", Duration::from_secs(5)).unwrap()
    }

    async fn collection(gateway: &Gateway) -> ProjectCollection {
        let session = gateway.sign_in_anonymously().await.unwrap();
        gateway.collection(&session)
    }

    async fn add(projects: &ProjectCollection, draft: &ProjectDraft) -> ProjectId {
        let id = ProjectId::generate();
        projects.create(&id, draft).await.unwrap();
        id
    }

    fn draft(name: &str, category: Category) -> ProjectDraft {
        let mut draft = ProjectDraft::blank();
        draft.name = name.to_string();
        draft.category = category;
        draft
    }

    #[tokio::test]
    async fn test_sign_in_is_stable() {
        let gateway = gateway();
        let first = gateway.sign_in_anonymously().await.unwrap();
        let second = gateway.sign_in_anonymously().await.unwrap();
        assert_eq!(first, second);

        let path = gateway.collection(&first).path().to_string();
        assert_eq!(
            path,
            format!("artifacts/crochet-tracker/users/{}/projects", first.user_id())
        );
    }

    #[tokio::test]
    async fn test_sign_in_rejects_malformed_identity() {
        let gateway = gateway();
        {
            let conn = gateway.inner.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO identity (key, value) VALUES (?1, 'not-a-uuid')",
                params![IDENTITY_KEY],
            )
            .unwrap();
        }

        assert!(matches!(
            gateway.sign_in_anonymously().await,
            Err(AuthError::MalformedIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_create_stamps_monotonic_created_at() {
        let gateway = gateway();
        let projects = collection(&gateway).await;

        let first = add(&projects, &draft("Scarf", Category::Wishlist)).await;
        let second = add(&projects, &draft("Hat", Category::Wishlist)).await;
        assert_ne!(first, second);

        let mut sub = projects.subscribe().await.unwrap();
        let snapshot = sub.current();
        assert_eq!(snapshot.projects.len(), 2);

        let a = snapshot.projects.iter().find(|p| p.id == first).unwrap();
        let b = snapshot.projects.iter().find(|p| p.id == second).unwrap();
        assert!(a.created_at.unwrap() < b.created_at.unwrap());
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_created_at() {
        let gateway = gateway();
        let projects = collection(&gateway).await;

        let mut original = draft("Cardigan", Category::Wishlist);
        original.pattern = "Raglan".to_string();
        let id = add(&projects, &original).await;

        let mut sub = projects.subscribe().await.unwrap();
        let before = sub.current().projects[0].created_at;

        let patch = ProjectPatch {
            name: Some("Cozy cardigan".to_string()),
            category: Some(Category::InProgress),
            ..Default::default()
        };
        projects.update(&id, &patch).await.unwrap();

        let snapshot = sub.changed().await.unwrap();
        let project = &snapshot.projects[0];
        assert_eq!(project.name, "Cozy cardigan");
        assert_eq!(project.category, CategoryTag::Known(Category::InProgress));
        assert_eq!(project.pattern, "Raglan");
        assert_eq!(project.created_at, before);
    }

    #[tokio::test]
    async fn test_update_missing_project_fails() {
        let gateway = gateway();
        let projects = collection(&gateway).await;

        let result = projects
            .update(&ProjectId::from("ghost".to_string()), &ProjectPatch::default())
            .await;
        assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_subscription_receives_every_write() {
        let gateway = gateway();
        let projects = collection(&gateway).await;

        let mut sub = projects.subscribe().await.unwrap();
        let initial = sub.current();
        assert!(initial.projects.is_empty());

        let id = add(&projects, &draft("Blanket", Category::Finished)).await;
        let created = sub.changed().await.unwrap();
        assert_eq!(created.projects.len(), 1);
        assert!(created.revision > initial.revision);

        projects.delete(&id).await.unwrap();
        let deleted = sub.changed().await.unwrap();
        assert!(deleted.projects.is_empty());

        // Deleting again is harmless
        projects.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_documents_are_skipped() {
        let gateway = gateway();
        let projects = collection(&gateway).await;
        add(&projects, &draft("Good", Category::Wishlist)).await;

        {
            let conn = gateway.inner.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO documents (path, id, body_json, created_at) VALUES (?1, 'bad', '[1,2', NULL)",
                params![projects.path().as_str()],
            )
            .unwrap();
        }

        let mut sub = projects.subscribe().await.unwrap();
        let snapshot = sub.current();
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].name, "Good");
    }

    #[tokio::test]
    async fn test_delete_removes_from_board_and_collage_after_refresh() {
        let gateway = gateway();
        let projects = collection(&gateway).await;

        let mut finished = draft("Tote bag", Category::Finished);
        finished.append_images(vec![ImagePayload::from_jpeg(&[1, 2, 3])]);
        let id = add(&projects, &finished).await;

        let mut sub = projects.subscribe().await.unwrap();
        let mut cache = ProjectCache::new();
        cache.replace(sub.current()).unwrap();

        assert_eq!(Board::build(cache.projects(), "").finished.len(), 1);
        assert_eq!(collage(cache.projects(), true, DEFAULT_COLLAGE_LIMIT).len(), 1);

        projects.delete(&id).await.unwrap();

        // Nothing changes until the subscription delivers
        assert_eq!(cache.len(), 1);

        cache.replace(sub.changed().await.unwrap()).unwrap();
        let board = Board::build(cache.projects(), "");
        assert!(board.wishlist.is_empty() && board.in_progress.is_empty() && board.finished.is_empty());
        assert!(collage(cache.projects(), false, DEFAULT_COLLAGE_LIMIT).is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let gateway = gateway();
        let projects = collection(&gateway).await;
        let mut sub = projects.subscribe().await.unwrap();

        gateway.close();

        assert!(matches!(sub.changed().await, Err(PersistenceError::SubscriptionClosed)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_calls_time_out_while_connection_is_busy() {
        let gateway = Gateway::open_in_memory("crochet-tracker", Duration::from_millis(100)).unwrap();
        let projects = collection(&gateway).await;
        let id = add(&projects, &draft("Scarf", Category::Wishlist)).await;

        let holder = gateway.hold_connection(Duration::from_millis(1500));

        assert!(matches!(
            projects.create(&ProjectId::generate(), &draft("Hat", Category::Wishlist)).await,
            Err(PersistenceError::Timeout(_))
        ));
        assert!(matches!(
            projects.update(&id, &ProjectPatch::default()).await,
            Err(PersistenceError::Timeout(_))
        ));
        assert!(matches!(projects.delete(&id).await, Err(PersistenceError::Timeout(_))));
        assert!(matches!(projects.subscribe().await, Err(PersistenceError::Timeout(_))));

        holder.join().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sign_in_times_out_while_connection_is_busy() {
        let gateway = Gateway::open_in_memory("crochet-tracker", Duration::from_millis(100)).unwrap();
        let holder = gateway.hold_connection(Duration::from_millis(500));

        assert!(matches!(
            gateway.sign_in_anonymously().await,
            Err(AuthError::Timeout(_))
        ));

        holder.join().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_retried_after_timeout_stores_one_record() {
        let gateway = Gateway::open_in_memory("crochet-tracker", Duration::from_millis(100)).unwrap();
        let projects = collection(&gateway).await;
        let id = ProjectId::generate();
        let scarf = draft("Scarf", Category::Wishlist);

        let holder = gateway.hold_connection(Duration::from_millis(400));
        assert!(matches!(
            projects.create(&id, &scarf).await,
            Err(PersistenceError::Timeout(_))
        ));
        holder.join().unwrap();

        // The timed-out write may still land before or after the retry
        projects.create(&id, &scarf).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut sub = projects.subscribe().await.unwrap();
        let snapshot = sub.current();
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].id, id);
        assert_eq!(snapshot.projects[0].name, "Scarf");
    }

    #[tokio::test]
    async fn test_create_with_same_id_keeps_created_at() {
        let gateway = gateway();
        let projects = collection(&gateway).await;
        let id = ProjectId::generate();

        projects.create(&id, &draft("Mittens", Category::Wishlist)).await.unwrap();
        let mut sub = projects.subscribe().await.unwrap();
        let first = sub.current().projects[0].created_at;

        projects.create(&id, &draft("Mittens", Category::InProgress)).await.unwrap();
        let snapshot = sub.changed().await.unwrap();
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].created_at, first);
        assert_eq!(snapshot.projects[0].category, CategoryTag::Known(Category::InProgress));
    }

    #[test]
    fn test_merge_patch_overwrites_only_given_keys() {
        let mut body = serde_json::json!({"name": "Old", "yarn": "Wool", "createdAt": 5});
        merge_patch(&mut body, serde_json::json!({"name": "New"}));
        assert_eq!(body, serde_json::json!({"name": "New", "yarn": "Wool", "createdAt": 5}));
    }
}
