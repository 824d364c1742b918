use course_core::model::{ClassId, CourseId, DraftSet};
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_kv_roundtrip_and_overwrite() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.get("missing").await.unwrap().is_none());

    repo.set("greeting", "hello").await.unwrap();
    repo.set("greeting", "hello again").await.unwrap();
    assert_eq!(
        repo.get("greeting").await.unwrap().as_deref(),
        Some("hello again")
    );
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn drafts_survive_reopening_storage() {
    let url = "sqlite:file:memdb_drafts_reopen?mode=memory&cache=shared";
    // Keep one connection alive so the shared in-memory database persists.
    let keeper = SqliteRepository::connect(url).await.expect("connect");
    keeper.migrate().await.expect("migrate");

    let course = CourseId::new("course-1").unwrap();
    let class = ClassId::new("class-3").unwrap();

    let first = Storage::sqlite(url).await.expect("storage");
    let mut drafts = DraftSet::new();
    drafts.set(0, "Today I practiced for ten minutes.");
    drafts.set(1, "short");
    first.drafts.save(&course, &class, &drafts).await.unwrap();

    let second = Storage::sqlite(url).await.expect("storage");
    let loaded = second.drafts.load(&course, &class).await.unwrap();
    assert_eq!(loaded, drafts);
    assert_eq!(loaded.qualifying(2, 20), vec![0]);

    let raw = keeper
        .get("writing_responses_course-1_class-3")
        .await
        .unwrap()
        .expect("draft entry");
    assert!(raw.starts_with('{'));
}
