//! Schema rebuild and bulk load against a real PostgreSQL server
//!
//! # Running These Tests
//!
//! These tests require Docker to be running. Run with:
//!
//! ```bash
//! cargo test -p taxdb-loader --test load_integration_test -- --ignored --nocapture
//! ```

mod common;

use common::{
    count_rows, init_test_tracing, source_url, with_file, write_dump, zip_bytes, StaticTransport,
    TestPostgres, MINIMAL_DUMP,
};
use sqlx::Connection;
use taxdb_loader::ingest::ArchiveFetcher;
use taxdb_loader::load::BulkLoader;
use taxdb_loader::schema::{Schema, SchemaManager, ALL_TABLES};
use taxdb_loader::{LoaderError, PipelineOrchestrator, PipelineState, WorkingDirectory};
use tempfile::TempDir;

fn local_orchestrator(config: taxdb_loader::LoaderConfig) -> PipelineOrchestrator {
    // Never used: every test here provides local data
    let fetcher = ArchiveFetcher::with_transport(source_url(), Box::new(StaticTransport::new(Vec::new())));
    PipelineOrchestrator::with_fetcher(config, fetcher)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_minimal_dataset_round_trip() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = TempDir::new().unwrap();
    write_dump(dir.path(), MINIMAL_DUMP).unwrap();
    let config = pg.config("taxdb_round_trip", Some(dir.path().to_path_buf()));

    let outcome = local_orchestrator(config.clone())
        .run(WorkingDirectory::resolve(Some(dir.path())).unwrap())
        .await
        .expect("pipeline run");

    assert_eq!(outcome.state, PipelineState::Loaded);
    let report = outcome.report.expect("load report");
    for table in ["division", "gencode", "nodes", "names"] {
        assert_eq!(report.rows(table), Some(1), "{}", table);
    }
    for table in ["delnodes", "merged", "citations"] {
        assert_eq!(report.rows(table), Some(0), "{}", table);
    }

    let mut conn = pg.connect(&config).await.unwrap();
    for table in ["division", "gencode", "nodes", "names"] {
        assert_eq!(count_rows(&mut conn, table).await.unwrap(), 1, "{}", table);
    }
    let (name, class): (String, String) =
        sqlx::query_as("SELECT name_txt, name_class::TEXT FROM names WHERE tax_id = 1")
            .fetch_one(&mut conn)
            .await
            .unwrap();
    assert_eq!(name, "root");
    assert_eq!(class, "scientific name");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_orphan_name_rolls_back_everything() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = TempDir::new().unwrap();
    let files = with_file(MINIMAL_DUMP, "names.dmp", "2\t|\torphan\t|\t\t|\tsynonym\t|\n");
    write_dump(dir.path(), &files).unwrap();
    let config = pg.config("taxdb_rollback", Some(dir.path().to_path_buf()));

    let mut conn = SchemaManager::new(Schema::new(false))
        .rebuild(&config.database)
        .await
        .unwrap();
    let err = BulkLoader::new(config.load.clone())
        .load_all(&mut conn, dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, LoaderError::Load { table: "names", .. }));
    for table in ALL_TABLES {
        assert_eq!(count_rows(&mut conn, table.name).await.unwrap(), 0, "{}", table.name);
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_load_failure_marks_run_failed() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = TempDir::new().unwrap();
    let files = with_file(MINIMAL_DUMP, "nodes.dmp", "1\t|\t1\t|\tno rank\t|\n");
    write_dump(dir.path(), &files).unwrap();
    let config = pg.config("taxdb_malformed", Some(dir.path().to_path_buf()));

    let outcome = local_orchestrator(config.clone())
        .run(WorkingDirectory::resolve(Some(dir.path())).unwrap())
        .await
        .expect("load failures do not abort the run");

    assert_eq!(outcome.state, PipelineState::Failed);
    assert_eq!(outcome.exit_code(), 1);
    let mut conn = pg.connect(&config).await.unwrap();
    assert_eq!(count_rows(&mut conn, "division").await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rerun_is_idempotent() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = TempDir::new().unwrap();
    let files = with_file(MINIMAL_DUMP, "merged.dmp", "12\t|\t1\t|\n46\t|\t1\t|\n");
    write_dump(dir.path(), &files).unwrap();
    let config = pg.config("taxdb_idempotent", Some(dir.path().to_path_buf()));

    let mut reports = Vec::new();
    for _ in 0..2 {
        let outcome = local_orchestrator(config.clone())
            .run(WorkingDirectory::resolve(Some(dir.path())).unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.state, PipelineState::Loaded);
        reports.push(outcome.report.unwrap());
    }

    assert_eq!(reports[0], reports[1]);
    assert_eq!(reports[1].rows("merged"), Some(2));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_download_into_temporary_directory() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let config = pg.config("taxdb_downloaded", None);
    assert!(config.force_download);

    let transport = StaticTransport::new(zip_bytes(MINIMAL_DUMP).unwrap());
    let fetcher = ArchiveFetcher::with_transport(source_url(), Box::new(transport.clone()));
    let orchestrator = PipelineOrchestrator::with_fetcher(config.clone(), fetcher);

    let workdir = WorkingDirectory::resolve(None).unwrap();
    let path = workdir.path().to_path_buf();
    let outcome = orchestrator.run(workdir).await.unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(transport.calls(), 1);
    assert!(!path.exists());
    let mut conn = pg.connect(&config).await.unwrap();
    assert_eq!(count_rows(&mut conn, "nodes").await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_citations_defaults_and_join_table() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = TempDir::new().unwrap();
    let files = with_file(
        MINIMAL_DUMP,
        "citations.dmp",
        "7\t|\tSmith 2001\t|\t\t|\t\t|\t\t|\tA \"quoted\", comma\\title\t|\t1 9606 562 \t|\n",
    );
    write_dump(dir.path(), &files).unwrap();
    let config = pg.config_normalized("taxdb_citations", Some(dir.path().to_path_buf()));

    let outcome = local_orchestrator(config.clone())
        .run(WorkingDirectory::resolve(Some(dir.path())).unwrap())
        .await
        .unwrap();
    assert_eq!(outcome.state, PipelineState::Loaded);
    assert_eq!(outcome.report.as_ref().and_then(|r| r.rows("citation_taxa")), Some(3));

    let mut conn = pg.connect(&config).await.unwrap();
    let (pubmed, medline, text): (i64, i64, String) =
        sqlx::query_as("SELECT pubmed_id, medline_id, citation_text FROM citations WHERE cit_id = 7")
            .fetch_one(&mut conn)
            .await
            .unwrap();
    assert_eq!((pubmed, medline), (0, 0));
    assert_eq!(text, "A \"quoted\", comma\\title");

    let taxa: Vec<i64> =
        sqlx::query_scalar("SELECT tax_id FROM citation_taxa WHERE cit_id = 7 ORDER BY tax_id")
            .fetch_all(&mut conn)
            .await
            .unwrap();
    assert_eq!(taxa, vec![1, 562, 9606]);
    conn.close().await.unwrap();
}
