//! Integration tests for scan → assign → execute

mod helpers;

use helpers::{file_size, TestEnv};
use mangalib_common::db::Library;
use mangalib_import::db::{history, libraries};
use mangalib_import::models::{
    Destination, FileAction, FileStatus, ImportRecord, ImportSession, OperationStatus,
    OperationType, SeriesTarget,
};
use mangalib_import::services::file_ops::{DUPLICATES_DIR, OLD_FILES_DIR};
use mangalib_import::services::{
    assign_group, auto_match_all, parse_filename, ImportExecutor, ImportScanner, SeriesChoice,
};
use std::path::Path;

async fn scan_session(env: &TestEnv) -> ImportSession {
    let records = ImportScanner::new().scan(&env.import_root).unwrap();
    ImportSession::new(env.import_root.clone(), records)
}

#[tokio::test]
async fn test_auto_match_and_import_into_existing_series() {
    let env = TestEnv::new().await;
    let shonen = env.add_library("Shonen").await;
    let series_id = env.add_series(&shonen, "One Piece").await;
    env.write_import_file("OnePiece_Vol01.cbz", 100);
    env.write_import_file("OnePiece_Vol02.cbz", 120);

    let mut session = scan_session(&env).await;
    let groups = session.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].title, "OnePiece");
    assert_eq!(groups[0].indices.len(), 2);

    let index = libraries::load_library_index(&env.pool).await.unwrap();
    assert_eq!(auto_match_all(&mut session, &index).unwrap(), 2);
    for record in session.records() {
        let destination = record.destination.as_ref().unwrap();
        assert_eq!(destination.library_id, shonen.id);
        assert_eq!(destination.series.series_id(), Some(series_id));
    }

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(
            session.records(),
            &env.import_root,
            OperationType::SessionImport,
            false,
        )
        .await
        .unwrap();

    assert_eq!(outcome.counts.imported, 2);
    assert!(outcome.failures.is_empty());

    let series_dir = Path::new(&shonen.path).join("One Piece");
    assert!(series_dir.join("OnePiece_Vol01.cbz").is_file());
    assert!(series_dir.join("OnePiece_Vol02.cbz").is_file());
    assert!(!env.import_root.join("OnePiece_Vol01.cbz").exists());

    let operation = history::get_operation(&env.pool, outcome.operation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(operation.status, OperationStatus::Completed);
    assert_eq!(operation.operation_type, OperationType::SessionImport);
    assert_eq!(operation.files_processed, 2);
    assert_eq!(operation.files_imported, 2);
    assert!(operation.completed_at.is_some());

    let files = history::get_operation_files(&env.pool, outcome.operation_id)
        .await
        .unwrap();
    assert_eq!(files.len(), 2);
    assert!(files
        .iter()
        .all(|f| f.action == FileAction::Imported && f.status == FileStatus::Success));

    let series = libraries::list_series(&env.pool, shonen.id).await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].total_volumes, 2);
    assert_eq!(series[0].missing_volumes, "[]");
}

#[tokio::test]
async fn test_larger_incoming_file_replaces_existing() {
    let env = TestEnv::new().await;
    let seinen = env.add_library("Seinen").await;
    let series_id = env.add_series(&seinen, "Berserk").await;
    let old_path = env
        .add_volume(&seinen, series_id, "Berserk", "Berserk T01.cbz", 1, 100)
        .await;
    env.write_import_file("Berserk Tome 01.cbz", 150);

    let mut session = scan_session(&env).await;
    let index = libraries::load_library_index(&env.pool).await.unwrap();
    auto_match_all(&mut session, &index).unwrap();

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(
            session.records(),
            &env.import_root,
            OperationType::SessionImport,
            false,
        )
        .await
        .unwrap();

    assert_eq!(outcome.counts.replaced, 1);
    assert_eq!(outcome.files[0].action, FileAction::Replaced);

    let new_path = Path::new(&seinen.path).join("Berserk").join("Berserk Tome 01.cbz");
    assert_eq!(file_size(&new_path), 150);
    assert!(!old_path.exists());

    let displaced = env.import_root.join(OLD_FILES_DIR).join("Berserk T01.cbz");
    assert_eq!(file_size(&displaced), 100);

    // Old row gone, new row in place
    let rows = libraries::volumes_by_number(&env.pool, series_id, 1)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].filename, "Berserk Tome 01.cbz");
}

#[tokio::test]
async fn test_smaller_incoming_file_is_parked_as_duplicate() {
    let env = TestEnv::new().await;
    let seinen = env.add_library("Seinen").await;
    let series_id = env.add_series(&seinen, "Monster").await;
    let existing = env
        .add_volume(&seinen, series_id, "Monster", "Monster T03.cbz", 3, 200)
        .await;
    env.write_import_file("Monster T03.cbz", 100);

    let mut session = scan_session(&env).await;
    let index = libraries::load_library_index(&env.pool).await.unwrap();
    auto_match_all(&mut session, &index).unwrap();

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(
            session.records(),
            &env.import_root,
            OperationType::SessionImport,
            false,
        )
        .await
        .unwrap();

    assert_eq!(outcome.counts.skipped, 1);
    assert_eq!(file_size(&existing), 200);

    let parked = env.import_root.join(DUPLICATES_DIR).join("Monster T03.cbz");
    assert_eq!(file_size(&parked), 100);
    assert_eq!(
        outcome.files[0].destination_path,
        parked.to_string_lossy().into_owned()
    );
    assert_eq!(env.volume_count(series_id).await, 1);
}

#[tokio::test]
async fn test_equal_size_is_skipped_and_holding_collision_keeps_both() {
    let env = TestEnv::new().await;
    let seinen = env.add_library("Seinen").await;
    let series_id = env.add_series(&seinen, "Monster").await;
    env.add_volume(&seinen, series_id, "Monster", "Monster T05.cbz", 5, 100)
        .await;

    // An earlier duplicate with the same name is already parked
    let earlier = env.write_import_file(&format!("{}/Monster T05.cbz", DUPLICATES_DIR), 42);
    env.write_import_file("Monster T05.cbz", 100);

    let mut session = scan_session(&env).await;
    assert_eq!(session.len(), 1, "holding areas are not scanned");
    let index = libraries::load_library_index(&env.pool).await.unwrap();
    auto_match_all(&mut session, &index).unwrap();

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(
            session.records(),
            &env.import_root,
            OperationType::SessionImport,
            false,
        )
        .await
        .unwrap();

    assert_eq!(outcome.counts.skipped, 1);
    assert_eq!(file_size(&earlier), 42);

    let parked = Path::new(&outcome.files[0].destination_path);
    assert_ne!(parked, earlier.as_path());
    assert_eq!(file_size(parked), 100);
}

#[tokio::test]
async fn test_unassigned_and_escaping_records_fail_without_stopping_batch() {
    let env = TestEnv::new().await;
    let shonen = env.add_library("Shonen").await;
    let series_id = env.add_series(&shonen, "Naruto").await;
    env.write_import_file("Naruto T01.cbz", 10);
    env.write_import_file("Unknown Thing 01.cbz", 10);

    let mut session = scan_session(&env).await;
    let index = libraries::load_library_index(&env.pool).await.unwrap();
    assert_eq!(auto_match_all(&mut session, &index).unwrap(), 1);

    let mut records = session.into_records();
    let mut escaping = ImportRecord::new(
        "escape.cbz".to_string(),
        "../escape.cbz".to_string(),
        10,
        parse_filename("escape.cbz"),
    );
    escaping.destination = records
        .iter()
        .find_map(|r| r.destination.clone());
    records.push(escaping);

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(&records, &env.import_root, OperationType::ManualImport, false)
        .await
        .unwrap();

    assert_eq!(outcome.counts.imported, 1);
    assert_eq!(outcome.counts.failed, 2);
    assert_eq!(outcome.counts.processed(), 3);

    let errors: Vec<&str> = outcome.failures.iter().map(|f| f.error.as_str()).collect();
    assert!(errors.contains(&"No destination assigned"));
    assert!(errors.contains(&"Invalid relative path"));

    // Every file of the batch is journaled
    let files = history::get_operation_files(&env.pool, outcome.operation_id)
        .await
        .unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(
        files
            .iter()
            .filter(|f| f.action == FileAction::Failed && f.status == FileStatus::Error)
            .count(),
        2
    );
    assert_eq!(env.volume_count(series_id).await, 1);
}

#[tokio::test]
async fn test_new_series_created_once_per_group() {
    let env = TestEnv::new().await;
    let shonen = env.add_library("Shonen").await;
    env.write_import_file("Dandadan T01.cbz", 10);
    env.write_import_file("Dandadan T02.cbz", 10);
    env.write_import_file("Dandadan T04.cbz", 10);

    let mut session = scan_session(&env).await;
    let index = libraries::load_library_index(&env.pool).await.unwrap();
    assert_eq!(auto_match_all(&mut session, &index).unwrap(), 0);

    let assigned = assign_group(
        &mut session,
        &index,
        "Dandadan",
        shonen.id,
        &SeriesChoice::Named("Dandadan".to_string()),
    )
    .unwrap();
    assert_eq!(assigned, 3);
    assert!(session
        .records()
        .iter()
        .all(|r| r.destination.as_ref().unwrap().series.is_new()));

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(
            session.records(),
            &env.import_root,
            OperationType::SessionImport,
            false,
        )
        .await
        .unwrap();
    assert_eq!(outcome.counts.imported, 3);

    let series = libraries::list_series(&env.pool, shonen.id).await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].title, "Dandadan");
    assert_eq!(series[0].total_volumes, 3);
    assert_eq!(series[0].missing_volumes, "[3]");

    let ids: Vec<Option<i64>> = outcome.files.iter().map(|f| f.series_id).collect();
    assert!(ids.iter().all(|id| *id == Some(series[0].id)));
}

#[tokio::test]
async fn test_cleanup_after_import_removes_emptied_directories() {
    let env = TestEnv::new().await;
    let shonen = env.add_library("Shonen").await;
    env.add_series(&shonen, "Bleach").await;
    env.write_import_file("batch 1/Bleach Tome 7.cbz", 10);
    env.write_import_file("batch 1/extras/Bleach Tome 8.cbz", 10);

    let mut session = scan_session(&env).await;
    let index = libraries::load_library_index(&env.pool).await.unwrap();
    assert_eq!(auto_match_all(&mut session, &index).unwrap(), 2);

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(
            session.records(),
            &env.import_root,
            OperationType::SessionImport,
            true,
        )
        .await
        .unwrap();

    assert_eq!(outcome.counts.imported, 2);
    assert_eq!(outcome.cleaned_directories, 2);
    assert!(!env.import_root.join("batch 1").exists());
    assert!(env.import_root.is_dir());
}

#[tokio::test]
async fn test_missing_import_root_is_rejected_before_journaling() {
    let env = TestEnv::new().await;
    let missing = env.dir.path().join("nowhere");

    let result = ImportExecutor::new(env.pool.clone())
        .execute(&[], &missing, OperationType::ManualImport, false)
        .await;

    assert!(result.is_err());
    assert!(history::list_operations(&env.pool, 10)
        .await
        .unwrap()
        .is_empty());
}

fn existing_destination(library: &Library, series_id: i64, title: &str) -> Destination {
    Destination {
        library_id: library.id,
        library_name: library.name.clone(),
        library_path: library.path.clone(),
        series: SeriesTarget::Existing {
            series_id,
            series_title: title.to_string(),
        },
    }
}

#[tokio::test]
async fn test_series_outside_destination_library_fails_before_moving() {
    let env = TestEnv::new().await;
    let shonen = env.add_library("Shonen").await;
    let seinen = env.add_library("Seinen").await;
    let berserk = env.add_series(&seinen, "Berserk").await;
    let berserk_file = env.write_import_file("Berserk T01.cbz", 10);
    let ghost_file = env.write_import_file("Ghost T01.cbz", 10);

    let mut records = scan_session(&env).await.into_records();
    records[0].destination = Some(existing_destination(&shonen, berserk, "Berserk"));
    records[1].destination = Some(existing_destination(&shonen, 9999, "Ghost"));

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(&records, &env.import_root, OperationType::ManualImport, false)
        .await
        .unwrap();

    assert_eq!(outcome.counts.failed, 2);
    assert!(berserk_file.is_file());
    assert!(ghost_file.is_file());
    assert!(!Path::new(&shonen.path).join("Berserk").exists());
    assert!(!Path::new(&shonen.path).join("Ghost").exists());

    let files = history::get_operation_files(&env.pool, outcome.operation_id)
        .await
        .unwrap();
    assert!(files
        .iter()
        .all(|f| f.action == FileAction::Failed && f.message.starts_with("Series not found")));
    assert_eq!(env.volume_count(berserk).await, 0);
}

#[tokio::test]
async fn test_index_failure_after_move_is_journaled_as_moved() {
    let env = TestEnv::new().await;
    let shonen = env.add_library("Shonen").await;
    let naruto = env.add_series(&shonen, "Naruto").await;
    env.write_import_file("Naruto Special.cbz", 10);

    let mut records = scan_session(&env).await.into_records();
    assert_eq!(records[0].parsed.volume, None);
    records[0].destination = Some(existing_destination(&shonen, naruto, "Naruto"));

    // Volume rows can no longer be written once the file is in place
    sqlx::query("DROP TABLE volumes")
        .execute(&env.pool)
        .await
        .unwrap();

    let outcome = ImportExecutor::new(env.pool.clone())
        .execute(&records, &env.import_root, OperationType::ManualImport, false)
        .await
        .unwrap();

    let landed = Path::new(&shonen.path).join("Naruto").join("Naruto Special.cbz");
    assert!(landed.is_file());
    assert_eq!(outcome.counts.imported, 1);

    let files = history::get_operation_files(&env.pool, outcome.operation_id)
        .await
        .unwrap();
    assert_eq!(files[0].action, FileAction::Imported);
    assert_eq!(files[0].status, FileStatus::Success);
    assert_eq!(files[0].destination_path, landed.to_string_lossy());
    assert!(files[0].message.contains("volume rows not updated"));
}
