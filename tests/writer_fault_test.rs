// ==========================================
// 行存储故障注入测试
// ==========================================
// 覆盖: 批次重试成功、重试耗尽后丢弃（导入仍为 STORED，标记 degraded）

use std::sync::Arc;
use tabular_import::api::{ImportApi, TemplateApi, UploadApi};
use tabular_import::domain::ImportStatus;
use tabular_import::logging;
use tabular_import::repository::{MetadataStore, RowStore};

use test_helpers::{
    create_test_db, open_stores, seed_contacts_template, stage_file, test_config, FaultyRowStore,
};

const CSV: &str = "First Name,Email,Plan\n\
Amy,amy@x.com,Pro\n\
Bob,bob@x.com,Basic\n\
Cara,cara@x.com,Pro\n\
Dan,dan@x.com,Basic\n\
Eve,eve@x.com,Pro\n\
Fay,fay@x.com,Basic\n";

/// 上传并按建议映射，返回 upload_id
async fn prepare_upload(metadata: Arc<dyn MetadataStore>, rows: Arc<dyn RowStore>) -> (String, ImportApi) {
    let template_api = TemplateApi::new(metadata.clone());
    seed_contacts_template(&template_api, "contacts").await;

    let upload_api = UploadApi::new(metadata.clone(), rows.clone(), test_config());
    let upload = upload_api
        .process_upload("contacts", "c.csv", "text/csv", &stage_file(CSV.as_bytes(), ".csv"))
        .await
        .unwrap();
    assert_eq!(upload.num_rows, 6);

    let import_api = ImportApi::new(metadata, rows, test_config());
    for s in import_api.suggest_mapping(&upload.id).await.unwrap() {
        let best = s.suggestion.unwrap();
        import_api
            .set_mapping(&upload.id, &s.upload_column_id, &best.template_column_id)
            .await
            .unwrap();
    }
    (upload.id, import_api)
}

#[tokio::test]
async fn test_transient_write_failure_is_retried() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, sqlite_rows) = open_stores(&db_path);
    let faulty = Arc::new(FaultyRowStore::new(sqlite_rows, 1));

    let (upload_id, import_api) = prepare_upload(metadata, faulty.clone()).await;
    let import = import_api.start_import(&upload_id).await.unwrap();

    assert_eq!(import.status, ImportStatus::Stored);
    assert!(!import.degraded);
    assert_eq!(import.dropped_rows, 0);
    assert_eq!(import.num_valid_rows, 6);

    // 6 行 / 每批 4 行 = 2 批，外加 1 次失败尝试
    assert_eq!(faulty.import_attempts(), 3);
    let results = import_api.page_import_rows(&import.id, 0, 100).await.unwrap();
    assert_eq!(results.len(), 6);
}

#[tokio::test]
async fn test_exhausted_retries_drop_batches_and_mark_degraded() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, sqlite_rows) = open_stores(&db_path);
    let faulty = Arc::new(FaultyRowStore::new(sqlite_rows, usize::MAX));

    let (upload_id, import_api) = prepare_upload(metadata, faulty.clone()).await;
    let import = import_api.start_import(&upload_id).await.unwrap();

    // 行级写入失败不会让导入失败
    assert_eq!(import.status, ImportStatus::Stored);
    assert!(import.degraded);
    assert_eq!(import.dropped_rows, 6);
    // 计数按已尝试的行统计
    assert_eq!(import.num_rows, 6);
    assert_eq!(import.num_valid_rows, 6);

    // 2 批 × 2 次尝试
    assert_eq!(faulty.import_attempts(), 4);
    assert!(import_api.page_import_rows(&import.id, 0, 100).await.unwrap().is_empty());

    let reloaded = import_api.get_import(&import.id).await.unwrap();
    assert!(reloaded.degraded);
    assert_eq!(reloaded.dropped_rows, 6);
}
