// ==========================================
// 上传 → 映射 → 导入 端到端测试
// ==========================================
// 模拟宿主程序调用 API 的完整流程

use serde_json::json;
use tabular_import::api::{ImportApi, NewColumn, TemplateApi, UploadApi};
use tabular_import::domain::{DataType, ImportStatus, StoredImportRow};
use tabular_import::importer::MappingError;
use tabular_import::logging;
use tabular_import::ApiError;

use test_helpers::{
    create_test_db, open_stores, rule, seed_contacts_template, stage_file, test_config,
};

const CONTACTS_CSV: &str = "First Name,Email,Plan,Notes\n\
Amy,amy@x.com, pro ,vip\n\
,not-an-email,Basic,\n\
Bob,bob@x.com,basic,\n\
Cara,cara@x.com,Gold,\n\
Dan,dan@x.com,,\n";

#[tokio::test]
async fn test_csv_import_full_flow() {
    logging::init_test();

    // 步骤 1: 数据库与 API
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, rows) = open_stores(&db_path);
    let template_api = TemplateApi::new(metadata.clone());
    let upload_api = UploadApi::new(metadata.clone(), rows.clone(), test_config());
    let import_api = ImportApi::new(metadata.clone(), rows.clone(), test_config());

    let template = seed_contacts_template(&template_api, "contacts").await;

    // 步骤 2: 上传
    let staged = stage_file(CONTACTS_CSV.as_bytes(), ".csv");
    let upload = upload_api
        .process_upload("contacts", "contacts.csv", "text/csv", &staged)
        .await
        .unwrap();

    assert!(upload.error.is_none());
    assert!(upload.parsed && upload.stored);
    assert_eq!(upload.num_rows, 5);
    assert_eq!(upload.num_columns, 4);
    assert_eq!(upload.columns[0].sample_data, vec!["Amy", "", "Bob"]);
    assert!(!staged.exists(), "暂存文件应被删除");

    // 步骤 3: 映射建议并应用
    let suggestions = import_api.suggest_mapping(&upload.id).await.unwrap();
    assert_eq!(suggestions.len(), 4);
    assert!(suggestions[3].suggestion.is_none(), "Notes 不应有建议");

    for s in &suggestions {
        if let Some(best) = &s.suggestion {
            import_api
                .set_mapping(&upload.id, &s.upload_column_id, &best.template_column_id)
                .await
                .unwrap();
        }
    }
    let mapped = metadata.get_upload(&upload.id).await.unwrap();
    let first_name_id = &template.column_by_key("first_name").unwrap().id;
    assert_eq!(mapped.columns[0].template_column_id.as_ref(), Some(first_name_id));
    assert!(import_api.check_mapping(&upload.id).await.unwrap().is_empty());

    // 步骤 4: 导入
    let import = import_api.start_import(&upload.id).await.unwrap();

    assert_eq!(import.status, ImportStatus::Stored);
    assert_eq!(import.num_rows, 5);
    assert_eq!(import.num_columns, 3);
    assert_eq!(import.num_valid_rows, 2);
    assert_eq!(import.num_error_rows, 3);
    assert_eq!(import.num_processed_values, 15);
    assert!(!import.degraded);
    assert_eq!(import.dropped_rows, 0);

    let reloaded = import_api.get_import(&import.id).await.unwrap();
    assert_eq!(reloaded.status, ImportStatus::Stored);
    assert_eq!(reloaded.num_valid_rows, 2);

    // 步骤 5: 读取结果
    let results = import_api.page_import_rows(&import.id, 0, 100).await.unwrap();
    let indexes: Vec<i64> = results.iter().map(|r| r.row_index()).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);

    match &results[0] {
        StoredImportRow::Valid(row) => {
            assert_eq!(row.values["first_name"], "Amy");
            assert_eq!(row.values["plan"], "Pro");
            assert!(!row.values.contains_key("notes"));
            assert_eq!(row.values.len(), 3);
        }
        other => panic!("第 0 行应为有效行: {:?}", other),
    }
    match &results[1] {
        StoredImportRow::Invalid(row) => {
            assert!(row.errors.contains_key("first_name"));
            assert!(row.errors.contains_key("email"));
            assert!(!row.errors.contains_key("plan"));
            assert_eq!(row.values["email"], "not-an-email");
        }
        other => panic!("第 1 行应为错误行: {:?}", other),
    }
    match &results[3] {
        StoredImportRow::Invalid(row) => {
            assert_eq!(row.values["plan"], "Gold");
            assert_eq!(row.errors.len(), 1);
        }
        other => panic!("第 3 行应为错误行: {:?}", other),
    }
    assert_eq!(results[2].values()["plan"], "Basic");

    // 分页从中间开始
    let tail = import_api.page_import_rows(&import.id, 3, 100).await.unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].row_index(), 3);
}

#[tokio::test]
async fn test_import_rejected_when_required_column_unmapped() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, rows) = open_stores(&db_path);
    let template_api = TemplateApi::new(metadata.clone());
    let upload_api = UploadApi::new(metadata.clone(), rows.clone(), test_config());
    let import_api = ImportApi::new(metadata.clone(), rows.clone(), test_config());

    let template = seed_contacts_template(&template_api, "contacts").await;
    let staged = stage_file(CONTACTS_CSV.as_bytes(), ".csv");
    let upload = upload_api
        .process_upload("contacts", "contacts.csv", "text/csv", &staged)
        .await
        .unwrap();

    // 只映射 Email，必填 first_name 未映射
    let email_id = template.column_by_key("email").unwrap().id.clone();
    import_api
        .set_mapping(&upload.id, &upload.columns[1].id, &email_id)
        .await
        .unwrap();

    let result = import_api.start_import(&upload.id).await;
    assert!(matches!(
        result,
        Err(ApiError::InvalidMapping(MappingError::RequiredColumnUnmapped { ref key })) if key == "first_name"
    ));

    // 两个源列映射到同一目标
    import_api
        .set_mapping(&upload.id, &upload.columns[0].id, &email_id)
        .await
        .unwrap();
    let problems = import_api.check_mapping(&upload.id).await.unwrap();
    assert!(problems
        .iter()
        .any(|p| matches!(p, MappingError::DuplicateTarget { key, .. } if key == "email")));

    // 清除后不再重复
    import_api.clear_mapping(&upload.columns[0].id).await.unwrap();
    let problems = import_api.check_mapping(&upload.id).await.unwrap();
    assert!(!problems.iter().any(|p| matches!(p, MappingError::DuplicateTarget { .. })));
}

#[tokio::test]
async fn test_set_mapping_rejects_foreign_template_column() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, rows) = open_stores(&db_path);
    let template_api = TemplateApi::new(metadata.clone());
    let upload_api = UploadApi::new(metadata.clone(), rows.clone(), test_config());
    let import_api = ImportApi::new(metadata.clone(), rows, test_config());

    seed_contacts_template(&template_api, "contacts").await;
    let other = seed_contacts_template(&template_api, "leads").await;

    let staged = stage_file(CONTACTS_CSV.as_bytes(), ".csv");
    let upload = upload_api
        .process_upload("contacts", "contacts.csv", "text/csv", &staged)
        .await
        .unwrap();

    let foreign_id = other.column_by_key("email").unwrap().id.clone();
    let result = import_api
        .set_mapping(&upload.id, &upload.columns[1].id, &foreign_id)
        .await;
    assert!(matches!(
        result,
        Err(ApiError::InvalidMapping(MappingError::UnknownTemplateColumn { .. }))
    ));
}

#[tokio::test]
async fn test_page_size_bounds_checked() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, rows) = open_stores(&db_path);
    let import_api = ImportApi::new(metadata, rows, test_config());

    assert!(matches!(
        import_api.page_import_rows("i1", 0, 10_001).await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        import_api.page_import_rows("i1", 0, 0).await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(import_api.page_import_rows("i1", 0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_of_missing_upload_is_not_found() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, rows) = open_stores(&db_path);
    let import_api = ImportApi::new(metadata, rows, test_config());

    let result = import_api.start_import("no-such-upload").await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_unruled_column_and_not_blank_email_flow() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().unwrap();
    let (metadata, rows) = open_stores(&db_path);
    let template_api = TemplateApi::new(metadata.clone());
    let upload_api = UploadApi::new(metadata.clone(), rows.clone(), test_config());
    let import_api = ImportApi::new(metadata, rows, test_config());

    // first_name 无规则；email 先 not_blank 后 email
    template_api.create_template("people", "People").await.unwrap();
    let first_name = template_api
        .add_column(
            "people",
            NewColumn {
                key: "first_name".to_string(),
                name: "First Name".to_string(),
                required: false,
                data_type: DataType::String,
            },
        )
        .await
        .unwrap();
    let email = template_api
        .add_column(
            "people",
            NewColumn {
                key: "email".to_string(),
                name: "Email".to_string(),
                required: false,
                data_type: DataType::String,
            },
        )
        .await
        .unwrap();
    template_api
        .add_validation("people", &email.id, rule("not_blank", json!(null)))
        .await
        .unwrap();
    let email_rule = template_api
        .add_validation("people", &email.id, rule("email", json!(null)))
        .await
        .unwrap();

    let staged = stage_file(b"first,email\nAmy,amy@x.com\n,not-an-email\n", ".csv");
    let upload = upload_api
        .process_upload("people", "people.csv", "text/csv", &staged)
        .await
        .unwrap();
    import_api
        .set_mapping(&upload.id, &upload.columns[0].id, &first_name.id)
        .await
        .unwrap();
    import_api
        .set_mapping(&upload.id, &upload.columns[1].id, &email.id)
        .await
        .unwrap();

    let import = import_api.start_import(&upload.id).await.unwrap();
    assert_eq!(import.status, ImportStatus::Stored);
    assert_eq!(import.num_rows, 2);
    assert_eq!(import.num_valid_rows, 1);
    assert_eq!(import.num_error_rows, 1);
    assert_eq!(import.num_processed_values, 4);

    let results = import_api.page_import_rows(&import.id, 0, 10).await.unwrap();
    match &results[0] {
        StoredImportRow::Valid(row) => {
            assert_eq!(row.values["first_name"], "Amy");
            assert_eq!(row.values["email"], "amy@x.com");
        }
        other => panic!("第 0 行应为有效行: {:?}", other),
    }
    match &results[1] {
        StoredImportRow::Invalid(row) => {
            // 空的 first_name 无规则，不产生错误项
            assert_eq!(row.values["first_name"], "");
            assert!(!row.errors.contains_key("first_name"));
            assert_eq!(row.errors["email"], vec![email_rule.id]);
        }
        other => panic!("第 1 行应为错误行: {:?}", other),
    }
}
