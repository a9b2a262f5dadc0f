// ==========================================
// 表格导入处理核心 - 命令行入口
// ==========================================
// 用法: tabular-import <文件> [MIME 类型] [导入器 ID]
// 初始化顺序: 日志 → 数据库与表结构 → 导入配置 → 处理上传
// ==========================================

use anyhow::{bail, Context};
use std::path::PathBuf;
use tabular_import::app::{get_default_db_path, AppState};
use tabular_import::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(file) = args.next() else {
        bail!("用法: tabular-import <文件> [MIME 类型] [导入器 ID]");
    };
    let file = PathBuf::from(file);
    let mime = args.next().unwrap_or_default();
    let importer_id = args.next().unwrap_or_else(|| "default".to_string());

    tracing::info!("==================================================");
    tracing::info!("表格导入处理核心 v{}", tabular_import::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).await.map_err(anyhow::Error::msg)?;

    // 上传处理结束后会删除暂存文件，这里先复制一份
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("无效的文件路径")?;
    let staged = std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), file_name));
    std::fs::copy(&file, &staged).with_context(|| format!("无法读取文件: {}", file.display()))?;

    let upload = state
        .upload_api
        .process_upload(&importer_id, &file_name, &mime, &staged)
        .await?;

    if let Some(error) = &upload.error {
        println!("上传 {} 无法导入: {}", upload.id, error);
        return Ok(());
    }

    println!("上传 {}: {} 行数据, {} 列", upload.id, upload.num_rows, upload.num_columns);
    for column in &upload.columns {
        println!("  [{}] {}  样例: {:?}", column.index, column.name, column.sample_data);
    }

    // 模板存在时给出映射建议
    match state.import_api.suggest_mapping(&upload.id).await {
        Ok(suggestions) => {
            println!("映射建议:");
            for s in suggestions {
                match s.suggestion {
                    Some(best) => println!("  {} → {} ({:.2})", s.name, best.template_column_id, best.score),
                    None => println!("  {} → (无)", s.name),
                }
            }
        }
        Err(e) => tracing::info!("跳过映射建议: {}", e),
    }

    Ok(())
}
