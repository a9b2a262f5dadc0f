// ==========================================
// 表格导入处理核心 - 上传扫描
// ==========================================
// 流程:
// 1. 第一行作为表头 → 生成 UploadColumn（序号从 0 开始）
// 2. 数据行: 超出表头宽度的单元格截断并告警；不足补空串
// 3. 前 sample_size 行的值作为各列样例
// 4. 每行（含表头，row_index 0）经批量写入器落入行存储
// 5. 行级解析错误跳过，row_index 只对成功读取的行连续编号
// ==========================================

use crate::domain::{RowMutation, UploadColumn, UploadRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RowReader;
use crate::writer::RowSink;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 扫描结果（只在成功时产生）
#[derive(Debug, Clone)]
pub struct ScannedUpload {
    pub columns: Vec<UploadColumn>,
    /// 数据行数（不含表头）
    pub num_rows: i64,
    /// 解析失败被跳过的行数
    pub skipped_rows: usize,
}

pub struct UploadParser {
    sample_size: usize,
}

impl UploadParser {
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    /// 扫描整张表并写入上传行
    ///
    /// # 返回
    /// - Err(NoRows): 没有任何可读行
    /// - Err(NoColumns): 表头没有列
    /// - Err(OnlyOneRow): 只有表头
    ///
    /// 失败时调用方不得持久化任何列；已提交的上传行由调用方决定是否保留
    pub async fn scan(
        &self,
        upload_id: &str,
        reader: &mut dyn RowReader,
        sink: &mut RowSink,
    ) -> ImportResult<ScannedUpload> {
        let mut columns: Option<Vec<UploadColumn>> = None;
        let mut num_rows: i64 = 0;
        let mut skipped_rows = 0usize;
        let mut next_index: i64 = 0;

        while let Some(result) = reader.next_row() {
            let mut cells = match result {
                Ok(cells) => cells,
                Err(e) => {
                    skipped_rows += 1;
                    warn!(upload_id, error = %e, "行解析失败，已跳过");
                    continue;
                }
            };

            let row_index = next_index;
            next_index += 1;

            if columns.is_none() {
                let header = build_columns(upload_id, &cells);
                if header.is_empty() {
                    // 表头为空时不再读取数据行
                    reader.close();
                    return Err(ImportError::NoColumns);
                }
                let values = header.iter().map(|c| (c.index, c.name.clone())).collect();
                columns = Some(header);
                sink.push(upload_row(upload_id, row_index, values)).await?;
                continue;
            }
            let Some(columns) = columns.as_mut() else {
                continue;
            };

            let width = columns.len();
            if cells.len() > width {
                warn!(
                    upload_id,
                    row_index,
                    cells = cells.len(),
                    columns = width,
                    "数据行单元格多于表头列数，超出部分已丢弃"
                );
                cells.truncate(width);
            }
            cells.resize(width, String::new());

            if (num_rows as usize) < self.sample_size {
                for (column, value) in columns.iter_mut().zip(cells.iter()) {
                    column.sample_data.push(value.clone());
                }
            }

            let values = cells
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i as u32, v))
                .collect();
            sink.push(upload_row(upload_id, row_index, values)).await?;
            num_rows += 1;
        }
        reader.close();

        let columns = columns.ok_or(ImportError::NoRows)?;
        if num_rows == 0 {
            return Err(ImportError::OnlyOneRow);
        }

        debug!(upload_id, num_rows, num_columns = columns.len(), skipped_rows, "上传扫描完成");
        Ok(ScannedUpload {
            columns,
            num_rows,
            skipped_rows,
        })
    }
}

fn build_columns(upload_id: &str, header: &[String]) -> Vec<UploadColumn> {
    header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            // 去除 UTF-8 BOM
            let name = if i == 0 { name.trim_start_matches('\u{feff}') } else { name };
            UploadColumn::new(upload_id, name.trim(), i as u32)
        })
        .collect()
}

fn upload_row(upload_id: &str, row_index: i64, values: BTreeMap<u32, String>) -> RowMutation {
    RowMutation::Upload(UploadRow {
        upload_id: upload_id.to_string(),
        row_index,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::repository::{RowStore, SqliteRowStore};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// 内存行读取器
    struct VecReader {
        rows: std::vec::IntoIter<ImportResult<Vec<String>>>,
    }

    impl VecReader {
        fn new(rows: Vec<ImportResult<Vec<&str>>>) -> Self {
            let rows: Vec<ImportResult<Vec<String>>> = rows
                .into_iter()
                .map(|r| r.map(|cells| cells.into_iter().map(str::to_string).collect()))
                .collect();
            Self { rows: rows.into_iter() }
        }
    }

    impl RowReader for VecReader {
        fn next_row(&mut self) -> Option<ImportResult<Vec<String>>> {
            self.rows.next()
        }
    }

    fn setup() -> (NamedTempFile, Arc<SqliteRowStore>, RowSink) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = Arc::new(SqliteRowStore::new(temp_file.path().to_str().unwrap()).unwrap());
        let sink = RowSink::start(store.clone(), &ImportConfig::default());
        (temp_file, store, sink)
    }

    #[tokio::test]
    async fn test_scan_columns_samples_and_rows() {
        let (_tmp, store, mut sink) = setup();
        let mut reader = VecReader::new(vec![
            Ok(vec!["\u{feff}First Name", " Email "]),
            Ok(vec!["Amy", "amy@x.com"]),
            Ok(vec!["Bob"]),
            Err(ImportError::CsvParseError("bad".to_string())),
            Ok(vec!["Cat", "cat@x.com", "overflow"]),
            Ok(vec!["Dan", "dan@x.com"]),
        ]);

        let scanned = UploadParser::new(3).scan("u1", &mut reader, &mut sink).await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(scanned.num_rows, 4);
        assert_eq!(scanned.skipped_rows, 1);
        assert_eq!(scanned.columns.len(), 2);
        assert_eq!(scanned.columns[0].name, "First Name");
        assert_eq!(scanned.columns[1].name, "Email");
        assert_eq!(scanned.columns[1].index, 1);
        assert_eq!(scanned.columns[0].sample_data, vec!["Amy", "Bob", "Cat"]);
        assert_eq!(scanned.columns[1].sample_data, vec!["amy@x.com", "", "cat@x.com"]);

        let rows = store.page_upload_rows("u1", 0, 100).await.unwrap();
        let indices: Vec<i64> = rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(rows[0].cell(0), "First Name");
        assert_eq!(rows[2].cell(1), "");
        assert_eq!(rows[3].values.len(), 2);
        assert_eq!(rows[4].cell(0), "Dan");
    }

    #[tokio::test]
    async fn test_terminal_states() {
        let (_tmp, store, mut sink) = setup();
        let parser = UploadParser::new(3);

        let mut empty = VecReader::new(vec![]);
        assert!(matches!(
            parser.scan("u1", &mut empty, &mut sink).await,
            Err(ImportError::NoRows)
        ));

        let mut header_only = VecReader::new(vec![Ok(vec!["a", "b"])]);
        assert!(matches!(
            parser.scan("u2", &mut header_only, &mut sink).await,
            Err(ImportError::OnlyOneRow)
        ));

        let mut no_columns = VecReader::new(vec![Ok(vec![]), Ok(vec!["x"]), Ok(vec!["y"])]);
        assert!(matches!(
            parser.scan("u3", &mut no_columns, &mut sink).await,
            Err(ImportError::NoColumns)
        ));

        sink.finish().await.unwrap();
        // 表头为空时数据行不落库
        assert!(store.page_upload_rows("u3", 0, 100).await.unwrap().is_empty());
    }
}
