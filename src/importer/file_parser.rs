// ==========================================
// 表格导入处理核心 - 行读取器
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx/.xls，取第一个工作表)
// 单元格保留原始文本，不做 trim（由规则自行决定是否忽略空白）
// ==========================================

use crate::domain::FileFormat;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::path::Path;

/// 逐行读取表格数据
pub trait RowReader: Send {
    /// 读取下一行
    ///
    /// # 返回
    /// - None: 数据结束
    /// - Some(Err): 该行解析失败（调用方可跳过继续）
    fn next_row(&mut self) -> Option<ImportResult<Vec<String>>>;

    /// 释放底层资源
    fn close(&mut self) {}
}

// ==========================================
// CSV Reader 实现
// ==========================================
pub struct CsvRowReader {
    records: Option<StringRecordsIntoIter<File>>,
}

impl CsvRowReader {
    pub fn open(path: &Path) -> ImportResult<Self> {
        let file = File::open(path)?;
        let reader = ReaderBuilder::new()
            .has_headers(false) // 表头由上层处理
            .flexible(true) // 允许行长度不一致
            .from_reader(file);
        Ok(Self {
            records: Some(reader.into_records()),
        })
    }
}

impl RowReader for CsvRowReader {
    fn next_row(&mut self) -> Option<ImportResult<Vec<String>>> {
        let records = self.records.as_mut()?;
        match records.next()? {
            Ok(record) => Some(Ok(record.iter().map(str::to_string).collect())),
            Err(e) => {
                // IO 错误后无法继续读取
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    self.records = None;
                }
                Some(Err(ImportError::from(e)))
            }
        }
    }

    fn close(&mut self) {
        self.records = None;
    }
}

// ==========================================
// Excel Reader 实现
// ==========================================
pub struct ExcelRowReader {
    rows: std::vec::IntoIter<Vec<String>>,
}

impl ExcelRowReader {
    pub fn open(path: &Path) -> ImportResult<Self> {
        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names.first().cloned().ok_or(ImportError::NoSheets)?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Self {
            rows: rows.into_iter(),
        })
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

impl RowReader for ExcelRowReader {
    fn next_row(&mut self) -> Option<ImportResult<Vec<String>>> {
        self.rows.next().map(Ok)
    }

    fn close(&mut self) {
        self.rows = Vec::new().into_iter();
    }
}

// ==========================================
// 格式判定与打开
// ==========================================

/// MIME 优先，无法判定时回退到扩展名
pub fn detect_format(path: &Path, mime: &str) -> ImportResult<FileFormat> {
    if let Some(format) = FileFormat::from_mime(mime) {
        return Ok(format);
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    FileFormat::from_extension(ext).ok_or_else(|| {
        let shown = if mime.trim().is_empty() { ext } else { mime };
        ImportError::UnsupportedFormat(shown.to_string())
    })
}

pub fn open_row_reader(path: &Path, mime: &str) -> ImportResult<Box<dyn RowReader>> {
    // 检查文件存在
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    match detect_format(path, mime)? {
        FileFormat::Csv => Ok(Box::new(CsvRowReader::open(path)?)),
        FileFormat::Xlsx => Ok(Box::new(ExcelRowReader::open(path)?)),
    }
}
