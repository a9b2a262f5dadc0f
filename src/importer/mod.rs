// ==========================================
// 表格导入处理核心 - 上传解析层
// ==========================================
// 职责: 读取 CSV/Excel，生成上传列与样例，写入上传行
// 红线: 不做规则校验（由导入处理器负责）
// ==========================================

pub mod error;
pub mod file_parser;
pub mod mapping;
pub mod upload_parser;

pub use error::{ImportError, ImportResult};
pub use file_parser::{detect_format, open_row_reader, CsvRowReader, ExcelRowReader, RowReader};
pub use mapping::{check_mapping, validate_mapping, MappingError};
pub use upload_parser::{ScannedUpload, UploadParser};
