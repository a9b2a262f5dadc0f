// ==========================================
// 表格导入处理核心 - 单行求值
// ==========================================
// 对每个已映射单元格按挂载顺序执行全部规则（不短路）:
// - 通过且带规范化值 → 后续规则与结果使用规范化值
// - 不通过 → 记录规则 ID；结果保留原始单元格值
// - 求值器内部错误 → 告警并跳过该规则
// 行有效 ⇔ 没有任何规则不通过
// 同一 key 被多个源列映射时，按源列序号最后写入者生效
// ==========================================

use crate::domain::{ImportRow, ImportRowWithErrors, RowMutation, UploadRow, ValidationId};
use crate::engine::column_mapping::ColumnMapping;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedRow {
    pub row_index: i64,
    pub values: BTreeMap<String, String>,
    pub errors: BTreeMap<String, Vec<ValidationId>>,
    /// 处理过的单元格数（含空单元格）
    pub processed_values: i64,
}

impl EvaluatedRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// 转为行存储语句（两类记录二选一）
    pub fn into_mutation(self, import_id: &str) -> RowMutation {
        if self.errors.is_empty() {
            RowMutation::Import(ImportRow {
                import_id: import_id.to_string(),
                row_index: self.row_index,
                values: self.values,
            })
        } else {
            RowMutation::ImportWithErrors(ImportRowWithErrors {
                import_id: import_id.to_string(),
                row_index: self.row_index,
                values: self.values,
                errors: self.errors,
            })
        }
    }
}

/// 求值一行
///
/// `row_index` 为导入结果中的行号（从 0 开始），与上传行号无关
pub fn evaluate_row(mapping: &ColumnMapping, row: &UploadRow, row_index: i64) -> EvaluatedRow {
    let mut values = BTreeMap::new();
    let mut errors: BTreeMap<String, Vec<ValidationId>> = BTreeMap::new();
    let mut processed_values = 0i64;

    for (index, column) in mapping.iter() {
        let original = row.cell(index);
        let mut current = original.to_string();
        let mut failed: Vec<ValidationId> = Vec::new();

        for rule in &column.rules {
            match rule.evaluator.evaluate(&current) {
                Ok(outcome) if outcome.passed => {
                    if let Some(normalized) = outcome.value {
                        current = normalized;
                    }
                }
                Ok(_) => failed.push(rule.validation_id),
                Err(e) => {
                    warn!(
                        upload_row = row.row_index,
                        schema_key = %column.schema_key,
                        validation_id = rule.validation_id,
                        error = %e,
                        "规则求值异常，已跳过"
                    );
                }
            }
        }

        let value = if failed.is_empty() { current } else { original.to_string() };
        // 多个源列映射到同一 key 时以最后一列为准（值与错误一致）
        errors.remove(&column.schema_key);
        if !failed.is_empty() {
            errors.insert(column.schema_key.clone(), failed);
        }
        values.insert(column.schema_key.clone(), value);
        processed_values += 1;
    }

    EvaluatedRow {
        row_index,
        values,
        errors,
        processed_values,
    }
}
