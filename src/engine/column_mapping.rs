// ==========================================
// 表格导入处理核心 - 映射解析
// ==========================================
// 每次导入开始时解析一次:
// 源列序号 → (schema key, 按挂载顺序初始化好的规则列表)
// 规则配置无效即整体失败，不进入逐行处理
// ==========================================

use crate::domain::{Template, Upload, ValidationId};
use crate::engine::error::{ProcessError, ProcessResult};
use crate::evaluator::Evaluator;
use std::collections::BTreeMap;
use tracing::warn;

/// 已初始化的规则
#[derive(Debug, Clone)]
pub struct BoundRule {
    pub validation_id: ValidationId,
    pub evaluator: Evaluator,
}

#[derive(Debug, Clone)]
pub struct MappedColumn {
    pub schema_key: String,
    pub rules: Vec<BoundRule>,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    columns: BTreeMap<u32, MappedColumn>,
}

impl ColumnMapping {
    pub fn resolve(upload: &Upload, template: &Template) -> ProcessResult<Self> {
        let mut columns = BTreeMap::new();

        for upload_column in upload.mapped_columns() {
            let Some(target_id) = upload_column.template_column_id.as_deref() else {
                continue;
            };
            let Some(target) = template.column(target_id) else {
                warn!(
                    upload_id = %upload.id,
                    column = %upload_column.name,
                    template_column_id = target_id,
                    "映射目标不在当前模板中，忽略该列"
                );
                continue;
            };

            let mut rules = Vec::with_capacity(target.validations.len());
            for validation in target.validations.iter().filter(|v| !v.deleted) {
                let evaluator = Evaluator::from_rule(&validation.rule_type, &validation.options)
                    .map_err(|source| ProcessError::InvalidRule {
                        validation_id: validation.id,
                        source,
                    })?;
                rules.push(BoundRule {
                    validation_id: validation.id,
                    evaluator,
                });
            }

            columns.insert(
                upload_column.index,
                MappedColumn {
                    schema_key: target.key.clone(),
                    rules,
                },
            );
        }

        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// 按源列序号升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (u32, &MappedColumn)> {
        self.columns.iter().map(|(index, column)| (*index, column))
    }
}
