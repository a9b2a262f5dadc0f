// ==========================================
// 表格导入处理核心 - 映射前置检查
// ==========================================
// 启动导入前由调用方执行:
// - 同一 schema key 不得被多个源列映射
// - 所有必填模板列必须被映射
// - 映射目标必须属于该模板
// ==========================================

use crate::domain::{Template, Upload};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("多个源列映射到同一目标列: key={key}, columns={columns:?}")]
    DuplicateTarget { key: String, columns: Vec<String> },

    #[error("必填列未映射: {key}")]
    RequiredColumnUnmapped { key: String },

    #[error("映射目标不属于当前模板: upload_column={upload_column}, template_column_id={template_column_id}")]
    UnknownTemplateColumn {
        upload_column: String,
        template_column_id: String,
    },
}

/// 检查上传列映射，返回发现的全部问题（空表示通过）
pub fn check_mapping(upload: &Upload, template: &Template) -> Vec<MappingError> {
    let mut problems = Vec::new();
    let mut by_key: HashMap<&str, Vec<String>> = HashMap::new();

    for column in upload.mapped_columns() {
        let Some(target_id) = column.template_column_id.as_deref() else {
            continue;
        };
        match template.column(target_id) {
            Some(target) => by_key.entry(target.key.as_str()).or_default().push(column.name.clone()),
            None => problems.push(MappingError::UnknownTemplateColumn {
                upload_column: column.name.clone(),
                template_column_id: target_id.to_string(),
            }),
        }
    }

    // 按模板列顺序输出，保证结果稳定
    for target in &template.columns {
        match by_key.get(target.key.as_str()) {
            Some(sources) if sources.len() > 1 => problems.push(MappingError::DuplicateTarget {
                key: target.key.clone(),
                columns: sources.clone(),
            }),
            None if target.required => problems.push(MappingError::RequiredColumnUnmapped {
                key: target.key.clone(),
            }),
            _ => {}
        }
    }
    problems
}

/// 检查上传列映射，遇到第一个问题即返回
pub fn validate_mapping(upload: &Upload, template: &Template) -> Result<(), MappingError> {
    match check_mapping(upload, template).into_iter().next() {
        Some(problem) => Err(problem),
        None => Ok(()),
    }
}
