// ==========================================
// 表格导入处理核心 - 模板与校验规则 API
// ==========================================
// 职责: 定义模板/列/规则；规则在持久化前完成初始化（fail-fast）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{DataType, Severity, Template, TemplateColumn, Validation, ValidationId};
use crate::evaluator::{Evaluator, EvaluatorKind};
use crate::repository::MetadataStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 新增列请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewColumn {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub data_type: DataType,
}

/// 新增校验规则请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewValidation {
    pub rule_type: String,
    #[serde(default)]
    pub options: serde_json::Value,
    /// 为空时使用规则默认文案
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
}

/// 规则类型说明（供前端做兼容性检查）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTypeInfo {
    pub rule_type: String,
    pub allowed_data_types: Vec<DataType>,
}

pub struct TemplateApi {
    metadata: Arc<dyn MetadataStore>,
}

impl TemplateApi {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// 可用规则类型列表
    pub fn rule_catalog() -> Vec<RuleTypeInfo> {
        EvaluatorKind::ALL
            .iter()
            .map(|kind| RuleTypeInfo {
                rule_type: kind.as_str().to_string(),
                allowed_data_types: kind.allowed_data_types().to_vec(),
            })
            .collect()
    }

    pub async fn create_template(&self, importer_id: &str, name: &str) -> ApiResult<Template> {
        if importer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("importer_id 不能为空".to_string()));
        }
        let template = Template {
            id: uuid::Uuid::new_v4().to_string(),
            importer_id: importer_id.to_string(),
            name: name.trim().to_string(),
            columns: Vec::new(),
            created_at: Utc::now(),
        };
        self.metadata.create_template(&template).await?;
        info!(importer_id, template_id = %template.id, "模板已创建");
        Ok(template)
    }

    pub async fn get_template(&self, importer_id: &str) -> ApiResult<Template> {
        Ok(self.metadata.get_template_by_importer(importer_id).await?)
    }

    /// 新增模板列
    ///
    /// # 校验
    /// - key 只能包含小写字母、数字、下划线
    /// - key 在模板内唯一
    pub async fn add_column(&self, importer_id: &str, request: NewColumn) -> ApiResult<TemplateColumn> {
        let key = request.key.trim();
        if !TemplateColumn::is_valid_key(key) {
            return Err(ApiError::InvalidInput(format!(
                "列 key 只能包含小写字母、数字、下划线: {:?}",
                request.key
            )));
        }

        let template = self.metadata.get_template_by_importer(importer_id).await?;
        if template.column_by_key(key).is_some() {
            return Err(ApiError::BusinessRuleViolation(format!("列 key 已存在: {}", key)));
        }

        let name = if request.name.trim().is_empty() { key } else { request.name.trim() };
        let column = TemplateColumn {
            id: uuid::Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            key: key.to_string(),
            name: name.to_string(),
            required: request.required,
            data_type: request.data_type,
            validations: Vec::new(),
        };
        self.metadata.create_template_column(&column).await?;
        Ok(column)
    }

    /// 新增校验规则
    ///
    /// # 校验
    /// - 规则类型必须已注册
    /// - 规则适用于列的数据类型
    /// - 规则参数可以成功初始化（与导入时同一套初始化逻辑）
    pub async fn add_validation(
        &self,
        importer_id: &str,
        template_column_id: &str,
        request: NewValidation,
    ) -> ApiResult<Validation> {
        let template = self.metadata.get_template_by_importer(importer_id).await?;
        let column = template
            .column(template_column_id)
            .ok_or_else(|| ApiError::NotFound(format!("TemplateColumn(id={})", template_column_id)))?;

        let kind: EvaluatorKind = request.rule_type.parse()?;
        if !kind.allows(column.data_type) {
            return Err(ApiError::BusinessRuleViolation(format!(
                "规则 {} 不适用于 {} 类型的列",
                kind.as_str(),
                column.data_type
            )));
        }
        let evaluator = Evaluator::initialize(kind, &request.options)?;

        let message = if request.message.trim().is_empty() {
            evaluator.default_message()
        } else {
            request.message
        };

        let mut validation = Validation {
            id: 0,
            template_column_id: column.id.clone(),
            rule_type: kind.as_str().to_string(),
            options: request.options,
            message,
            severity: request.severity,
            deleted: false,
        };
        validation.id = self.metadata.create_validation(&validation).await?;
        info!(
            validation_id = validation.id,
            rule_type = %validation.rule_type,
            schema_key = %column.key,
            "校验规则已添加"
        );
        Ok(validation)
    }

    /// 软删除规则（已开始的导入不受影响）
    pub async fn delete_validation(&self, id: ValidationId) -> ApiResult<()> {
        self.metadata.soft_delete_validation(id).await?;
        Ok(())
    }
}
