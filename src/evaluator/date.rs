// ==========================================
// 表格导入处理核心 - 日期求值器
// ==========================================
// 占位实现: 始终通过，日期格式规则待产品确定后补充
// ==========================================

use crate::evaluator::error::EvaluatorResult;
use crate::evaluator::{Outcome, RuleEvaluator};

#[derive(Debug, Clone)]
pub struct DateEvaluator;

impl RuleEvaluator for DateEvaluator {
    fn initialize(_options: &serde_json::Value) -> EvaluatorResult<Self> {
        Ok(Self)
    }

    fn evaluate(&self, _cell: &str) -> EvaluatorResult<Outcome> {
        Ok(Outcome::pass())
    }

    fn default_message(&self) -> String {
        "The cell must contain a valid date".to_string()
    }
}
