// ==========================================
// 表格导入处理核心 - 数值类求值器
// ==========================================
// Range: 任意精度十进制比较（避免超长/高精度输入经 f64 丢精度）
// Number / Boolean: 宽松类型转换，转换失败即规则不通过
// ==========================================

use crate::evaluator::error::{EvaluatorError, EvaluatorResult};
use crate::evaluator::{Outcome, RuleEvaluator};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::str::FromStr;

/// 宽松数值解析: 去除首尾空白与千分位逗号
fn parse_decimal(cell: &str) -> Option<BigDecimal> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = trimmed.replace(',', "");
    BigDecimal::from_str(&cleaned).ok()
}

// ==========================================
// Range - 数值范围（含边界）
// ==========================================
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeOptions {
    min: Option<i64>,
    max: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RangeEvaluator {
    min: Option<BigDecimal>,
    max: Option<BigDecimal>,
}

impl RuleEvaluator for RangeEvaluator {
    fn initialize(options: &serde_json::Value) -> EvaluatorResult<Self> {
        let parsed: RangeOptions = serde_json::from_value(options.clone())
            .map_err(|e| EvaluatorError::invalid_options("range", e.to_string()))?;
        match (parsed.min, parsed.max) {
            (None, None) => return Err(EvaluatorError::MissingBound("range".to_string())),
            (Some(min), Some(max)) if min > max => {
                return Err(EvaluatorError::InvertedBounds {
                    min: min.to_string(),
                    max: max.to_string(),
                })
            }
            _ => {}
        }
        Ok(Self {
            min: parsed.min.map(BigDecimal::from),
            max: parsed.max.map(BigDecimal::from),
        })
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        let value = match parse_decimal(cell) {
            Some(v) => v,
            None => return Ok(Outcome::fail()),
        };
        let above_min = self.min.as_ref().map_or(true, |min| &value >= min);
        let below_max = self.max.as_ref().map_or(true, |max| &value <= max);
        Ok(Outcome::from_bool(above_min && below_max))
    }

    fn default_message(&self) -> String {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => format!("The value must be between {} and {}", min, max),
            (Some(min), None) => format!("The value must be at least {}", min),
            (None, Some(max)) => format!("The value must be at most {}", max),
            (None, None) => String::new(),
        }
    }
}

// ==========================================
// Number - 数值类型检查
// ==========================================
#[derive(Debug, Clone)]
pub struct NumberEvaluator;

impl RuleEvaluator for NumberEvaluator {
    fn initialize(_options: &serde_json::Value) -> EvaluatorResult<Self> {
        Ok(Self)
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        Ok(Outcome::from_bool(parse_decimal(cell).is_some()))
    }

    fn default_message(&self) -> String {
        "The cell must contain a number".to_string()
    }
}

// ==========================================
// Boolean - 布尔类型检查
// ==========================================
#[derive(Debug, Clone)]
pub struct BooleanEvaluator;

impl BooleanEvaluator {
    /// 宽松布尔解析: true/false、1/0、t/f、yes/no、y/n、on/off
    pub fn parse(cell: &str) -> Option<bool> {
        match cell.trim().to_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
            "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
            _ => None,
        }
    }
}

impl RuleEvaluator for BooleanEvaluator {
    fn initialize(_options: &serde_json::Value) -> EvaluatorResult<Self> {
        Ok(Self)
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        Ok(Outcome::from_bool(Self::parse(cell).is_some()))
    }

    fn default_message(&self) -> String {
        "The cell must contain either true or false".to_string()
    }
}
