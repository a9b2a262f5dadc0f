// ==========================================
// 表格导入处理核心 - 文本类求值器
// ==========================================
// Filled / NotBlank / Regex / List / Length / Email / Phone
// 注意: Length 不裁剪空白（度量原始长度），其余按各自约定处理
// ==========================================

use crate::evaluator::error::{EvaluatorError, EvaluatorResult};
use crate::evaluator::{is_blank, Outcome, RuleEvaluator};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use validator::ValidateEmail;

// ==========================================
// Filled - 是否必须填写
// ==========================================
// 参数: bool 或 {"required": bool}
#[derive(Debug, Clone)]
pub struct FilledEvaluator {
    required: bool,
}

impl RuleEvaluator for FilledEvaluator {
    fn initialize(options: &serde_json::Value) -> EvaluatorResult<Self> {
        let required = match options {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Object(map) => map
                .get("required")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| EvaluatorError::invalid_options("filled", "缺少布尔参数 required"))?,
            other => {
                return Err(EvaluatorError::invalid_options(
                    "filled",
                    format!("期望布尔值，实际 {}", other),
                ))
            }
        };
        Ok(Self { required })
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        Ok(Outcome::from_bool(!is_blank(cell) == self.required))
    }

    fn default_message(&self) -> String {
        if self.required {
            "The cell must contain a value".to_string()
        } else {
            "The cell must be empty".to_string()
        }
    }
}

// ==========================================
// NotBlank - 非空
// ==========================================
#[derive(Debug, Clone)]
pub struct NotBlankEvaluator;

impl RuleEvaluator for NotBlankEvaluator {
    fn initialize(_options: &serde_json::Value) -> EvaluatorResult<Self> {
        Ok(Self)
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        Ok(Outcome::from_bool(!is_blank(cell)))
    }

    fn default_message(&self) -> String {
        "The cell must contain a value".to_string()
    }
}

// ==========================================
// Regex - 正则匹配
// ==========================================
#[derive(Debug, Clone)]
pub struct RegexEvaluator {
    regex: Regex,
}

impl RuleEvaluator for RegexEvaluator {
    fn initialize(options: &serde_json::Value) -> EvaluatorResult<Self> {
        let pattern = options
            .as_str()
            .ok_or_else(|| EvaluatorError::invalid_options("regex", "期望正则表达式字符串"))?;
        if pattern.is_empty() {
            return Err(EvaluatorError::InvalidPattern("正则表达式为空".to_string()));
        }
        let regex = Regex::new(pattern).map_err(|e| EvaluatorError::InvalidPattern(e.to_string()))?;
        Ok(Self { regex })
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        Ok(Outcome::from_bool(self.regex.is_match(cell)))
    }

    fn default_message(&self) -> String {
        format!("The cell must match the pattern {}", self.regex.as_str())
    }
}

// ==========================================
// List - 枚举值（大小写不敏感，通过时改写为规范大小写）
// ==========================================
#[derive(Debug, Clone)]
pub struct ListEvaluator {
    options: Vec<String>,
    /// 与 options 一一对应的小写形式，初始化时计算
    folded: Vec<String>,
}

impl ListEvaluator {
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl RuleEvaluator for ListEvaluator {
    fn initialize(options: &serde_json::Value) -> EvaluatorResult<Self> {
        let raw: Vec<String> = serde_json::from_value(options.clone())
            .map_err(|e| EvaluatorError::invalid_options("list", e.to_string()))?;

        let mut seen = HashSet::new();
        let mut canonical = Vec::new();
        let mut folded = Vec::new();
        for value in raw {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            // 保留首次出现的大小写形式
            let lower = trimmed.to_lowercase();
            if seen.insert(lower.clone()) {
                canonical.push(trimmed.to_string());
                folded.push(lower);
            }
        }

        if canonical.is_empty() {
            return Err(EvaluatorError::EmptyList);
        }
        Ok(Self {
            options: canonical,
            folded,
        })
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        let needle = cell.trim().to_lowercase();
        Ok(self
            .folded
            .iter()
            .position(|f| *f == needle)
            .map(|i| Outcome::pass_with(self.options[i].clone()))
            .unwrap_or_else(Outcome::fail))
    }

    fn default_message(&self) -> String {
        format!("The value must be {}", join_with_or(&self.options))
    }
}

/// 'a' / 'a' or 'b' / 'a', 'b', or 'c'
fn join_with_or(options: &[String]) -> String {
    let quoted: Vec<String> = options.iter().map(|o| format!("'{}'", o)).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

// ==========================================
// Length - 字符长度范围（含边界）
// ==========================================
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LengthEvaluator {
    min: Option<u64>,
    max: Option<u64>,
}

impl RuleEvaluator for LengthEvaluator {
    fn initialize(options: &serde_json::Value) -> EvaluatorResult<Self> {
        let parsed: LengthEvaluator = serde_json::from_value(options.clone())
            .map_err(|e| EvaluatorError::invalid_options("length", e.to_string()))?;
        match (parsed.min, parsed.max) {
            (None, None) => Err(EvaluatorError::MissingBound("length".to_string())),
            (Some(min), Some(max)) if min > max => Err(EvaluatorError::InvertedBounds {
                min: min.to_string(),
                max: max.to_string(),
            }),
            _ => Ok(parsed),
        }
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        let len = cell.chars().count() as u64;
        let above_min = self.min.map_or(true, |min| len >= min);
        let below_max = self.max.map_or(true, |max| len <= max);
        Ok(Outcome::from_bool(above_min && below_max))
    }

    fn default_message(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                format!("The cell must contain between {} and {} characters", min, max)
            }
            (Some(min), None) => format!("The cell must contain at least {} characters", min),
            (None, Some(max)) => format!("The cell must contain at most {} characters", max),
            (None, None) => String::new(),
        }
    }
}

// ==========================================
// Email - 邮箱格式
// ==========================================
#[derive(Debug, Clone)]
pub struct EmailEvaluator;

impl RuleEvaluator for EmailEvaluator {
    fn initialize(_options: &serde_json::Value) -> EvaluatorResult<Self> {
        Ok(Self)
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Ok(Outcome::fail());
        }
        Ok(Outcome::from_bool(trimmed.to_string().validate_email()))
    }

    fn default_message(&self) -> String {
        "The cell must contain a valid email address".to_string()
    }
}

// ==========================================
// Phone - 北美格式电话（宽松）
// ==========================================
// 通过时改写为裁剪后的形式
const PHONE_PATTERN: &str = r"^(?:\+?1[\s.\-]?)?\(?\d{3}\)?[\s.\-]?\d{3}[\s.\-]?\d{4}$";

#[derive(Debug, Clone)]
pub struct PhoneEvaluator {
    regex: Regex,
}

impl RuleEvaluator for PhoneEvaluator {
    fn initialize(_options: &serde_json::Value) -> EvaluatorResult<Self> {
        let regex =
            Regex::new(PHONE_PATTERN).map_err(|e| EvaluatorError::InvalidPattern(e.to_string()))?;
        Ok(Self { regex })
    }

    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        let trimmed = cell.trim();
        if self.regex.is_match(trimmed) {
            Ok(Outcome::pass_with(trimmed))
        } else {
            Ok(Outcome::fail())
        }
    }

    fn default_message(&self) -> String {
        "The cell must contain a valid phone number".to_string()
    }
}
