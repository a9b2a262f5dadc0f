// ==========================================
// 表格导入处理核心 - 校验求值器框架
// ==========================================
// 职责: 按规则类型校验单元格
// 分发: 规则类型字符串 → EvaluatorKind → Evaluator 枚举变体
// 约束: 参数在定义时解析一次，初始化后无可变状态，可跨线程共享
// ==========================================

pub mod date;
pub mod error;
pub mod numeric;
pub mod text;

use crate::domain::types::DataType;
use std::fmt;
use std::str::FromStr;

pub use date::DateEvaluator;
pub use error::{EvaluatorError, EvaluatorResult};
pub use numeric::{BooleanEvaluator, NumberEvaluator, RangeEvaluator};
pub use text::{
    EmailEvaluator, FilledEvaluator, LengthEvaluator, ListEvaluator, NotBlankEvaluator,
    PhoneEvaluator, RegexEvaluator,
};

// ==========================================
// Outcome - 单次求值结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub passed: bool,
    /// 通过时的规范化取值（None 表示保持原值）
    pub value: Option<String>,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            value: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            passed: false,
            value: None,
        }
    }

    pub fn pass_with(value: impl Into<String>) -> Self {
        Self {
            passed: true,
            value: Some(value.into()),
        }
    }

    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Self::pass()
        } else {
            Self::fail()
        }
    }
}

// ==========================================
// RuleEvaluator Trait
// ==========================================
// 实现者: 各规则类型的求值器
pub trait RuleEvaluator: Sized {
    /// 解析并校验规则参数（定义时调用一次）
    fn initialize(options: &serde_json::Value) -> EvaluatorResult<Self>;

    /// 校验单元格
    fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome>;

    /// 默认提示信息
    fn default_message(&self) -> String;
}

/// 空白判定: Unicode 空白裁剪后为空
pub fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

// ==========================================
// EvaluatorKind - 规则类型注册表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluatorKind {
    Filled,
    NotBlank,
    Regex,
    List,
    Length,
    Range,
    Number,
    Boolean,
    Email,
    Phone,
    Date,
}

impl EvaluatorKind {
    pub const ALL: [EvaluatorKind; 11] = [
        EvaluatorKind::Filled,
        EvaluatorKind::NotBlank,
        EvaluatorKind::Regex,
        EvaluatorKind::List,
        EvaluatorKind::Length,
        EvaluatorKind::Range,
        EvaluatorKind::Number,
        EvaluatorKind::Boolean,
        EvaluatorKind::Email,
        EvaluatorKind::Phone,
        EvaluatorKind::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::Filled => "filled",
            EvaluatorKind::NotBlank => "not_blank",
            EvaluatorKind::Regex => "regex",
            EvaluatorKind::List => "list",
            EvaluatorKind::Length => "length",
            EvaluatorKind::Range => "range",
            EvaluatorKind::Number => "number",
            EvaluatorKind::Boolean => "boolean",
            EvaluatorKind::Email => "email",
            EvaluatorKind::Phone => "phone",
            EvaluatorKind::Date => "date",
        }
    }

    /// 规则适用的数据类型（前端规则兼容性检查）
    pub fn allowed_data_types(&self) -> &'static [DataType] {
        match self {
            EvaluatorKind::Filled | EvaluatorKind::NotBlank => &DataType::ALL,
            EvaluatorKind::Regex
            | EvaluatorKind::List
            | EvaluatorKind::Length
            | EvaluatorKind::Email
            | EvaluatorKind::Phone => &[DataType::String],
            EvaluatorKind::Range => &[DataType::Number],
            EvaluatorKind::Number => &[DataType::Number, DataType::String],
            EvaluatorKind::Boolean => &[DataType::Boolean, DataType::String],
            EvaluatorKind::Date => &[DataType::Date, DataType::String],
        }
    }

    pub fn allows(&self, data_type: DataType) -> bool {
        self.allowed_data_types().contains(&data_type)
    }
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluatorKind {
    type Err = EvaluatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        EvaluatorKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| EvaluatorError::UnknownType(s.to_string()))
    }
}

// ==========================================
// Evaluator - 已初始化的求值器
// ==========================================
#[derive(Debug, Clone)]
pub enum Evaluator {
    Filled(FilledEvaluator),
    NotBlank(NotBlankEvaluator),
    Regex(RegexEvaluator),
    List(ListEvaluator),
    Length(LengthEvaluator),
    Range(RangeEvaluator),
    Number(NumberEvaluator),
    Boolean(BooleanEvaluator),
    Email(EmailEvaluator),
    Phone(PhoneEvaluator),
    Date(DateEvaluator),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Evaluator::Filled($inner) => $body,
            Evaluator::NotBlank($inner) => $body,
            Evaluator::Regex($inner) => $body,
            Evaluator::List($inner) => $body,
            Evaluator::Length($inner) => $body,
            Evaluator::Range($inner) => $body,
            Evaluator::Number($inner) => $body,
            Evaluator::Boolean($inner) => $body,
            Evaluator::Email($inner) => $body,
            Evaluator::Phone($inner) => $body,
            Evaluator::Date($inner) => $body,
        }
    };
}

impl Evaluator {
    /// 按规则类型初始化求值器
    pub fn initialize(kind: EvaluatorKind, options: &serde_json::Value) -> EvaluatorResult<Self> {
        Ok(match kind {
            EvaluatorKind::Filled => Evaluator::Filled(FilledEvaluator::initialize(options)?),
            EvaluatorKind::NotBlank => {
                Evaluator::NotBlank(NotBlankEvaluator::initialize(options)?)
            }
            EvaluatorKind::Regex => Evaluator::Regex(RegexEvaluator::initialize(options)?),
            EvaluatorKind::List => Evaluator::List(ListEvaluator::initialize(options)?),
            EvaluatorKind::Length => Evaluator::Length(LengthEvaluator::initialize(options)?),
            EvaluatorKind::Range => Evaluator::Range(RangeEvaluator::initialize(options)?),
            EvaluatorKind::Number => Evaluator::Number(NumberEvaluator::initialize(options)?),
            EvaluatorKind::Boolean => Evaluator::Boolean(BooleanEvaluator::initialize(options)?),
            EvaluatorKind::Email => Evaluator::Email(EmailEvaluator::initialize(options)?),
            EvaluatorKind::Phone => Evaluator::Phone(PhoneEvaluator::initialize(options)?),
            EvaluatorKind::Date => Evaluator::Date(DateEvaluator::initialize(options)?),
        })
    }

    /// 按数据库中的规则类型字符串初始化
    pub fn from_rule(rule_type: &str, options: &serde_json::Value) -> EvaluatorResult<Self> {
        let kind = rule_type.parse::<EvaluatorKind>()?;
        Self::initialize(kind, options)
    }

    pub fn kind(&self) -> EvaluatorKind {
        match self {
            Evaluator::Filled(_) => EvaluatorKind::Filled,
            Evaluator::NotBlank(_) => EvaluatorKind::NotBlank,
            Evaluator::Regex(_) => EvaluatorKind::Regex,
            Evaluator::List(_) => EvaluatorKind::List,
            Evaluator::Length(_) => EvaluatorKind::Length,
            Evaluator::Range(_) => EvaluatorKind::Range,
            Evaluator::Number(_) => EvaluatorKind::Number,
            Evaluator::Boolean(_) => EvaluatorKind::Boolean,
            Evaluator::Email(_) => EvaluatorKind::Email,
            Evaluator::Phone(_) => EvaluatorKind::Phone,
            Evaluator::Date(_) => EvaluatorKind::Date,
        }
    }

    pub fn evaluate(&self, cell: &str) -> EvaluatorResult<Outcome> {
        dispatch!(self, e => e.evaluate(cell))
    }

    pub fn default_message(&self) -> String {
        dispatch!(self, e => e.default_message())
    }

    pub fn allowed_data_types(&self) -> &'static [DataType] {
        self.kind().allowed_data_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_registry_round_trip_names() {
        for kind in EvaluatorKind::ALL {
            assert_eq!(kind.as_str().parse::<EvaluatorKind>(), Ok(kind));
        }
        assert_eq!("Not-Blank".parse::<EvaluatorKind>(), Ok(EvaluatorKind::NotBlank));
        assert_eq!(
            "unique".parse::<EvaluatorKind>(),
            Err(EvaluatorError::UnknownType("unique".to_string()))
        );
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let options = json!(["Red", "red ", "Blue"]);
        let a = Evaluator::from_rule("list", &options).unwrap();
        let b = Evaluator::from_rule("list", &options).unwrap();

        for cell in [" red", "BLUE", "green", "", "Red"] {
            assert_eq!(a.evaluate(cell), b.evaluate(cell), "cell={:?}", cell);
        }
        assert_eq!(a.default_message(), b.default_message());
    }

    #[test]
    fn test_malformed_regex_fails_at_definition() {
        let err = Evaluator::from_rule("regex", &json!("([a-z")).unwrap_err();
        assert!(matches!(err, EvaluatorError::InvalidPattern(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_allowed_data_types() {
        assert!(EvaluatorKind::NotBlank.allows(DataType::Date));
        assert!(EvaluatorKind::Range.allows(DataType::Number));
        assert!(!EvaluatorKind::Range.allows(DataType::String));
        assert!(!EvaluatorKind::Email.allows(DataType::Boolean));
    }

    #[test]
    fn test_dispatch_reports_kind() {
        let e = Evaluator::initialize(EvaluatorKind::Email, &serde_json::Value::Null).unwrap();
        assert_eq!(e.kind(), EvaluatorKind::Email);
        assert!(e.evaluate("amy@x.com").unwrap().passed);
    }
}
