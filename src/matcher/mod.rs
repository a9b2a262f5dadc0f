// ==========================================
// 表格导入处理核心 - 列匹配建议
// ==========================================
// 职责: 为每个源列给出最可能的目标模板列（只排序，不自动应用）
// 流程: 多轮启发式打分 → MatchQueue 保留每列最高分 → 取队首
// ==========================================

pub mod queue;

use crate::domain::{TemplateColumn, UploadColumn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use queue::MatchQueue;

// ===== 启发式分数 =====
pub const SCORE_EXACT: f64 = 1.0;
pub const SCORE_NORMALIZED: f64 = 0.95;
pub const SCORE_SYNONYM: f64 = 0.85;
pub const SCORE_SUBSTRING: f64 = 0.6;
pub const SCORE_TOKEN_OVERLAP: f64 = 0.5;
/// 低于该分数的候选不参与建议
pub const MIN_SCORE: f64 = 0.2;

/// 常见列名同义词组（下划线形式）
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["first_name", "firstname", "first", "given_name", "forename", "fname"],
    &["last_name", "lastname", "last", "surname", "family_name", "lname"],
    &["full_name", "name", "fullname", "contact_name"],
    &["email", "email_address", "e_mail", "mail"],
    &["phone", "phone_number", "telephone", "tel", "mobile", "cell", "cell_phone"],
    &["address", "street", "street_address", "address_line_1", "address1"],
    &["zip", "zip_code", "zipcode", "postal_code", "postcode"],
    &["city", "town"],
    &["state", "province", "region"],
    &["country", "nation", "country_code"],
    &["company", "organization", "organisation", "employer", "company_name"],
    &["dob", "date_of_birth", "birthday", "birth_date"],
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub template_column_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSuggestion {
    pub upload_column_id: String,
    pub index: u32,
    pub name: String,
    pub suggestion: Option<Suggestion>,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    lowered: [String; 2], // key / name 小写
    snake: [String; 2],   // 非字母数字折叠为下划线
    compact: [String; 2], // 仅保留字母数字
    tokens: HashSet<String>,
}

// ==========================================
// ColumnMatcher
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnMatcher {
    candidates: Vec<Candidate>,
}

impl ColumnMatcher {
    pub fn new(columns: &[TemplateColumn]) -> Self {
        let candidates = columns
            .iter()
            .map(|c| {
                let mut tokens = tokenize(&c.key);
                tokens.extend(tokenize(&c.name));
                Candidate {
                    id: c.id.clone(),
                    lowered: [c.key.trim().to_lowercase(), c.name.trim().to_lowercase()],
                    snake: [to_snake(&c.key), to_snake(&c.name)],
                    compact: [to_compact(&c.key), to_compact(&c.name)],
                    tokens,
                }
            })
            .collect();
        Self { candidates }
    }

    /// 对单个源列名打分，返回全部候选
    pub fn rank(&self, source_name: &str) -> MatchQueue {
        let mut queue = MatchQueue::new();
        let lowered = source_name.trim().to_lowercase();
        if lowered.is_empty() {
            return queue;
        }
        let snake = to_snake(source_name);
        let compact = to_compact(source_name);
        let tokens = tokenize(source_name);

        // 第 1 轮: 大小写不敏感精确匹配
        for c in &self.candidates {
            if c.lowered.iter().any(|v| *v == lowered) {
                queue.push(&c.id, SCORE_EXACT);
            }
        }

        // 第 2 轮: 忽略分隔符/标点后的匹配
        if !compact.is_empty() {
            for c in &self.candidates {
                if c.compact.iter().any(|v| *v == compact) {
                    queue.push(&c.id, SCORE_NORMALIZED);
                }
            }
        }

        // 第 3 轮: 同义词
        if let Some(group) = synonym_group(&snake) {
            for c in &self.candidates {
                if c.snake.iter().any(|v| group.contains(&v.as_str())) {
                    queue.push(&c.id, SCORE_SYNONYM);
                }
            }
        }

        // 第 4 轮: 子串包含（按长度比例折算）
        if compact.len() >= 3 {
            for c in &self.candidates {
                for target in c.compact.iter().filter(|t| t.len() >= 3) {
                    if target.contains(&compact) || compact.contains(target.as_str()) {
                        let (short, long) = if target.len() < compact.len() {
                            (target.len(), compact.len())
                        } else {
                            (compact.len(), target.len())
                        };
                        let score = SCORE_SUBSTRING * (short as f64 / long as f64);
                        if score >= MIN_SCORE {
                            queue.push(&c.id, score);
                        }
                    }
                }
            }
        }

        // 第 5 轮: 词元重叠（Jaccard）
        if !tokens.is_empty() {
            for c in &self.candidates {
                let inter = c.tokens.intersection(&tokens).count();
                if inter == 0 {
                    continue;
                }
                let union = c.tokens.union(&tokens).count();
                let score = SCORE_TOKEN_OVERLAP * (inter as f64 / union as f64);
                if score >= MIN_SCORE {
                    queue.push(&c.id, score);
                }
            }
        }

        queue
    }

    /// 单个源列的最佳候选
    pub fn suggest(&self, source_name: &str) -> Option<Suggestion> {
        self.rank(source_name)
            .pop()
            .map(|(template_column_id, score)| Suggestion {
                template_column_id,
                score,
            })
    }

    /// 为全部源列给出建议（不处理多个源列指向同一目标的情况，由用户确认）
    pub fn suggest_all(&self, columns: &[UploadColumn]) -> Vec<ColumnSuggestion> {
        columns
            .iter()
            .map(|col| ColumnSuggestion {
                upload_column_id: col.id.clone(),
                index: col.index,
                name: col.name.clone(),
                suggestion: self.suggest(&col.name),
            })
            .collect()
    }
}

fn to_snake(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;
    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

fn to_compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn tokenize(value: &str) -> HashSet<String> {
    to_snake(value)
        .split('_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn synonym_group(snake: &str) -> Option<&'static [&'static str]> {
    SYNONYM_GROUPS
        .iter()
        .copied()
        .find(|group| group.contains(&snake))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataType;

    fn column(id: &str, key: &str, name: &str) -> TemplateColumn {
        TemplateColumn {
            id: id.to_string(),
            template_id: "t1".to_string(),
            key: key.to_string(),
            name: name.to_string(),
            required: false,
            data_type: DataType::String,
            validations: vec![],
        }
    }

    fn matcher() -> ColumnMatcher {
        ColumnMatcher::new(&[
            column("c1", "first_name", "First Name"),
            column("c2", "last_name", "Last Name"),
            column("c3", "email", "Email"),
            column("c4", "phone_number", "Phone Number"),
        ])
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let s = matcher().suggest("EMAIL").unwrap();
        assert_eq!(s.template_column_id, "c3");
        assert_eq!(s.score, SCORE_EXACT);
    }

    #[test]
    fn test_normalized_match() {
        let s = matcher().suggest("first-name").unwrap();
        assert_eq!(s.template_column_id, "c1");
        assert_eq!(s.score, SCORE_NORMALIZED);
    }

    #[test]
    fn test_synonym_match() {
        let s = matcher().suggest("Surname").unwrap();
        assert_eq!(s.template_column_id, "c2");
        assert_eq!(s.score, SCORE_SYNONYM);

        let s = matcher().suggest("Telephone").unwrap();
        assert_eq!(s.template_column_id, "c4");
    }

    #[test]
    fn test_substring_match_scaled() {
        let s = matcher().suggest("Primary Email").unwrap();
        assert_eq!(s.template_column_id, "c3");
        assert!(s.score < SCORE_SYNONYM);
    }

    #[test]
    fn test_no_suggestion_for_unrelated_column() {
        assert_eq!(matcher().suggest("zz"), None);
        assert_eq!(matcher().suggest("   "), None);
    }

    #[test]
    fn test_rank_keeps_best_heuristic_per_column() {
        // "phone" 同时命中同义词与子串，应保留同义词分数
        let mut q = matcher().rank("phone");
        let (id, score) = q.pop().unwrap();
        assert_eq!(id, "c4");
        assert_eq!(score, SCORE_SYNONYM);
    }

    #[test]
    fn test_suggest_all_covers_every_source_column() {
        let mut a = UploadColumn::new("u1", "E-mail", 0);
        a.id = "uc1".to_string();
        let b = UploadColumn::new("u1", "Notes", 1);

        let out = matcher().suggest_all(&[a, b]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].upload_column_id, "uc1");
        assert_eq!(out[0].suggestion.as_ref().map(|s| s.template_column_id.as_str()), Some("c3"));
        assert!(out[1].suggestion.is_none());
    }
}
