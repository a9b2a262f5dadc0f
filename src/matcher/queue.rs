// ==========================================
// 表格导入处理核心 - 匹配优先队列
// ==========================================
// 最大堆 + 位置索引，支持按模板列 ID 原地提升分数
// 同一 ID 重复插入时保留较高分数
// 同分时按插入顺序出队（先插入者优先），调用方不应依赖该顺序
// ==========================================

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    score: f64,
    seq: u64,
}

impl Entry {
    /// 是否应排在 other 之前
    fn outranks(&self, other: &Entry) -> bool {
        self.score > other.score || (self.score == other.score && self.seq < other.seq)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchQueue {
    heap: Vec<Entry>,
    positions: HashMap<String, usize>,
    next_seq: u64,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 当前记录的分数
    pub fn score_of(&self, id: &str) -> Option<f64> {
        self.positions.get(id).map(|&pos| self.heap[pos].score)
    }

    /// 插入候选；已存在时取 max(旧分数, 新分数)
    pub fn push(&mut self, id: &str, score: f64) {
        if score.is_nan() {
            return;
        }

        if let Some(&pos) = self.positions.get(id) {
            if score > self.heap[pos].score {
                self.heap[pos].score = score;
                self.sift_up(pos);
            }
            return;
        }

        let entry = Entry {
            id: id.to_string(),
            score,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.heap.push(entry);
        let pos = self.heap.len() - 1;
        self.positions.insert(id.to_string(), pos);
        self.sift_up(pos);
    }

    /// 查看最高分候选
    pub fn peek(&self) -> Option<(&str, f64)> {
        self.heap.first().map(|e| (e.id.as_str(), e.score))
    }

    /// 弹出最高分候选
    pub fn pop(&mut self) -> Option<(String, f64)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.id, entry.score))
    }

    /// 按分数从高到低取出全部候选
    pub fn into_sorted_vec(mut self) -> Vec<(String, f64)> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            out.push(item);
        }
        out
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].id.clone(), a);
        self.positions.insert(self.heap[b].id.clone(), b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].outranks(&self.heap[parent]) {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut best = pos;
            if left < len && self.heap[left].outranks(&self.heap[best]) {
                best = left;
            }
            if right < len && self.heap[right].outranks(&self.heap[best]) {
                best = right;
            }
            if best == pos {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_maximum_score_per_id() {
        let mut q = MatchQueue::new();
        q.push("colA", 0.4);
        q.push("colA", 0.9);
        q.push("colA", 0.2);

        assert_eq!(q.len(), 1);
        assert_eq!(q.pop(), Some(("colA".to_string(), 0.9)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_pops_in_descending_score_order() {
        let mut q = MatchQueue::new();
        q.push("a", 0.1);
        q.push("b", 0.7);
        q.push("c", 0.3);
        q.push("d", 0.5);
        q.push("a", 0.8); // 提升后应排第一

        let order: Vec<String> = q.into_sorted_vec().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_positions_stay_consistent_after_pops() {
        let mut q = MatchQueue::new();
        for (i, id) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            q.push(id, i as f64 / 10.0);
        }
        assert_eq!(q.pop().map(|(id, _)| id), Some("f".to_string()));
        q.push("a", 0.95);
        assert_eq!(q.score_of("a"), Some(0.95));
        assert_eq!(q.peek().map(|(id, _)| id.to_string()), Some("a".to_string()));
        assert_eq!(q.len(), 5);
    }

    #[test]
    fn test_nan_is_ignored() {
        let mut q = MatchQueue::new();
        q.push("a", f64::NAN);
        assert!(q.is_empty());
    }
}
