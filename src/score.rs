use std::cmp::Ordering;

use crate::applicant::{Applicant, Aid};
use crate::config::{Config, InputFormat};

// 学科ごとの得点計算ルール。設定読み込み時に一度だけ決まる。
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreRule {
    Aggregate,         // GPA等の総合点をそのまま使う
    Mean(Vec<String>), // 指定科目の平均
}

impl ScoreRule {
    pub fn resolve(conf: &Config, subjects: &[String]) -> Self {
        if conf.format == InputFormat::Gpa || subjects.is_empty() {
            ScoreRule::Aggregate
        } else {
            ScoreRule::Mean(subjects.to_vec())
        }
    }

    // max(科目平均, 特別試験)。科目の成績が無ければ0点扱い。
    pub fn score(&self, applicant: &Applicant) -> f64 {
        let base = match self {
            ScoreRule::Aggregate => applicant.aggregate.unwrap_or(0.0),
            ScoreRule::Mean(subjects) if subjects.is_empty() => 0.0,
            ScoreRule::Mean(subjects) => {
                let sum: f64 = subjects.iter()
                    .map(|s| applicant.results.get(s).copied().unwrap_or(0.0))
                    .sum();
                sum / subjects.len() as f64
            }
        };
        match applicant.special {
            Some(special) if special > base => special,
            _ => base,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub id: Aid,
    pub full_name: String,
    pub score: f64,
}

// 得点の降順、同点は氏名の昇順
pub fn compare(a: &Ranked, b: &Ranked) -> Ordering {
    b.score.partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.full_name.cmp(&b.full_name))
}

// 安定ソートなので、得点も氏名も同じなら渡された順のまま
pub fn rank(ids: &[Aid], applicants: &[Applicant], rule: &ScoreRule) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = ids.iter()
        .map(|&id| {
            let applicant = &applicants[id];
            Ranked { id, full_name: applicant.full_name(), score: rule.score(applicant) }
        })
        .collect();
    ranked.sort_by(compare);
    ranked
}
