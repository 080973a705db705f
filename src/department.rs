use tracing::debug;

use crate::allocator::Assignment;
use crate::applicant::{Applicant, Aid};
use crate::config::Config;
use crate::score::{self, Ranked, ScoreRule};

pub type Did = usize; //学科ID。学科名の昇順に振った連番

#[derive(Debug, Clone)]
pub struct Department {
    pub id: Did,
    pub name: String,
    pub rule: ScoreRule,
    pub waves: [Vec<Aid>; Config::PRIORITIES], //第n志望でこの学科を選んだ受験者
    pub roster: Vec<Aid>, //合格者（合格した順）
}

impl Department {
    pub fn new(id: Did, name: &str, rule: ScoreRule) -> Self {
        Self {
            id,
            name: name.to_string(),
            rule,
            waves: Default::default(),
            roster: Vec::new(),
        }
    }

    // 設定から学科一覧を作成。学科名の昇順に並べ、その位置をIDにする。
    pub fn from_conf(conf: &Config) -> Vec<Self> {
        let mut confs = conf.departments.clone();
        confs.sort_by(|a, b| a.name.cmp(&b.name));
        confs.iter()
            .enumerate()
            .map(|(i, d)| Department::new(i, &d.name, ScoreRule::resolve(conf, &d.subjects)))
            .collect()
    }

    // 第wave志望の受験者から、未合格の者を成績順に残り定員まで合格させる。
    // 合格者は同じ回の他学科にもすぐ反映されるよう、その都度assignmentに記録する。
    pub fn enroll(&mut self, wave: usize, applicants: &[Applicant], assignment: &mut Assignment, capacity: usize) -> Vec<Aid> {
        let remaining = capacity.saturating_sub(self.roster.len());
        if remaining == 0 {
            return Vec::new();
        }
        let candidates: Vec<Aid> = self.waves[wave].iter()
            .copied()
            .filter(|id| assignment.is_free(*id))
            .collect();

        let mut admitted = Vec::new();
        for ranked in score::rank(&candidates, applicants, &self.rule) {
            if admitted.len() >= remaining {
                break;
            }
            if assignment.assign(ranked.id, self.id) {
                admitted.push(ranked.id);
            }
        }
        debug!(department = %self.name, wave = wave + 1, candidates = candidates.len(), admitted = admitted.len(), "enrolled");
        self.roster.extend_from_slice(&admitted);
        admitted
    }

    // 表示用に合格者を成績順に並べ直す
    pub fn ranked_roster(&self, applicants: &[Applicant]) -> Vec<Ranked> {
        score::rank(&self.roster, applicants, &self.rule)
    }
}

// 学科名からIDを引く（学科一覧は名前順）
pub fn find(departments: &[Department], name: &str) -> Option<Did> {
    departments.binary_search_by(|d| d.name.as_str().cmp(name))
        .ok()
        .map(|i| departments[i].id)
}

// 受験者を各志望の学科の選抜リストに登録する
pub fn register(departments: &mut [Department], applicant: &Applicant) {
    for (wave, did) in applicant.priorities.iter().enumerate() {
        departments[*did].waves[wave].push(applicant.id);
    }
}
