use tracing::info;

use crate::applicant::{Applicant, Aid};
use crate::config::Config;
use crate::department::{Department, Did};

// 受験者ごとの合格学科。一度記録したら変更しない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    slots: Vec<Option<Did>>,
}

impl Assignment {
    pub fn new(applicants: usize) -> Self {
        Self { slots: vec![None; applicants] }
    }

    pub fn get(&self, id: Aid) -> Option<Did> {
        self.slots.get(id).copied().flatten()
    }

    pub fn is_free(&self, id: Aid) -> bool {
        self.get(id).is_none()
    }

    // 未合格なら合格学科を記録してtrue。既に合格済み、または範囲外のIDならfalse。
    pub fn assign(&mut self, id: Aid, did: Did) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) if slot.is_none() => {
                *slot = Some(did);
                true
            }
            _ => false,
        }
    }

    pub fn admitted(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

// 第1志望→第2志望→第3志望の順に、各学科で残り定員を成績順に埋める。
// 定員が0以下なら誰も合格しない。
pub fn allocate(departments: &mut [Department], applicants: &[Applicant], capacity: i64) -> Assignment {
    let mut assignment = Assignment::new(applicants.len());
    let capacity = if capacity > 0 { capacity as usize } else { 0 };

    for wave in 0..Config::PRIORITIES {
        let mut admitted = 0;
        for department in departments.iter_mut() {
            admitted += department.enroll(wave, applicants, &mut assignment, capacity).len();
        }
        info!(wave = wave + 1, admitted, "wave finished");
    }
    assignment
}
