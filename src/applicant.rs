use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{info, warn};

use crate::config::{Config, InputFormat};
use crate::department::{self, Department, Did};
use crate::error::RecordError;

pub type Aid = usize; //受験者ID。読み込み順の連番

#[derive(Debug, Clone, PartialEq)]
pub struct Applicant {
    pub id: Aid,
    pub first_name: String,
    pub last_name: String,
    pub results: HashMap<String, f64>, //科目ごとの成績
    pub aggregate: Option<f64>, //GPA等の総合点
    pub special: Option<f64>, //特別試験の成績
    pub priorities: [Did; Config::PRIORITIES], //第1〜第3志望の学科
}

impl Applicant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    // 1行分の読み込み。列は空白区切り。
    //   gpa:   名 姓 GPA 志望1 志望2 志望3
    //   exams: 名 姓 科目... 特別試験 志望1 志望2 志望3  （特別試験が "-" なら無し）
    pub fn from_line(line: &str, id: Aid, conf: &Config, departments: &[Department]) -> Result<Self, RecordError> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let scores = match conf.format {
            InputFormat::Gpa => 1,
            InputFormat::Exams => conf.subjects.len() + 1,
        };
        let expected = 2 + scores + Config::PRIORITIES;
        if cols.len() != expected {
            return Err(RecordError::Columns { expected, found: cols.len() });
        }

        let mut results = HashMap::new();
        let mut aggregate = None;
        let special;
        match conf.format {
            InputFormat::Gpa => {
                aggregate = Some(parse_score("gpa", cols[2])?);
                special = None;
            }
            InputFormat::Exams => {
                for (subject, value) in conf.subjects.iter().zip(&cols[2..]) {
                    results.insert(subject.clone(), parse_score(subject, value)?);
                }
                special = match cols[2 + conf.subjects.len()] {
                    "-" => None,
                    value => Some(parse_score("special", value)?),
                };
            }
        }

        let mut priorities = [0; Config::PRIORITIES];
        for (slot, name) in priorities.iter_mut().zip(&cols[2 + scores..]) {
            *slot = department::find(departments, name)
                .ok_or_else(|| RecordError::UnknownDepartment(name.to_string()))?;
        }

        Ok(Self {
            id,
            first_name: cols[0].to_string(),
            last_name: cols[1].to_string(),
            results,
            aggregate,
            special,
            priorities,
        })
    }

    // 受験者を読み込み、各学科の選抜リストに登録する。
    // 読めない行は警告を出して読み飛ばす。
    pub fn from_reader<R: BufRead>(reader: R, conf: &Config, departments: &mut [Department]) -> Result<Vec<Self>> {
        let mut applicants: Vec<Self> = Vec::new();
        let mut skipped = 0;
        for (n, line) in reader.lines().enumerate() {
            let line = line.context("applicants cannot be read")?;
            if line.trim().is_empty() {
                continue;
            }
            match Applicant::from_line(&line, applicants.len(), conf, departments) {
                Ok(applicant) => {
                    department::register(departments, &applicant);
                    applicants.push(applicant);
                }
                Err(e) => {
                    skipped += 1;
                    warn!(line = n + 1, error = %e, "skipping applicant");
                }
            }
        }
        info!(applicants = applicants.len(), skipped, "applicants loaded");
        Ok(applicants)
    }

    pub fn from_path(path: &str, conf: &Config, departments: &mut [Department]) -> Result<Vec<Self>> {
        let file = File::open(path).with_context(|| format!("applicants file `{}` not found", path))?;
        Applicant::from_reader(BufReader::new(file), conf, departments)
    }
}

fn parse_score(column: &str, value: &str) -> Result<f64, RecordError> {
    let score = value.parse::<f64>().map_err(|_| RecordError::Number {
        column: column.to_string(),
        value: value.to_string(),
    })?;
    if !score.is_finite() {
        return Err(RecordError::NonFinite { column: column.to_string(), value: value.to_string() });
    }
    Ok(score)
}

const FIRST_NAMES: [&str; 16] = [
    "Laura", "Willie", "Mike", "Jermine", "Hope", "Kalvin", "Elsie", "Fredrick",
    "Ali", "Dallas", "Randi", "Marquis", "Tawana", "Estelle", "Jaylen", "Nevin",
];
const LAST_NAMES: [&str; 16] = [
    "Spungen", "Hatsue", "Lewis", "Yeatman", "Kyler", "Anderson", "Backlund", "Poteet",
    "Zeigler", "Mcbride", "Lefort", "Thompson", "Brockhouse", "Walton", "Halenar", "Ellis",
];

// 乱数シードから受験者データ（入力ファイルの行）を生成する。
// 成績は正規分布（0〜100に丸め）、志望は学科一覧から重複ありで3つ。
pub fn generate(conf: &Config) -> Result<Vec<String>> {
    conf.validate_generator()?;
    let mut rng = Xoshiro256StarStar::seed_from_u64(conf.random_seed);
    let normal = Normal::new(conf.score_mu, conf.score_sigma)
        .with_context(|| format!("invalid score distribution mu={} sigma={}", conf.score_mu, conf.score_sigma))?;
    let names: Vec<&str> = conf.departments.iter().map(|d| d.name.as_str()).collect();

    let draw = |rng: &mut Xoshiro256StarStar| normal.sample(rng).max(0.0).min(100.0).round();
    let lines = (0..conf.generate_number)
        .map(|_| {
            let mut cols: Vec<String> = vec![
                FIRST_NAMES.choose(&mut rng).unwrap_or(&"Anon").to_string(),
                LAST_NAMES.choose(&mut rng).unwrap_or(&"Anon").to_string(),
            ];
            match conf.format {
                InputFormat::Gpa => cols.push(format!("{:.2}", draw(&mut rng) * 4.0 / 100.0)),
                InputFormat::Exams => {
                    for _ in &conf.subjects {
                        cols.push(format!("{}", draw(&mut rng)));
                    }
                    if rng.gen_bool(conf.special_prob) {
                        cols.push(format!("{}", draw(&mut rng)));
                    } else {
                        cols.push("-".to_string());
                    }
                }
            }
            for _ in 0..Config::PRIORITIES {
                cols.push(names.choose(&mut rng).unwrap_or(&"").to_string());
            }
            cols.join(" ")
        })
        .collect();
    Ok(lines)
}
