use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::applicant::Applicant;
use crate::department::Department;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub full_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roster {
    pub department: String,
    pub entries: Vec<Entry>,
}

// 選抜結果。学科名の昇順、各学科内は成績順。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionResult {
    pub capacity: i64,
    pub rosters: Vec<Roster>,
}

// 学科別集計CSVの1行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSummary {
    pub department: String,
    pub capacity: i64,
    pub admitted: usize,
    pub lowest: Option<f64>, //最低合格点
    pub mean: Option<f64>, //合格者平均点
}

impl Entry {
    pub fn line(&self) -> String {
        format!("{} {:.2}", self.full_name, self.score)
    }
}

impl Roster {
    pub fn summary(&self, capacity: i64) -> RosterSummary {
        let admitted = self.entries.len();
        let lowest = self.entries.last().map(|e| e.score);
        let mean = if admitted == 0 {
            None
        } else {
            Some(self.entries.iter().map(|e| e.score).sum::<f64>() / admitted as f64)
        };
        RosterSummary { department: self.department.clone(), capacity, admitted, lowest, mean }
    }

    // 学科ごとの出力ファイル名
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.department.to_lowercase())
    }
}

impl AdmissionResult {
    // 選抜後の各学科の合格者を成績順に並べ直して確定する
    pub fn collect(departments: &[Department], applicants: &[Applicant], capacity: i64) -> Self {
        let mut rosters: Vec<Roster> = departments.iter()
            .map(|d| Roster {
                department: d.name.clone(),
                entries: d.ranked_roster(applicants).into_iter()
                    .map(|r| Entry { full_name: r.full_name, score: r.score })
                    .collect(),
            })
            .collect();
        rosters.sort_by(|a, b| a.department.cmp(&b.department));
        Self { capacity, rosters }
    }

    pub fn roster(&self, department: &str) -> Option<&Roster> {
        self.rosters.iter().find(|r| r.department == department)
    }

    pub fn admitted(&self) -> usize {
        self.rosters.iter().map(|r| r.entries.len()).sum()
    }

    // 学科別ファイル、集計CSV、全体のJSONをdirに書き出す
    pub fn write_to_dir(&self, dir: &str) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("dir `{}` cannot create", dir))?;
        for roster in &self.rosters {
            let path = format!("{}/{}", dir.trim_end_matches('/'), roster.file_name());
            let body: String = roster.entries.iter().map(|e| e.line() + "\n").collect();
            fs::write(&path, body).with_context(|| format!("`{}` cannot write", path))?;
        }

        let path = format!("{}/summary.csv", dir.trim_end_matches('/'));
        let mut wtr = WriterBuilder::new().from_path(&path)
            .with_context(|| format!("`{}` cannot write", path))?;
        for roster in &self.rosters {
            wtr.serialize(roster.summary(self.capacity))?;
        }
        wtr.flush()?;

        let path = format!("{}/result.json", dir.trim_end_matches('/'));
        let file = File::create(&path).with_context(|| format!("`{}` cannot write", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;

        info!(dir, departments = self.rosters.len(), "result files written");
        Ok(())
    }
}

// 画面出力：学科名、合格者の「氏名 得点」、空行
impl fmt::Display for AdmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for roster in &self.rosters {
            writeln!(f, "{}", roster.department)?;
            for entry in &roster.entries {
                writeln!(f, "{}", entry.line())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreRule;
    use std::collections::HashMap;

    fn applicant(id: usize, first: &str, last: &str, gpa: f64) -> Applicant {
        Applicant {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            results: HashMap::new(),
            aggregate: Some(gpa),
            special: None,
            priorities: [0, 0, 0],
        }
    }

    fn sample() -> AdmissionResult {
        let applicants = vec![
            applicant(0, "Mike", "Lewis", 3.5),
            applicant(1, "Ann", "Lee", 3.9),
            applicant(2, "Al", "Zed", 3.5),
        ];
        // 名前順でない学科一覧でも出力は学科名順
        let mut physics = Department::new(1, "Physics", ScoreRule::Aggregate);
        physics.roster = vec![0, 1];
        let mut biotech = Department::new(0, "Biotech", ScoreRule::Aggregate);
        biotech.roster = vec![2];
        let chemistry = Department::new(2, "Chemistry", ScoreRule::Aggregate);
        AdmissionResult::collect(&[physics, biotech, chemistry], &applicants, 2)
    }

    #[test]
    fn rosters_are_sorted_for_display() {
        let result = sample();
        let names: Vec<&str> = result.rosters.iter().map(|r| r.department.as_str()).collect();
        assert_eq!(names, vec!["Biotech", "Chemistry", "Physics"]);

        let physics = result.roster("Physics").unwrap();
        assert_eq!(physics.entries[0], Entry { full_name: "Ann Lee".to_string(), score: 3.9 });
        assert_eq!(physics.entries[1].full_name, "Mike Lewis");
        assert!(result.roster("Chemistry").unwrap().entries.is_empty());
        assert!(result.roster("Law").is_none());
        assert_eq!(result.admitted(), 3);
    }

    #[test]
    fn display_matches_console_format() {
        let text = sample().to_string();
        assert_eq!(text, "Biotech\nAl Zed 3.50\n\nChemistry\n\nPhysics\nAnn Lee 3.90\nMike Lewis 3.50\n\n");
    }

    #[test]
    fn summary_reports_lowest_and_mean() {
        let result = sample();
        let s = result.roster("Physics").unwrap().summary(result.capacity);
        assert_eq!(s.admitted, 2);
        assert_eq!(s.lowest, Some(3.5));
        assert!((s.mean.unwrap() - 3.7).abs() < 1e-9);
        assert_eq!(result.roster("Chemistry").unwrap().summary(2).mean, None);
    }

    #[test]
    fn writes_result_files() {
        let dir = std::env::temp_dir().join(format!("admission-result-{}", std::process::id()));
        let dir = dir.to_str().unwrap().to_string();
        let result = sample();
        result.write_to_dir(&dir).unwrap();

        assert_eq!(fs::read_to_string(format!("{}/physics.txt", dir)).unwrap(), "Ann Lee 3.90\nMike Lewis 3.50\n");
        assert_eq!(fs::read_to_string(format!("{}/chemistry.txt", dir)).unwrap(), "");
        let csv = fs::read_to_string(format!("{}/summary.csv", dir)).unwrap();
        assert!(csv.starts_with("department,capacity,admitted,lowest,mean\n"));
        assert!(csv.contains("Biotech,2,1,3.5,3.5\n"));
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(format!("{}/result.json", dir)).unwrap()).unwrap();
        assert_eq!(json["rosters"][2]["entries"][0]["full_name"], "Ann Lee");
        fs::remove_dir_all(&dir).unwrap();
    }
}
