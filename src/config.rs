use std::collections::HashSet;
use std::fs;
use std::io::BufRead;
use anyhow::{bail, Context, Result};
use clap::{App, Arg, ArgMatches, SubCommand, crate_version};
use serde::Deserialize;
use once_cell::sync::OnceCell;
use chrono::Local;
use tracing::info;

// グローバルな設定情報オブジェクト
pub static CONFIG: OnceCell<Config> = OnceCell::new();

// 入力ファイルの列構成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Gpa,   // 名 姓 GPA 第1志望 第2志望 第3志望
    Exams, // 名 姓 科目... 特別試験 第1志望 第2志望 第3志望
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepartmentConf {
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<String>, //平均をとる科目。空ならGPA等の総合点を使う
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub applicants_path: String,
    pub format: InputFormat,
    pub subjects: Vec<String>,
    pub departments: Vec<DepartmentConf>,

    pub capacity: Option<i64>,

    pub output_dir_base: String,
    pub logging: bool,

    pub random_seed: u64,
    pub generate_number: usize,
    pub score_mu: f64,
    pub score_sigma: f64,
    pub special_prob: f64,
}

// 実行するコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Admit,
    Generate { output: Option<String> },
}

impl Default for Config {
    fn default() -> Self {
        let dept = |name: &str, subjects: &[&str]| DepartmentConf {
            name: name.to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            applicants_path: "applicants.txt".to_string(),
            format: InputFormat::Exams,
            subjects: ["physics", "chemistry", "math", "computer_science"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            departments: vec![
                dept("Biotech", &["chemistry", "physics"]),
                dept("Chemistry", &["chemistry"]),
                dept("Engineering", &["computer_science", "math"]),
                dept("Mathematics", &["math"]),
                dept("Physics", &["physics", "math"]),
            ],
            capacity: None,
            output_dir_base: "out".to_string(),
            logging: false,
            random_seed: 0,
            generate_number: 100,
            score_mu: 70.0,
            score_sigma: 15.0,
            special_prob: 0.5,
        }
    }
}

impl Config {
    // 志望数（= 選抜の回数）
    pub const PRIORITIES: usize = 3;

    ///////////////////////////////////////////////////////
    // Configオブジェクト生成。コマンドライン引数と設定ファイルから。
    // Configオブジェクトは一度だけstaticで生成され、その後不変。
    pub fn from_args() -> Result<Command> {
        let matches = App::new("university admission")
            .version(crate_version!())
            .arg(Arg::with_name("CONFIG_FILE")
                .help("config toml file")
            )
            .arg(Arg::with_name("applicants")
                .help("applicants file")
                .short("a")
                .long("applicants")
                .takes_value(true)
            )
            .arg(Arg::with_name("capacity")
                .help("seats per department (read from stdin when omitted)")
                .short("c")
                .long("capacity")
                .takes_value(true)
            )
            .arg(Arg::with_name("output")
                .help("base dir for result files")
                .short("o")
                .long("output")
                .takes_value(true)
            )
            .arg(Arg::with_name("logging")
                .help("write result files")
                .short("l")
                .long("log")
            )
            .subcommand(SubCommand::with_name("generate")
                .about("write a synthetic applicants file")
                .arg(Arg::with_name("OUTPUT")
                    .help("output file (stdout when omitted)")
                )
                .arg(Arg::with_name("CONFIG_FILE")
                    .help("config toml file")
                    .long("config")
                    .takes_value(true)
                )
                .arg(Arg::with_name("number")
                    .help("number of applicants")
                    .short("n")
                    .long("number")
                    .takes_value(true)
                )
                .arg(Arg::with_name("seed")
                    .help("random seed")
                    .short("s")
                    .long("seed")
                    .takes_value(true)
                )
            )
            .get_matches();

        if let Some(sub) = matches.subcommand_matches("generate") {
            let mut cfg = Config::load(sub.value_of("CONFIG_FILE"))?;
            if let Some(n) = sub.value_of("number") {
                cfg.generate_number = n.parse::<usize>()
                    .with_context(|| format!("invalid applicant number `{}`", n))?;
            }
            if let Some(seed) = sub.value_of("seed") {
                cfg.random_seed = seed.parse::<u64>()
                    .with_context(|| format!("invalid random seed `{}`", seed))?;
            }
            info!(number = cfg.generate_number, seed = cfg.random_seed, "generating applicants");
            let output = sub.value_of("OUTPUT").map(|s| s.to_string());
            Config::install(cfg)?;
            return Ok(Command::Generate { output });
        }

        let mut cfg = Config::load(matches.value_of("CONFIG_FILE"))?;
        cfg.apply_overrides(&matches)?;
        Config::install(cfg)?;
        Ok(Command::Admit)
    }

    // 設定ファイルの読み込み。指定がなければ既定値。
    pub fn load(filename: Option<&str>) -> Result<Self> {
        let cfg = match filename {
            Some(filename) => {
                info!(file = filename, "loading config");
                let contents = fs::read_to_string(filename)
                    .with_context(|| format!("config file `{}` cannot be read", filename))?;
                Config::from_toml_str(&contents)
                    .with_context(|| format!("config file `{}` is invalid", filename))?
            }
            None => Config::default(),
        };
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_overrides(&mut self, matches: &ArgMatches) -> Result<()> {
        if let Some(path) = matches.value_of("applicants") {
            self.applicants_path = path.to_string();
        }
        // 定員の指定があれば設定ファイルの指定を上書き
        if let Some(capacity) = matches.value_of("capacity") {
            self.capacity = Some(parse_capacity(capacity)?);
        }
        if let Some(dir) = matches.value_of("output") {
            self.output_dir_base = dir.to_string();
        }
        if matches.is_present("logging") {
            self.logging = true;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.departments.is_empty() {
            bail!("at least one department must be configured");
        }
        let mut names = HashSet::new();
        for dept in &self.departments {
            if !names.insert(dept.name.as_str()) {
                bail!("department `{}` is configured twice", dept.name);
            }
            if self.format == InputFormat::Exams {
                if let Some(s) = dept.subjects.iter().find(|s| !self.subjects.contains(*s)) {
                    bail!("department `{}` uses subject `{}` which is not an input column", dept.name, s);
                }
            }
        }
        self.validate_generator()
    }

    // 合成データ生成のパラメータ確認
    pub fn validate_generator(&self) -> Result<()> {
        if !self.score_mu.is_finite() {
            bail!("score_mu must be finite, got {}", self.score_mu);
        }
        if !self.score_sigma.is_finite() || self.score_sigma < 0.0 {
            bail!("score_sigma must be a finite non-negative number, got {}", self.score_sigma);
        }
        if !(0.0..=1.0).contains(&self.special_prob) {
            bail!("special_prob must be within 0..=1, got {}", self.special_prob);
        }
        Ok(())
    }

    fn install(cfg: Config) -> Result<()> {
        CONFIG.set(cfg).map_err(|_| anyhow::anyhow!("config already initialized"))
    }

    // 生成済みのConfigオブジェクトを返す
    pub fn get() -> &'static Config {
        CONFIG.get().expect("Not initalized Config")
    }

    // 定員。設定になければ標準入力から1行読む。
    pub fn capacity_or_read<R: BufRead>(&self, input: R) -> Result<i64> {
        if let Some(capacity) = self.capacity {
            return Ok(capacity);
        }
        let line = input.lines().next()
            .context("capacity was not given")?
            .context("capacity cannot be read")?;
        parse_capacity(&line)
    }

    //データ出力ディレクトリを生成し、その相対パス名を返す。
    pub fn get_output_dirname(&self, capacity: i64) -> Result<String> {
        let prefix = format!("c{}_", capacity);
        let new_dir = self.output_dir_base.clone() + "/" + &prefix + &Local::now().format("%Y_%m%d_%H%M%S").to_string();
        create_new_dir(&self.output_dir_base, &new_dir)?;
        Ok(new_dir + "/")
    }
}

// 出力先は毎回新規作成。既に存在すればエラー。
fn create_new_dir(base: &str, new_dir: &str) -> Result<()> {
    fs::create_dir_all(base).with_context(|| format!("dir `{}` cannot create", base))?;
    fs::create_dir(new_dir).with_context(|| format!("dir `{}` cannot create", new_dir))?;
    Ok(())
}

fn parse_capacity(s: &str) -> Result<i64> {
    s.trim().parse::<i64>().with_context(|| format!("invalid capacity `{}`", s.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_five_departments() {
        let cfg = Config::default();
        let names: Vec<&str> = cfg.departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Biotech", "Chemistry", "Engineering", "Mathematics", "Physics"]);
        assert_eq!(cfg.format, InputFormat::Exams);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg = Config::from_toml_str(r#"
            format = "gpa"
            capacity = 3
            logging = true

            [[departments]]
            name = "Mathematics"

            [[departments]]
            name = "Physics"
        "#).unwrap();
        assert_eq!(cfg.format, InputFormat::Gpa);
        assert_eq!(cfg.capacity, Some(3));
        assert!(cfg.logging);
        assert_eq!(cfg.departments.len(), 2);
        assert!(cfg.departments[0].subjects.is_empty());
        assert_eq!(cfg.applicants_path, "applicants.txt");
    }

    #[test]
    fn duplicate_department_is_rejected() {
        let err = Config::from_toml_str(r#"
            [[departments]]
            name = "Physics"
            subjects = ["physics"]

            [[departments]]
            name = "Physics"
            subjects = ["math"]
        "#).unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn unknown_subject_is_rejected_for_exam_input() {
        let err = Config::from_toml_str(r#"
            [[departments]]
            name = "Arts"
            subjects = ["painting"]
        "#).unwrap_err();
        assert!(err.to_string().contains("painting"));
    }

    #[test]
    fn generator_parameters_are_validated() {
        let err = Config::from_toml_str("score_sigma = -2.0").unwrap_err();
        assert!(err.to_string().contains("score_sigma"));
        let err = Config::from_toml_str("special_prob = 1.2").unwrap_err();
        assert!(err.to_string().contains("special_prob"));
        assert!(Config::from_toml_str("score_sigma = 0.0\nspecial_prob = 0.0").is_ok());
    }

    #[test]
    fn output_dir_is_never_reused() {
        let base = std::env::temp_dir().join(format!("admission-out-{}", std::process::id()));
        let base = base.to_str().unwrap().to_string();
        let dir = format!("{}/c2_run", base);
        create_new_dir(&base, &dir).unwrap();
        assert!(create_new_dir(&base, &dir).is_err());
        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn capacity_is_read_when_not_configured() {
        let cfg = Config::default();
        assert_eq!(cfg.capacity_or_read(" 7\n".as_bytes()).unwrap(), 7);
        assert!(cfg.capacity_or_read("seven\n".as_bytes()).is_err());
        assert!(cfg.capacity_or_read("".as_bytes()).is_err());

        let cfg = Config { capacity: Some(2), ..Config::default() };
        assert_eq!(cfg.capacity_or_read("".as_bytes()).unwrap(), 2);
    }
}
