mod allocator;
mod applicant;
mod config;
mod department;
mod error;
mod result;
mod score;

use std::fs;
use std::io::{self, BufRead};
use std::time::Instant;
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::applicant::Applicant;
use crate::config::{Command, Config};
use crate::department::Department;
use crate::result::AdmissionResult;

pub fn main() -> Result<()> {
    // 診断ログは標準エラーへ。標準出力は選抜結果のみ。
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let begin = Instant::now();

    match Config::from_args()? {
        Command::Generate { output } => {
            let lines = applicant::generate(Config::get())?;
            let body: String = lines.iter().map(|l| l.clone() + "\n").collect();
            match output {
                Some(path) => fs::write(&path, body).with_context(|| format!("`{}` cannot write", path))?,
                None => print!("{}", body),
            }
        }
        Command::Admit => {
            let conf = Config::get();
            let capacity = conf.capacity_or_read(io::stdin().lock())?;
            let file = fs::File::open(&conf.applicants_path)
                .with_context(|| format!("applicants file `{}` not found", conf.applicants_path))?;
            let result = admit(conf, capacity, io::BufReader::new(file))?;
            print!("{}", result);

            if conf.logging {
                let dir = conf.get_output_dirname(capacity)?;
                result.write_to_dir(&dir)?;
            }
        }
    }

    info!(elapsed = ?begin.elapsed(), "finished");
    Ok(())
}

// 読み込み→3回の選抜→結果確定
pub fn admit<R: BufRead>(conf: &Config, capacity: i64, input: R) -> Result<AdmissionResult> {
    let mut departments = Department::from_conf(conf);
    let applicants = Applicant::from_reader(input, conf, &mut departments)?;
    let assignment = allocator::allocate(&mut departments, &applicants, capacity);
    info!(capacity, admitted = assignment.admitted(), applicants = applicants.len(), "allocation finished");
    Ok(AdmissionResult::collect(&departments, &applicants, capacity))
}
