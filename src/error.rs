use thiserror::Error;

// 受験者1行分の読み込みエラー。該当行は読み飛ばす。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("expected {expected} columns, found {found}")]
    Columns { expected: usize, found: usize },

    #[error("column `{column}`: `{value}` is not a number")]
    Number { column: String, value: String },

    #[error("column `{column}`: `{value}` is not a finite number")]
    NonFinite { column: String, value: String },

    #[error("unknown department `{0}`")]
    UnknownDepartment(String),
}
