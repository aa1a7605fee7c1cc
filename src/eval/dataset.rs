use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::EvalError, types::Step};

/// One conversation to score: the route taken and the expected route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub route: Vec<Step>,
    pub reference_route: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<EvalCase>),
    One(EvalCase),
}

impl From<OneOrMany> for Vec<EvalCase> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(cases) => cases,
            OneOrMany::One(case) => vec![case],
        }
    }
}

fn is_case_file(path: &Path) -> bool {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    matches!(ext, "json" | "jsonl" | "yaml" | "yml")
}

/// Loads cases from a file, or from every case file directly inside a directory.
///
/// Directory results are sorted by id. Cases without an id are named
/// `<file stem>-<index>`, the index zero-padded to the file's case count.
pub fn load_cases(path: impl AsRef<Path>) -> Result<Vec<EvalCase>, EvalError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return load_case_file(path);
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(path)? {
        let p = entry?.path();
        if p.is_file() && is_case_file(&p) {
            files.push(p);
        }
    }
    files.sort();

    let mut cases = Vec::new();
    for file in files {
        cases.extend(load_case_file(&file)?);
    }
    cases.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(cases)
}

pub fn load_case_file(path: &Path) -> Result<Vec<EvalCase>, EvalError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let content = fs::read_to_string(path)?;
    let mut cases: Vec<EvalCase> = match ext {
        "json" => serde_json::from_str::<OneOrMany>(&content)?.into(),
        "jsonl" => parse_jsonl(path, &content)?,
        "yaml" | "yml" => serde_yaml::from_str::<OneOrMany>(&content)?.into(),
        other => {
            return Err(EvalError::InvalidDataset {
                path: path.to_path_buf(),
                message: format!("unsupported extension: {other:?}"),
            })
        }
    };

    // Zero-padded so id order matches file order.
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("case");
    let width = cases.len().saturating_sub(1).to_string().len();
    for (index, case) in cases.iter_mut().enumerate() {
        if case.id.is_empty() {
            case.id = format!("{stem}-{index:0width$}");
        }
    }
    Ok(cases)
}

fn parse_jsonl(path: &Path, content: &str) -> Result<Vec<EvalCase>, EvalError> {
    let mut cases = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let case = serde_json::from_str(line).map_err(|e| EvalError::InvalidDataset {
            path: path.to_path_buf(),
            message: format!("line {}: {e}", line_no + 1),
        })?;
        cases.push(case);
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_case_parses_from_json() {
        let json = r#"{
            "id": "refund",
            "route": [{"name": "A", "type": "agent"}],
            "reference_route": [{"name": "A", "type": "agent"}, {"name": "B", "type": "agent"}]
        }"#;
        let cases: Vec<EvalCase> = serde_json::from_str::<OneOrMany>(json).unwrap().into();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "refund");
        assert_eq!(cases[0].route, vec![Step::agent("A")]);
        assert_eq!(cases[0].query, None);
    }

    #[test]
    fn case_list_parses_from_yaml() {
        let yaml = "\
- query: card blocked
  route:
    - { name: banking_agent, type: agent }
  reference_route:
    - { name: credit_card_agent, type: agent }
- route: []
  reference_route: []
";
        let cases: Vec<EvalCase> = serde_yaml::from_str::<OneOrMany>(yaml).unwrap().into();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].query.as_deref(), Some("card blocked"));
        assert!(cases[1].route.is_empty());
    }
}
