//! Task and directory loading from JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use taskscale_core::{normalize_all, Directory, NormalizedTask, Person};
use walkdir::WalkDir;

/// Files to read for `path`: the file itself, or every `*.json` below a
/// directory in path order.
pub fn scan_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("input not found: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_json(path: &Path) -> Result<Value> {
    let mut bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    simd_json::from_slice::<Value>(&mut bytes)
        .with_context(|| format!("invalid JSON in {}", path.display()))
}

/// The task list inside a document: the document itself when it is an
/// array, or its `tasks` member.
fn task_list(document: &Value) -> &Value {
    match document {
        Value::Object(map) => map.get("tasks").unwrap_or(document),
        _ => document,
    }
}

fn parse_tasks(path: &Path) -> Result<Vec<NormalizedTask>> {
    let document = read_json(path)?;
    normalize_all(task_list(&document)).with_context(|| format!("no task list in {}", path.display()))
}

/// Load and normalize every task under `path`. Files are parsed in parallel;
/// the result keeps file order.
pub fn load_tasks(path: &Path) -> Result<Vec<NormalizedTask>> {
    let files = scan_inputs(path)?;
    let parsed: Vec<Vec<NormalizedTask>> = files
        .par_iter()
        .map(|file| parse_tasks(file))
        .collect::<Result<Vec<_>>>()?;

    let tasks: Vec<NormalizedTask> = parsed.into_iter().flatten().collect();
    tracing::debug!(files = files.len(), tasks = tasks.len(), "loaded {}", path.display());
    Ok(tasks)
}

/// Load users and reporters for label resolution. Accepts an array of
/// people (users only) or `{"users": [...], "reporters": [...]}`. Reporter
/// names carried on the tasks fill any gaps.
pub fn load_directory(path: Option<&Path>, tasks: &[NormalizedTask]) -> Result<Directory> {
    let mut directory = match path {
        None => Directory::default(),
        Some(path) => {
            let document = read_json(path)?;
            let (users, reporters) = match document {
                Value::Array(_) => (people(document)?, Vec::new()),
                Value::Object(mut map) => (
                    people(map.remove("users").unwrap_or(Value::Null))?,
                    people(map.remove("reporters").unwrap_or(Value::Null))?,
                ),
                _ => bail!("{} is not a user list", path.display()),
            };
            Directory::new(users, reporters)
        }
    };
    directory.learn_reporters(tasks);
    Ok(directory)
}

fn people(value: Value) -> Result<Vec<Person>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).context("invalid person entry")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_array_and_wrapped_documents() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.json"),
            r#"[{"markets": ["ro"], "timeInHours": 1}]"#,
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::write(
            tmp.path().join("nested/b.json"),
            r#"{"tasks": [{"markets": ["bg"]}, {"markets": ["ie"]}]}"#,
        )
        .unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let tasks = load_tasks(tmp.path()).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].markets, vec!["RO".to_string()]);
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("broken.json");
        fs::write(&file, "{ not json").unwrap();

        let err = load_tasks(&file).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }

    #[test]
    fn test_non_array_task_list_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("object.json");
        fs::write(&file, r#"{"tasks": {"id": 1}}"#).unwrap();
        assert!(load_tasks(&file).is_err());
    }

    #[test]
    fn test_missing_input() {
        let tmp = TempDir::new().unwrap();
        assert!(load_tasks(&tmp.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_load_directory_shapes() {
        let tmp = TempDir::new().unwrap();
        let users = tmp.path().join("users.json");
        fs::write(&users, r#"[{"id": "u1", "name": "Ana"}]"#).unwrap();
        let directory = load_directory(Some(&users), &[]).unwrap();
        assert_eq!(directory.user("u1").map(|p| p.display_name()), Some("Ana"));

        let both = tmp.path().join("both.json");
        fs::write(
            &both,
            r#"{"users": [{"id": "u1", "email": "u1@example.com"}], "reporters": [{"id": "r1", "name": "Rea"}]}"#,
        )
        .unwrap();
        let directory = load_directory(Some(&both), &[]).unwrap();
        assert_eq!(
            directory.user("u1").map(|p| p.display_name()),
            Some("u1@example.com")
        );
        assert!(directory.reporter("r1").is_some());
    }
}
