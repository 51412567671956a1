mod common;

use assert_cmd::prelude::*;
use common::vaultport_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const ID1: &str = "0123456789abcdef0123456789abcdef";
const ID2: &str = "89abcdef0123456789abcdef01234567";

#[test]
fn test_dry_run_mutates_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let page_name = format!("Home {ID1}.md");
    let dir_name = format!("Projects {ID2}");
    let body = format!("# Home\n\n[Tasks](Tasks%20{ID2}.md)\n");
    fs::create_dir(temp.path().join(&dir_name))?;
    fs::write(temp.path().join(&page_name), &body)?;
    fs::write(temp.path().join(format!("Tasks {ID2}.md")), "# Tasks\n")?;

    vaultport_cmd()
        .arg(temp.path().to_str().unwrap())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run, nothing was modified"))
        .stdout(predicate::str::contains("Documents processed: 2"))
        .stdout(predicate::str::contains("Files renamed: 2"))
        .stdout(predicate::str::contains("Directories renamed: 1"));

    // Everything is exactly as it was.
    assert!(temp.path().join(&page_name).exists());
    assert!(temp.path().join(&dir_name).is_dir());
    assert_eq!(fs::read_to_string(temp.path().join(&page_name))?, body);
    assert!(!temp.path().join("Home.md").exists());

    temp.close()?;
    Ok(())
}

#[test]
fn test_dry_run_never_prompts() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    fs::write(temp.path().join(format!("Home {ID1}.md")), "# Home\n")?;

    // No -y and no stdin: the run must still complete.
    vaultport_cmd()
        .arg(temp.path().to_str().unwrap())
        .arg("-D")
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversion report"));

    temp.close()?;
    Ok(())
}

#[test]
fn test_dry_run_reports_planned_merges() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let dir = temp.path().join(format!("Projects {ID1}"));
    fs::create_dir(&dir)?;
    fs::write(dir.join("diagram.png"), b"png")?;
    fs::write(temp.path().join(format!("Projects {ID1}.md")), "# Projects\n")?;

    vaultport_cmd()
        .arg(temp.path().to_str().unwrap())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Attachments merged: 1"));

    assert!(temp.path().join(format!("Projects {ID1}.md")).exists());

    temp.close()?;
    Ok(())
}
