use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::planner_config::FileConfig;
use crate::PlanResult;

pub const EXPORT_FILE_NAME: &str = "diet_plan.txt";
pub const EXPORT_HEADER: &str = "YOUR PERSONALIZED DIET PLAN";
const SEPARATOR_WIDTH: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("File {0} exists, but overwrite is disabled")]
    Exists(PathBuf),
    #[error("Unable to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Plain-text rendering of a plan for download.
pub fn format_diet_plan_for_txt(diet_plan: &PlanResult) -> String {
    let mut txt_content = String::from(EXPORT_HEADER);
    txt_content.push('\n');
    txt_content.push_str(&"=".repeat(SEPARATOR_WIDTH));
    txt_content.push_str("\n\n");
    txt_content.push_str(diet_plan.result());
    txt_content
}

/// Writes `diet_plan.txt` into the configured directory. Returns `None`
/// when saving is turned off.
pub fn write_diet_plan(
    diet_plan: &PlanResult,
    file_config: &FileConfig,
) -> Result<Option<PathBuf>, ExportError> {
    if !file_config.save_to_file {
        info!("Save file config is disabled, ignoring");
        return Ok(None);
    }

    let dir = Path::new(&file_config.output_dir);
    let path = dir.join(EXPORT_FILE_NAME);
    if path.exists() {
        if !file_config.overwrite {
            return Err(ExportError::Exists(path));
        }
        info!("File: {} exists, overwriting", path.display());
    }

    let io_error = |source: io::Error| ExportError::Io {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    let file = File::create(&path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(format_diet_plan_for_txt(diet_plan).as_bytes())
        .map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    info!("Saved diet plan to {}", path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(text: &str) -> PlanResult {
        PlanResult::from_value(json!({ "result": text })).unwrap()
    }

    fn file_config(dir: &Path, save_to_file: bool, overwrite: bool) -> FileConfig {
        FileConfig {
            output_dir: String::from(dir.to_str().unwrap()),
            save_to_file,
            overwrite,
        }
    }

    #[test]
    fn wraps_result_with_header() {
        assert_eq!(
            format_diet_plan_for_txt(&plan("Day 1: ...")),
            "YOUR PERSONALIZED DIET PLAN\n==============================\n\nDay 1: ..."
        );
    }

    #[test]
    fn keeps_non_ascii_text() {
        let txt = format_diet_plan_for_txt(&plan("Petit-déjeuner: crème 🥗"));
        assert!(txt.ends_with("Petit-déjeuner: crème 🥗"));
    }

    #[test]
    fn writes_export_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let path = write_diet_plan(&plan("Day 1"), &file_config(&out, true, false))
            .unwrap()
            .unwrap();
        assert_eq!(path, out.join(EXPORT_FILE_NAME));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(EXPORT_HEADER));
        assert!(written.ends_with("Day 1"));
    }

    #[test]
    fn respects_overwrite_flag() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(EXPORT_FILE_NAME), "old").unwrap();

        let err = write_diet_plan(&plan("new"), &file_config(dir.path(), true, false)).unwrap_err();
        assert!(matches!(err, ExportError::Exists(_)));

        write_diet_plan(&plan("new"), &file_config(dir.path(), true, true)).unwrap();
        let written = fs::read_to_string(dir.path().join(EXPORT_FILE_NAME)).unwrap();
        assert!(written.ends_with("new"));
    }

    #[test]
    fn skips_when_saving_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let saved = write_diet_plan(&plan("x"), &file_config(dir.path(), false, true)).unwrap();
        assert!(saved.is_none());
        assert!(!dir.path().join(EXPORT_FILE_NAME).exists());
    }
}
