//! Dated output paths and the JSON artifact written at the end of a run.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{run_config::OutputSink, Error};

pub const OUTPUT_DIR_NAME: &str = "scraped_data";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns `<base_directory>/scraped_data/<spider>_<YYYY-MM-DD>.json`,
/// creating `scraped_data` when it is missing.
pub fn resolve(
    spider_identifier: &str,
    base_directory: &Path,
    today: NaiveDate,
) -> Result<PathBuf, Error> {
    let output_dir = base_directory.join(OUTPUT_DIR_NAME);
    fs::create_dir_all(&output_dir).map_err(|err| {
        tracing::error!("failed creating output dir '{}'", output_dir.display());
        Error::filesystem(&output_dir, err)
    })?;
    Ok(output_dir.join(artifact_file_name(spider_identifier, today)))
}

pub fn artifact_file_name(spider_identifier: &str, date: NaiveDate) -> String {
    format!("{}_{}.json", spider_identifier, date.format(DATE_FORMAT))
}

/// Writes `records` as an indented JSON array to the sink path.
///
/// The array goes to a sibling `.part` file first and is renamed over the
/// target, so readers never see a half-written artifact from this run.
pub fn write_artifact<T: Serialize>(sink: &OutputSink, records: &[T]) -> Result<(), Error> {
    let path = &sink.path;
    if path.exists() && !sink.overwrite {
        return Err(Error::filesystem(
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "artifact exists"),
        ));
    }
    let mut part = path.clone().into_os_string();
    part.push(".part");
    let part = PathBuf::from(part);

    tracing::debug!("writing {} records to {:?}", records.len(), part);
    let file = fs::File::create(&part).map_err(|err| Error::filesystem(&part, err))?;
    let mut writer = BufWriter::new(file);
    let indent = vec![b' '; sink.indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    records.serialize(&mut serializer).map_err(|err| {
        tracing::error!("failed writing JSON");
        err
    })?;
    writer.write_all(b"\n").map_err(|err| Error::filesystem(&part, err))?;
    writer
        .into_inner()
        .map_err(|err| Error::filesystem(&part, err.into_error()))?
        .sync_all()
        .map_err(|err| Error::filesystem(&part, err))?;

    fs::rename(&part, path).map_err(|err| Error::filesystem(path, err))?;
    tracing::info!(path = %path.display(), records = records.len(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_config::{FeedFormat, OutputSink};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// `<spider>_<YYYY-MM-DD>.json` with a zero-padded calendar date.
    fn is_artifact_name(name: &str, spider: &str) -> bool {
        name.strip_prefix(spider)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix(".json"))
            .filter(|stamp| stamp.len() == 10)
            .map_or(false, |stamp| {
                NaiveDate::parse_from_str(stamp, DATE_FORMAT).is_ok()
            })
    }

    #[test]
    fn resolve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = resolve("eventbrite", dir.path(), date(2025, 3, 9)).unwrap();
        let second = resolve("eventbrite", dir.path(), date(2025, 3, 9)).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            dir.path().join("scraped_data").join("eventbrite_2025-03-09.json")
        );
        assert!(dir.path().join("scraped_data").is_dir());
    }

    #[test]
    fn file_names_are_zero_padded() {
        for d in [date(1999, 1, 1), date(2025, 12, 31), date(10, 6, 7)] {
            let name = artifact_file_name("findarace", d);
            assert!(is_artifact_name(&name, "findarace"), "{name}");
        }
        assert!(!is_artifact_name("findarace_2025-6-7.json", "findarace"));
        assert!(!is_artifact_name("findarace_2025-06-07.csv", "findarace"));
    }

    #[test]
    fn resolve_propagates_filesystem_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();
        let err = resolve("mindspace", &blocker, date(2025, 1, 2)).unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }), "{err:?}");
    }

    #[test]
    fn writes_empty_array_with_two_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path().join("x.json"));
        write_artifact::<serde_json::Value>(&sink, &[]).unwrap();
        assert_eq!(fs::read_to_string(&sink.path).unwrap(), "[]\n");

        write_artifact(&sink, &[serde_json::json!({"name": "a"})]).unwrap();
        assert_eq!(
            fs::read_to_string(&sink.path).unwrap(),
            "[\n  {\n    \"name\": \"a\"\n  }\n]\n"
        );
        assert_eq!(sink.format, FeedFormat::Json);
    }

    #[test]
    fn refuses_to_replace_when_overwrite_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = OutputSink::new(dir.path().join("x.json"));
        sink.overwrite = false;
        fs::write(&sink.path, b"[]").unwrap();
        assert!(write_artifact::<serde_json::Value>(&sink, &[]).is_err());
    }
}
