use std::fs;
use std::path::Path;

use sender_core::BatchResult;
use sender_engine::AtomicFileWriter;
use sender_logging::{sender_error, sender_info, sender_warn};

const LAST_RUN_FILENAME: &str = ".last_run.ron";

pub(crate) fn load_last_result(dir: &Path) -> Option<BatchResult> {
    let path = dir.join(LAST_RUN_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            sender_warn!("Failed to read last run from {:?}: {}", path, err);
            return None;
        }
    };

    match ron::from_str::<BatchResult>(&content) {
        Ok(result) => {
            sender_info!("Loaded last run summary from {:?}", path);
            Some(result)
        }
        Err(err) => {
            sender_warn!("Failed to parse last run from {:?}: {}", path, err);
            None
        }
    }
}

pub(crate) fn save_last_result(writer: &AtomicFileWriter, result: &BatchResult) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(result, pretty) {
        Ok(text) => text,
        Err(err) => {
            sender_error!("Failed to serialize last run: {}", err);
            return;
        }
    };

    if let Err(err) = writer.write(LAST_RUN_FILENAME, content) {
        sender_error!(
            "Failed to write last run to {:?}: {}",
            writer.dir(),
            err
        );
    }
}
