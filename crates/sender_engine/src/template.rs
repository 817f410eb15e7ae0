use std::io;

use thiserror::Error;

use crate::{IMAGE_COLUMN, MESSAGE_COLUMN, NUMBER_COLUMN};

pub const TEMPLATE_FILENAME: &str = "whatsapp_template.csv";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Sample spreadsheet showing the expected columns, one row with and one without an image.
pub fn template_csv() -> Result<Vec<u8>, TemplateError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([NUMBER_COLUMN, MESSAGE_COLUMN, IMAGE_COLUMN])?;
    writer.write_record([
        "9876543210",
        "Hello! This is a test message.",
        "C:\\path\\to\\image1.jpg",
    ])?;
    writer.write_record(["9123456780", "Welcome to WhatsApp Bulk Sender!", ""])?;
    writer.into_inner().map_err(|err| err.into_error().into())
}
