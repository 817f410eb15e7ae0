//! Bulk sender engine: spreadsheet IO, delivery automation and the batch worker.
mod delivery;
mod desktop;
mod engine;
mod filename;
mod persist;
mod preview;
mod settings;
mod sheet;
mod template;
mod types;

pub use delivery::{deep_link, Automation, Delivery, DeliveryError, KeystrokeDelivery};
pub use desktop::DesktopAutomation;
pub use engine::{run_batch, DeliveryFactory, RunHandle, RunRequest, RunSignals};
pub use filename::{has_supported_extension, secure_filename, upload_filename, SUPPORTED_EXTENSIONS};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use preview::{preview_rows, MAX_PREVIEW_CELL, PREVIEW_ROWS};
pub use settings::DeliverySettings;
pub use sheet::{
    load_sheet, SheetData, SheetError, IMAGE_COLUMN, MESSAGE_COLUMN, NUMBER_COLUMN,
    REQUIRED_COLUMNS,
};
pub use template::{template_csv, TemplateError, TEMPLATE_FILENAME};
pub use types::{ChannelEventSink, EngineEvent, EventSink};
