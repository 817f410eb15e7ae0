use std::borrow::Cow;

/// Country code prepended to numbers that do not carry their own `+` prefix.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

/// One spreadsheet row: a number, a message and an optional image to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub raw_number: String,
    pub raw_message: String,
    pub image_path: Option<String>,
}

impl Job {
    pub fn new(
        raw_number: impl Into<String>,
        raw_message: impl Into<String>,
        image_path: Option<String>,
    ) -> Self {
        let image_path = image_path
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty());
        Self {
            raw_number: raw_number.into(),
            raw_message: raw_message.into(),
            image_path,
        }
    }
}

/// Delivery-ready view of a [`Job`]; derived per job and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedJob {
    pub number: String,
    pub message: String,
}

impl FormattedJob {
    pub fn from_job(job: &Job, country_code: &str) -> Self {
        Self {
            number: format_phone_number(&job.raw_number, country_code),
            message: prepare_message(&job.raw_message),
        }
    }
}

/// Keeps digits and a leading `+`, prepending `country_code` when the number has no `+`.
///
/// No length or plausibility checks: a malformed number is passed through and
/// fails later at delivery.
pub fn format_phone_number(raw: &str, country_code: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len() + country_code.len());
    for c in raw.trim().chars() {
        if c.is_ascii_digit() || (c == '+' && cleaned.is_empty()) {
            cleaned.push(c);
        }
    }
    if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("{country_code}{cleaned}")
    }
}

/// Turns free-form operator input ("91", " +1 ") into a `+digits` code.
///
/// Returns `None` when no digit is present.
pub fn normalize_country_code(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("+{digits}"))
    }
}

/// Escapes a message for the `text` query parameter of a deep link.
///
/// Newlines become `%0A` first; existing `%` characters are left as they are so
/// pre-escaped text is not escaped twice.
pub fn prepare_message(raw: &str) -> String {
    let with_breaks = raw.trim().replace('\n', "%0A");
    with_breaks
        .split('%')
        .map(urlencoding::encode)
        .collect::<Vec<Cow<'_, str>>>()
        .join("%")
}
