use std::sync::OnceLock;

use anyhow::{Context, Result};
use base64::Engine;
use regex::Regex;

use crate::linear::Gateway;

const DATA_URI_PREFIX: &str = "data:";

fn segment_delimiter() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| Regex::new(r"\s*\|\s*").unwrap())
}

/// Build the final comment body. The raw value is pipe-delimited; any
/// segment that is a data URI is uploaded and replaced with a Markdown
/// image link, all other segments pass through. Segment order is kept
/// and the result is posted as a single comment by the caller.
pub async fn compose(gateway: &dyn Gateway, raw: &str) -> Result<String> {
    let mut lines = Vec::new();
    for segment in segment_delimiter().split(raw) {
        if segment.starts_with(DATA_URI_PREFIX) {
            let attachment = parse_data_uri(segment)?;
            let filename = format!("upload.{}", attachment.extension());
            let asset_url = gateway
                .upload_asset(&attachment.content_type, &filename, attachment.bytes)
                .await?;
            lines.push(format!("![]({asset_url})"));
        } else {
            lines.push(segment.to_string());
        }
    }
    Ok(lines.join("\n"))
}

struct DataUri {
    content_type: String,
    bytes: Vec<u8>,
}

impl DataUri {
    /// File extension from the MIME subtype, e.g. `image/png` -> `png`.
    fn extension(&self) -> &str {
        self.content_type
            .rsplit('/')
            .next()
            .unwrap_or(&self.content_type)
    }
}

fn parse_data_uri(segment: &str) -> Result<DataUri> {
    let rest = segment
        .strip_prefix(DATA_URI_PREFIX)
        .context("Not a data URI")?;
    let (content_type, payload) = rest
        .split_once(";base64,")
        .with_context(|| format!("Malformed data URI (expected data:<mime>;base64,...): {segment}"))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("Failed to decode data URI payload")?;
    Ok(DataUri {
        content_type: content_type.to_string(),
        bytes,
    })
}
