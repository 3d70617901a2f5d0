use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::status::{truncate_chars, MESSAGE_MAX_LEN};

/// Represents the message content
#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<Vec<Value>>,
}

/// Represents a transcript line with message
#[derive(Debug, Deserialize)]
struct TranscriptLine {
    #[serde(rename = "type")]
    type_: Option<String>,
    message: Option<MessageContent>,
}

/// Last assistant text message in a JSONL transcript, capped at 500 characters.
/// A missing or unreadable transcript yields "".
pub fn last_assistant_text(transcript_path: &str) -> String {
    if transcript_path.is_empty() {
        return String::new();
    }
    let path = Path::new(transcript_path);
    if !path.is_file() {
        return String::new();
    }

    let last = match File::open(path).and_then(|file| scan(BufReader::new(file))) {
        Ok(last) => last,
        Err(e) => {
            debug!(path = %transcript_path, error = %e, "transcript unreadable");
            None
        }
    };

    last.map(|text| truncate_chars(&text, MESSAGE_MAX_LEN))
        .unwrap_or_default()
}

/// Walk every line, keeping the text of the final `text` block seen in an
/// assistant entry. Lines that are not valid JSON (or not UTF-8) are skipped.
fn scan<R: Read>(reader: BufReader<R>) -> io::Result<Option<String>> {
    let mut last_text = None;

    for line in reader.split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let Ok(entry) = serde_json::from_slice::<TranscriptLine>(&line) else {
            continue;
        };
        if entry.type_.as_deref() != Some("assistant") {
            continue;
        }

        let blocks = entry
            .message
            .and_then(|message| message.content)
            .unwrap_or_default();
        for block in blocks {
            if block.get("type").and_then(|v| v.as_str()) != Some("text") {
                continue;
            }
            if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                last_text = Some(text.to_string());
            }
        }
    }

    Ok(last_text)
}
