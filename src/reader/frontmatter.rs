//! `+++`-fenced TOML front matter.
//!
//! ```text
//! +++
//! title = "Hello"
//! tags = ["rust", "linux/emacs"]
//! +++
//! Intro paragraph.
//! <!--more-->
//! The rest.
//! ```
//!
//! The fenced block becomes the metadata, the body becomes `content`, and the
//! text before `<!--more-->` becomes `summary` unless the block sets one.

use super::{ReadError, Reader};
use crate::meta::Meta;
use serde_json::Value;

const FENCE: &str = "+++";
const MORE: &str = "<!--more-->";

pub struct FrontMatterReader;

impl Reader for FrontMatterReader {
    fn read(&self, bytes: &[u8]) -> Result<Meta, ReadError> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let (front, body) = split(text);
        let mut meta = match front {
            Some(front) => Meta::from_toml(&toml::from_str::<toml::Table>(front)?),
            None => Meta::new(),
        };

        let body = body.trim_start_matches(['\r', '\n']);
        if !body.trim().is_empty() {
            if !meta.contains("summary")
                && let Some((summary, _)) = body.split_once(MORE)
            {
                meta.insert("summary", Value::String(summary.trim().to_owned()));
            }
            meta.insert("content", Value::String(body.to_owned()));
        }

        if meta.is_empty() {
            return Err(ReadError::Empty);
        }
        Ok(meta)
    }
}

/// Split off a leading fenced block. An unterminated fence is plain body text.
fn split(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return (None, text);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}
