//! Item codes, QR payloads and the code lock used while editing
//!
//! A new item gets a fresh code every time its name changes. Once an
//! existing item is opened for editing its code is locked: printed labels
//! already carry it, so renaming must not produce a new one.

use crate::clock::Clock;
use crate::config::{CODE_PREFIX, LOAN_FORM_PAGE};
use crate::database::{Item, RecordId};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

/// Characters left as-is when encoding a code into a link, matching
/// browser `encodeURIComponent`
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub trait CodeGenerator: Send + Sync {
    fn generate_code_for(&self, seed: &str) -> String;
}

/// Shows the QR preview next to the item form
pub trait QrDisplay: Send + Sync {
    /// An existing item was opened; its code must stay as shown
    fn on_code_locked_during_edit(&self, code: &str);

    /// A new candidate code, or `None` to clear the preview
    fn show_candidate(&self, code: Option<&str>);
}

/// Pulls one camera frame and decodes a QR payload from it, if any
pub trait FrameDecoder: Send + Sync {
    fn decode_frame(&self) -> Option<String>;
}

/// `ITEM-<unix seconds>` codes
pub struct TimestampCodes {
    clock: Arc<dyn Clock>,
}

impl TimestampCodes {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl CodeGenerator for TimestampCodes {
    fn generate_code_for(&self, _seed: &str) -> String {
        format!("{}{}", CODE_PREFIX, self.clock.now_millis().div_euclid(1000))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDisplay;

impl QrDisplay for NoDisplay {
    fn on_code_locked_during_edit(&self, _code: &str) {}

    fn show_candidate(&self, _code: Option<&str>) {}
}

/// Link encoded into an item's QR label
pub fn qr_payload(link_base: &str, code: &str) -> String {
    let base = if link_base.is_empty() || link_base.ends_with('/') {
        link_base.to_string()
    } else {
        format!("{}/", link_base)
    };
    format!(
        "{}{}?code={}",
        base,
        LOAN_FORM_PAGE,
        utf8_percent_encode(code, COMPONENT_ENCODE_SET)
    )
}

/// Extract the item code from a scanned payload.
///
/// Labels carry a link with `?code=`; hand-typed or older labels carry the
/// bare code.
pub fn code_from_payload(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    let code = match payload.split_once("code=") {
        Some((_, rest)) => {
            let raw = rest.split('&').next().unwrap_or_default();
            percent_encoding::percent_decode_str(raw)
                .decode_utf8_lossy()
                .into_owned()
        }
        None => payload.to_string(),
    };

    (!code.trim().is_empty()).then(|| code.trim().to_string())
}

/// `candidate`, or `candidate-N` with the smallest N >= 2 not yet taken
pub fn unique_code<'a, I>(candidate: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = taken.into_iter().collect();
    if !taken.contains(&candidate) {
        return candidate.to_string();
    }

    (2..)
        .map(|n| format!("{}-{}", candidate, n))
        .find(|code| !taken.contains(&code.as_str()))
        .unwrap_or_else(|| candidate.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CodeLock {
    #[default]
    Unlocked,
    Locked {
        code: String,
    },
}

/// Code handling for one open item form
pub struct ItemForm {
    lock: CodeLock,
    candidate: Option<String>,
    editing: Option<RecordId>,
    generator: Arc<dyn CodeGenerator>,
    display: Arc<dyn QrDisplay>,
}

impl ItemForm {
    pub fn new(generator: Arc<dyn CodeGenerator>, display: Arc<dyn QrDisplay>) -> Self {
        Self {
            lock: CodeLock::Unlocked,
            candidate: None,
            editing: None,
            generator,
            display,
        }
    }

    pub fn open_new(&mut self) {
        self.lock = CodeLock::Unlocked;
        self.candidate = None;
        self.editing = None;
        self.display.show_candidate(None);
    }

    pub fn open_edit(&mut self, item: &Item) {
        tracing::debug!("Editing item {}, code {} locked", item.id, item.code);
        self.lock = CodeLock::Locked {
            code: item.code.clone(),
        };
        self.candidate = None;
        self.editing = Some(item.id.clone());
        self.display.on_code_locked_during_edit(&item.code);
    }

    pub fn on_name_changed(&mut self, name: &str) {
        if matches!(self.lock, CodeLock::Locked { .. }) {
            return;
        }

        let name = name.trim();
        self.candidate = if name.is_empty() {
            None
        } else {
            Some(self.generator.generate_code_for(name))
        };
        self.display.show_candidate(self.candidate.as_deref());
    }

    pub fn close(&mut self) {
        self.lock = CodeLock::Unlocked;
        self.candidate = None;
        self.editing = None;
    }

    /// The code currently displayed, which is what gets saved
    pub fn code_for_save(&self) -> Option<String> {
        match &self.lock {
            CodeLock::Locked { code } => Some(code.clone()),
            CodeLock::Unlocked => self.candidate.clone(),
        }
    }

    pub fn lock(&self) -> &CodeLock {
        &self.lock
    }

    /// Id of the item being edited, `None` for a new item
    pub fn editing(&self) -> Option<&RecordId> {
        self.editing.as_ref()
    }
}
