//! Metadata extraction from `.audit` exports.
//!
//! Audit files are not well-formed XML, so blocks are found by pairing literal
//! `<item>`/`<custom_item>` tags instead of parsing the document. Each block's
//! own text (its content minus nested blocks) is then searched for
//! `KEY|value,` tokens.

use std::ops::Range;

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use tracing::{debug, instrument};

use super::Extractor;
use crate::error::ExtractError;
use crate::model::EmbeddedMetadataRecord;

pub const STIG_ID_MARKER: &str = "STIG-ID|";
pub const CAT_MARKER: &str = "CAT|";
pub const NIST_MARKER: &str = "800-53|";

const TAG_PATTERNS: [&str; 4] = ["<item>", "</item>", "<custom_item>", "</custom_item>"];

static TAG_AUTOMATON: Lazy<AhoCorasick> =
    Lazy::new(|| AhoCorasick::new(TAG_PATTERNS).expect("block tag patterns are valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Item,
    CustomItem,
}

impl BlockKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::CustomItem => "custom_item",
        }
    }
}

/// A matched open/close pair. `outer` spans both tags, `inner` only the content.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    outer: Range<usize>,
    inner: Range<usize>,
}

struct OpenTag {
    kind: BlockKind,
    start: usize,
    content_start: usize,
}

/// Extracts one [`EmbeddedMetadataRecord`] per block that names a STIG id.
#[derive(Debug, Clone, Default)]
pub struct AuditExtractor;

impl AuditExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for AuditExtractor {
    type Output = Vec<EmbeddedMetadataRecord>;

    #[instrument(name = "extract_audit", skip(self, text), fields(input_len = text.len()))]
    fn extract(&self, _origin: &str, text: &str) -> Result<Self::Output, ExtractError> {
        let blocks = scan_blocks(text);
        let children = direct_children(&blocks);

        let mut records = Vec::new();
        for (idx, block) in blocks.iter().enumerate() {
            let own = own_text(text, block, children[idx].iter().map(|&c| &blocks[c]));
            let record = read_fields(&own);
            if record.join_key().is_some() {
                records.push(record);
            }
        }
        debug!(blocks = blocks.len(), records = records.len(), "audit blob extracted");
        Ok(records)
    }
}

/// Pair block tags and return complete blocks sorted by start offset, which
/// is their pre-order.
///
/// A closing tag pairs with the innermost open tag of the same name. Open tags
/// of another name above it are left unterminated and dropped; a closing tag
/// with no open partner is ignored.
fn scan_blocks(text: &str) -> Vec<Block> {
    let mut open: Vec<OpenTag> = Vec::new();
    let mut blocks = Vec::new();

    for found in TAG_AUTOMATON.find_iter(text) {
        let (kind, closing) = match found.pattern().as_usize() {
            0 => (BlockKind::Item, false),
            1 => (BlockKind::Item, true),
            2 => (BlockKind::CustomItem, false),
            _ => (BlockKind::CustomItem, true),
        };
        if !closing {
            open.push(OpenTag {
                kind,
                start: found.start(),
                content_start: found.end(),
            });
            continue;
        }
        let Some(pos) = open.iter().rposition(|tag| tag.kind == kind) else {
            debug!(tag = kind.tag(), offset = found.start(), "ignoring stray closing tag");
            continue;
        };
        for dropped in open.drain(pos + 1..) {
            debug!(tag = dropped.kind.tag(), offset = dropped.start, "unterminated block");
        }
        if let Some(tag) = open.pop() {
            blocks.push(Block {
                outer: tag.start..found.end(),
                inner: tag.content_start..found.start(),
            });
        }
    }
    for dropped in open {
        debug!(tag = dropped.kind.tag(), offset = dropped.start, "unterminated block");
    }

    blocks.sort_by_key(|block| block.outer.start);
    blocks
}

/// Index lists of each block's direct children. Blocks must be sorted by start
/// and properly nested, which `scan_blocks` guarantees.
fn direct_children(blocks: &[Block]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); blocks.len()];
    let mut ancestors: Vec<usize> = Vec::new();
    for (idx, block) in blocks.iter().enumerate() {
        while let Some(&top) = ancestors.last() {
            if blocks[top].outer.end <= block.outer.start {
                ancestors.pop();
            } else {
                break;
            }
        }
        if let Some(&parent) = ancestors.last() {
            children[parent].push(idx);
        }
        ancestors.push(idx);
    }
    children
}

/// Block content with nested blocks cut out. Segments are joined by a line
/// break so a token never spans a removed child.
fn own_text<'a>(text: &str, block: &Block, children: impl Iterator<Item = &'a Block>) -> String {
    let mut own = String::new();
    let mut cursor = block.inner.start;
    for child in children {
        own.push_str(&text[cursor..child.outer.start]);
        own.push('\n');
        cursor = child.outer.end;
    }
    own.push_str(&text[cursor..block.inner.end]);
    own
}

fn read_fields(text: &str) -> EmbeddedMetadataRecord {
    EmbeddedMetadataRecord {
        stig_id: field_value(text, STIG_ID_MARKER).map(str::to_string),
        cat: field_value(text, CAT_MARKER).map(str::to_string),
        nist_control_id: field_value(text, NIST_MARKER).map(str::to_string),
    }
}

/// Value of the first `marker` occurrence that is followed by a comma on the
/// same line. Empty values count as absent.
pub fn field_value<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(found) = text[from..].find(marker) {
        let value_start = from + found + marker.len();
        let rest = &text[value_start..];
        if let Some(end) = rest.find([',', '\n']) {
            if rest.as_bytes()[end] == b',' {
                let value = &rest[..end];
                return (!value.is_empty()).then_some(value);
            }
        }
        from += found + 1;
    }
    None
}
