//! PDF structural probe
//!
//! Checks the header and trailer marker, then walks the page tree from the
//! trailer's `/Root` without decoding any streams. Incremental updates are
//! honoured: a later definition of an object number replaces the earlier
//! one. Documents whose tree lives in compressed object streams are
//! reported as unsupported.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use regex::bytes::Regex;

use super::{DocumentFormat, FormatError, PageEntry, PageIndex};

const HEADER_PREFIXES: [&[u8]; 2] = [b"%PDF-1.", b"%PDF-2."];
const EOF_MARKER: &[u8] = b"%%EOF";
/// The end-of-file marker must appear within this many trailing bytes
const TRAILER_WINDOW: usize = 1024;

/// Latest definition of an indirect object
#[derive(Debug, Clone)]
struct ObjectDef {
    offset: usize,
    body: Range<usize>,
}

/// Indirect objects visible in the file body
struct ObjectTable {
    objects: HashMap<u32, ObjectDef>,
    /// Object or cross-reference streams were seen; missing objects may live there
    has_object_streams: bool,
}

impl ObjectTable {
    fn lookup(&self, number: u32) -> Result<&ObjectDef, FormatError> {
        self.objects.get(&number).ok_or_else(|| {
            if self.has_object_streams {
                FormatError::Unsupported(format!(
                    "object {} is stored in an object stream",
                    number
                ))
            } else {
                FormatError::Corrupt(format!("missing object {}", number))
            }
        })
    }
}

/// Built-in [`DocumentFormat`] for PDF files
#[derive(Debug, Clone)]
pub struct PdfProbe {
    object_re: Regex,
    page_re: Regex,
    pages_re: Regex,
    object_stream_re: Regex,
    root_re: Regex,
    catalog_pages_re: Regex,
    kids_re: Regex,
    reference_re: Regex,
}

impl Default for PdfProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProbe {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("probe pattern is valid");
        Self {
            object_re: compile(r"(?s-u)(\d+)\s+(\d+)\s+obj\b(.*?)\bendobj\b"),
            page_re: compile(r"(?-u)/Type\s*/Page\b"),
            pages_re: compile(r"(?-u)/Type\s*/Pages\b"),
            object_stream_re: compile(r"(?-u)/Type\s*/(?:ObjStm|XRef)\b"),
            root_re: compile(r"(?-u)/Root\s+(\d+)\s+\d+\s+R\b"),
            catalog_pages_re: compile(r"(?-u)/Pages\s+(\d+)\s+\d+\s+R\b"),
            kids_re: compile(r"(?s-u)/Kids\s*\[(.*?)\]"),
            reference_re: compile(r"(?-u)(\d+)\s+\d+\s+R\b"),
        }
    }

    fn check_header(bytes: &[u8]) -> Result<(), FormatError> {
        if HEADER_PREFIXES.iter().any(|prefix| bytes.starts_with(prefix)) {
            Ok(())
        } else {
            Err(FormatError::Unsupported("missing %PDF header".to_string()))
        }
    }

    fn check_trailer(bytes: &[u8]) -> Result<(), FormatError> {
        let tail = &bytes[bytes.len().saturating_sub(TRAILER_WINDOW)..];
        if tail.windows(EOF_MARKER.len()).any(|w| w == EOF_MARKER) {
            Ok(())
        } else {
            Err(FormatError::Corrupt("missing %%EOF marker".to_string()))
        }
    }

    fn scan_objects(&self, bytes: &[u8]) -> Result<ObjectTable, FormatError> {
        let mut objects = HashMap::new();
        let mut has_object_streams = false;

        for caps in self.object_re.captures_iter(bytes) {
            let (Some(whole), Some(number), Some(body)) = (caps.get(0), caps.get(1), caps.get(3))
            else {
                continue;
            };
            let number = parse_number(number.as_bytes()).ok_or_else(|| {
                FormatError::Corrupt(format!(
                    "object number out of range at offset {}",
                    whole.start()
                ))
            })?;

            has_object_streams |= self.object_stream_re.is_match(body.as_bytes());
            objects.insert(
                number,
                ObjectDef {
                    offset: whole.start(),
                    body: body.range(),
                },
            );
        }

        Ok(ObjectTable {
            objects,
            has_object_streams,
        })
    }

    /// Object number of the page tree root, via the latest `/Root`
    fn page_tree_root(&self, bytes: &[u8], table: &ObjectTable) -> Result<u32, FormatError> {
        let root = self
            .root_re
            .captures_iter(bytes)
            .last()
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_number(m.as_bytes()))
            .ok_or_else(|| {
                FormatError::Corrupt("trailer has no /Root reference".to_string())
            })?;

        let catalog = &bytes[table.lookup(root)?.body.clone()];
        self.catalog_pages_re
            .captures(catalog)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_number(m.as_bytes()))
            .ok_or_else(|| FormatError::Corrupt(format!("catalog {} has no /Pages", root)))
    }

    fn kids(&self, node: u32, body: &[u8]) -> Result<Vec<u32>, FormatError> {
        let array = self
            .kids_re
            .captures(body)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| FormatError::Corrupt(format!("page tree node {} has no /Kids", node)))?;

        Ok(self
            .reference_re
            .captures_iter(array.as_bytes())
            .filter_map(|caps| caps.get(1).and_then(|m| parse_number(m.as_bytes())))
            .collect())
    }

    /// Depth-first walk of the page tree; yields pages in reading order
    fn walk_pages(
        &self,
        bytes: &[u8],
        table: &ObjectTable,
        root: u32,
    ) -> Result<Vec<PageEntry>, FormatError> {
        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(number) = stack.pop() {
            if !visited.insert(number) {
                return Err(FormatError::Corrupt(format!(
                    "object {} appears twice in the page tree",
                    number
                )));
            }

            let object = table.lookup(number)?;
            let body = &bytes[object.body.clone()];
            if self.page_re.is_match(body) {
                entries.push(PageEntry {
                    object_number: number,
                    offset: object.offset,
                });
            } else if self.pages_re.is_match(body) {
                let kids = self.kids(number, body)?;
                stack.extend(kids.into_iter().rev());
            } else {
                return Err(FormatError::Corrupt(format!(
                    "object {} in the page tree is neither /Page nor /Pages",
                    number
                )));
            }
        }

        Ok(entries)
    }
}

fn parse_number(digits: &[u8]) -> Option<u32> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

impl DocumentFormat for PdfProbe {
    fn name(&self) -> &str {
        "pdf"
    }

    fn probe(&self, bytes: &[u8]) -> Result<PageIndex, FormatError> {
        Self::check_header(bytes)?;
        Self::check_trailer(bytes)?;

        let table = self.scan_objects(bytes)?;
        let root = match self.page_tree_root(bytes, &table) {
            Err(FormatError::Corrupt(_)) if table.has_object_streams => {
                return Err(FormatError::Unsupported(
                    "page tree is stored in object streams".to_string(),
                ));
            }
            other => other?,
        };
        let entries = self.walk_pages(bytes, &table, root)?;

        if entries.is_empty() {
            return Err(FormatError::Corrupt("document has no pages".to_string()));
        }

        log::debug!("pdf probe indexed {} pages", entries.len());
        Ok(PageIndex::new(entries))
    }
}
