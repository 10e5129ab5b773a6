//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Minimal well-formed PDF with `pages` page objects
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut out = String::from("%PDF-1.7\n");
    out.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", i + 3)).collect();
    out.push_str(&format!(
        "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
        kids.join(" "),
        pages
    ));
    for i in 0..pages {
        out.push_str(&format!(
            "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n",
            i + 3
        ));
    }
    out.push_str("trailer\n<< /Root 1 0 R >>\n%%EOF\n");
    out.into_bytes()
}

/// Object numbers of the pages in `sample_pdf(pages)`, in page order
pub fn page_objects(pages: usize) -> Vec<u32> {
    (0..pages as u32).map(|i| i + 3).collect()
}

/// Incremental update rewriting the page tree root to list `kids`
pub fn page_tree_update(kids: &[u32]) -> Vec<u8> {
    let refs: Vec<String> = kids.iter().map(|k| format!("{} 0 R", k)).collect();
    format!(
        "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\ntrailer\n<< /Root 1 0 R /Prev 0 >>\n%%EOF\n",
        refs.join(" "),
        kids.len()
    )
    .into_bytes()
}

/// Incremental update adding page `object_number` after `kids_before`
pub fn page_increment(kids_before: &[u32], object_number: u32) -> Vec<u8> {
    let mut kids = kids_before.to_vec();
    kids.push(object_number);
    let mut out = format!(
        "{} 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n",
        object_number
    )
    .into_bytes();
    out.extend_from_slice(&page_tree_update(&kids));
    out
}

pub fn write_document(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

pub fn locator(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
