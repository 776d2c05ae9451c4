//! Package Repository Management

use super::{PackageId, PackageMetadata};
use alloc::vec::Vec;
use alloc::string::String;

/// Package repository
#[derive(Debug, Clone)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Repository URL
    pub url: String,
    /// Is repository trusted
    pub trusted: bool,
}

impl Repository {
    pub fn new(name: String, url: String, trusted: bool) -> Self {
        Self { name, url, trusted }
    }

    /// Fetch package list from repository
    pub fn fetch_package_list(&self) -> Vec<PackageMetadata> {
        // TODO: Implement HTTP/HTTPS fetch
        Vec::new()
    }

    /// Download package by ID
    pub fn download_package(&self, package_id: &PackageId) -> Option<Vec<u8>> {
        // TODO: Implement package download
        None
    }
}
