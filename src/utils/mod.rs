//! Utility modules for Card Assets
//!
//! This module contains various utility functions organized by functionality:
//! - `files`: File operations and directory management
//! - `http`: HTTP client and image downloads
//! - `images`: Image resizing and PNG encoding
//! - `names`: Filename sanitization and the resized-variant naming convention

pub mod files;
pub mod http;
pub mod images;
pub mod names;
