// src/scan/mod.rs
// =============================================================================
// This module finds the links we need to check.
//
// How it works:
// 1. Walk the documentation root and list every Markdown file
// 2. Drop files matching an ignore pattern, sort what's left
// 3. Render each file to HTML and pull out every <a href>
// 4. Drop links matching an ignore pattern, remove duplicates
// 5. Emit one LinkRecord per unique link per file
// =============================================================================

mod ignore;
mod scanner;
mod walk;

pub use ignore::IgnoreRules;
pub use scanner::Scanner;
pub use walk::is_document;
