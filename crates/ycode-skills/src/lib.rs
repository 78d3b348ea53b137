//! # ycode-skills
//!
//! Skills are on-demand instructions. Each one is a directory holding a
//! `SKILL.md` file (Markdown with a small frontmatter header) and, optionally,
//! `scripts/`, `references/` and `assets/` folders.
//!
//! Only names and descriptions go into the system prompt. The full body is
//! injected when the model calls the `Skill` tool.
//!
//! ```markdown
//! ---
//! name: pdf
//! description: Extract text and tables from PDF files
//! tags: [documents]
//! ---
//!
//! # PDF
//!
//! Run `scripts/extract.py <file>` and summarise the output.
//! ```

pub mod definition;
pub mod registry;

pub use definition::SkillDefinition;
pub use registry::SkillRegistry;
