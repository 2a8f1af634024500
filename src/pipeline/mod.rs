//! Pipeline stages for template-to-report generation.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the LLM stage can be swapped for a scripted
//! source without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ llm ──▶ postprocess ──▶ builder ──▶ docx
//! (text)   (chunks)  (cleanup)     (Document)  (zip)
//! ```
//!
//! 1. [`input`]       : read template/reference/instructions files as text
//! 2. [`llm`]         : build the chat request and stream the answer; the
//!    only stage with network I/O
//! 3. [`postprocess`] : deterministic cleanup of the concatenated answer
//! 4. [`builder`]     : classify lines into headings, items, tables and
//!    paragraphs
//! 5. [`docx`]        : serialise the document as a WordprocessingML package

pub mod builder;
pub mod docx;
pub mod input;
pub mod llm;
pub mod postprocess;
