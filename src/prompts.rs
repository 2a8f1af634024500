//! Prompts for template-driven report generation.
//!
//! Centralising every prompt here keeps the wording in one place and lets
//! unit tests inspect the exact text sent to the model without a network
//! call. Callers can override the system prompt via
//! [`crate::config::GenerationConfig::system_prompt`]; the user prompt is
//! always assembled by [`build_user_prompt`].

use serde::{Deserialize, Serialize};

/// Everything the user supplies for one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Text content of the template document.
    pub template_text: String,
    /// Text content of an optional reference document.
    pub reference_text: Option<String>,
    /// Free-text writing instructions.
    pub instructions: String,
}

impl ReportRequest {
    pub fn new(template_text: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            template_text: template_text.into(),
            reference_text: None,
            instructions: instructions.into(),
        }
    }

    pub fn with_reference(mut self, reference_text: impl Into<String>) -> Self {
        self.reference_text = Some(reference_text.into());
        self
    }

    /// Reference text, treating a blank one as absent.
    pub fn reference(&self) -> Option<&str> {
        self.reference_text
            .as_deref()
            .filter(|r| !r.trim().is_empty())
    }
}

/// Default system prompt.
///
/// Limits the model to the Markdown subset the document builder renders,
/// so the exported DOCX matches what was streamed.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an experienced writer of plans and reports for schools and education programmes. You fill in document templates following the user's instructions.

Write the answer in Markdown using ONLY these constructs:
   - # to #### headings
   - paragraphs with **bold**, *italic* or ***bold italic*** emphasis
   - flat lists: "- item" or "1. item" (no nesting)
   - pipe tables with a header row and a separator row (| --- |)

Do NOT use code fences, block quotes, links or images.
Do NOT wrap the answer in ```markdown fences.
Start directly with the document title as a heading."#;

/// Build the user prompt for one report request.
///
/// Sections appear in a fixed order: template, optional reference,
/// instructions, then the writing rules.
pub fn build_user_prompt(request: &ReportRequest, language: &str) -> String {
    let mut prompt = format!(
        "# Write a plan or report\n\n## Template content:\n{}\n\n",
        request.template_text.trim()
    );

    let reference = request.reference();
    if let Some(reference) = reference {
        prompt.push_str(&format!(
            "## Reference document content:\n{}\n\n",
            reference.trim()
        ));
    }

    prompt.push_str(&format!(
        "## User instructions:\n{}\n\n---\n\n",
        request.instructions.trim()
    ));

    let sources = if reference.is_some() {
        "the template and the reference document"
    } else {
        "the template"
    };
    prompt.push_str(&format!(
        "**Following the instructions, analyse {sources} and write the plan or report by filling in its content.**\n\
**Write in {language}, with a clear and logical structure.**\n\
**Follow the layout of the template; you may add information or content where needed.**\n\
**If the template is insufficient or the instructions cannot be carried out, say so honestly.**\n\
**You specialise in education-related documents: school project plans, teaching activity plans, project-based learning plans and reports.**\n\
**When a table is needed, write it as a Markdown table.**\n"
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_all_sections_in_order() {
        let req = ReportRequest::new("Section 1. Goals", "Write a 2025 plan")
            .with_reference("Last year's report");
        let p = build_user_prompt(&req, "Korean");

        let t = p.find("## Template content:").unwrap();
        let r = p.find("## Reference document content:").unwrap();
        let i = p.find("## User instructions:").unwrap();
        assert!(t < r && r < i);
        assert!(p.contains("Section 1. Goals"));
        assert!(p.contains("Last year's report"));
        assert!(p.contains("Write in Korean"));
        assert!(p.contains("the template and the reference document"));
    }

    #[test]
    fn prompt_omits_blank_reference() {
        let req = ReportRequest::new("T", "I").with_reference("   ");
        let p = build_user_prompt(&req, "English");
        assert!(!p.contains("Reference document content"));
        assert!(p.contains("analyse the template and write"));
        assert!(p.contains("Write in English"));
    }

    #[test]
    fn system_prompt_forbids_outer_fences() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Do NOT wrap the answer"));
    }
}
