//! Markdown report assembly.
//!
//! [`assemble`] is pure: it only concatenates already-produced section texts
//! in a fixed order (business, financial when present, then extra topics in
//! insertion order). Failed sections arrive here already rendered as their
//! placeholder text.

use crate::models::SectionMap;

pub const COMPANY_PLACEHOLDER: &str = "（企業名未入力）";
pub const BUSINESS_HEADING: &str = "事業要約";
pub const FINANCIAL_HEADING: &str = "財務要約";
pub const CUSTOM_HEADING_PREFIX: &str = "追加観点: ";
pub const DEFAULT_FILENAME: &str = "dd_report.md";

/// An assembled report and the company it was generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub company: String,
    pub markdown: String,
}

impl Report {
    pub fn filename(&self) -> String {
        suggested_filename(&self.company)
    }
}

/// Render the report Markdown.
///
/// The heading names `company`, or [`COMPANY_PLACEHOLDER`] when it is blank.
/// Each section is a level-2 heading, the text, and a blank line.
pub fn assemble(
    company: &str,
    business: &str,
    financial: Option<&str>,
    custom: &SectionMap,
) -> String {
    let name = match company.trim() {
        "" => COMPANY_PLACEHOLDER,
        trimmed => trimmed,
    };

    let mut out = format!("# {} DDレポート\n\n", name);
    push_section(&mut out, BUSINESS_HEADING, business);
    if let Some(financial) = financial {
        push_section(&mut out, FINANCIAL_HEADING, financial);
    }
    for result in custom.iter() {
        let heading = format!("{}{}", CUSTOM_HEADING_PREFIX, result.label);
        push_section(&mut out, &heading, &result.text());
    }
    out
}

fn push_section(out: &mut String, heading: &str, text: &str) {
    out.push_str("## ");
    out.push_str(heading);
    out.push('\n');
    out.push_str(text.trim_end());
    out.push_str("\n\n");
}

/// `dd_report_{company}.md`, with characters unsafe in file names replaced
/// by `_`. Blank names give [`DEFAULT_FILENAME`].
pub fn suggested_filename(company: &str) -> String {
    let company = company.trim();
    if company.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    let safe: String = company
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    format!("dd_report_{}.md", safe)
}
