//! DOCX export: serialise a [`Document`] as a WordprocessingML package.
//!
//! The package is written by hand with the `zip` crate. Every part is a
//! small XML string built from the document model, which keeps the output
//! deterministic and easy to inspect in tests.
//!
//! ## Package layout
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml            dc:title
//! word/document.xml            body
//! word/styles.xml              Normal, Heading1-4, ListBullet, ListNumber, TableGrid
//! word/numbering.xml           one bullet list, one decimal list per ordered run
//! word/_rels/document.xml.rels
//! ```
//!
//! ## Numbered lists
//!
//! Each run of consecutive ordered items gets its own `w:num` restarting at
//! 1, so a second numbered list later in the report does not continue the
//! first one's count.

use crate::config::ExportConfig;
use crate::document::{Block, Document, StyledRun, Table};
use crate::error::ReportError;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// `numId` of the shared bullet list; ordered runs are numbered after it.
const BULLET_NUM_ID: usize = 1;

/// Render `document` as DOCX bytes.
pub fn render_docx(document: &Document, export: &ExportConfig) -> Result<Vec<u8>, ReportError> {
    export.validate()?;

    let (body, ordered_lists) = body_xml(document);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    write_part(&mut zip, "[Content_Types].xml", CONTENT_TYPES_XML, opt)?;

    zip.add_directory("_rels/", opt)?;
    write_part(&mut zip, "_rels/.rels", RELS_XML, opt)?;

    zip.add_directory("docProps/", opt)?;
    write_part(&mut zip, "docProps/core.xml", &core_xml(&document.title), opt)?;

    zip.add_directory("word/", opt)?;
    zip.add_directory("word/_rels/", opt)?;
    write_part(&mut zip, "word/document.xml", &document_xml(&body), opt)?;
    write_part(&mut zip, "word/styles.xml", &styles_xml(export), opt)?;
    write_part(&mut zip, "word/numbering.xml", &numbering_xml(ordered_lists), opt)?;
    write_part(&mut zip, "word/_rels/document.xml.rels", WORD_RELS_XML, opt)?;

    let bytes = zip.finish()?.into_inner();
    debug!(
        "Rendered DOCX: {} blocks, {} bytes",
        document.blocks.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Turn a document title into a safe `.docx` filename.
///
/// Path separators, characters Windows forbids in filenames and control
/// characters become `_`; an empty result falls back to `generated_report`.
pub fn export_filename(title: &str) -> String {
    let sanitised: String = title
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = sanitised.trim();
    let stem = if stem.is_empty() { "generated_report" } else { stem };
    format!("{stem}.docx")
}

/// Escape text for use in XML content and attribute values.
///
/// Control characters other than tab are dropped: XML 1.0 cannot carry
/// them at all.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push(ch),
            c if c.is_control() => {}
            _ => out.push(ch),
        }
    }
    out
}

fn write_part(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &str,
    opt: SimpleFileOptions,
) -> Result<(), ReportError> {
    zip.start_file(name, opt)?;
    zip.write_all(content.as_bytes())
        .map_err(|e| ReportError::ExportFailed {
            detail: format!("writing {name}: {e}"),
        })
}

// ── Body ─────────────────────────────────────────────────────────────────

/// Body XML plus the number of ordered-list runs it references.
fn body_xml(document: &Document) -> (String, usize) {
    let mut body = String::new();
    let mut ordered_lists = 0;
    let mut in_ordered = false;

    for block in &document.blocks {
        match block {
            Block::Heading { level, text } => {
                let style = format!("Heading{level}");
                body.push_str(&paragraph_xml(
                    Some(style.as_str()),
                    None,
                    &[StyledRun::plain(text.as_str())],
                ));
            }
            Block::Paragraph { runs } => body.push_str(&paragraph_xml(None, None, runs)),
            Block::ListItem { ordered, text } => {
                let (style, num_id) = if *ordered {
                    if !in_ordered {
                        ordered_lists += 1;
                    }
                    ("ListNumber", BULLET_NUM_ID + ordered_lists)
                } else {
                    ("ListBullet", BULLET_NUM_ID)
                };
                body.push_str(&paragraph_xml(
                    Some(style),
                    Some(num_id),
                    &[StyledRun::plain(text.as_str())],
                ));
            }
            Block::Table(table) => body.push_str(&table_xml(table)),
        }
        in_ordered = matches!(block, Block::ListItem { ordered: true, .. });
    }

    (body, ordered_lists)
}

fn paragraph_xml(style: Option<&str>, num_id: Option<usize>, runs: &[StyledRun]) -> String {
    let mut p = String::from("<w:p>");
    if style.is_some() || num_id.is_some() {
        p.push_str("<w:pPr>");
        if let Some(style) = style {
            p.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if let Some(num_id) = num_id {
            p.push_str(&format!(
                r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num_id}"/></w:numPr>"#
            ));
        }
        p.push_str("</w:pPr>");
    }
    for run in runs.iter().filter(|r| !r.text.is_empty()) {
        p.push_str(&run_xml(run));
    }
    p.push_str("</w:p>");
    p
}

fn run_xml(run: &StyledRun) -> String {
    let mut r = String::from("<w:r>");
    if run.bold || run.italic {
        r.push_str("<w:rPr>");
        if run.bold {
            r.push_str("<w:b/>");
        }
        if run.italic {
            r.push_str("<w:i/>");
        }
        r.push_str("</w:rPr>");
    }
    r.push_str(&format!(
        r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
        xml_escape(&run.text)
    ));
    r
}

fn table_xml(table: &Table) -> String {
    // A cell-less table is not valid WordprocessingML; keep one column.
    let columns = table.column_count().max(1);

    let mut t = String::from(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#,
    );
    for _ in 0..columns {
        t.push_str("<w:gridCol/>");
    }
    t.push_str("</w:tblGrid>");

    for row in 0..table.rows.len() {
        let header = table.is_header(row);
        t.push_str("<w:tr>");
        if header {
            t.push_str("<w:trPr><w:tblHeader/></w:trPr>");
        }
        for col in 0..columns {
            let text = table.cell(row, col);
            let run = if header {
                StyledRun::bold(text)
            } else {
                StyledRun::plain(text)
            };
            t.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr>"#);
            t.push_str(&paragraph_xml(None, None, &[run]));
            t.push_str("</w:tc>");
        }
        t.push_str("</w:tr>");
    }

    t.push_str("</w:tbl>");
    t
}

// ── Parts ────────────────────────────────────────────────────────────────

fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="11906" w:h="16838"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
    </w:sectPr>
  </w:body>
</w:document>"#
    )
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{}</dc:title>
  <dc:creator>edgequake-reportgen</dc:creator>
</cp:coreProperties>"#,
        xml_escape(title)
    )
}

fn styles_xml(export: &ExportConfig) -> String {
    let font = xml_escape(&export.font_name);
    let size = export.half_points();

    let headings: String = [(1u8, 12u32), (2, 8), (3, 4), (4, 2)]
        .iter()
        .map(|(level, bump)| {
            format!(
                r#"
  <w:style w:type="paragraph" w:styleId="Heading{level}">
    <w:name w:val="heading {level}"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{outline}"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/></w:rPr>
  </w:style>"#,
                outline = level - 1,
                sz = size + bump,
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault>
      <w:rPr>
        <w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>
        <w:sz w:val="{size}"/>
        <w:szCs w:val="{size}"/>
      </w:rPr>
    </w:rPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:spacing w:after="120"/></w:pPr>
    <w:rPr>
      <w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>
      <w:sz w:val="{size}"/>
      <w:szCs w:val="{size}"/>
    </w:rPr>
  </w:style>{headings}
  <w:style w:type="paragraph" w:styleId="ListBullet">
    <w:name w:val="List Bullet"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListNumber">
    <w:name w:val="List Number"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
  </w:style>
  <w:style w:type="table" w:styleId="TableGrid">
    <w:name w:val="Table Grid"/>
    <w:tblPr>
      <w:tblBorders>
        <w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>
      </w:tblBorders>
    </w:tblPr>
  </w:style>
</w:styles>"#
    )
}

/// Abstract 0 is the bullet list, abstract 1 the decimal list; `w:num`
/// 1 is bullets and 2.. restart the decimal list once per ordered run.
fn numbering_xml(ordered_lists: usize) -> String {
    let mut nums = format!(
        r#"  <w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="0"/></w:num>
"#
    );
    for i in 1..=ordered_lists {
        nums.push_str(&format!(
            r#"  <w:num w:numId="{}"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>
"#,
            BULLET_NUM_ID + i
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:multiLevelType w:val="singleLevel"/>
    <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:multiLevelType w:val="singleLevel"/>
    <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl>
  </w:abstractNum>
{nums}</w:numbering>"#
    )
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

const WORD_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;
