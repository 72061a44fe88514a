//! Format-specific text extraction.

use super::{AcquisitionError, DocumentKind};
use crate::pipeline::TextUnit;
use std::io::{Cursor, Read};

const DOCX_BODY: &str = "word/document.xml";

/// Turn raw document bytes into ordered text units tagged with `source`.
///
/// PDF documents yield one unit per page; DOCX and plain text yield a single unit. Units without any visible text are dropped, so an
/// image-only PDF produces an empty list rather than an error.
pub async fn extract_units(
    bytes: Vec<u8>,
    kind: DocumentKind,
    source: &str,
) -> Result<Vec<TextUnit>, AcquisitionError> {
    let pages = match kind {
        DocumentKind::Text => vec![decode_text(&bytes)],
        DocumentKind::Pdf => run_blocking(kind, move || extract_pdf(&bytes)).await?,
        DocumentKind::Docx => vec![run_blocking(kind, move || extract_docx(&bytes)).await?],
    };

    let units: Vec<TextUnit> = pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .map(|page| TextUnit::new(page, source))
        .collect();
    tracing::debug!(source, kind = %kind, units = units.len(), "Extracted document text");
    Ok(units)
}

async fn run_blocking<T, F>(kind: DocumentKind, job: F) -> Result<T, AcquisitionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|error| AcquisitionError::Extraction {
            kind,
            reason: format!("extraction task failed: {error}"),
        })?
        .map_err(|reason| AcquisitionError::Extraction { kind, reason })
}

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

fn extract_pdf(bytes: &[u8]) -> Result<Vec<String>, String> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|error| error.to_string())
}

fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|error| error.to_string())?;
    let mut body = archive
        .by_name(DOCX_BODY)
        .map_err(|error| format!("{DOCX_BODY}: {error}"))?;
    let mut xml = String::new();
    body.read_to_string(&mut xml)
        .map_err(|error| format!("{DOCX_BODY}: {error}"))?;
    Ok(docx_text(&xml))
}

/// Collect run text from WordprocessingML, one line per paragraph.
fn docx_text(xml: &str) -> String {
    let mut out = String::new();
    let mut rest = xml;
    let mut in_run_text = false;

    while let Some(open) = rest.find('<') {
        if in_run_text {
            out.push_str(&unescape_xml(&rest[..open]));
        }
        let Some(len) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + len];
        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default();

        match (name, closing) {
            ("w:t", false) => in_run_text = !self_closing,
            ("w:t", true) => in_run_text = false,
            ("w:p", true) => out.push('\n'),
            ("w:tab", false) => out.push('\t'),
            ("w:br", false) | ("w:cr", false) => out.push('\n'),
            _ => {}
        }
        rest = &rest[open + len + 1..];
    }
    out
}

fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Build a minimal DOCX archive around the given `word/document.xml` body.
    pub(crate) fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", zip::write::FileOptions::default())
            .expect("start content types");
        writer
            .write_all(b"<?xml version=\"1.0\"?><Types/>")
            .expect("write content types");
        writer
            .start_file(DOCX_BODY, zip::write::FileOptions::default())
            .expect("start body");
        writer
            .write_all(document_xml.as_bytes())
            .expect("write body");
        writer.finish().expect("finish archive").into_inner()
    }

    pub(crate) fn paragraphs_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|text| format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>"))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}<w:sectPr/></w:body></w:document>"
        )
    }

    #[test]
    fn docx_text_keeps_paragraphs_and_runs() {
        let xml = "<w:body><w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr>\
                   <w:r><w:t>Grace </w:t></w:r><w:r><w:t xml:space=\"preserve\">period</w:t></w:r></w:p>\
                   <w:p><w:r><w:t>A</w:t><w:tab/><w:t>B &amp; C &lt;D&gt;</w:t></w:r></w:p>\
                   <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>";
        assert_eq!(docx_text(xml), "Grace period\nA\tB & C <D>\nCell\n");
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let xml = "<w:p><w:r><w:instrText>PAGE</w:instrText><w:t>visible</w:t></w:r></w:p>";
        assert_eq!(docx_text(xml), "visible\n");
    }

    /// Build an uncompressed PDF with one Helvetica text line per page.
    fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
        let page_count = pages.len();
        let kids: Vec<String> = (0..page_count)
            .map(|page| format!("{} 0 R", 4 + page * 2))
            .collect();
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {page_count} >>",
                kids.join(" ")
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (page, text) in pages.iter().enumerate() {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + page * 2
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
        }
        let xref_at = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(xref.as_bytes());
        pdf
    }

    #[tokio::test]
    async fn pdf_pages_become_separate_units() {
        let bytes = pdf_bytes(&["Page one text", "Page two text"]);
        let units = extract_units(bytes, DocumentKind::Pdf, "policy.pdf")
            .await
            .expect("units");

        let texts: Vec<&str> = units.iter().map(|unit| unit.text.trim()).collect();
        assert_eq!(texts, vec!["Page one text", "Page two text"]);
        assert!(units.iter().all(|unit| unit.source == "policy.pdf"));
    }

    #[tokio::test]
    async fn plain_text_is_one_unit_and_lossy() {
        let mut bytes = "\u{feff}Policy text ".as_bytes().to_vec();
        bytes.push(0xff);
        let units = extract_units(bytes, DocumentKind::Text, "policy.txt")
            .await
            .expect("units");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Policy text \u{fffd}");
        assert_eq!(units[0].source, "policy.txt");
    }

    #[tokio::test]
    async fn docx_archive_is_extracted() {
        let bytes = docx_bytes(&paragraphs_xml(&["First clause.", "Second clause."]));
        let units = extract_units(bytes, DocumentKind::Docx, "terms.docx")
            .await
            .expect("units");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "First clause.\nSecond clause.\n");
    }

    #[tokio::test]
    async fn blank_documents_yield_no_units() {
        let units = extract_units(b"  \n\t ".to_vec(), DocumentKind::Text, "blank.txt")
            .await
            .expect("units");
        assert!(units.is_empty());
    }

    #[tokio::test]
    async fn corrupt_archives_fail_extraction() {
        let error = extract_units(b"not a zip".to_vec(), DocumentKind::Docx, "broken.docx")
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            AcquisitionError::Extraction {
                kind: DocumentKind::Docx,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn corrupt_pdfs_fail_extraction() {
        let error = extract_units(b"%PDF-1.4 garbage".to_vec(), DocumentKind::Pdf, "broken.pdf")
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            AcquisitionError::Extraction {
                kind: DocumentKind::Pdf,
                ..
            }
        ));
    }
}
