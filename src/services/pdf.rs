use anyhow::{Context, Result};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Readers accept the header anywhere in the first kilobyte.
const HEADER_WINDOW: usize = 1024;

/// Quick sniff of the file header; the real parse happens in [`extract_text`].
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(HEADER_WINDOW)]
        .windows(PDF_MAGIC.len())
        .any(|window| window == PDF_MAGIC)
}

/// Extract the document text, one page after another.
///
/// Pages without extractable text are dropped; every kept page is followed by
/// a newline.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let pages = extract_pages(bytes)?;
    let text = join_pages(&pages);
    tracing::info!(
        "PDF text extracted: {} pages, {} with text, {} chars",
        pages.len(),
        pages.iter().filter(|p| has_text(p)).count(),
        text.len()
    );
    Ok(text)
}

pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut text = String::new();
    for page in pages.iter().map(AsRef::as_ref).filter(|p| has_text(p)) {
        text.push_str(page);
        text.push('\n');
    }
    text
}

fn has_text(page: &str) -> bool {
    !page.trim().is_empty()
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    // pdftotext (poppler) is faster and copes better with complex layouts
    select_pages(extract_pages_pdftotext(bytes), || {
        tracing::info!("Extracting PDF via pdf_extract (this may be slow for large files)");
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .context("Failed to extract text from PDF")
    })
}

/// Picks between the primary extractor's pages and the fallback's.
///
/// A primary result that parsed but found no text still counts: if the
/// fallback then fails, those blank pages are returned so the document is
/// reported as empty rather than unreadable.
fn select_pages<F>(primary: Result<Vec<String>>, fallback: F) -> Result<Vec<String>>
where
    F: FnOnce() -> Result<Vec<String>>,
{
    match primary {
        Ok(pages) if pages.iter().any(|p| has_text(p)) => {
            tracing::debug!("PDF extracted via pdftotext ({} pages)", pages.len());
            Ok(pages)
        }
        Ok(blank) => {
            tracing::warn!("pdftotext returned no text, falling back to pdf_extract");
            match fallback() {
                Ok(pages) => Ok(pages),
                Err(e) => {
                    tracing::warn!("pdf_extract failed after blank pdftotext output: {e:#}");
                    Ok(blank)
                }
            }
        }
        Err(e) => {
            tracing::warn!("pdftotext failed ({e:#}), falling back to pdf_extract");
            fallback()
        }
    }
}

fn extract_pages_pdftotext(bytes: &[u8]) -> Result<Vec<String>> {
    use std::io::Write;
    use std::process::Command;

    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write PDF to temp file")?;
    tmp.flush()?;

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(tmp.path())
        .arg("-")
        .output()
        .context("Failed to run pdftotext, is poppler-utils installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pdftotext exited with {}: {stderr}", output.status);
    }

    let text = String::from_utf8(output.stdout).context("pdftotext output is not valid UTF-8")?;
    Ok(split_form_feeds(&text))
}

/// pdftotext terminates every page with a form feed.
fn split_form_feeds(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    if pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    pages
}
