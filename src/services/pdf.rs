use tracing::warn;

/// Plain text of a PDF document, `None` when it cannot be parsed or is empty.
pub fn pdf_to_text(bytes: &[u8]) -> Option<String> {
    match pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string()) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "pdf: extraction failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_yields_none() {
        assert_eq!(pdf_to_text(b"not a pdf"), None);
        assert_eq!(pdf_to_text(&[]), None);
    }
}
