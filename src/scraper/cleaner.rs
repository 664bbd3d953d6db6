
// ── Text normalisation ────────────────────────────────────────────────────────

/// Collapse a raw text node into its trimmed content, `None` when blank.
/// "\n  R$ 10.000,00 \t" → "R$ 10.000,00" | "   " → None
pub fn clean_text(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let s = raw.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Normalise a field label for comparison: trim, drop a trailing colon,
/// squeeze inner whitespace.
/// "Finalidade:" → "Finalidade" | " Data  de início : " → "Data de início"
pub fn normalise_label(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_suffix(':').unwrap_or(s);
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn label_matches(text: &str, label: &str) -> bool {
    normalise_label(text) == normalise_label(label)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
