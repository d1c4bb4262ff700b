//! Post-processing of LLM output.

/// Prefix marking recommendations mined from LLM output.
pub const LLM_PREFIX: &str = "LLM: ";

const MARKERS: [&str; 4] = [
    "Recommendations:",
    "Recommendation:",
    "recommendations:",
    "recommendation:",
];

/// Pulls recommendation lines out of free-form analysis text.
///
/// Lines containing a `Recommendation:` marker and list items starting with
/// `-` are taken first. When none are found and the text is long enough, the
/// first three sentences longer than 20 characters are used instead. Every
/// result carries the [`LLM_PREFIX`].
///
/// # Examples
///
/// ```rust
/// use ingest_profiler::llm::extract_recommendations;
///
/// let text = "Summary\n- Partition by created_at\nRecommendation: add a primary key";
/// assert_eq!(
///     extract_recommendations(text),
///     vec!["LLM: Partition by created_at", "LLM: add a primary key"]
/// );
/// ```
pub fn extract_recommendations(analysis: &str) -> Vec<String> {
    let mut found = Vec::new();

    for line in analysis.lines().map(str::trim) {
        if MARKERS.iter().any(|m| line.contains(m)) {
            let cleaned = MARKERS
                .iter()
                .fold(line.to_string(), |acc, m| acc.replace(m, ""));
            let cleaned = cleaned.trim().trim_start_matches('-').trim();
            if cleaned.chars().count() > 10 {
                found.push(format!("{LLM_PREFIX}{cleaned}"));
            }
        } else if line.starts_with('-') && line.chars().count() > 5 {
            let cleaned = line.trim_start_matches('-').trim();
            if !cleaned.is_empty() {
                found.push(format!("{LLM_PREFIX}{cleaned}"));
            }
        }
    }

    if found.is_empty() && analysis.chars().count() > 50 {
        found = analysis
            .split('.')
            .take(3)
            .map(str::trim)
            .filter(|s| s.chars().count() > 20)
            .map(|s| format!("{LLM_PREFIX}{s}."))
            .collect();
    }

    found
}

/// Removes a surrounding markdown code fence (```` ```sql ... ``` ````).
///
/// Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // drop the info string (`sql`, `ddl`, ...) on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_lines_need_content() {
        let text = "Recommendation: ok\nRecommendations: normalize the phone column";
        assert_eq!(
            extract_recommendations(text),
            vec!["LLM: normalize the phone column"]
        );
    }

    #[test]
    fn test_short_dash_lines_skipped() {
        assert!(extract_recommendations("- a\n-bb").is_empty());
    }

    #[test]
    fn test_sentence_fallback() {
        let text = "The dataset is small and clean overall. Ages look plausible for adults. \
                    Names are unique. Consider ClickHouse later on when it grows.";
        assert_eq!(
            extract_recommendations(text),
            vec![
                "LLM: The dataset is small and clean overall.",
                "LLM: Ages look plausible for adults.",
            ]
        );
    }

    #[test]
    fn test_short_text_yields_nothing() {
        assert!(extract_recommendations("All good. Nothing to add.").is_empty());
        assert!(extract_recommendations("").is_empty());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```sql\nCREATE TABLE t (a INT);\n```"),
            "CREATE TABLE t (a INT);"
        );
        assert_eq!(strip_code_fences("  SELECT 1;  "), "SELECT 1;");
        assert_eq!(strip_code_fences("```\nSELECT 1;\n```\n"), "SELECT 1;");
    }
}
