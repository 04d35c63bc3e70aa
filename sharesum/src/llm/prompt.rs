// Prompt construction for summary requests

/// Built-in instruction template.
///
/// Placeholders: `{text}`, `{length}` (label), `{percent}` and `{fraction}`.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Summarize the following content. Make the summary {length}, about {percent}% of the original length.

INSTRUCTIONS:
1. If the content names a title, author, publication date or source, list them at the top.
2. Use markdown formatting sparingly: short headings and bullet points only where they help.
3. Keep the language of the original content.
4. If the content is a link you cannot open or read, say so explicitly instead of guessing what it contains.

CONTENT:
{text}
"#;

/// Target verbosity derived from a 1-5 length level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthProfile {
    level: u8,
    label: &'static str,
    percent: u32,
}

const PROFILES: [LengthProfile; 5] = [
    LengthProfile { level: 1, label: "very short", percent: 5 },
    LengthProfile { level: 2, label: "short", percent: 10 },
    LengthProfile { level: 3, label: "medium", percent: 15 },
    LengthProfile { level: 4, label: "long", percent: 20 },
    LengthProfile { level: 5, label: "very long", percent: 25 },
];

impl LengthProfile {
    /// Anything outside 1-5 is treated as level 3.
    pub fn for_level(level: i64) -> Self {
        let idx = match level {
            1..=5 => (level - 1) as usize,
            _ => 2,
        };
        PROFILES[idx]
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Target share of the original length, in whole percent
    pub fn percent(&self) -> u32 {
        self.percent
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.percent) / 100.0
    }

    /// Sentences to keep out of `total`: `max(1, floor(total * fraction))`
    pub fn sentence_count(&self, total: usize) -> usize {
        (total * self.percent as usize / 100).max(1)
    }
}

/// Render the final prompt. A blank template selects [`DEFAULT_PROMPT_TEMPLATE`];
/// a custom template without `{text}` gets the raw text appended.
pub fn build_prompt(raw_text: &str, level: i64, template: &str) -> String {
    let profile = LengthProfile::for_level(level);
    let template = if template.trim().is_empty() {
        DEFAULT_PROMPT_TEMPLATE
    } else {
        template
    };

    // `{text}` goes last so placeholders inside the shared text stay literal
    let rendered = template
        .replace("{length}", profile.label())
        .replace("{percent}", &profile.percent().to_string())
        .replace("{fraction}", &format!("{:.2}", profile.fraction()));

    if rendered.contains("{text}") {
        rendered.replace("{text}", raw_text)
    } else {
        format!("{}\n\n{}", rendered.trim_end(), raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_table_matches_levels() {
        let expected = [
            (1, "very short", 5),
            (2, "short", 10),
            (3, "medium", 15),
            (4, "long", 20),
            (5, "very long", 25),
        ];
        for (level, label, percent) in expected {
            let profile = LengthProfile::for_level(level);
            assert_eq!(profile.label(), label);
            assert_eq!(profile.percent(), percent);
        }
    }

    #[test]
    fn out_of_range_levels_are_medium() {
        for level in [-3, 0, 6, 42, i64::MAX] {
            let profile = LengthProfile::for_level(level);
            assert_eq!(profile.level(), 3);
            assert_eq!(profile.label(), "medium");
            assert!((profile.fraction() - 0.15).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn sentence_count_floors_with_minimum_one() {
        let very_short = LengthProfile::for_level(1);
        assert_eq!(very_short.sentence_count(4), 1);
        assert_eq!(very_short.sentence_count(20), 1);
        assert_eq!(very_short.sentence_count(40), 2);

        let very_long = LengthProfile::for_level(5);
        assert_eq!(very_long.sentence_count(0), 1);
        assert_eq!(very_long.sentence_count(8), 2);
        assert_eq!(very_long.sentence_count(11), 2);
    }

    #[test]
    fn default_prompt_contains_text_label_and_percent() {
        let text = "Rust 1.80 ships today. It stabilizes LazyLock.";
        let prompt = build_prompt(text, 2, "");

        assert!(prompt.contains(text));
        assert!(prompt.contains("short, about 10% of the original length"));
        assert!(prompt.contains("author"));
        assert!(prompt.contains("link you cannot open"));
    }

    #[test]
    fn custom_template_placeholders_are_filled() {
        let prompt = build_prompt("body", 4, "Write a {length} digest ({fraction}) of: {text}");
        assert_eq!(prompt, "Write a long digest (0.20) of: body");
    }

    #[test]
    fn custom_template_without_text_placeholder_appends_text() {
        let prompt = build_prompt("https://example.com/post", 9, "Summarize briefly ({length}).");
        assert_eq!(prompt, "Summarize briefly (medium).\n\nhttps://example.com/post");
    }

    #[test]
    fn placeholders_in_shared_text_are_not_expanded() {
        let text = "Use {length} as a variable name.";
        let prompt = build_prompt(text, 1, "");
        assert!(prompt.contains(text));
    }
}
