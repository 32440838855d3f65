//! Turns free-text model output into exactly three gift records.
//!
//! Cleanup runs as an ordered list of named stages, most general first
//! (markup and whitespace) down to the block-level repairs. Each stage is a
//! pure `&str -> String` transform so a new model quirk only needs a new entry
//! in [`CLEANUP_STAGES`].

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::error::{GiftAdvisorError, Result};
use crate::models::GiftRecord;

/// Stand-in URL the model is told to emit; replaced when a real photo is found.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placeholder.com/400x300";

pub const EXPECTED_RECORDS: usize = 3;
const MIN_BLOCK_LINES: usize = 5;
const BLOCK_SEPARATOR: &str = "\n\n";

pub const PRICE_LABEL: &str = "Price:";
pub const IMAGE_LABEL: &str = "Image:";
pub const WHY_LABEL: &str = "Why:";

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*|[\[\]]").expect("Invalid markup regex"));
static CRLF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").expect("Invalid CRLF regex"));
static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("Invalid trailing space regex"));
static LEADING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]+").expect("Invalid leading space regex"));
static EXCESS_BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid blank run regex"));
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n\r?\n").expect("Invalid blank line regex"));
static MISSING_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\n])\n([23]\n)").expect("Invalid separator regex"));
static IMAGE_WHY_SAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(Image:[^\n]*?)[ \t]*(Why:)").expect("Invalid image/why regex")
});

/// One named cleanup transform.
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

pub const CLEANUP_STAGES: &[Stage] = &[
    Stage {
        name: "strip_markup",
        apply: strip_markup,
    },
    Stage {
        name: "normalize_whitespace",
        apply: normalize_whitespace,
    },
    Stage {
        name: "trim_blank",
        apply: trim_blank,
    },
    Stage {
        name: "renumber_blocks",
        apply: renumber_blocks,
    },
    Stage {
        name: "repair_block_separators",
        apply: repair_block_separators,
    },
    Stage {
        name: "repair_image_why",
        apply: repair_image_why,
    },
];

/// Remove bold markers and the literal brackets echoed from the format template.
pub fn strip_markup(text: &str) -> String {
    MARKUP.replace_all(text.trim(), "").into_owned()
}

/// Unify line endings, drop indentation and trailing spaces, and cap blank runs at one blank line.
pub fn normalize_whitespace(text: &str) -> String {
    let text = CRLF.replace_all(text, "\n");
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = LEADING_SPACE.replace_all(&text, "\n");
    EXCESS_BLANKS
        .replace_all(&text, BLOCK_SEPARATOR)
        .into_owned()
}

pub fn trim_blank(text: &str) -> String {
    text.trim().to_string()
}

/// Overwrite each block's first line with its 1-based position.
pub fn renumber_blocks(text: &str) -> String {
    split_blocks(text)
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            let rest = block.split_once('\n').map(|(_, rest)| rest);
            match rest {
                Some(rest) => format!("{}\n{}", i + 1, rest),
                None => (i + 1).to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Insert the blank line the model left out before a bare `2` or `3` line.
pub fn repair_block_separators(text: &str) -> String {
    MISSING_SEPARATOR
        .replace_all(text, "${1}\n\n${2}")
        .into_owned()
}

/// Break an `Image:` line that swallowed the following `Why:` label.
pub fn repair_image_why(text: &str) -> String {
    IMAGE_WHY_SAME_LINE
        .replace_all(text, "${1}\n${2}")
        .into_owned()
}

/// Run every cleanup stage in order.
pub fn clean(raw: &str) -> String {
    CLEANUP_STAGES.iter().fold(raw.to_string(), |text, stage| {
        let out = (stage.apply)(&text);
        let changed = out != text;
        trace!(stage = stage.name, changed, "Applied cleanup stage");
        out
    })
}

/// Split on blank lines, dropping whitespace-only blocks.
pub fn split_blocks(text: &str) -> Vec<&str> {
    BLANK_LINE
        .split(text)
        .filter(|block| !block.trim().is_empty())
        .collect()
}

fn block_lines(block: &str) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn labeled<'a>(lines: &'a [String], label: &str) -> Option<&'a str> {
    lines
        .iter()
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
}

/// A validated block: the record plus the text lines it is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftBlock {
    record: GiftRecord,
    lines: Vec<String>,
}

impl GiftBlock {
    fn from_lines(index: usize, mut lines: Vec<String>) -> Self {
        lines[0] = index.to_string();

        let image = match labeled(&lines, IMAGE_LABEL).map(str::to_string) {
            Some(url) if !url.is_empty() => url,
            Some(_) => {
                if let Some(line) = lines.iter_mut().find(|l| l.starts_with(IMAGE_LABEL)) {
                    *line = format!("{IMAGE_LABEL} {PLACEHOLDER_IMAGE_URL}");
                }
                PLACEHOLDER_IMAGE_URL.to_string()
            }
            None => PLACEHOLDER_IMAGE_URL.to_string(),
        };

        let record = GiftRecord {
            index,
            name: lines[1].clone(),
            price: labeled(&lines, PRICE_LABEL).unwrap_or_default().to_string(),
            image_url: image,
            why: labeled(&lines, WHY_LABEL).unwrap_or_default().to_string(),
        };

        Self { record, lines }
    }

    pub fn record(&self) -> &GiftRecord {
        &self.record
    }

    pub fn into_record(self) -> GiftRecord {
        self.record
    }

    /// Swap in a real image URL, rewriting the block's `Image:` line when it has one.
    pub fn set_image(&mut self, url: &str) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.starts_with(IMAGE_LABEL)) {
            *line = format!("{IMAGE_LABEL} {url}");
        }
        self.record.image_url = url.to_string();
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Clean, split, and check raw model text, yielding three blocks in order.
pub fn normalize(raw: &str) -> Result<Vec<GiftBlock>> {
    let cleaned = clean(raw);
    debug!(cleaned = %cleaned, "Cleaned model output");

    let sections = split_blocks(&cleaned);
    if sections.len() != EXPECTED_RECORDS {
        return Err(GiftAdvisorError::InvalidFormat {
            found: sections.len(),
        });
    }

    sections
        .into_iter()
        .enumerate()
        .map(|(i, section)| {
            let lines = block_lines(section);
            if lines.len() < MIN_BLOCK_LINES {
                return Err(GiftAdvisorError::InvalidSectionFormat {
                    index: i + 1,
                    reason: format!(
                        "expected at least {MIN_BLOCK_LINES} lines, found {}",
                        lines.len()
                    ),
                });
            }
            Ok(GiftBlock::from_lines(i + 1, lines))
        })
        .collect()
}

/// Wire text: blocks joined by one blank line.
pub fn render(blocks: &[GiftBlock]) -> String {
    blocks
        .iter()
        .map(GiftBlock::render)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Last gate before the text leaves the server.
///
/// Every block needs at least five lines, an index of exactly `1`, `2` or `3`,
/// and `Price:`, `Image:` and `Why:` lines. Price and Why must also carry a value.
pub fn validate_final(text: &str) -> Result<()> {
    let sections = split_blocks(text);
    if sections.len() != EXPECTED_RECORDS {
        return Err(GiftAdvisorError::InvalidFinalFormat {
            index: 0,
            reason: format!("expected {EXPECTED_RECORDS} blocks, found {}", sections.len()),
        });
    }

    for (i, section) in sections.iter().enumerate() {
        let lines = block_lines(section);
        let fail = |reason: String| GiftAdvisorError::InvalidFinalFormat {
            index: i + 1,
            reason,
        };

        if lines.len() < MIN_BLOCK_LINES {
            return Err(fail(format!("only {} lines", lines.len())));
        }
        if !matches!(lines[0].as_str(), "1" | "2" | "3") {
            return Err(fail(format!("bad index line {:?}", lines[0])));
        }
        for label in [PRICE_LABEL, IMAGE_LABEL, WHY_LABEL] {
            match labeled(&lines, label) {
                None => return Err(fail(format!("missing {label} line"))),
                Some("") if label != IMAGE_LABEL => {
                    return Err(fail(format!("empty {label} value")));
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(n: &str, name: &str) -> String {
        format!(
            "{n}\n{name}\nPrice: USD 60\nImage: {PLACEHOLDER_IMAGE_URL}\nWhy: {name} suits them."
        )
    }

    fn three(nums: [&str; 3]) -> String {
        format!(
            "{}\n\n{}\n\n{}",
            block(nums[0], "Kindle Paperwhite"),
            block(nums[1], "Book Subscription"),
            block(nums[2], "Reading Lamp")
        )
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("  **1**\n[Kindle]\nPrice: [USD] 120  "),
            "1\nKindle\nPrice: USD 120"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        let input = "1\r\n  Lamp   \r\nPrice: 10\n\n\n\n2\n\tBook";
        assert_eq!(normalize_whitespace(input), "1\nLamp\nPrice: 10\n\n2\nBook");
    }

    #[test]
    fn test_normalize_whitespace_clears_whitespace_only_lines() {
        assert_eq!(normalize_whitespace("a\n   \n   \nb"), "a\n\nb");
    }

    #[test]
    fn test_trim_blank() {
        assert_eq!(trim_blank("\n\n  1\nA\n\n"), "1\nA");
    }

    #[test]
    fn test_renumber_blocks_overwrites_first_line() {
        let text = "13\nA\n\n13\nB\n\n15\nC";
        assert_eq!(renumber_blocks(text), "1\nA\n\n2\nB\n\n3\nC");
    }

    #[test]
    fn test_repair_block_separators() {
        let text = "1\nA\nWhy: y\n2\nB\nWhy: z\n3\nC";
        assert_eq!(
            repair_block_separators(text),
            "1\nA\nWhy: y\n\n2\nB\nWhy: z\n\n3\nC"
        );
    }

    #[test]
    fn test_repair_block_separators_leaves_existing_blank() {
        let text = "1\nA\n\n2\nB";
        assert_eq!(repair_block_separators(text), text);
    }

    #[test]
    fn test_repair_image_why() {
        let text = "Image: https://placeholder.com/400x300 Why: Great for readers.";
        assert_eq!(
            repair_image_why(text),
            "Image: https://placeholder.com/400x300\nWhy: Great for readers."
        );
    }

    #[test]
    fn test_stages_are_in_documented_order() {
        let names: Vec<_> = CLEANUP_STAGES.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "strip_markup",
                "normalize_whitespace",
                "trim_blank",
                "renumber_blocks",
                "repair_block_separators",
                "repair_image_why"
            ]
        );
    }

    #[test]
    fn test_normalize_renumbers_any_numerals() {
        let blocks = normalize(&three(["7", "7", "12"])).unwrap();
        let indices: Vec<_> = blocks.iter().map(|b| b.record().index).collect();
        assert_eq!(indices, [1, 2, 3]);
        assert_eq!(blocks[0].record().name, "Kindle Paperwhite");
        assert_eq!(blocks[1].record().price, "USD 60");
        assert_eq!(blocks[2].record().why, "Reading Lamp suits them.");
        assert_eq!(blocks[2].record().image_url, PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn test_normalize_is_idempotent_on_clean_input() {
        let input = three(["1", "2", "3"]);
        let blocks = normalize(&input).unwrap();
        let rendered = render(&blocks);
        assert_eq!(rendered, input);
        assert_eq!(normalize(&rendered).unwrap(), blocks);
    }

    #[test]
    fn test_normalize_handles_markdown_noise() {
        let raw = "\n**1**\n**[Kindle]**\nPrice: [USD] [120]\nImage: https://placeholder.com/400x300\nWhy: [Lightweight.]\n\n\n\n2\nPen\nPrice: USD 55\nImage: https://placeholder.com/400x300 Why: Smooth.\n\n3\nMug\nPrice: USD 70\nImage: https://placeholder.com/400x300\nWhy: Warm.\n";
        let blocks = normalize(raw).unwrap();
        assert_eq!(blocks[0].record().name, "Kindle");
        assert_eq!(blocks[0].record().price, "USD 120");
        assert_eq!(blocks[0].record().why, "Lightweight.");
        assert_eq!(blocks[1].record().why, "Smooth.");
        validate_final(&render(&blocks)).unwrap();
    }

    #[test]
    fn test_missing_separators_are_repaired() {
        let raw = "1\nA\nPrice: 10\nImage: x\nWhy: y\n2\nB\nPrice: 20\nImage: x\nWhy: y\n3\nC\nPrice: 30\nImage: x\nWhy: y";
        let blocks = normalize(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        let names: Vec<_> = blocks.iter().map(|b| b.record().name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_one_missing_separator_still_yields_sequential_indices() {
        let raw = format!(
            "{}\n{}\n\n{}",
            block("1", "A"),
            block("2", "B"),
            block("3", "C")
        );
        let blocks = normalize(&raw).unwrap();
        let indices: Vec<_> = blocks.iter().map(|b| b.record().index).collect();
        assert_eq!(indices, [1, 2, 3]);
        validate_final(&render(&blocks)).unwrap();
    }

    #[test]
    fn test_two_blocks_is_invalid_format() {
        let raw = format!("{}\n\n{}", block("1", "A"), block("2", "B"));
        assert!(matches!(
            normalize(&raw),
            Err(GiftAdvisorError::InvalidFormat { found: 2 })
        ));
    }

    #[test]
    fn test_four_blocks_is_invalid_format() {
        let raw = format!("Here are some ideas!\n\n{}", three(["1", "2", "3"]));
        assert!(matches!(
            normalize(&raw),
            Err(GiftAdvisorError::InvalidFormat { found: 4 })
        ));
    }

    #[test]
    fn test_short_block_is_invalid_section() {
        let raw = format!(
            "{}\n\n2\nB\nPrice: USD 60\nWhy: missing image\n\n{}",
            block("1", "A"),
            block("3", "C")
        );
        match normalize(&raw) {
            Err(GiftAdvisorError::InvalidSectionFormat { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected section error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_label_extracts_empty_then_fails_final() {
        let raw = format!(
            "{}\n\n2\nB\nPrice: USD 60\nImage: x\nBecause they like it.\n\n{}",
            block("1", "A"),
            block("3", "C")
        );
        let blocks = normalize(&raw).unwrap();
        assert_eq!(blocks[1].record().why, "");
        assert!(matches!(
            validate_final(&render(&blocks)),
            Err(GiftAdvisorError::InvalidFinalFormat { index: 2, .. })
        ));
    }

    #[test]
    fn test_empty_image_value_gets_placeholder() {
        let raw = format!(
            "{}\n\n2\nB\nPrice: USD 60\nImage:\nWhy: z\n\n{}",
            block("1", "A"),
            block("3", "C")
        );
        let blocks = normalize(&raw).unwrap();
        assert_eq!(blocks[1].record().image_url, PLACEHOLDER_IMAGE_URL);
        assert!(render(&blocks).contains(&format!("Image: {PLACEHOLDER_IMAGE_URL}\nWhy: z")));
    }

    #[test]
    fn test_set_image_rewrites_line() {
        let mut blocks = normalize(&three(["1", "2", "3"])).unwrap();
        blocks[0].set_image("https://images.example/kindle.jpg?w=400&h=300&fit=crop");
        let text = render(&blocks);
        assert!(text.starts_with(
            "1\nKindle Paperwhite\nPrice: USD 60\nImage: https://images.example/kindle.jpg?w=400&h=300&fit=crop\n"
        ));
        assert_eq!(
            blocks[0].record().image_url,
            "https://images.example/kindle.jpg?w=400&h=300&fit=crop"
        );
        validate_final(&text).unwrap();
    }

    #[test]
    fn test_validate_final_rejects_bad_index() {
        let text = three(["1", "2", "4"]);
        assert!(matches!(
            validate_final(&text),
            Err(GiftAdvisorError::InvalidFinalFormat { index: 3, .. })
        ));
    }

    #[test]
    fn test_validate_final_rejects_empty_price() {
        let text = three(["1", "2", "3"]).replacen("Price: USD 60", "Price:", 1);
        assert!(matches!(
            validate_final(&text),
            Err(GiftAdvisorError::InvalidFinalFormat { index: 1, .. })
        ));
    }
}
