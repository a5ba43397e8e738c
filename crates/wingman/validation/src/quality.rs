//! ContentQualityValidator - framework-section completeness scoring
//!
//! Instructions are expected to follow a ten-section framework. Each
//! section present in the text earns 0-10 points from length,
//! specificity and structure signals, so the sum is already on the
//! 0-100 scale.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::json;

use crate::score::{ValidationInput, Validator, ValidatorScore};

/// The ten framework sections, in presentation order.
pub const FRAMEWORK_SECTIONS: [&str; 10] = [
    "objective",
    "context",
    "prerequisites",
    "steps",
    "verification",
    "rollback",
    "risks",
    "dependencies",
    "success_criteria",
    "timeout",
];

const VAGUE_WORDS: [&str; 6] = ["tbd", "todo", "stuff", "somehow", "maybe", "etc"];
const VAGUENESS_PENALTY: u32 = 2;

fn section_header_regex(section: &str) -> Regex {
    // Matches "## Objective", "objective:", "**Success Criteria**" and
    // the snake_case spelling used in structured submissions.
    let spaced = section.replace('_', "[ _]");
    RegexBuilder::new(&format!(
        r"(^|\n)\s*(#+\s*|\*\*)?{spaced}s?\b(\*\*)?\s*:?"
    ))
    .case_insensitive(true)
    .build()
    .unwrap_or_else(|e| panic!("invalid section regex for {section}: {e}"))
}

struct Signals {
    backtick: Regex,
    action_verb: Regex,
    quantified: Regex,
    url: Regex,
    bullet: Regex,
    numbered: Regex,
}

fn signals() -> &'static Signals {
    static SIGNALS: OnceLock<Signals> = OnceLock::new();
    SIGNALS.get_or_init(|| Signals {
        backtick: Regex::new(r"`[^`]+`").unwrap_or_else(|e| panic!("backtick regex: {e}")),
        action_verb: RegexBuilder::new(
            r"\b(run|execute|deploy|verify|check|restart|apply|create|update|query|confirm|roll\s?back)\b",
        )
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("action verb regex: {e}")),
        quantified: Regex::new(r"\b\d+\s*(%|ms|s|sec|seconds|m|min|minutes|h|hours|gb|mb|replicas?|retries)\b")
            .unwrap_or_else(|e| panic!("quantified regex: {e}")),
        url: Regex::new(r"https?://\S+").unwrap_or_else(|e| panic!("url regex: {e}")),
        bullet: Regex::new(r"(^|\n)\s*[-*]\s+").unwrap_or_else(|e| panic!("bullet regex: {e}")),
        numbered: Regex::new(r"(^|\n)\s*\d+[.)]\s+").unwrap_or_else(|e| panic!("numbered regex: {e}")),
    })
}

struct SectionRegexes([Regex; 10]);

fn section_regexes() -> &'static SectionRegexes {
    static REGEXES: OnceLock<SectionRegexes> = OnceLock::new();
    REGEXES.get_or_init(|| {
        SectionRegexes(FRAMEWORK_SECTIONS.map(section_header_regex))
    })
}

/// Extracts the body of a section: text from its header to the next
/// recognized header or end of input.
fn section_body<'a>(text: &'a str, index: usize) -> Option<&'a str> {
    let regexes = section_regexes();
    let m = regexes.0[index].find(text)?;
    let start = m.end();
    let mut end = text.len();
    for (i, re) in regexes.0.iter().enumerate() {
        if i == index {
            continue;
        }
        if let Some(other) = re.find_at(text, start) {
            end = end.min(other.start());
        }
    }
    Some(&text[start..end])
}

fn score_section(section: &str, body: &str) -> u32 {
    let sig = signals();
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return 1; // header alone shows intent, nothing more
    }

    let mut points: u32 = 2;

    // Length: up to 3 points for substance without rewarding padding.
    let words = trimmed.split_whitespace().count() as u32;
    points += (words / 8).min(3);

    // Specificity: 1 point per distinct signal kind, up to 3.
    let mut specificity = 0u32;
    for re in [&sig.backtick, &sig.action_verb, &sig.quantified, &sig.url] {
        if re.is_match(trimmed) {
            specificity += 1;
        }
    }
    points += specificity.min(3);

    // Structure.
    if sig.bullet.is_match(trimmed) || sig.numbered.is_match(trimmed) {
        points += 1;
    }

    // Section-specific bonus.
    let bonus = match section {
        "steps" => sig.numbered.is_match(trimmed),
        "verification" | "success_criteria" => sig.quantified.is_match(trimmed),
        "rollback" => sig.action_verb.is_match(trimmed),
        "timeout" => sig.quantified.is_match(trimmed),
        _ => false,
    };
    if bonus {
        points += 1;
    }

    points.min(10)
}

fn vagueness_penalty(text: &str) -> u32 {
    let lower = text.to_ascii_lowercase();
    let mut hits = 0u32;
    for word in VAGUE_WORDS {
        let re = RegexBuilder::new(&format!(r"\b{word}\b"))
            .build()
            .unwrap_or_else(|e| panic!("vague word regex: {e}"));
        if re.is_match(&lower) {
            hits += 1;
        }
    }
    hits * VAGUENESS_PENALTY
}

/// Scores instruction completeness against the ten-section framework.
#[derive(Debug, Default, Clone)]
pub struct ContentQualityValidator;

impl ContentQualityValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for ContentQualityValidator {
    fn name(&self) -> &'static str {
        "content_quality"
    }

    async fn validate(&self, input: &ValidationInput) -> ValidatorScore {
        let text = input.instruction.as_str();
        let mut total: u32 = 0;
        let mut section_scores = serde_json::Map::new();
        let mut missing = Vec::new();

        for (i, section) in FRAMEWORK_SECTIONS.iter().enumerate() {
            match section_body(text, i) {
                Some(body) => {
                    let points = score_section(section, body);
                    total += points;
                    section_scores.insert(section.to_string(), json!(points));
                }
                None => {
                    section_scores.insert(section.to_string(), json!(0));
                    missing.push(section.to_string());
                }
            }
        }

        let penalty = vagueness_penalty(text);
        let score = total.saturating_sub(penalty).min(100) as u8;

        let mut concerns = Vec::new();
        if !missing.is_empty() {
            concerns.push(format!("missing sections: {}", missing.join(", ")));
        }
        if penalty > 0 {
            concerns.push("vague language detected".to_string());
        }

        ValidatorScore::new(self.name(), score)
            .with_concerns(concerns)
            .with_details(json!({
                "section_scores": section_scores,
                "missing_sections": missing,
                "vagueness_penalty": penalty,
            }))
    }
}
