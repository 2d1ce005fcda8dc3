//! Deterministic fallback analyzer.
//!
//! Scans the bill for each category's keywords, keeps categories whose gate
//! admits the reader's profile, and synthesises one finding per category.
//! Used when the oracle is unavailable; always returns at least one finding.

use billscope_core::chunk::chunk_text;
use billscope_core::{Chunk, ImpactDirection, ImpactFinding, ReaderProfile, Severity};
use tracing::{debug, info};

use crate::policy::{CategoryRule, GateMatch, HeuristicPolicy};

pub const GENERIC_CATEGORY: &str = "General";
pub const GENERIC_TITLE: &str = "Limited Direct Impact";

/// Rule-based analyzer driven by a [`HeuristicPolicy`].
pub struct HeuristicEngine {
    policy: HeuristicPolicy,
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new(HeuristicPolicy::default())
    }
}

impl HeuristicEngine {
    /// Build an engine. Keywords and cue words are lowercased and trimmed.
    pub fn new(mut policy: HeuristicPolicy) -> Self {
        for rule in &mut policy.categories {
            normalize_words(&mut rule.keywords);
        }
        normalize_words(&mut policy.positive_cues);
        normalize_words(&mut policy.negative_cues);
        Self { policy }
    }

    pub fn policy(&self) -> &HeuristicPolicy {
        &self.policy
    }

    /// Analyze raw document text. Chunks it first so findings can cite passages.
    pub fn analyze_text(&self, text: &str, profile: &ReaderProfile) -> Vec<ImpactFinding> {
        self.analyze(&chunk_text(text), profile)
    }

    /// Analyze a chunked document. Never returns an empty vector.
    pub fn analyze(&self, chunks: &[Chunk], profile: &ReaderProfile) -> Vec<ImpactFinding> {
        let lowered: Vec<String> = chunks.iter().map(|c| c.content.to_lowercase()).collect();

        let mut findings = Vec::new();
        for rule in &self.policy.categories {
            let matching: Vec<usize> = lowered
                .iter()
                .enumerate()
                .filter(|(_, text)| rule.keywords.iter().any(|kw| contains_word_start(text, kw)))
                .map(|(i, _)| i)
                .collect();
            if matching.is_empty() {
                continue;
            }

            let Some(gate) = rule.gate.evaluate(profile, &self.policy) else {
                debug!(category = %rule.name, "keywords matched but category not relevant to profile");
                continue;
            };

            findings.push(self.build_finding(rule, &gate, chunks, &lowered, &matching));
        }

        if findings.is_empty() {
            info!("no category matched the profile, emitting generic finding");
            findings.push(generic_finding(chunks.first()));
        } else {
            info!(count = findings.len(), "heuristic analysis complete");
        }
        findings
    }

    fn build_finding(
        &self,
        rule: &CategoryRule,
        gate: &GateMatch,
        chunks: &[Chunk],
        lowered: &[String],
        matching: &[usize],
    ) -> ImpactFinding {
        let hits: Vec<&str> = rule
            .keywords
            .iter()
            .filter(|kw| matching.iter().any(|&i| contains_word_start(&lowered[i], kw)))
            .map(String::as_str)
            .collect();

        let positive: usize = self.cue_count(&self.policy.positive_cues, lowered, matching);
        let negative: usize = self.cue_count(&self.policy.negative_cues, lowered, matching);
        let impact = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => ImpactDirection::Positive,
            std::cmp::Ordering::Less => ImpactDirection::Negative,
            std::cmp::Ordering::Equal => ImpactDirection::Neutral,
        };

        let mut severity = if hits.len() >= self.policy.high_hits {
            Severity::High
        } else if hits.len() >= self.policy.medium_hits {
            Severity::Medium
        } else {
            Severity::Low
        };
        if gate.strong {
            severity = severity.raised();
        }

        let mut details = vec![format!("Mentions: {}", hits.join(", "))];
        details.extend(self.excerpts(rule, chunks, matching));

        debug!(
            category = %rule.name,
            hits = hits.len(),
            positive,
            negative,
            severity = %severity,
            "category matched"
        );

        ImpactFinding {
            category: rule.name.clone(),
            impact,
            severity,
            title: rule.title.clone(),
            description: format!("{} This applies to you {}.", rule.summary, gate.reason),
            details,
            source_chunk_id: Some(chunks[matching[0]].id.clone()),
            citation: None,
        }
    }

    fn cue_count(&self, cues: &[String], lowered: &[String], matching: &[usize]) -> usize {
        matching
            .iter()
            .map(|&i| cues.iter().map(|cue| count_word_starts(&lowered[i], cue)).sum::<usize>())
            .sum()
    }

    /// Quoted sentences that mention a category keyword, in document order.
    fn excerpts(&self, rule: &CategoryRule, chunks: &[Chunk], matching: &[usize]) -> Vec<String> {
        matching
            .iter()
            .flat_map(|&i| sentences(&chunks[i].content))
            .filter(|sentence| {
                let lower = sentence.to_lowercase();
                rule.keywords.iter().any(|kw| contains_word_start(&lower, kw))
            })
            .take(self.policy.max_excerpts)
            .map(|sentence| format!("\"{}\"", truncate_chars(sentence, self.policy.max_excerpt_chars)))
            .collect()
    }
}

fn generic_finding(first: Option<&Chunk>) -> ImpactFinding {
    ImpactFinding {
        category: GENERIC_CATEGORY.to_string(),
        impact: ImpactDirection::Neutral,
        severity: Severity::Low,
        title: GENERIC_TITLE.to_string(),
        description: "Based on your profile, this bill does not appear to contain provisions \
                      that directly affect you. It may still have indirect effects."
            .to_string(),
        details: vec!["No provisions matched the topics tracked for your profile.".to_string()],
        source_chunk_id: first.map(|c| c.id.clone()),
        citation: None,
    }
}

fn normalize_words(words: &mut Vec<String>) {
    for word in words.iter_mut() {
        *word = word.trim().to_lowercase();
    }
    words.retain(|w| !w.is_empty());
}

/// True if `needle` occurs in `haystack` at the start of a word.
fn contains_word_start(haystack: &str, needle: &str) -> bool {
    count_word_starts(haystack, needle) > 0
}

/// Occurrences of `needle` in `haystack` not preceded by a letter or digit.
fn count_word_starts(haystack: &str, needle: &str) -> usize {
    haystack
        .match_indices(needle)
        .filter(|(i, _)| {
            haystack[..*i]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric())
        })
        .count()
}

/// Split text into sentences at `.`, `;`, `!`, `?` followed by whitespace.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        let at_break = matches!(c, '.' | ';' | '!' | '?')
            && iter.peek().is_none_or(|(_, next)| next.is_whitespace());
        if at_break {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}…", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SCENARIO_A: &str = "SEC. 1. Tax credit for small business. SEC. 2. Medicare drug price cap.";

    fn llc_owner() -> ReaderProfile {
        ReaderProfile {
            business_type: Some("llc".into()),
            ..Default::default()
        }
    }

    fn by_category<'a>(findings: &'a [ImpactFinding], category: &str) -> Option<&'a ImpactFinding> {
        findings.iter().find(|f| f.category == category)
    }

    #[test]
    fn small_business_tax_credit_for_llc_owner() {
        let engine = HeuristicEngine::default();
        let chunks = chunk_text(SCENARIO_A);
        let findings = engine.analyze(&chunks, &llc_owner());

        let business = by_category(&findings, "Business").expect("business finding");
        let taxation = by_category(&findings, "Taxation").expect("taxation finding");

        for finding in [business, taxation] {
            let id = finding.source_chunk_id.as_deref().unwrap();
            let cited = chunks.iter().find(|c| c.id == id).unwrap().content.to_lowercase();
            assert!(cited.contains("tax") || cited.contains("business"));
            assert_eq!(finding.impact, ImpactDirection::Positive);
        }
        assert!(business.description.contains("llc"));
    }

    #[test]
    fn healthcare_gated_out_without_coverage_or_age() {
        let engine = HeuristicEngine::default();
        let findings = engine.analyze_text(SCENARIO_A, &llc_owner());
        assert!(by_category(&findings, "Healthcare").is_none());
    }

    #[test]
    fn healthcare_admitted_for_medicare_enrollee() {
        let engine = HeuristicEngine::default();
        let profile = ReaderProfile {
            medicare_enrolled: true,
            ..Default::default()
        };
        let findings = engine.analyze_text(SCENARIO_A, &profile);
        let health = by_category(&findings, "Healthcare").expect("healthcare finding");
        // medicare + drug → medium, strong gate → high
        assert_eq!(health.severity, Severity::High);
        assert!(health.details.iter().any(|d| d.contains("Medicare drug price cap.")));
    }

    #[test]
    fn source_is_first_chunk_with_keyword() {
        let engine = HeuristicEngine::default();
        let text = "SEC. 1. Short title.\n\nSEC. 2. Definitions.\n\nSEC. 3. Increase the tax penalty.\n\nSEC. 4. Tax filing.";
        let findings = engine.analyze_text(text, &ReaderProfile::default());
        let taxation = by_category(&findings, "Taxation").unwrap();
        assert_eq!(taxation.source_chunk_id.as_deref(), Some("p-3"));
        assert_eq!(taxation.impact, ImpactDirection::Negative);
    }

    #[test]
    fn generic_finding_when_nothing_matches() {
        let engine = HeuristicEngine::default();
        let findings = engine.analyze_text("SEC. 1. Designates a post office building.", &ReaderProfile::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, GENERIC_TITLE);
        assert_eq!(findings[0].category, GENERIC_CATEGORY);
        assert_eq!(findings[0].severity, Severity::Low);
        assert_eq!(findings[0].source_chunk_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn never_empty_across_profiles() {
        let engine = HeuristicEngine::default();
        let texts = [
            SCENARIO_A,
            "x",
            "Veterans and armed forces housing grant.",
            "Social Security retirement age\n\nStudent loan forgiveness",
        ];
        let profiles = [
            ReaderProfile::default(),
            llc_owner(),
            ReaderProfile {
                age: Some(80),
                is_veteran: true,
                is_student: true,
                housing_status: Some("rent".into()),
                ..Default::default()
            },
        ];
        for text in texts {
            for profile in &profiles {
                assert!(!engine.analyze_text(text, profile).is_empty(), "empty for {text:?}");
            }
        }
    }

    #[test]
    fn empty_chunk_set_still_yields_generic() {
        let findings = HeuristicEngine::default().analyze(&[], &ReaderProfile::default());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].source_chunk_id.is_none());
    }

    #[test]
    fn deterministic() {
        let engine = HeuristicEngine::default();
        let a = engine.analyze_text(SCENARIO_A, &llc_owner());
        let b = engine.analyze_text(SCENARIO_A, &llc_owner());
        assert_eq!(a, b);
    }

    #[test]
    fn keywords_match_at_word_start_only() {
        assert!(contains_word_start("new taxes apply", "tax"));
        assert!(!contains_word_start("syntax errors", "tax"));
        assert!(contains_word_start("(tax) credit", "tax"));
        assert_eq!(count_word_starts("tax, tax and syntax", "tax"), 2);
    }

    #[test]
    fn custom_policy_keywords_are_normalised() {
        let mut policy = HeuristicPolicy::default();
        policy.categories.retain(|c| c.name == "Taxation");
        policy.categories[0].keywords = vec!["  TARIFF ".into()];
        let engine = HeuristicEngine::new(policy);
        let findings = engine.analyze_text("A new Tariff on imports.", &ReaderProfile::default());
        assert_eq!(findings[0].category, "Taxation");
    }

    #[test]
    fn sentence_split() {
        assert_eq!(
            sentences("SEC. 1. Tax credit. More text"),
            vec!["SEC.", "1.", "Tax credit.", "More text"]
        );
        assert_eq!(sentences("26 U.S.C. 45; applies!"), vec!["26 U.S.C.", "45;", "applies!"]);
    }

    #[test]
    fn excerpts_are_truncated() {
        assert_eq!(truncate_chars("abcdef", 3), "abc…");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    const VOCABULARY: &[&str] = &[
        "SEC. 1.", "tax", "credit", "penalty", "Medicare", "drug", "small business", "student",
        "loan forgiveness", "veteran", "rent", "mortgage", "retirement", "wage", "post office",
        "the", "shall", "repeal", "\n", "\n\n",
    ];

    fn bill_text() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::collection::vec(prop::sample::select(VOCABULARY), 0..40)
                .prop_map(|words| words.join(" ")),
            "(\\PC|\n){0,200}",
        ]
    }

    fn reader_profile() -> impl Strategy<Value = ReaderProfile> {
        let tag = |values: &'static [&'static str]| {
            prop::option::of(prop::sample::select(values).prop_map(String::from))
        };
        (
            prop::option::of(0u32..100),
            tag(&["under 25k", "75k-100k", "$250,000+"]),
            tag(&["own", "rent"]),
            tag(&["llc", "sole proprietor"]),
            tag(&["teacher", "nurse"]),
            any::<[bool; 6]>(),
        )
            .prop_map(|(age, income, housing, business, occupation, flags)| ReaderProfile {
                age,
                income_bracket: income,
                housing_status: housing,
                business_type: business,
                occupation,
                has_health_insurance: flags[0],
                medicare_enrolled: flags[1],
                receives_social_security: flags[2],
                is_veteran: flags[3],
                is_student: flags[4],
                has_student_loans: flags[5],
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn property_fallback_is_total(text in bill_text(), profile in reader_profile()) {
            let engine = HeuristicEngine::default();
            let chunks = chunk_text(&text);
            let findings = engine.analyze(&chunks, &profile);

            prop_assert!(!findings.is_empty());
            for finding in &findings {
                match finding.source_chunk_id.as_deref() {
                    Some(id) => prop_assert!(chunks.iter().any(|c| c.id == id)),
                    None => prop_assert!(chunks.is_empty()),
                }
            }
        }
    }
}
