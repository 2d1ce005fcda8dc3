//! Heuristic analysis policy.
//!
//! Keyword tables, cue words, severity thresholds, and profile cutoffs for
//! the fallback analyzer. These are product tuning rather than contract, so
//! they live in data: the built-in table is [`HeuristicPolicy::default`] and
//! a JSON file can replace any part of it.

use std::path::Path;

use anyhow::{Context, Result};
use billscope_core::ReaderProfile;
use serde::{Deserialize, Serialize};
use tracing::info;

// ── Default value functions ──

fn default_medium_hits() -> usize {
    2
}

fn default_high_hits() -> usize {
    3
}

fn default_senior_age() -> u32 {
    65
}

fn default_retirement_age() -> u32 {
    62
}

fn default_high_income() -> u64 {
    200_000
}

fn default_max_excerpts() -> usize {
    2
}

fn default_max_excerpt_chars() -> usize {
    240
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn default_positive_cues() -> Vec<String> {
    words(&[
        "credit", "reduce", "reduction", "lower", "exempt", "expand", "subsid", "relief",
        "grant", "deduction", "rebate", "refund", "waive", "assistance", "protect",
        "forgive", "price cap", "increase benefits",
    ])
}

fn default_negative_cues() -> Vec<String> {
    words(&[
        "penalt", "repeal", "surcharge", "restrict", "eliminat", "terminat", "rescind",
        "prohibit", "fee", "fines", "tax increase", "cut", "suspend", "disqualif",
    ])
}

fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            name: "Healthcare".into(),
            keywords: words(&[
                "health", "medicare", "medicaid", "insurance", "prescription", "drug",
                "hospital", "patient", "coverage",
            ]),
            gate: Gate::Healthcare,
            title: "Changes to your healthcare costs or coverage".into(),
            summary: "The bill changes rules for health coverage, care, or drug pricing.".into(),
        },
        CategoryRule {
            name: "Taxation".into(),
            keywords: words(&[
                "tax", "irs", "internal revenue", "deduction", "tax credit", "withholding",
            ]),
            gate: Gate::Always,
            title: "Changes to what you owe in taxes".into(),
            summary: "The bill changes tax rates, credits, or deductions.".into(),
        },
        CategoryRule {
            name: "Education".into(),
            keywords: words(&[
                "education", "student", "school", "college", "tuition", "pell", "loan forgiveness",
            ]),
            gate: Gate::Education,
            title: "Changes to education costs or aid".into(),
            summary: "The bill changes funding, aid, or loan terms for education.".into(),
        },
        CategoryRule {
            name: "Employment".into(),
            keywords: words(&[
                "employee", "employment", "wage", "worker", "labor", "overtime", "workforce",
                "unemployment",
            ]),
            gate: Gate::Employment,
            title: "Changes affecting your job or pay".into(),
            summary: "The bill changes workplace rules, wages, or worker protections.".into(),
        },
        CategoryRule {
            name: "Business".into(),
            keywords: words(&[
                "business", "small business", "employer", "corporation", "llc", "entrepreneur",
                "self-employ", "commerce",
            ]),
            gate: Gate::Business,
            title: "Changes for your business".into(),
            summary: "The bill changes obligations or incentives for businesses.".into(),
        },
        CategoryRule {
            name: "Social Security".into(),
            keywords: words(&[
                "social security", "retirement", "retiree", "pension", "supplemental security",
                "disability benefit",
            ]),
            gate: Gate::SocialSecurity,
            title: "Changes to retirement or Social Security benefits".into(),
            summary: "The bill changes Social Security or retirement benefits.".into(),
        },
        CategoryRule {
            name: "Housing".into(),
            keywords: words(&[
                "housing", "mortgage", "rent", "tenant", "homeowner", "landlord", "property tax",
            ]),
            gate: Gate::Housing,
            title: "Changes to your housing costs".into(),
            summary: "The bill changes rules for renting, owning, or financing a home.".into(),
        },
        CategoryRule {
            name: "Veterans".into(),
            keywords: words(&["veteran", "armed forces", "military service", "va benefit"]),
            gate: Gate::Veterans,
            title: "Changes to veterans' benefits".into(),
            summary: "The bill changes benefits or services for veterans.".into(),
        },
    ]
}

// ── Policy structs ──

/// Which profile attributes make a category relevant to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Always,
    Healthcare,
    Education,
    Employment,
    Business,
    SocialSecurity,
    Housing,
    Veterans,
}

/// Why a gate let a category through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateMatch {
    /// Completes the sentence "This applies to you ...".
    pub reason: String,
    /// A strong match raises the finding's severity one level.
    pub strong: bool,
}

impl GateMatch {
    fn new(reason: impl Into<String>, strong: bool) -> Option<Self> {
        Some(Self {
            reason: reason.into(),
            strong,
        })
    }
}

impl Gate {
    /// Check the reader's profile. `None` means the category is not relevant.
    pub fn evaluate(&self, profile: &ReaderProfile, policy: &HeuristicPolicy) -> Option<GateMatch> {
        match self {
            Gate::Always => {
                if profile.has_business() {
                    GateMatch::new("as a business owner and taxpayer", true)
                } else if profile
                    .income_lower_bound()
                    .is_some_and(|income| income >= policy.high_income_threshold)
                {
                    GateMatch::new("given your income bracket", true)
                } else {
                    GateMatch::new("as a taxpayer", false)
                }
            }
            Gate::Healthcare => {
                if profile.medicare_enrolled {
                    GateMatch::new("because you are enrolled in Medicare", true)
                } else if profile.medicaid_enrolled {
                    GateMatch::new("because you are enrolled in Medicaid", true)
                } else if let Some(age) = profile.age.filter(|&a| a >= policy.senior_age) {
                    GateMatch::new(format!("at age {age}"), true)
                } else if profile.has_health_insurance {
                    GateMatch::new("because you have health insurance", false)
                } else {
                    None
                }
            }
            Gate::Education => {
                if profile.is_student {
                    GateMatch::new("as a student", true)
                } else if profile.has_student_loans {
                    GateMatch::new("because you have student loans", true)
                } else if let Some(n) = profile.dependents.filter(|&n| n > 0) {
                    GateMatch::new(format!("as a parent or guardian of {n} dependent(s)"), false)
                } else {
                    None
                }
            }
            Gate::Employment => {
                if !profile.is_working() {
                    return None;
                }
                match profile.occupation.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
                    Some(occupation) => GateMatch::new(format!("in your work as {occupation}"), false),
                    None => GateMatch::new("as a working person", false),
                }
            }
            Gate::Business => {
                let kind = profile.business_type.as_deref().map(str::trim).filter(|b| !b.is_empty())?;
                GateMatch::new(format!("as a business owner ({kind})"), true)
            }
            Gate::SocialSecurity => {
                if profile.receives_social_security {
                    GateMatch::new("because you receive Social Security", true)
                } else if let Some(age) = profile.age.filter(|&a| a >= policy.retirement_age) {
                    GateMatch::new(format!("as you approach or enter retirement at age {age}"), false)
                } else {
                    None
                }
            }
            Gate::Housing => match profile.housing_status.as_deref().map(str::to_ascii_lowercase) {
                Some(s) if s.trim().starts_with("own") || s.contains("homeowner") => {
                    GateMatch::new("as a homeowner", false)
                }
                Some(s) if s.contains("rent") => GateMatch::new("as a renter", false),
                _ => None,
            },
            Gate::Veterans => {
                if profile.is_veteran {
                    GateMatch::new("as a veteran", true)
                } else {
                    None
                }
            }
        }
    }
}

/// One topical category of the keyword table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    /// Matched case-insensitively at word starts, so `tax` matches "taxes".
    pub keywords: Vec<String>,
    pub gate: Gate,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicPolicy {
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,

    #[serde(default = "default_positive_cues")]
    pub positive_cues: Vec<String>,

    #[serde(default = "default_negative_cues")]
    pub negative_cues: Vec<String>,

    /// Distinct keyword hits for `medium` severity.
    #[serde(default = "default_medium_hits")]
    pub medium_hits: usize,

    /// Distinct keyword hits for `high` severity.
    #[serde(default = "default_high_hits")]
    pub high_hits: usize,

    #[serde(default = "default_senior_age")]
    pub senior_age: u32,

    #[serde(default = "default_retirement_age")]
    pub retirement_age: u32,

    #[serde(default = "default_high_income")]
    pub high_income_threshold: u64,

    #[serde(default = "default_max_excerpts")]
    pub max_excerpts: usize,

    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            positive_cues: default_positive_cues(),
            negative_cues: default_negative_cues(),
            medium_hits: default_medium_hits(),
            high_hits: default_high_hits(),
            senior_age: default_senior_age(),
            retirement_age: default_retirement_age(),
            high_income_threshold: default_high_income(),
            max_excerpts: default_max_excerpts(),
            max_excerpt_chars: default_max_excerpt_chars(),
        }
    }
}

impl HeuristicPolicy {
    /// Load a policy from a JSON file. Omitted fields take built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy: {}", path.display()))?;
        let policy: HeuristicPolicy = serde_json::from_str(&data)
            .with_context(|| format!("invalid policy JSON: {}", path.display()))?;
        policy.validate()?;
        info!(path = %path.display(), categories = policy.categories.len(), "loaded heuristic policy");
        Ok(policy)
    }

    /// Validate thresholds and tables.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.categories.is_empty(), "policy must define at least one category");
        anyhow::ensure!(self.medium_hits >= 1, "medium_hits must be at least 1");
        anyhow::ensure!(
            self.high_hits >= self.medium_hits,
            "high_hits must be >= medium_hits"
        );
        for rule in &self.categories {
            anyhow::ensure!(!rule.name.trim().is_empty(), "category name must not be empty");
            anyhow::ensure!(
                rule.keywords.iter().any(|k| !k.trim().is_empty()),
                "category {} has no keywords",
                rule.name
            );
        }
        Ok(())
    }

    /// Serialize the policy as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize policy")
    }
}
