//! Reader profile: who the analysis is personalised for.

use serde::{Deserialize, Serialize};

/// Attributes describing a single reader.
///
/// Every field is optional on the wire; missing fields deserialize to
/// "unknown" (`None`) or `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderProfile {
    // Location
    pub state: Option<String>,
    pub zip_code: Option<String>,

    // Household
    pub age: Option<u32>,
    pub dependents: Option<u32>,
    /// Free-form bracket such as `"50k-75k"` or `"under 25000"`.
    pub income_bracket: Option<String>,
    /// `"own"` or `"rent"`.
    pub housing_status: Option<String>,

    // Work
    pub occupation: Option<String>,
    pub employment_status: Option<String>,
    pub business_type: Option<String>,
    pub business_employees: Option<u32>,

    // Health and benefits
    pub has_health_insurance: bool,
    pub medicare_enrolled: bool,
    pub medicaid_enrolled: bool,
    pub receives_social_security: bool,
    pub is_veteran: bool,

    // Education
    pub is_student: bool,
    pub has_student_loans: bool,
    pub education_level: Option<String>,
}

impl ReaderProfile {
    /// True if the reader owns or runs a business.
    pub fn has_business(&self) -> bool {
        non_blank(&self.business_type)
    }

    /// True if the reader reports an occupation or a working employment status.
    pub fn is_working(&self) -> bool {
        let employed = self.employment_status.as_deref().is_some_and(|s| {
            let s = s.to_ascii_lowercase();
            (s.contains("employ") && !s.contains("unemploy")) || s.contains("self")
        });
        employed || non_blank(&self.occupation)
    }

    pub fn has_dependents(&self) -> bool {
        self.dependents.is_some_and(|n| n > 0)
    }

    /// Lower bound of the income bracket in whole currency units.
    ///
    /// Reads the first number in the bracket and honours a trailing `k`:
    /// `"50k-75k"` → 50 000, `"under 25000"` → 25 000, `"$120,000+"` → 120 000.
    pub fn income_lower_bound(&self) -> Option<u64> {
        let bracket = self.income_bracket.as_deref()?;
        let mut digits = String::new();
        let mut chars = bracket.chars().skip_while(|c| !c.is_ascii_digit()).peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if c != ',' {
                break;
            }
            chars.next();
        }
        let base: u64 = digits.parse().ok()?;
        match chars.peek() {
            Some('k') | Some('K') => Some(base * 1_000),
            _ => Some(base),
        }
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
