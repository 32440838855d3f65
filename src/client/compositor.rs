use serde::{Deserialize, Serialize};

/// Filter state collected by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptFilters {
    pub relationship: Option<String>,
    pub age: Option<u32>,
    pub occasion: Option<String>,
    /// Currency symbol shown next to budget amounts, e.g. `$`
    pub currency: String,
    pub budget_min: u32,
    pub budget_max: u32,
    pub interests: Vec<String>,
}

impl Default for PromptFilters {
    fn default() -> Self {
        Self {
            relationship: None,
            age: None,
            occasion: None,
            currency: "$".to_string(),
            budget_min: 50,
            budget_max: 500,
            interests: Vec::new(),
        }
    }
}

impl PromptFilters {
    /// Assemble the free-text prompt. The budget clause is always present;
    /// the other clauses only when their filter is set.
    pub fn compose(&self) -> String {
        let mut parts = Vec::new();

        if let Some(relationship) = non_blank(self.relationship.as_deref()) {
            parts.push(format!("Looking for a gift for my {relationship}"));
        }
        if let Some(age) = self.age {
            parts.push(format!("who is {age} years old"));
        }
        if let Some(occasion) = non_blank(self.occasion.as_deref()) {
            parts.push(format!("for their {occasion}"));
        }

        // the max slider never sits below the min slider
        let max = self.budget_max.max(self.budget_min);
        parts.push(format!(
            "with a budget between {cur}{min} and {cur}{max}",
            cur = self.currency,
            min = self.budget_min,
        ));

        let interests: Vec<&str> = self
            .interests
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .collect();
        if !interests.is_empty() {
            parts.push(format!("who is interested in {}", interests.join(", ")));
        }

        parts.join(" ")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
