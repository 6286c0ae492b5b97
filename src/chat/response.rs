use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Preparation methods paired, in order, with the natural alternatives
pub const PREPARATION_METHODS: [&str; 5] = [
    "Steep in hot water for 10-15 minutes to make a therapeutic tea",
    "Create a paste by grinding with a small amount of water",
    "Infuse in carrier oil for 2-3 weeks in a dark place",
    "Blend with honey to create a natural syrup",
    "Make a compress by soaking cloth in strong infusion",
];

/// A condition named by a bot reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Condition,
    CommonCauses,
    RecommendedMedications,
    ActiveIngredients,
    NaturalAlternatives,
    PreventionGuidelines,
    SpecialistReferral,
    Text,
}

impl SectionKind {
    const HEADERS: [(&'static str, SectionKind); 7] = [
        ("Condition:", SectionKind::Condition),
        ("Common Causes:", SectionKind::CommonCauses),
        ("Recommended Medications:", SectionKind::RecommendedMedications),
        ("Active Ingredients:", SectionKind::ActiveIngredients),
        ("Natural Alternatives:", SectionKind::NaturalAlternatives),
        ("Prevention Guidelines:", SectionKind::PreventionGuidelines),
        ("Specialist Referral:", SectionKind::SpecialistReferral),
    ];

    fn detect(block: &str) -> Self {
        Self::HEADERS
            .iter()
            .find(|(header, _)| block.contains(header))
            .map(|(_, kind)| *kind)
            .unwrap_or(SectionKind::Text)
    }
}

/// One titled block of a structured reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub items: Vec<String>,
}

impl Section {
    /// `(ingredient, purpose)` rows of an active-ingredients section
    pub fn ingredient_rows(&self) -> Vec<(String, Option<String>)> {
        self.items
            .iter()
            .map(|item| match item.split_once(" - ") {
                Some((ingredient, purpose)) => (ingredient.to_string(), Some(purpose.to_string())),
                None => (item.clone(), None),
            })
            .collect()
    }

    /// The first five alternatives with their preparation method
    pub fn preparations(&self) -> Vec<(String, &'static str)> {
        self.items
            .iter()
            .zip(PREPARATION_METHODS)
            .map(|(item, method)| (item.clone(), method))
            .collect()
    }
}

fn strip_bullet(line: &str) -> String {
    line.trim().trim_start_matches("• ").trim().to_string()
}

/// Split a reply into sections on blank lines
pub fn sections(content: &str) -> Vec<Section> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| match SectionKind::detect(block) {
            SectionKind::Condition => Section {
                kind: SectionKind::Condition,
                title: block.to_string(),
                items: Vec::new(),
            },
            SectionKind::Text => Section {
                kind: SectionKind::Text,
                title: String::new(),
                items: vec![block.to_string()],
            },
            kind => {
                let mut lines = block.lines();
                let title = lines.next().unwrap_or_default().trim().to_string();
                let items = lines
                    .map(strip_bullet)
                    .filter(|item| !item.is_empty())
                    .collect();
                Section { kind, title, items }
            }
        })
        .collect()
}

/// Text of the first section of `kind`, items joined by newlines
pub fn section_text(content: &str, kind: SectionKind) -> Option<String> {
    sections(content)
        .into_iter()
        .find(|section| section.kind == kind)
        .map(|section| {
            if section.items.is_empty() {
                section.title
            } else {
                section.items.join("\n")
            }
        })
}

/// Pull the condition name out of a reply's `Condition:` line
pub fn extract_condition(content: &str, timestamp: DateTime<Utc>) -> Option<Condition> {
    let line = content.lines().find(|line| line.contains("Condition:"))?;
    let (_, rest) = line.split_once("Condition:")?;
    let name = rest.trim().trim_matches('*').trim();

    if name.is_empty() {
        return None;
    }

    Some(Condition {
        name: name.to_string(),
        timestamp,
    })
}
