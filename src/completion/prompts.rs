/// System prompt sent with every completion request
pub const SYSTEM_PROMPT: &str = "You are MediGuide, a medical AI assistant. Provide health insights in a structured format with sections for Condition, Common Causes, Recommended Medications, Active Ingredients, Natural Alternatives (include exactly 5 natural alternatives based on the active ingredients), Prevention Guidelines, and Specialist Referral. For each natural alternative, provide a specific preparation method.";

/// Greeting that opens every conversation
pub const GREETING: &str = "👋 Hello! I'm MediGuide, your personal health assistant. Please describe your symptoms in detail, and I'll help analyze them.";

/// Languages offered as one-click translations
pub const TRANSLATION_LANGUAGES: [&str; 2] = ["French", "Arabic"];

pub fn translate(content: &str, language: &str) -> String {
    format!(
        "Translate the following medical information to {language}, maintaining the exact same format with sections for Condition, Common Causes, Active Ingredients, Natural Alternatives, Prevention Guidelines, and Specialist Referral. Keep all section headers in English but translate the content. Here's the content to translate:\n\n{content}"
    )
}

pub fn analyze_new_symptoms(current_condition: &str, new_symptoms: &str) -> String {
    format!(
        "Given the current condition:\n{current_condition}\n\nAnalyze these additional symptoms:\n{new_symptoms}\n\nProvide an updated analysis."
    )
}

pub fn more_prevention_details(condition: &str) -> String {
    format!(
        "Provide detailed prevention guidelines for the following condition:\n{condition}\n\nInclude lifestyle changes, dietary recommendations, and preventive measures."
    )
}

pub fn more_natural_alternatives(active_ingredients: &str) -> String {
    format!(
        "Given these active ingredients:\n{active_ingredients}\n\nProvide 5 additional natural alternatives with specific preparation methods for each."
    )
}

pub fn find_specialist(condition: &str) -> String {
    format!(
        "For the condition: {condition}\n\nRecommend medical specialists and types of healthcare providers to consult. Include what to look for in a specialist and key questions to ask during consultation."
    )
}
