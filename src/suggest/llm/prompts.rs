use crate::suggest::Product;

/// Follow-up turn sent when the first answer had no JSON object in it.
pub const JSON_ONLY_INSTRUCTION: &str =
    "Please provide ONLY the JSON object with no additional text or markdown formatting.";

pub fn tag_prompt(product: &Product) -> String {
    format!(
        r#"You are an SEO assistant and expert. Analyze this product and generate relevant tags and keywords.

Product Title: {title}
Product Description: {description}

Return ONLY a valid JSON object with this exact structure (no markdown, no explanation):
{{
  "tags": ["tag1", "tag2", "tag3"],
  "keywords": ["keyword phrase 1", "keyword phrase 2"]
}}

Requirements:
- Generate 8-12 short, relevant tags (single words or 2-word phrases)
- Generate 5-8 longer SEO-friendly keyword phrases
- Focus on searchability and discoverability
- Include category, product type, and key features"#,
        title = product.title,
        description = product.description,
    )
}
