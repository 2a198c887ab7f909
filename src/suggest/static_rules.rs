//! Rule-based tags (fallback when the LLM is unavailable)
//!
//! Pure and network-free: the same product always yields the same tags and
//! keywords, so a response can be produced no matter what OpenRouter does.

use super::{dedup_in_order, Product, Suggestions, MAX_KEYWORDS, MAX_TAGS};
use tracing::debug;

/// Words too common to be useful as tags.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "are", "was", "will", "has", "have",
    "been", "being", "can", "could", "would", "should", "may", "might", "must", "shall", "does",
    "did", "our", "your", "their", "its", "his", "her", "who", "what", "where", "when",
];

/// Cap on tags taken straight from the product text.
const MAX_TEXT_TAGS: usize = 8;

const FALLBACK_TAGS: &[&str] = &["product", "sale", "online"];

struct Category {
    name: &'static str,
    /// Substrings that put a product in this category.
    keywords: &'static [&'static str],
    tags: &'static [&'static str],
}

/// Scanned in order; the first match wins.
const CATEGORIES: &[Category] = &[
    Category {
        name: "clothing",
        keywords: &[
            "shirt", "pants", "dress", "jacket", "sweater", "clothing", "apparel", "fashion",
            "wear", "outfit",
        ],
        tags: &["fashion", "clothing", "apparel"],
    },
    Category {
        name: "electronics",
        keywords: &[
            "phone", "laptop", "computer", "tablet", "headphone", "camera", "electronic", "tech",
            "gadget", "device",
        ],
        tags: &["electronics", "technology", "gadget"],
    },
    Category {
        name: "jewelry",
        keywords: &[
            "ring", "necklace", "bracelet", "earring", "jewelry", "watch", "accessory", "gold",
            "silver",
        ],
        tags: &["jewelry", "accessory", "fashion"],
    },
    Category {
        name: "home",
        keywords: &[
            "furniture", "chair", "table", "lamp", "decor", "kitchen", "home", "house", "room",
        ],
        tags: &["home", "furniture", "decor"],
    },
    Category {
        name: "beauty",
        keywords: &[
            "makeup", "skincare", "cosmetic", "perfume", "beauty", "lotion", "cream", "serum",
        ],
        tags: &["beauty", "cosmetics", "skincare"],
    },
    Category {
        name: "sports",
        keywords: &[
            "fitness", "exercise", "sports", "gym", "yoga", "outdoor", "athletic", "training",
        ],
        tags: &["sports", "fitness", "athletic"],
    },
    Category {
        name: "food",
        keywords: &[
            "food", "snack", "drink", "organic", "healthy", "meal", "gourmet", "natural",
        ],
        tags: &["food", "organic", "healthy"],
    },
    Category {
        name: "books",
        keywords: &[
            "book", "novel", "reading", "literature", "story", "author", "paperback", "hardcover",
        ],
        tags: &["books", "reading", "literature"],
    },
];

/// Distinct meaningful words from the text, in order of first appearance.
fn text_tags(text: &str) -> Vec<String> {
    let words = text
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string);
    let mut tags = dedup_in_order(words);
    tags.truncate(MAX_TEXT_TAGS);
    tags
}

fn detect_category(text: &str) -> Option<&'static Category> {
    CATEGORIES
        .iter()
        .find(|category| category.keywords.iter().any(|kw| text.contains(kw)))
}

fn keyword_phrases(title: &str) -> Vec<String> {
    let mut keywords = vec![
        format!("buy {} online", title),
        format!("{} best price", title),
        format!("{} for sale", title),
        format!("affordable {}", title),
        format!("{} discount offers", title),
        format!("quality {}", title),
        format!("{} free shipping", title),
        format!("top rated {}", title),
    ];
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

/// Tags and keywords without any network access. Never fails.
pub fn suggest_local(product: &Product) -> Suggestions {
    let text = format!("{} {}", product.title, product.description).to_lowercase();

    let category = detect_category(&text);
    if let Some(category) = category {
        debug!(category = category.name, "Local suggest matched category");
    }
    let category_tags = category.map(|c| c.tags).unwrap_or_default();

    let mut tags = dedup_in_order(
        category_tags
            .iter()
            .map(|t| t.to_string())
            .chain(text_tags(&text)),
    );
    tags.truncate(MAX_TAGS);
    if tags.is_empty() {
        tags = FALLBACK_TAGS.iter().map(|t| t.to_string()).collect();
    }

    Suggestions {
        tags,
        keywords: keyword_phrases(&product.title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_of(title: &str, description: &str) -> Vec<String> {
        suggest_local(&Product::new(title, description)).tags
    }

    #[test]
    fn test_empty_product_gets_fallback_tags() {
        let result = suggest_local(&Product::default());
        assert_eq!(result.tags, vec!["product", "sale", "online"]);
        assert_eq!(result.keywords.len(), 8);
    }

    #[test]
    fn test_short_and_stop_words_only_gets_fallback_tags() {
        assert_eq!(
            tags_of("it is", "the and for with"),
            vec!["product", "sale", "online"]
        );
    }

    #[test]
    fn test_laptop_is_electronics_only() {
        let tags = tags_of("Gaming Laptop", "Fast and light");
        assert_eq!(&tags[..3], &["electronics", "technology", "gadget"]);
        for other in ["fashion", "clothing", "jewelry", "home", "beauty", "books"] {
            assert!(!tags.iter().any(|t| t == other), "unexpected {}", other);
        }
        assert_eq!(tags[3..], ["gaming", "laptop", "fast", "light"]);
    }

    #[test]
    fn test_first_category_wins() {
        // "shirt" is clothing, "phone" is electronics; clothing is scanned first.
        let tags = tags_of("Phone pouch shirt", "");
        assert_eq!(&tags[..3], &["fashion", "clothing", "apparel"]);
        assert!(!tags.iter().any(|t| t == "electronics"));
    }

    #[test]
    fn test_category_match_is_substring() {
        // "earrings" only matches through the "ring" keyword.
        let tags = tags_of("Earrings", "");
        assert_eq!(&tags[..3], &["jewelry", "accessory", "fashion"]);
    }

    #[test]
    fn test_category_tags_dedup_against_text_tags() {
        let tags = tags_of("Fashion jacket", "");
        assert_eq!(tags, vec!["fashion", "clothing", "apparel", "jacket"]);
    }

    #[test]
    fn test_text_tags_capped_at_eight() {
        let tags = tags_of(
            "alpha bravo charlie delta", "foxtrot hotel india juliet kilo lima",
        );
        assert_eq!(
            tags,
            vec!["alpha", "bravo", "charlie", "delta", "foxtrot", "hotel", "india", "juliet"]
        );
    }

    #[test]
    fn test_total_tags_capped_at_twelve() {
        let tags = tags_of(
            "organic snack mix",
            "crunchy salty sweet roasted almonds cashews pecans walnuts",
        );
        assert!(tags.len() <= MAX_TAGS);
        assert_eq!(&tags[..3], &["food", "organic", "healthy"]);
    }

    #[test]
    fn test_tokens_keep_punctuation_and_dedup() {
        let tags = tags_of("Lamp lamp", "lamp, bright");
        assert_eq!(
            tags,
            vec!["home", "furniture", "decor", "lamp", "lamp,", "bright"]
        );
    }

    #[test]
    fn test_keywords_follow_template_order() {
        let result = suggest_local(&Product::new("Yoga Mat", ""));
        assert_eq!(
            result.keywords,
            vec![
                "buy Yoga Mat online",
                "Yoga Mat best price",
                "Yoga Mat for sale",
                "affordable Yoga Mat",
                "Yoga Mat discount offers",
                "quality Yoga Mat",
                "Yoga Mat free shipping",
                "top rated Yoga Mat",
            ]
        );
    }

    #[test]
    fn test_is_pure() {
        let product = Product::new("Ceramic Mug", "Dishwasher safe kitchen mug, 350ml");
        assert_eq!(suggest_local(&product), suggest_local(&product));
    }

    #[test]
    fn test_limits_hold_for_varied_inputs() {
        let long = "word ".repeat(500);
        let inputs = [
            ("", ""),
            ("   ", "\n\t"),
            ("Über Café Latte", "Ünïcödé ñame"),
            (long.as_str(), long.as_str()),
            ("a b c", "d e f"),
        ];
        for (title, description) in inputs {
            let result = suggest_local(&Product::new(title, description));
            assert!(result.tags.len() <= MAX_TAGS);
            assert!(!result.tags.is_empty());
            assert_eq!(result.keywords.len(), MAX_KEYWORDS);
            let mut unique = result.tags.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), result.tags.len());
        }
    }
}
