use regex::RegexBuilder;

use crate::request::{GenerationRequest, RequestKind, Requirements, SiteStyle};

// ─── PromptClassifier ─────────────────────────────────────────────────────

/// Turns a raw chat prompt into a structured [`GenerationRequest`].
///
/// Deliberately pluggable: the default implementation is keyword-based,
/// but callers may substitute anything (including a model call) without
/// touching the orchestration pipeline.
pub trait PromptClassifier: Send + Sync {
    fn classify(&self, prompt: &str) -> GenerationRequest;
}

// ─── PatternClassifier ────────────────────────────────────────────────────

/// Keyword/regex classifier extracting style, features, pages, industry,
/// and request kind from the user's message.
pub struct PatternClassifier {
    styles: Vec<(SiteStyle, regex::Regex)>,
    features: Vec<(&'static str, regex::Regex)>,
    industries: Vec<(&'static str, regex::Regex)>,
    multi_page: regex::Regex,
    redesign: regex::Regex,
    optimization: regex::Regex,
}

fn ci(pattern: &str) -> regex::Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("static classifier pattern")
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self {
            styles: vec![
                // Order matters: the first match wins, so the more specific
                // luxury/minimalist patterns come before the broad modern one.
                (SiteStyle::Luxury, ci(r"luxury|premium|high-end|exclusive|elegant")),
                (SiteStyle::Minimalist, ci(r"minimal|simple|sparse")),
                (SiteStyle::Bold, ci(r"bold|vibrant|colorful|dynamic")),
                (SiteStyle::Classic, ci(r"classic|traditional|timeless")),
                (SiteStyle::Modern, ci(r"modern|contemporary|sleek|clean")),
            ],
            features: vec![
                ("contact form", ci(r"contact\s*(form|us)|get\s*in\s*touch")),
                ("booking system", ci(r"booking|appointment|schedule|calendar")),
                ("newsletter", ci(r"newsletter|subscribe|mailing\s*list")),
                ("testimonials", ci(r"testimonial|review|feedback|client\s*says")),
                ("portfolio", ci(r"portfolio|gallery|showcase|work\s*samples")),
                ("blog", ci(r"blog|articles|news|posts")),
                ("e-commerce", ci(r"shop|store|product|cart|payment")),
                ("team section", ci(r"team|about\s*us|staff|members")),
                ("FAQ", ci(r"faq|questions|q&a")),
                ("pricing", ci(r"pricing|plans|packages|cost")),
            ],
            industries: vec![
                ("real estate", ci(r"real\s*estate|property|housing|realty")),
                ("saas", ci(r"saas|software|app|platform")),
                ("healthcare", ci(r"health|medical|clinic|doctor|wellness")),
                ("finance", ci(r"finance|banking|investment|wealth")),
                ("restaurant", ci(r"restaurant|food|dining|cafe|bistro")),
                ("fitness", ci(r"fitness|gym|training|coach|workout")),
                ("education", ci(r"education|school|course|learning|academy")),
                ("legal", ci(r"law|legal|attorney|lawyer")),
                ("consulting", ci(r"consulting|consultant|advisory")),
                ("agency", ci(r"agency|creative|design|marketing")),
            ],
            multi_page: ci(r"multi-page|multiple\s*pages"),
            redesign: ci(r"redesign|update|refresh|modernize"),
            optimization: ci(r"optimize|improve|enhance|seo"),
        }
    }
}

impl PromptClassifier for PatternClassifier {
    fn classify(&self, prompt: &str) -> GenerationRequest {
        let style = self
            .styles
            .iter()
            .find(|(_, re)| re.is_match(prompt))
            .map(|(s, _)| *s)
            .unwrap_or_default();

        let features: Vec<String> = self
            .features
            .iter()
            .filter(|(_, re)| re.is_match(prompt))
            .map(|(name, _)| (*name).to_owned())
            .collect();

        let industry = self
            .industries
            .iter()
            .find(|(_, re)| re.is_match(prompt))
            .map(|(name, _)| (*name).to_owned());

        let pages: Vec<String> = if self.multi_page.is_match(prompt) {
            ["home", "about", "services", "contact"]
                .iter()
                .map(|p| (*p).to_owned())
                .collect()
        } else {
            vec!["home".to_owned()]
        };

        // Optimization wins over redesign when both match, matching the
        // order the original heuristics applied them in.
        let kind = if self.optimization.is_match(prompt) {
            RequestKind::Optimization
        } else if self.redesign.is_match(prompt) {
            RequestKind::Redesign
        } else {
            RequestKind::New
        };

        GenerationRequest {
            kind,
            prompt: prompt.to_owned(),
            history: Vec::new(),
            context: None,
            requirements: Requirements {
                style,
                features,
                pages,
                seo_keywords: Vec::new(),
                target_audience: None,
                industry,
            },
            technical: None,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
