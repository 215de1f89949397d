use serde::{Deserialize, Serialize};

// ─── GenerationRequest ────────────────────────────────────────────────────

/// A fully-specified site generation request.
///
/// Built once per user message (usually by a [`crate::PromptClassifier`])
/// and never mutated afterwards. Continuation turns derive a fresh request
/// via [`GenerationRequest::continuation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: RequestKind,
    pub prompt: String,
    /// Recent prior conversation rows, oldest first. Backends forward
    /// these so follow-up prompts ("make it blue") keep their context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    pub requirements: Requirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<TechnicalPrefs>,
}

impl GenerationRequest {
    /// Derive the synthetic follow-up request used for continue/repair
    /// turns. Everything is carried over except the prompt text.
    pub fn continuation(&self, instruction: impl Into<String>) -> Self {
        Self {
            prompt: instruction.into(),
            ..self.clone()
        }
    }

    /// Render the full user prompt sent to a generation backend:
    /// the raw prompt followed by context, requirements, and technical
    /// preference lines.
    pub fn render_prompt(&self) -> String {
        let mut prompt = self.prompt.clone();

        if let Some(ctx) = &self.context {
            if let Some(site) = &ctx.current_site_summary {
                prompt.push_str(&format!("\n\nCurrent website: {site}"));
            }
            if !ctx.inspiration_urls.is_empty() {
                prompt.push_str(&format!(
                    "\n\nInspiration websites: {}",
                    ctx.inspiration_urls.join(", ")
                ));
            }
            if let Some(brand) = &ctx.brand_guidelines {
                prompt.push_str("\n\nBrand Guidelines:");
                if !brand.colors.is_empty() {
                    prompt.push_str(&format!("\n- Colors: {}", brand.colors.join(", ")));
                }
                if !brand.fonts.is_empty() {
                    prompt.push_str(&format!("\n- Fonts: {}", brand.fonts.join(", ")));
                }
                if let Some(tone) = &brand.tone {
                    prompt.push_str(&format!("\n- Tone: {tone}"));
                }
                if let Some(logo) = &brand.logo_url {
                    prompt.push_str(&format!("\n- Logo: {logo}"));
                }
            }
        }

        prompt.push_str("\n\nRequirements:");
        prompt.push_str(&format!("\n- Style: {}", self.requirements.style.as_str()));
        prompt.push_str(&format!(
            "\n- Features: {}",
            self.requirements.features.join(", ")
        ));
        if !self.requirements.pages.is_empty() {
            prompt.push_str(&format!("\n- Pages: {}", self.requirements.pages.join(", ")));
        }
        if !self.requirements.seo_keywords.is_empty() {
            prompt.push_str(&format!(
                "\n- SEO Keywords: {}",
                self.requirements.seo_keywords.join(", ")
            ));
        }
        if let Some(audience) = &self.requirements.target_audience {
            prompt.push_str(&format!("\n- Target Audience: {audience}"));
        }

        if let Some(tech) = &self.technical {
            prompt.push_str("\n\nTechnical Preferences:");
            if let Some(animations) = tech.animations {
                prompt.push_str(&format!(
                    "\n- Animations: {}",
                    if animations { "Yes" } else { "Minimal" }
                ));
            }
            if let Some(perf) = &tech.performance {
                prompt.push_str(&format!("\n- Performance: {}", perf.as_str()));
            }
        }

        prompt
    }

    /// Render the contextual system prompt for this request.
    pub fn render_system_prompt(&self) -> String {
        let mut sp = String::from(
            "You are an expert web developer building a production Next.js site. \
             Work file by file and report each file you create or edit.",
        );
        if let Some(industry) = &self.requirements.industry {
            sp.push_str(&format!(" The site is for the {industry} industry."));
        }
        sp.push_str(&format!(
            " The visual style is {}.",
            self.requirements.style.as_str()
        ));
        if !self.requirements.features.is_empty() {
            sp.push_str(&format!(
                " Required features: {}.",
                self.requirements.features.join(", ")
            ));
        }
        sp
    }
}

/// One prior conversation message carried into a generation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    New,
    Redesign,
    Feature,
    Optimization,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_site_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inspiration_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_guidelines: Option<BrandGuidelines>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandGuidelines {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fonts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirements {
    pub style: SiteStyle,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seo_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStyle {
    #[default]
    Modern,
    Classic,
    Minimalist,
    Luxury,
    Bold,
    Elegant,
}

impl SiteStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStyle::Modern => "modern",
            SiteStyle::Classic => "classic",
            SiteStyle::Minimalist => "minimalist",
            SiteStyle::Luxury => "luxury",
            SiteStyle::Bold => "bold",
            SiteStyle::Elegant => "elegant",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Nextjs,
    Vite,
    Expo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Standard,
    Optimized,
    Ultra,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Standard => "standard",
            PerformanceTier::Optimized => "optimized",
            PerformanceTier::Ultra => "ultra",
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> GenerationRequest {
        GenerationRequest {
            kind: RequestKind::New,
            prompt: "Build a landing page for a coffee roastery".into(),
            history: Vec::new(),
            context: None,
            requirements: Requirements {
                style: SiteStyle::Luxury,
                features: vec!["contact form".into(), "testimonials".into()],
                pages: vec!["home".into(), "about".into()],
                seo_keywords: vec!["coffee".into()],
                target_audience: Some("coffee lovers".into()),
                industry: Some("restaurant".into()),
            },
            technical: Some(TechnicalPrefs {
                framework: Some(Framework::Nextjs),
                animations: Some(false),
                performance: Some(PerformanceTier::Optimized),
            }),
        }
    }

    #[test]
    fn render_prompt_includes_requirement_lines() {
        let prompt = base_request().render_prompt();
        assert!(prompt.starts_with("Build a landing page"));
        assert!(prompt.contains("- Style: luxury"));
        assert!(prompt.contains("- Features: contact form, testimonials"));
        assert!(prompt.contains("- Pages: home, about"));
        assert!(prompt.contains("- SEO Keywords: coffee"));
        assert!(prompt.contains("- Target Audience: coffee lovers"));
        assert!(prompt.contains("- Animations: Minimal"));
        assert!(prompt.contains("- Performance: optimized"));
    }

    #[test]
    fn render_prompt_includes_brand_guidelines() {
        let mut req = base_request();
        req.context = Some(RequestContext {
            current_site_summary: Some("a single stale page".into()),
            inspiration_urls: vec!["https://example.com".into()],
            brand_guidelines: Some(BrandGuidelines {
                colors: vec!["#112233".into()],
                fonts: vec!["Inter".into()],
                tone: Some("warm".into()),
                logo_url: None,
            }),
        });
        let prompt = req.render_prompt();
        assert!(prompt.contains("Current website: a single stale page"));
        assert!(prompt.contains("Inspiration websites: https://example.com"));
        assert!(prompt.contains("- Colors: #112233"));
        assert!(prompt.contains("- Fonts: Inter"));
        assert!(prompt.contains("- Tone: warm"));
    }

    #[test]
    fn continuation_keeps_everything_but_prompt() {
        let mut req = base_request();
        req.history = vec![HistoryMessage {
            role: ChatRole::User,
            content: "first message".into(),
        }];
        let cont = req.continuation("continue");
        assert_eq!(cont.prompt, "continue");
        assert_eq!(cont.kind, req.kind);
        assert_eq!(cont.requirements.style, req.requirements.style);
        assert_eq!(cont.requirements.features, req.requirements.features);
        assert_eq!(cont.history, req.history);
    }

    #[test]
    fn system_prompt_mentions_industry_and_style() {
        let sp = base_request().render_system_prompt();
        assert!(sp.contains("restaurant industry"));
        assert!(sp.contains("style is luxury"));
    }
}
