//! Persona-driven relevance ranking across a document collection.
//!
//! Runs entirely locally. Sections are found from page text and scored
//! against keywords drawn from the persona and goal. Every document is
//! guaranteed a slot in the ranking, and the best passages of the chosen
//! sections become the subsection analysis.

use std::collections::{BTreeMap, HashMap, HashSet};

use lexsight_core::{
    timestamp_now, AnalysisMetadata, AnalysisResult, ExtractedContent, ExtractedSection,
    ProcessingInfo, SubsectionAnalysis,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

pub const RANKING_ANALYSIS_TYPE: &str = "Persona Relevance Ranking";

/// Keywords added when a persona or goal mentions a domain.
const DOMAIN_KEYWORDS: &[&[&str]] = &[
    &[
        "legal", "law", "contract", "agreement", "clause", "obligation", "liability", "rights",
        "compliance", "regulation", "jurisdiction", "litigation", "termination",
        "indemnification", "warranty", "breach", "confidentiality", "dispute",
    ],
    &[
        "employment", "employee", "employer", "salary", "compensation", "benefits", "leave",
        "severance", "probation", "overtime",
    ],
    &[
        "lease", "tenant", "landlord", "rent", "premises", "property", "deposit", "maintenance",
        "occupancy",
    ],
    &[
        "business", "financial", "market", "revenue", "strategy", "profit", "investment",
        "performance", "competitive", "portfolio", "operations",
    ],
    &[
        "technology", "software", "development", "data", "system", "programming",
        "engineering", "algorithm", "analytics", "security",
    ],
    &[
        "medical", "health", "patient", "clinical", "treatment", "diagnosis", "therapy",
        "healthcare", "wellness", "care",
    ],
    &[
        "research", "study", "academic", "literature", "analysis", "methodology", "thesis",
        "scholarly", "education", "learning",
    ],
];

/// Verbs that reveal what kind of work the goal asks for.
const TASK_PATTERNS: &[&[&str]] = &[
    &["plan", "organize", "prepare", "schedule", "arrange", "coordinate", "timeline"],
    &["analyze", "review", "evaluate", "assess", "examine", "investigate", "compare"],
    &["research", "investigate", "explore", "discover", "find", "identify"],
    &["create", "develop", "build", "design", "generate", "produce", "establish"],
    &["negotiate", "draft", "amend", "revise", "redline", "sign"],
];

const PATTERN_KEYWORDS: usize = 5;
const TASK_DOMAIN_KEYWORDS: usize = 8;
const PERSONA_DOMAINS: usize = 2;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
        "had", "day", "get", "has", "him", "his", "how", "new", "now", "old", "see", "two", "way",
        "who", "did", "its", "let", "put", "say", "she", "too", "use", "this", "that", "with",
        "have", "they", "will", "been", "from", "would", "there", "their", "what", "about",
        "which", "when", "make", "like", "into", "time", "very", "after", "first", "well", "much",
        "also", "many", "such", "only", "some", "other", "then", "them", "these", "come", "could",
        "want", "look", "over", "think", "where", "just", "work", "even", "back", "any", "good",
        "through", "down", "may", "shall",
    ]
    .into_iter()
    .collect()
});

/// Lines that are page furniture rather than headings.
static EXCLUDED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bpage \d+|copyright|©|all rights reserved|\bconfidential\b|\bdraft\b|internal use only|https?://|www\.|\b(?:name|date|signature):|please (?:fill|read carefully)|\b(?:suite|street|avenue|boulevard|parkway)\b",
    )
    .unwrap()
});
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());
static PROPER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").unwrap());
static STRUCTURED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:\-]\s*[A-Z]").unwrap());
static OBLIGATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:shall|must|agrees?|terminat\w*|pay|notify|indemnif\w*|comply|warrants?)\b")
        .unwrap()
});

/// Words joining a heading's capitalized terms.
const CONNECTORS: &[&str] = &["a", "an", "and", "by", "for", "in", "of", "on", "or", "the", "to", "with"];

const MAX_HEADING_CHARS: usize = 80;
const MAX_HEADING_WORDS: usize = 8;
const MAX_SECTION_CHARS: usize = 4000;
const MIN_PASSAGE_CHARS: usize = 100;
const MIN_REFINED_CHARS: usize = 80;
const REFINED_CHARS: usize = 600;
const MIN_PASSAGE_SCORE: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Sections kept in `extracted_sections`.
    pub max_sections: usize,
    /// Passages kept in `subsection_analysis`.
    pub max_subsections: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_sections: 10,
            max_subsections: 10,
        }
    }
}

/// Weighted keywords describing what a persona cares about for a goal.
#[derive(Debug, Clone, Default)]
pub struct PersonaProfile {
    weights: BTreeMap<String, f64>,
}

impl PersonaProfile {
    pub fn new(persona: &str, job_to_be_done: &str) -> Self {
        let mut persona_keywords: HashSet<String> = tokenize(persona).into_iter().collect();
        for domain in detect_domains(persona).into_iter().take(PERSONA_DOMAINS) {
            persona_keywords.extend(domain.iter().map(|k| k.to_string()));
        }

        let mut task_keywords: HashSet<String> = tokenize(job_to_be_done).into_iter().collect();
        let task_lower = job_to_be_done.to_lowercase();
        for pattern in TASK_PATTERNS {
            if pattern.iter().any(|k| task_lower.contains(k)) {
                task_keywords.extend(pattern.iter().take(PATTERN_KEYWORDS).map(|k| k.to_string()));
            }
        }
        if let Some(domain) = detect_domains(job_to_be_done).first() {
            task_keywords.extend(domain.iter().take(TASK_DOMAIN_KEYWORDS).map(|k| k.to_string()));
        }

        let weights = persona_keywords
            .union(&task_keywords)
            .map(|keyword| {
                let base = match (persona_keywords.contains(keyword), task_keywords.contains(keyword)) {
                    (true, true) => 2.5,
                    (true, false) => 1.5,
                    _ => 1.3,
                };
                let specificity = match keyword.chars().count() {
                    n if n > 10 => 1.3,
                    n if n > 7 => 1.2,
                    _ => 1.0,
                };
                (keyword.clone(), base * specificity)
            })
            .collect();
        Self { weights }
    }

    /// Weight of `keyword`, 0 when the profile does not contain it.
    pub fn weight(&self, keyword: &str) -> f64 {
        self.weights.get(keyword).copied().unwrap_or(0.0)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Domain keyword lists mentioned by `text`, most mentioned first.
fn detect_domains(text: &str) -> Vec<&'static [&'static str]> {
    let text = text.to_lowercase();
    let mut found: Vec<(usize, &'static [&'static str])> = DOMAIN_KEYWORDS
        .iter()
        .map(|domain| (domain.iter().filter(|k| text.contains(*k)).count(), *domain))
        .filter(|(matches, _)| *matches > 0)
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.into_iter().map(|(_, domain)| domain).collect()
}

/// Lowercased content words of at least three characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .filter(|w| !STOP_WORDS.contains(w) && !w.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// A heading and the text under it, within one document.
#[derive(Debug, Clone, PartialEq)]
struct Section {
    document: String,
    title: String,
    page_number: u32,
    text: String,
    position: usize,
    siblings: usize,
}

impl Section {
    fn new(document: &str, title: impl Into<String>, page_number: u32) -> Self {
        Self {
            document: document.to_string(),
            title: title.into(),
            page_number,
            text: String::new(),
            position: 0,
            siblings: 0,
        }
    }

    fn push_line(&mut self, line: &str) {
        if self.text.len() >= MAX_SECTION_CHARS {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }
}

fn looks_like_heading(line: &str) -> bool {
    let chars = line.chars().count();
    if !(3..=MAX_HEADING_CHARS).contains(&chars)
        || line.ends_with(&['.', ',', ';'][..])
        || line.chars().filter(|c| c.is_alphabetic()).count() < 3
        || line.starts_with(char::is_lowercase)
        || EXCLUDED_LINE.is_match(line)
    {
        return false;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() > MAX_HEADING_WORDS {
        return false;
    }
    let terms: Vec<&&str> = words
        .iter()
        .filter(|w| !CONNECTORS.contains(&w.to_lowercase().as_str()))
        .collect();
    if terms.is_empty() {
        return false;
    }
    let capitalized = terms
        .iter()
        .filter(|w| w.starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit()))
        .count();
    capitalized * 4 >= terms.len() * 3
}

/// Title for a page with no heading: its first substantial line.
fn page_title(lines: &[&str], file_name: &str, page_number: u32) -> String {
    const WEAK_STARTS: &[&str] = &["the", "this", "that", "it", "in", "on", "at"];
    lines
        .iter()
        .find(|line| {
            let first = line.split_whitespace().next().unwrap_or("").to_lowercase();
            (10..=MAX_HEADING_CHARS).contains(&line.chars().count())
                && line.split_whitespace().count() >= 2
                && !WEAK_STARTS.contains(&first.as_str())
        })
        .map(|line| line.to_string())
        .unwrap_or_else(|| format!("Content from {file_name} - Page {page_number}"))
}

/// Split a document into sections at heading-like lines. Text before the
/// first heading becomes one section per page.
fn detect_sections(content: &ExtractedContent) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for page in content.page_texts.iter().filter(|p| !p.is_placeholder()) {
        let mut loose = Vec::new();
        for line in page.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if looks_like_heading(line) {
                sections.extend(current.take());
                current = Some(Section::new(&content.file_name, line, page.page_number));
            } else if let Some(section) = current.as_mut() {
                section.push_line(line);
            } else {
                loose.push(line);
            }
        }
        if !loose.is_empty() {
            let title = page_title(&loose, &content.file_name, page.page_number);
            let mut section = Section::new(&content.file_name, title, page.page_number);
            for line in loose {
                section.push_line(line);
            }
            sections.push(section);
        }
    }
    sections.extend(current);

    let siblings = sections.len();
    for (position, section) in sections.iter_mut().enumerate() {
        section.position = position;
        section.siblings = siblings;
    }
    sections
}

/// Inverse document frequencies over the sections of one ranking run.
struct Corpus {
    idf: HashMap<String, f64>,
    unseen_idf: f64,
}

impl Corpus {
    fn new(documents: &[Vec<String>]) -> Self {
        let n = documents.len() as f64;
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for terms in documents {
            for term in terms.iter().map(String::as_str).collect::<HashSet<_>>() {
                *frequency.entry(term).or_default() += 1;
            }
        }
        let idf = frequency
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .collect();
        Self {
            idf,
            unseen_idf: (1.0 + n).ln() + 1.0,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(self.unseen_idf)
    }

    /// Cosine similarity between a section's TF-IDF vector and the profile.
    fn similarity(&self, terms: &[String], profile: &PersonaProfile) -> f64 {
        if terms.is_empty() || profile.is_empty() {
            return 0.0;
        }
        let mut tf: HashMap<&str, f64> = HashMap::new();
        for term in terms {
            *tf.entry(term.as_str()).or_default() += 1.0;
        }
        let section_norm = tf
            .iter()
            .map(|(term, count)| (count * self.idf(term)).powi(2))
            .sum::<f64>()
            .sqrt();

        let mut dot = 0.0;
        let mut profile_norm = 0.0;
        for (keyword, weight) in &profile.weights {
            let idf = self.idf(keyword);
            let q = weight * idf;
            profile_norm += q * q;
            if let Some(count) = tf.get(keyword.as_str()) {
                dot += q * count * idf;
            }
        }
        if section_norm == 0.0 || profile_norm == 0.0 {
            0.0
        } else {
            dot / (section_norm * profile_norm.sqrt())
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SectionScore {
    keyword: f64,
    title: f64,
    tfidf: f64,
    position: f64,
    length: f64,
}

impl SectionScore {
    fn total(&self) -> f64 {
        self.keyword * 0.35
            + self.title * 0.2
            + self.tfidf * 0.15
            + self.position * 0.15
            + self.length * 0.15
    }
}

fn score_section(section: &Section, terms: &[String], profile: &PersonaProfile, corpus: &Corpus) -> SectionScore {
    SectionScore {
        keyword: keyword_overlap(&format!("{} {}", section.title, section.text), profile),
        title: keyword_overlap(&section.title, profile),
        tfidf: corpus.similarity(terms, profile),
        position: position_score(section.position, section.siblings),
        length: length_score(&section.text),
    }
}

/// Share of the profile's weight whose keywords occur in `text`. A keyword
/// matches a word containing it, or a longer word it contains.
fn keyword_overlap(text: &str, profile: &PersonaProfile) -> f64 {
    let words: HashSet<String> = tokenize(text).into_iter().collect();
    let total = profile.total_weight();
    if words.is_empty() || total == 0.0 {
        return 0.0;
    }
    let matched: f64 = profile
        .weights
        .iter()
        .filter(|(keyword, _)| {
            words.iter().any(|word| {
                word.contains(keyword.as_str()) || (word.len() >= 4 && keyword.contains(word.as_str()))
            })
        })
        .map(|(_, weight)| weight)
        .sum();
    matched / total
}

/// Earlier sections score higher: 1.0 for the first, decaying to 0.3.
fn position_score(position: usize, siblings: usize) -> f64 {
    if siblings <= 1 {
        return 1.0;
    }
    let decay = 0.7 / (siblings - 1) as f64;
    (1.0 - position as f64 * decay).max(0.3)
}

/// Moderate lengths score best.
fn length_score(text: &str) -> f64 {
    match text.split_whitespace().count() {
        0 => 0.0,
        50..=200 => 1.0,
        201..=400 => 0.9,
        20..=49 => 0.8,
        401..=800 => 0.7,
        10..=19 => 0.6,
        _ => 0.4,
    }
}

/// Best section of each document first, then the rest by score.
fn diversify<'a>(ranked: &[(f64, &'a Section)], max_sections: usize) -> Vec<&'a Section> {
    let mut chosen: Vec<usize> = Vec::new();
    let mut documents = HashSet::new();
    for (i, (_, section)) in ranked.iter().enumerate() {
        if chosen.len() >= max_sections {
            break;
        }
        if documents.insert(section.document.as_str()) {
            chosen.push(i);
        }
    }
    for i in 0..ranked.len() {
        if chosen.len() >= max_sections {
            break;
        }
        if !chosen.contains(&i) {
            chosen.push(i);
        }
    }
    chosen.into_iter().map(|i| ranked[i].1).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for end in SENTENCE_END.find_iter(text) {
        let sentence = text[start..end.end()].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = end.end();
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Runs of whole sentences of at least [`MIN_PASSAGE_CHARS`] characters.
fn passages(text: &str) -> Vec<String> {
    let text = collapse_whitespace(text);
    let mut out = Vec::new();
    let mut current = String::new();
    for sentence in sentences(&text) {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
        if current.chars().count() >= MIN_PASSAGE_CHARS {
            out.push(std::mem::take(&mut current));
        }
    }
    if current.chars().count() >= MIN_PASSAGE_CHARS / 2 {
        out.push(current);
    }
    out
}

fn passage_score(passage: &str, profile: &PersonaProfile) -> f64 {
    let lower = passage.to_lowercase();
    let total = profile.total_weight();
    let keyword = if total > 0.0 {
        profile
            .weights
            .iter()
            .map(|(keyword, weight)| weight * lower.matches(keyword.as_str()).count().min(3) as f64)
            .sum::<f64>()
            / total
    } else {
        0.0
    };

    let mut bonus = 0.0;
    if NUMBER.is_match(passage) {
        bonus += 0.1;
    }
    let obligations: HashSet<&str> = OBLIGATION.find_iter(&lower).map(|m| m.as_str()).collect();
    bonus += obligations.len() as f64 * 0.05;
    if passage.contains(':') || passage.contains('-') {
        bonus += 0.1;
    }
    match passage.chars().count() {
        150..=500 => bonus += 0.2,
        100..=600 => bonus += 0.1,
        _ => {}
    }
    keyword + bonus
}

fn has_specific_details(text: &str) -> bool {
    [&*NUMBER, &*PROPER_NAME, &*STRUCTURED, &*OBLIGATION]
        .iter()
        .filter(|re| re.is_match(text))
        .count()
        >= 2
}

/// Jaccard similarity of the two texts' word sets.
fn overlap(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
    let union = a.union(&b).count();
    if union == 0 {
        0.0
    } else {
        a.intersection(&b).count() as f64 / union as f64
    }
}

/// Clean a passage to whole sentences of at most `max_chars` characters.
fn refine_passage(text: &str, max_chars: usize) -> String {
    const ENDINGS: &[char] = &['.', '!', '?'];
    let mut text = collapse_whitespace(text);
    if !text.ends_with(ENDINGS) && !text.ends_with(':') {
        match text.rfind(ENDINGS) {
            Some(end) => text.truncate(end + 1),
            None => text.push('.'),
        }
    }
    if let Some((cut, _)) = text.char_indices().nth(max_chars) {
        let head = &text[..cut];
        text = match head.rfind(ENDINGS) {
            Some(end) => head[..=end].to_string(),
            None => format!("{}...", head.trim_end()),
        };
    }
    text
}

struct Candidate<'a> {
    section: &'a Section,
    text: String,
    score: f64,
}

/// Ranks the sections of a document collection for a persona and goal.
#[derive(Debug, Clone, Default)]
pub struct RelevanceRanker {
    config: RankerConfig,
}

impl RelevanceRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    /// Rank every section of `documents`. The result is empty only when
    /// `documents` is.
    pub fn rank(&self, documents: &[ExtractedContent], persona: &str, job_to_be_done: &str) -> AnalysisResult {
        let profile = PersonaProfile::new(persona, job_to_be_done);
        let sections: Vec<Section> = documents.iter().flat_map(detect_sections).collect();
        let terms: Vec<Vec<String>> = sections
            .iter()
            .map(|s| tokenize(&format!("{} {}", s.title, s.text)))
            .collect();
        let corpus = Corpus::new(&terms);

        let mut ranked: Vec<(f64, &Section)> = sections
            .iter()
            .zip(&terms)
            .map(|(section, terms)| (score_section(section, terms, &profile, &corpus).total(), section))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (score, section) in ranked.iter().take(3) {
            debug!("{:.3} {} / {}", score, section.document, section.title);
        }

        let selected = diversify(&ranked, self.config.max_sections);
        info!(
            "Ranked {} sections across {} documents for '{}'",
            sections.len(),
            documents.len(),
            persona
        );

        let extracted_sections = selected
            .iter()
            .enumerate()
            .map(|(i, section)| ExtractedSection {
                document: section.document.clone(),
                section_title: section.title.chars().take(MAX_HEADING_CHARS).collect(),
                importance_rank: i as u32 + 1,
                page_number: Some(section.page_number),
            })
            .collect();
        let subsection_analysis = self.subsections(&selected, &profile);

        let names: Vec<String> = documents.iter().map(|d| d.file_name.clone()).collect();
        let now = timestamp_now();
        AnalysisResult {
            metadata: AnalysisMetadata {
                input_documents: names.clone(),
                persona: persona.to_string(),
                job_to_be_done: job_to_be_done.to_string(),
                processing_timestamp: now.clone(),
                total_pages: Some(documents.iter().map(|d| d.total_pages).sum()),
                processing_note: Some(format!(
                    "Ranked {} of {} sections by relevance to the persona and goal",
                    selected.len(),
                    sections.len()
                )),
            },
            extracted_sections,
            subsection_analysis,
            processing_info: ProcessingInfo {
                files_processed: names,
                total_files: documents.len(),
                analysis_type: RANKING_ANALYSIS_TYPE.to_string(),
                processed_at: now,
                limitation_note: None,
            },
        }
    }

    /// The strongest distinct passages of the selected sections, at most
    /// two per document while other documents are still unrepresented.
    fn subsections(&self, selected: &[&Section], profile: &PersonaProfile) -> Vec<SubsectionAnalysis> {
        let per_section = (self.config.max_subsections / selected.len().max(1)).clamp(1, 3);

        let mut candidates = Vec::new();
        for (i, section) in selected.iter().copied().enumerate() {
            let mut scored: Vec<(f64, String)> = passages(&section.text)
                .into_iter()
                .map(|p| (passage_score(&p, profile), p))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));

            let mut kept: Vec<(f64, String)> = Vec::new();
            for (score, passage) in scored {
                if kept.len() >= per_section {
                    break;
                }
                if score > MIN_PASSAGE_SCORE && kept.iter().all(|(_, k)| overlap(k, &passage) <= 0.6) {
                    kept.push((score, passage));
                }
            }

            for (score, passage) in kept {
                let text = refine_passage(&passage, REFINED_CHARS);
                if text.chars().count() < MIN_REFINED_CHARS {
                    continue;
                }
                let words = text.split_whitespace().count() as f64;
                let specifics = if has_specific_details(&text) { 0.02 } else { 0.0 };
                candidates.push(Candidate {
                    section,
                    score: score * 0.5 + 0.3 / (i + 1) as f64 + words / 100.0 * 0.1 + specifics,
                    text,
                });
            }
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let documents: HashSet<&str> = selected.iter().map(|s| s.document.as_str()).collect();
        let mut used: HashSet<&str> = HashSet::new();
        let mut chosen: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if chosen.len() >= self.config.max_subsections {
                break;
            }
            let section: &Section = candidate.section;
            let same_document = chosen
                .iter()
                .filter(|c| c.section.document == section.document)
                .count();
            if same_document >= 2 && used.len() < documents.len() {
                continue;
            }
            if candidate.score <= MIN_PASSAGE_SCORE
                || chosen.iter().any(|c| overlap(&c.text, &candidate.text) > 0.5)
            {
                continue;
            }
            used.insert(section.document.as_str());
            chosen.push(candidate);
        }

        if chosen.is_empty() {
            return selected
                .iter()
                .take(self.config.max_subsections)
                .map(|section| SubsectionAnalysis {
                    document: Some(section.document.clone()),
                    page_number: Some(section.page_number),
                    refined_text: section_summary(section),
                    ..Default::default()
                })
                .collect();
        }

        chosen
            .into_iter()
            .map(|c| SubsectionAnalysis {
                document: Some(c.section.document.clone()),
                page_number: Some(c.section.page_number),
                refined_text: c.text,
                ..Default::default()
            })
            .collect()
    }
}

/// Stand-in analysis for a section without a usable passage.
fn section_summary(section: &Section) -> String {
    if section.text.trim().chars().count() < 20 {
        format!("Information about {} is available in the document.", section.title)
    } else {
        refine_passage(&section.text, REFINED_CHARS)
    }
}
