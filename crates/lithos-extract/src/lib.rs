//! Technical-report metric validation and extraction.
//!
//! A document is screened against a catalog of mining metrics (keywords plus
//! patterns); documents mentioning at least 40% of the catalog count as
//! technical reports. Extraction then pulls concrete financial figures out of
//! the text, scaling each value by the unit token that was actually matched.

use anyhow::Context;
use regex::Regex;
use serde::Serialize;

pub const CRATE_NAME: &str = "lithos-extract";

/// Share of catalog metrics a document must mention to count as a report.
pub const VALIDATION_THRESHOLD_PCT: f64 = 40.0;

struct MetricSpec {
    category: &'static str,
    field: &'static str,
    canonical_term: &'static str,
    keywords: &'static [&'static str],
    pattern: &'static str,
}

const METRIC_CATALOG: &[MetricSpec] = &[
    MetricSpec {
        category: "Economic Metrics",
        field: "NPV",
        canonical_term: "NPV (post-tax)",
        keywords: &["NPV after tax", "post-tax NPV", "NPV (AT)", "after-tax net present value"],
        pattern: r"(?i)(?:post[\s-]?tax|after[\s-]?tax)\s*NPV[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:M|million|MM|B|billion)",
    },
    MetricSpec {
        category: "Economic Metrics",
        field: "NPV",
        canonical_term: "NPV (pre-tax)",
        keywords: &["NPV pre tax", "pre-tax NPV", "NPV (BT)", "before-tax NPV"],
        pattern: r"(?i)(?:pre[\s-]?tax|before[\s-]?tax)\s*NPV[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:M|million|MM|B|billion)",
    },
    MetricSpec {
        category: "Economic Metrics",
        field: "IRR",
        canonical_term: "IRR (post-tax)",
        keywords: &["IRR after tax", "post-tax IRR", "IRR (AT)", "after-tax internal rate"],
        pattern: r"(?i)(?:post[\s-]?tax|after[\s-]?tax)\s*IRR[^\d]*([\d.]+)\s*%",
    },
    MetricSpec {
        category: "Economic Metrics",
        field: "IRR",
        canonical_term: "IRR (pre-tax)",
        keywords: &["IRR pre tax", "pre-tax IRR", "IRR (BT)", "before-tax IRR"],
        pattern: r"(?i)(?:pre[\s-]?tax|before[\s-]?tax)\s*IRR[^\d]*([\d.]+)\s*%",
    },
    MetricSpec {
        category: "Economic Metrics",
        field: "Payback Period",
        canonical_term: "Payback Period",
        keywords: &["payback", "payback period", "capital payback", "investment payback"],
        pattern: r"(?i)payback(?:\s+period)?[^\d]*([\d.]+)\s*(?:years?|yrs?)",
    },
    MetricSpec {
        category: "Capital Costs",
        field: "Initial CAPEX",
        canonical_term: "Initial CAPEX",
        keywords: &[
            "initial capital",
            "CAPEX",
            "capital expenditure",
            "pre-production capital",
            "development capital",
        ],
        pattern: r"(?i)(?:initial|pre[\s-]?production|development)\s*(?:capital|CAPEX)[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:M|million|MM|B|billion)",
    },
    MetricSpec {
        category: "Capital Costs",
        field: "Sustaining CAPEX",
        canonical_term: "Sustaining CAPEX",
        keywords: &["sustaining capital", "sustaining CAPEX", "LOM sustaining", "maintenance capital"],
        pattern: r"(?i)sustaining\s*(?:capital|CAPEX)[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:M|million|MM|B|billion)",
    },
    MetricSpec {
        category: "Operating Costs",
        field: "OPEX",
        canonical_term: "Operating Cost (OPEX)",
        keywords: &["operating cost", "OPEX", "operating costs", "site operating cost"],
        pattern: r"(?i)(?:operating\s*cost|OPEX)[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:/|per)\s*(?:tonne?|t|ton)",
    },
    MetricSpec {
        category: "Operating Costs",
        field: "AISC",
        canonical_term: "AISC",
        keywords: &["AISC", "all-in sustaining cost", "all in sustaining"],
        pattern: r"(?i)AISC[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:/|per)\s*(?:oz|ounce|lb|pound|tonne?|t)",
    },
    MetricSpec {
        category: "Operating Costs",
        field: "Cash Cost",
        canonical_term: "Cash Cost",
        keywords: &["cash cost", "cash costs", "site cash cost"],
        pattern: r"(?i)cash\s*cost[^\d]*([$US]*\s*[\d,]+(?:\.\d+)?)\s*(?:/|per)\s*(?:oz|ounce|lb|pound|tonne?|t)",
    },
    MetricSpec {
        category: "Mine Profile",
        field: "Mine Life",
        canonical_term: "Mine Life",
        keywords: &["mine life", "life of mine", "LOM", "project life"],
        pattern: r"(?i)(?:mine\s*life|life\s*of\s*mine|LOM)[^\d]*([\d.]+)\s*(?:years?|yrs?)",
    },
    MetricSpec {
        category: "Mine Profile",
        field: "Annual Production",
        canonical_term: "Annual Production",
        keywords: &["annual production", "yearly production", "average annual production"],
        pattern: r"(?i)(?:annual|yearly|average\s*annual)\s*production[^\d]*([\d,]+(?:\.\d+)?)\s*(?:k?t|tonnes?|tons?|Mtpa|oz|ounces|lbs?|pounds?)",
    },
    MetricSpec {
        category: "Mine Profile",
        field: "Throughput",
        canonical_term: "Throughput",
        keywords: &["throughput", "nameplate capacity", "processing rate", "tpd", "Mtpa"],
        pattern: r"(?i)(?:throughput|processing\s*rate|nameplate)[^\d]*([\d,]+(?:\.\d+)?)\s*(?:Mt?pa|tpd|t/d|tonnes?/day)",
    },
    MetricSpec {
        category: "Resources",
        field: "Total Resources",
        canonical_term: "Total Resources",
        keywords: &["mineral resources", "total resources", "measured and indicated", "M&I", "inferred"],
        pattern: r"(?i)(?:total|mineral)\s*resources?[^\d]*([\d,]+(?:\.\d+)?)\s*(?:Mt|million\s*tonnes?|million\s*tons?)",
    },
    MetricSpec {
        category: "Resources",
        field: "Grade",
        canonical_term: "Grade",
        keywords: &["grade", "average grade", "resource grade", "ore grade"],
        pattern: r"(?i)(?:average|ore|resource)?\s*grade[^\d]*([\d.]+)\s*(?:g/t|%|ppm|oz/t)",
    },
    MetricSpec {
        category: "Resources",
        field: "Reserves",
        canonical_term: "Reserves",
        keywords: &["ore reserves", "proven and probable", "P&P", "mineral reserves"],
        pattern: r"(?i)(?:ore|mineral)\s*reserves?[^\d]*([\d,]+(?:\.\d+)?)\s*(?:Mt|million\s*tonnes?|million\s*tons?)",
    },
    MetricSpec {
        category: "Metallurgy",
        field: "Recovery",
        canonical_term: "Metallurgical Recovery",
        keywords: &["recovery", "metallurgical recovery", "processing recovery", "overall recovery"],
        pattern: r"(?i)(?:metallurgical|processing|overall)?\s*recovery[^\d]*([\d.]+)\s*%",
    },
    MetricSpec {
        category: "Project Overview",
        field: "Project Stage",
        canonical_term: "Project Stage",
        keywords: &[
            "exploration",
            "PEA",
            "preliminary economic assessment",
            "pre-feasibility",
            "PFS",
            "feasibility study",
            "DFS",
            "BFS",
            "construction",
            "production",
        ],
        pattern: r"(?i)\b(exploration|PEA|preliminary\s*economic\s*assessment|pre[\s-]?feasibility|PFS|feasibility\s*study|DFS|BFS|construction|production)\b",
    },
    MetricSpec {
        category: "Compliance",
        field: "Reporting Code",
        canonical_term: "Reporting Code",
        keywords: &["NI 43-101", "S-K 1300", "SK1300", "JORC", "SAMREC"],
        pattern: r"(?i)\b(NI\s*43[\s-]101|S[\s-]K\s*1300|SK1300|JORC|SAMREC)\b",
    },
];

/// One catalog entry with its compiled screening pattern.
pub struct MetricDefinition {
    pub category: &'static str,
    pub field: &'static str,
    pub canonical_term: &'static str,
    pub keywords: &'static [&'static str],
    pattern: Regex,
}

/// Outcome of screening a document against the metric catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentValidation {
    pub is_valid: bool,
    pub metrics_found: usize,
    pub total_metrics: usize,
    pub percentage: u32,
    pub found_metrics: Vec<String>,
}

/// Figures pulled from report text. Money is USD millions, masses are
/// tonnes, fields stay `None` when the text never states them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_tax_npv_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_tax_npv_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustaining_capex_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mine_life_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_production_tonnes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_resource_tonnes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_grade_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opex_usd_per_tonne: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aisc_usd_per_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

struct ExtractionPatterns {
    post_tax_npv: Regex,
    pre_tax_npv: Regex,
    irr: Regex,
    payback: Regex,
    capex: Regex,
    sustaining_capex: Regex,
    mine_life: Regex,
    annual_production: Regex,
    total_resources: Regex,
    grade: Regex,
    opex: Regex,
    aisc: Regex,
    stage: Regex,
}

impl ExtractionPatterns {
    fn compile() -> anyhow::Result<Self> {
        Ok(Self {
            post_tax_npv: compile(
                "post-tax NPV",
                r"(?i)(?:post[\s-]?tax|after[\s-]?tax)\s*NPV[^\d]*\$?([\d,]+(?:\.\d+)?)\s*(million|billion|MM|M|B)",
            )?,
            pre_tax_npv: compile(
                "pre-tax NPV",
                r"(?i)(?:pre[\s-]?tax|before[\s-]?tax)\s*NPV[^\d]*\$?([\d,]+(?:\.\d+)?)\s*(million|billion|MM|M|B)",
            )?,
            irr: compile(
                "IRR",
                r"(?i)(?:post[\s-]?tax|after[\s-]?tax)?\s*IRR[^\d]*([\d.]+)\s*%",
            )?,
            payback: compile(
                "payback period",
                r"(?i)payback(?:\s+period)?[^\d]*([\d.]+)\s*(?:years?|yrs?)",
            )?,
            capex: compile(
                "initial capex",
                r"(?i)(?:initial|pre[\s-]?production|development|total)\s*(?:capital|CAPEX)[^\d]*\$?([\d,]+(?:\.\d+)?)\s*(million|billion|MM|M|B)",
            )?,
            sustaining_capex: compile(
                "sustaining capex",
                r"(?i)sustaining\s*(?:capital|CAPEX)[^\d]*\$?([\d,]+(?:\.\d+)?)\s*(million|billion|MM|M|B)",
            )?,
            mine_life: compile(
                "mine life",
                r"(?i)(?:mine\s*life|life\s*of\s*mine|LOM)[^\d]*([\d.]+)\s*(?:years?|yrs?)",
            )?,
            annual_production: compile(
                "annual production",
                r"(?i)(?:annual|yearly|average\s*annual)\s*production[^\d]*([\d,]+(?:\.\d+)?)\s*(Mt|million\s*tonnes?|k?t/year)",
            )?,
            total_resources: compile(
                "total resources",
                r"(?i)(?:total|mineral)\s*resources?[^\d]*([\d,]+(?:\.\d+)?)\s*(?:Mt|million\s*tonnes?)",
            )?,
            grade: compile(
                "resource grade",
                r"(?i)(?:average|ore|resource)?\s*grade[^\d]*([\d.]+)\s*(g/t|%|ppm|oz/t)",
            )?,
            opex: compile(
                "operating cost",
                r"(?i)(?:operating\s*cost|OPEX)[^\d]*\$?([\d,]+(?:\.\d+)?)\s*(?:/|per)\s*(?:tonne?|t)",
            )?,
            aisc: compile(
                "AISC",
                r"(?i)AISC[^\d]*\$?([\d,]+(?:\.\d+)?)\s*(?:/|per)\s*(?:oz|ounce|lb|pound|tonne?)",
            )?,
            stage: compile(
                "project stage",
                r"(?i)\b(exploration|PEA|preliminary\s*economic\s*assessment|pre[\s-]?feasibility|feasibility\s*study|construction|production)\b",
            )?,
        })
    }
}

pub struct MetricsExtractor {
    catalog: Vec<MetricDefinition>,
    patterns: ExtractionPatterns,
}

impl MetricsExtractor {
    pub fn new() -> anyhow::Result<Self> {
        let mut catalog = Vec::with_capacity(METRIC_CATALOG.len());
        for spec in METRIC_CATALOG {
            catalog.push(MetricDefinition {
                category: spec.category,
                field: spec.field,
                canonical_term: spec.canonical_term,
                keywords: spec.keywords,
                pattern: compile(spec.canonical_term, spec.pattern)?,
            });
        }
        Ok(Self {
            catalog,
            patterns: ExtractionPatterns::compile()?,
        })
    }

    pub fn catalog(&self) -> &[MetricDefinition] {
        &self.catalog
    }

    /// Screen `text` against the catalog. A metric counts as found when any
    /// of its keywords occurs (case-insensitive) or its pattern matches.
    pub fn validate_document(&self, text: &str) -> DocumentValidation {
        let haystack = text.to_lowercase();
        let mut found_metrics = Vec::new();

        for metric in &self.catalog {
            let mut found = metric
                .keywords
                .iter()
                .any(|keyword| haystack.contains(&keyword.to_lowercase()));
            if !found {
                found = metric.pattern.is_match(text);
            }
            if found {
                found_metrics.push(metric.canonical_term.to_string());
            }
        }

        let metrics_found = found_metrics.len();
        let total_metrics = self.catalog.len();
        let percentage = metrics_found as f64 / total_metrics as f64 * 100.0;

        DocumentValidation {
            // Validity is judged on the exact share; the reported percentage
            // is rounded for display.
            is_valid: percentage >= VALIDATION_THRESHOLD_PCT,
            metrics_found,
            total_metrics,
            percentage: percentage.round() as u32,
            found_metrics,
        }
    }

    /// Pull concrete figures out of `text`. Each field takes the first match
    /// of its pattern; unparseable captures leave the field unset.
    pub fn extract(&self, text: &str) -> ExtractedMetrics {
        let p = &self.patterns;
        let mut out = ExtractedMetrics {
            post_tax_npv_usd_m: capture_money(&p.post_tax_npv, text),
            pre_tax_npv_usd_m: capture_money(&p.pre_tax_npv, text),
            irr_percent: capture_number(&p.irr, text),
            payback_years: capture_number(&p.payback, text),
            capex_usd_m: capture_money(&p.capex, text),
            sustaining_capex_usd_m: capture_money(&p.sustaining_capex, text),
            mine_life_years: capture_number(&p.mine_life, text),
            annual_production_tonnes: capture_mass(&p.annual_production, text),
            total_resource_tonnes: capture_number(&p.total_resources, text)
                .map(|megatonnes| megatonnes * 1_000_000.0),
            opex_usd_per_tonne: capture_number(&p.opex, text),
            aisc_usd_per_unit: capture_number(&p.aisc, text),
            ..ExtractedMetrics::default()
        };

        if let Some(caps) = p.grade.captures(text) {
            let value = caps.get(1).and_then(|m| parse_figure(m.as_str()));
            if let (Some(value), Some(unit)) = (value, caps.get(2)) {
                out.resource_grade = Some(value);
                out.resource_grade_unit = Some(unit.as_str().to_string());
            }
        }

        out.stage = p
            .stage
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| normalize_stage(m.as_str()))
            .map(str::to_string);

        out
    }
}

/// Confidence in an extraction, 0 to 100. Five critical figures carry 60
/// points between them, seven secondary figures carry the remaining 40.
pub fn extraction_confidence(metrics: &ExtractedMetrics) -> u32 {
    let critical = [
        metrics.post_tax_npv_usd_m,
        metrics.capex_usd_m,
        metrics.irr_percent,
        metrics.mine_life_years,
        metrics.annual_production_tonnes,
    ];
    let bonus = [
        metrics.pre_tax_npv_usd_m,
        metrics.sustaining_capex_usd_m,
        metrics.payback_years,
        metrics.total_resource_tonnes,
        metrics.resource_grade,
        metrics.opex_usd_per_tonne,
        metrics.aisc_usd_per_unit,
    ];

    let critical_found = critical.iter().filter(|m| m.is_some()).count();
    let bonus_found = bonus.iter().filter(|m| m.is_some()).count();

    let confidence = critical_found as f64 / critical.len() as f64 * 60.0
        + bonus_found as f64 / bonus.len() as f64 * 40.0;
    (confidence.round() as u32).min(100)
}

fn compile(what: &str, pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(pattern).with_context(|| format!("compiling {what} pattern"))
}

fn parse_figure(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn capture_number(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    parse_figure(caps.get(1)?.as_str())
}

/// Money figures normalize to USD millions: a billion-denominated token
/// scales the captured value by 1000.
fn capture_money(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    let value = parse_figure(caps.get(1)?.as_str())?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    let multiplier = if unit == "b" || unit == "billion" {
        1_000.0
    } else {
        1.0
    };
    Some(value * multiplier)
}

/// Production figures normalize to tonnes per year from the matched unit
/// token: megatonnes and "million tonnes" scale by 1e6, kilotonnes by 1e3.
fn capture_mass(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    let value = parse_figure(caps.get(1)?.as_str())?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    let multiplier = if unit.starts_with("mt") || unit.starts_with("million") {
        1_000_000.0
    } else if unit.starts_with("kt") {
        1_000.0
    } else {
        1.0
    };
    Some(value * multiplier)
}

/// Canonical stage label for a matched stage term. Comparison runs on the
/// term squashed to lowercase alphanumerics, so "pre-feasibility",
/// "pre feasibility" and "prefeasibility" normalize the same way.
fn normalize_stage(label: &str) -> Option<&'static str> {
    let squashed: String = label
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if squashed.contains("exploration") {
        Some("exploration")
    } else if squashed.contains("pea") || squashed.contains("preliminary") {
        Some("pea")
    } else if squashed.contains("prefeasibility") {
        Some("pre_feasibility")
    } else if squashed.contains("feasibility") {
        Some("feasibility")
    } else if squashed.contains("construction") {
        Some("construction")
    } else if squashed.contains("production") {
        Some("production")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REPORT: &str = "\
        The feasibility study outlines a post-tax NPV of $1,250 million at an 8% discount rate, \
        with a post-tax IRR of 29.5% and payback period of 2.8 years. Initial capital of $475 million \
        (sustaining capital $120 million over LOM). Mine life 14 years with average annual production \
        of 2.1 Mt. Total resources of 85.4 Mt at an average grade 1.24 g/t. Operating cost of $38.50 \
        per tonne and AISC of $950 per oz. Proven and probable ore reserves of 52 Mt. Overall recovery \
        92.5%. Reported under NI 43-101.";

    fn extractor() -> MetricsExtractor {
        MetricsExtractor::new().expect("catalog patterns compile")
    }

    #[test]
    fn catalog_carries_every_screening_metric() {
        assert_eq!(extractor().catalog().len(), 19);
    }

    #[test]
    fn technical_report_text_passes_validation() {
        let validation = extractor().validate_document(SAMPLE_REPORT);
        assert!(validation.is_valid);
        assert_eq!(validation.total_metrics, 19);
        assert_eq!(validation.metrics_found, 15);
        assert_eq!(validation.percentage, 79);
        assert!(validation.found_metrics.contains(&"NPV (post-tax)".to_string()));
        assert!(validation.found_metrics.contains(&"Reporting Code".to_string()));
        assert!(!validation.found_metrics.contains(&"Throughput".to_string()));
    }

    #[test]
    fn unrelated_text_fails_validation() {
        let validation = extractor().validate_document("Quarterly newsletter about copper markets.");
        assert!(!validation.is_valid);
        assert_eq!(validation.metrics_found, 0);
        assert_eq!(validation.percentage, 0);
        assert!(validation.found_metrics.is_empty());
    }

    #[test]
    fn validity_threshold_sits_at_forty_percent_of_the_catalog() {
        // Seven keyword hits out of nineteen metrics is under the threshold,
        // eight is over it.
        let seven = "NPV after tax, payback, CAPEX, AISC, mine life, grade, recovery";
        let validation = extractor().validate_document(seven);
        assert_eq!(validation.metrics_found, 7);
        assert!(!validation.is_valid);
        assert_eq!(validation.percentage, 37);

        let eight = format!("{seven}, throughput");
        let validation = extractor().validate_document(&eight);
        assert_eq!(validation.metrics_found, 8);
        assert!(validation.is_valid);
        assert_eq!(validation.percentage, 42);
    }

    #[test]
    fn keyword_screening_ignores_case() {
        let validation = extractor().validate_document("the aisc came in under guidance");
        assert!(validation.found_metrics.contains(&"AISC".to_string()));
    }

    #[test]
    fn pattern_screening_catches_spellings_keywords_miss() {
        // "NI 43 101" without the dash only matches via the pattern.
        let validation = extractor().validate_document("prepared according to NI 43 101");
        assert!(validation.found_metrics.contains(&"Reporting Code".to_string()));
    }

    #[test]
    fn full_report_extraction_finds_every_stated_figure() {
        let metrics = extractor().extract(SAMPLE_REPORT);
        assert_eq!(metrics.post_tax_npv_usd_m, Some(1250.0));
        assert_eq!(metrics.pre_tax_npv_usd_m, None);
        assert_eq!(metrics.irr_percent, Some(29.5));
        assert_eq!(metrics.payback_years, Some(2.8));
        assert_eq!(metrics.capex_usd_m, Some(475.0));
        assert_eq!(metrics.sustaining_capex_usd_m, Some(120.0));
        assert_eq!(metrics.mine_life_years, Some(14.0));
        assert_eq!(metrics.annual_production_tonnes, Some(2_100_000.0));
        assert_eq!(metrics.total_resource_tonnes, Some(85_400_000.0));
        assert_eq!(metrics.resource_grade, Some(1.24));
        assert_eq!(metrics.resource_grade_unit.as_deref(), Some("g/t"));
        assert_eq!(metrics.opex_usd_per_tonne, Some(38.5));
        assert_eq!(metrics.aisc_usd_per_unit, Some(950.0));
        assert_eq!(metrics.stage.as_deref(), Some("feasibility"));
    }

    #[test]
    fn empty_text_extracts_nothing() {
        assert_eq!(extractor().extract(""), ExtractedMetrics::default());
    }

    #[test]
    fn billion_denominated_money_scales_to_millions() {
        let metrics = extractor().extract("post-tax NPV of $1.2 billion");
        assert_eq!(metrics.post_tax_npv_usd_m, Some(1200.0));

        let metrics = extractor().extract("initial capital of $2.5B");
        assert_eq!(metrics.capex_usd_m, Some(2500.0));
    }

    #[test]
    fn production_scales_by_the_matched_unit_token() {
        let ex = extractor();
        assert_eq!(
            ex.extract("average annual production of 2.1 Mt").annual_production_tonnes,
            Some(2_100_000.0)
        );
        assert_eq!(
            ex.extract("annual production of 850 kt/year").annual_production_tonnes,
            Some(850_000.0)
        );
        assert_eq!(
            ex.extract("annual production of 120,000 t/year").annual_production_tonnes,
            Some(120_000.0)
        );
    }

    #[test]
    fn thousands_separators_are_stripped_before_parsing() {
        let metrics = extractor().extract("pre-tax NPV of $1,234.5 million");
        assert_eq!(metrics.pre_tax_npv_usd_m, Some(1234.5));
    }

    #[test]
    fn grade_keeps_its_unit() {
        let metrics = extractor().extract("resource grade 0.45 % copper equivalent");
        assert_eq!(metrics.resource_grade, Some(0.45));
        assert_eq!(metrics.resource_grade_unit.as_deref(), Some("%"));
    }

    #[test]
    fn irr_matches_without_a_tax_basis_prefix() {
        let metrics = extractor().extract("the project IRR is 21.7%");
        assert_eq!(metrics.irr_percent, Some(21.7));
    }

    #[test]
    fn stage_spellings_normalize_to_one_label() {
        let ex = extractor();
        assert_eq!(ex.extract("entering pre-feasibility").stage.as_deref(), Some("pre_feasibility"));
        assert_eq!(ex.extract("entering pre feasibility").stage.as_deref(), Some("pre_feasibility"));
        assert_eq!(ex.extract("a PEA was completed").stage.as_deref(), Some("pea"));
        assert_eq!(
            ex.extract("Preliminary Economic Assessment results").stage.as_deref(),
            Some("pea")
        );
        assert_eq!(ex.extract("currently in production").stage.as_deref(), Some("production"));
        assert_eq!(ex.extract("early exploration drilling").stage.as_deref(), Some("exploration"));
    }

    #[test]
    fn confidence_weighs_critical_figures_over_bonus_ones() {
        let metrics = extractor().extract(SAMPLE_REPORT);
        // All five critical figures plus six of seven bonus figures.
        assert_eq!(extraction_confidence(&metrics), 94);
    }

    #[test]
    fn confidence_is_zero_when_nothing_was_found() {
        assert_eq!(extraction_confidence(&ExtractedMetrics::default()), 0);
    }

    #[test]
    fn confidence_caps_at_one_hundred() {
        let metrics = ExtractedMetrics {
            post_tax_npv_usd_m: Some(1000.0),
            pre_tax_npv_usd_m: Some(1400.0),
            irr_percent: Some(25.0),
            payback_years: Some(3.0),
            capex_usd_m: Some(400.0),
            sustaining_capex_usd_m: Some(90.0),
            mine_life_years: Some(12.0),
            annual_production_tonnes: Some(1_500_000.0),
            total_resource_tonnes: Some(60_000_000.0),
            resource_grade: Some(1.1),
            resource_grade_unit: Some("g/t".to_string()),
            opex_usd_per_tonne: Some(40.0),
            aisc_usd_per_unit: Some(900.0),
            stage: Some("production".to_string()),
        };
        assert_eq!(extraction_confidence(&metrics), 100);
    }

    #[test]
    fn absent_figures_stay_out_of_serialized_output() {
        let metrics = extractor().extract("post-tax NPV of $500 million");
        let value = serde_json::to_value(&metrics).expect("serialize");
        let object = value.as_object().expect("object");
        assert_eq!(object.get("post_tax_npv_usd_m"), Some(&serde_json::json!(500.0)));
        assert!(!object.contains_key("capex_usd_m"));
        assert!(!object.contains_key("stage"));
    }
}
