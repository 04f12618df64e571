//! Report aggregation and rendering.
//!
//! A [`Report`] is built once per run from the [`PageResult`]s and the
//! responsive breakdown, then rendered as a text table, a navigable HTML
//! document and a JSON result list.

use crate::pairing::MissingSide;
use crate::regions::RegionScore;
use crate::responsive::BreakpointResult;
use crate::result::FidelityResult;
use crate::strategy::Metric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Report document file name
pub const HTML_REPORT: &str = "index.html";

/// Result list file name
pub const JSON_REPORT: &str = "results.json";

/// One page row, split before the status column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Page, pixel and structural columns, padded
    pub cells: String,
    /// Verdict of the row
    pub status: PageStatus,
    /// Status label with detail
    pub status_text: String,
}

/// Page table laid out as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLines {
    /// Column heading
    pub heading: String,
    /// Dashed rule under the heading
    pub rule: String,
    /// Rows in page order
    pub rows: Vec<TableRow>,
}

fn score_cell(value: Option<f64>, metric: Metric) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format_score(metric, v))
}

/// `320px=98.3%`, `320px=captured` or `320px=unavailable`
#[must_use]
pub fn breakpoint_cell(bp: &BreakpointResult) -> String {
    let value = match (bp.score, bp.captured()) {
        (Some(score), _) => format_score(bp.metric, score),
        (None, true) => "captured".to_string(),
        (None, false) => "unavailable".to_string(),
    };
    format!("{}px={value}", bp.width)
}

/// Verdict for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Score at or above threshold
    Pass,
    /// Score below threshold, or the page could not be compared
    Fail,
    /// One side is absent
    Missing,
}

impl PageStatus {
    /// Upper-case label for tables
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Missing => "MISSING",
        }
    }

    /// CSS class used in the HTML report
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Missing => "missing",
        }
    }
}

/// `Pass` when `score >= threshold`, otherwise `Fail`
#[must_use]
pub fn verdict(score: f64, threshold: f64) -> PageStatus {
    if score >= threshold {
        PageStatus::Pass
    } else {
        PageStatus::Fail
    }
}

/// Pass thresholds, one per metric scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Pixel match percentage (0-100)
    pub pixel: f64,
    /// Structural score (0-1)
    pub structural: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pixel: Metric::Pixel.default_threshold(),
            structural: Metric::Structural.default_threshold(),
        }
    }
}

impl Thresholds {
    /// Threshold on `metric`'s scale
    #[must_use]
    pub const fn for_metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Pixel => self.pixel,
            Metric::Structural => self.structural,
        }
    }

    /// Override the threshold of one metric
    #[must_use]
    pub const fn with(mut self, metric: Metric, value: f64) -> Self {
        match metric {
            Metric::Pixel => self.pixel = value,
            Metric::Structural => self.structural = value,
        }
        self
    }
}

/// Format a threshold or score on `metric`'s scale
#[must_use]
pub fn format_score(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Pixel => format!("{value:.1}%"),
        Metric::Structural => format!("{value:.3}"),
    }
}

/// Comparison outcome for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Logical page name
    pub name: String,
    /// Verdict
    pub status: PageStatus,
    /// Pixel match percentage
    pub pixel_similarity: Option<f64>,
    /// Structural score, only when structural similarity ran
    pub structural_score: Option<f64>,
    /// Metric the verdict was decided on
    pub metric: Option<Metric>,
    /// Band scores, top to bottom
    pub regions: Vec<RegionScore>,
    /// Copied original, relative to the output directory
    pub original_image_path: Option<String>,
    /// Copied clone, relative to the output directory
    pub clone_image_path: Option<String>,
    /// Difference overlay, relative to the output directory
    pub diff_image_path: Option<String>,
    /// Structural heatmap, relative to the output directory
    pub heatmap_path: Option<String>,
    /// Missing reason or error message
    pub detail: Option<String>,
}

impl PageResult {
    /// Terminal result for a pair lacking one side
    #[must_use]
    pub fn missing(name: impl Into<String>, side: MissingSide) -> Self {
        Self {
            name: name.into(),
            status: PageStatus::Missing,
            pixel_similarity: None,
            structural_score: None,
            metric: None,
            regions: Vec::new(),
            original_image_path: None,
            clone_image_path: None,
            diff_image_path: None,
            heatmap_path: None,
            detail: Some(side.reason().to_string()),
        }
    }

    /// Failed result for a page that could not be compared
    #[must_use]
    pub fn errored(name: impl Into<String>, metric: Metric, detail: impl Into<String>) -> Self {
        Self {
            status: PageStatus::Fail,
            pixel_similarity: Some(0.0),
            metric: Some(metric),
            detail: Some(detail.into()),
            ..Self::missing(name, MissingSide::NoClone)
        }
    }

    /// Score the verdict was decided on
    #[must_use]
    pub fn primary_score(&self) -> Option<f64> {
        match self.metric? {
            Metric::Structural => self.structural_score,
            Metric::Pixel => self.pixel_similarity,
        }
    }
}

/// Pass/fail/missing counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Pages compared
    pub total: usize,
    /// Pages that passed
    pub passed: usize,
    /// Pages that failed
    pub failed: usize,
    /// Pages missing a side
    pub missing: usize,
}

impl Summary {
    /// Count the statuses of `pages`
    #[must_use]
    pub fn from_pages(pages: &[PageResult]) -> Self {
        pages.iter().fold(Self::default(), |mut summary, page| {
            summary.total += 1;
            match page.status {
                PageStatus::Pass => summary.passed += 1,
                PageStatus::Fail => summary.failed += 1,
                PageStatus::Missing => summary.missing += 1,
            }
            summary
        })
    }
}

/// Run metadata echoed into every artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// RFC 3339 generation time
    pub generated_at: String,
    /// Metric the caller asked for
    pub requested_metric: Metric,
    /// Metric that actually ran
    pub effective_metric: Metric,
    /// Threshold applied on the effective metric's scale
    pub threshold: f64,
    /// Both thresholds as configured
    pub thresholds: Thresholds,
    /// Number of bands per page
    pub region_count: usize,
}

impl RunInfo {
    /// Metadata stamped with the current time
    #[must_use]
    pub fn now(
        requested_metric: Metric,
        effective_metric: Metric,
        thresholds: Thresholds,
        region_count: usize,
    ) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            requested_metric,
            effective_metric,
            threshold: thresholds.for_metric(effective_metric),
            thresholds,
            region_count,
        }
    }

    /// True when the requested metric was downgraded
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.requested_metric != self.effective_metric
    }
}

/// Aggregate of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub run: RunInfo,
    /// Status counts
    pub summary: Summary,
    /// Page results in pairing order
    pub pages: Vec<PageResult>,
    /// Breakpoint results per page
    pub responsive: BTreeMap<String, Vec<BreakpointResult>>,
}

impl Report {
    /// Build from page results and the responsive map
    #[must_use]
    pub fn new(
        run: RunInfo,
        pages: Vec<PageResult>,
        responsive: BTreeMap<String, Vec<BreakpointResult>>,
    ) -> Self {
        Self {
            run,
            summary: Summary::from_pages(&pages),
            pages,
            responsive,
        }
    }

    /// At least one page failed
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Threshold display string
    #[must_use]
    pub fn threshold_label(&self) -> String {
        format_score(self.run.effective_metric, self.run.threshold)
    }

    /// Header line printed before the table
    #[must_use]
    pub fn header_line(&self) -> String {
        format!(
            "Comparing {} page(s) with {} threshold...",
            self.pages.len(),
            self.threshold_label()
        )
    }

    /// Closing summary line
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "Summary: {} passed, {} failed, {} missing (threshold: {})",
            self.summary.passed,
            self.summary.failed,
            self.summary.missing,
            self.threshold_label()
        )
    }

    /// Column layout shared by every text rendering of the page table
    #[must_use]
    pub fn table(&self) -> TableLines {
        let width = self
            .pages
            .iter()
            .map(|p| p.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(4)
            + 2;

        let heading = format!("{:<width$}{:>10}  {:>10}  Status", "Page", "Pixel", "Structural");
        let rule = "-".repeat(heading.chars().count());
        let rows = self
            .pages
            .iter()
            .map(|page| TableRow {
                cells: format!(
                    "{:<width$}{:>10}  {:>10}  ",
                    page.name,
                    score_cell(page.pixel_similarity, Metric::Pixel),
                    score_cell(page.structural_score, Metric::Structural),
                ),
                status: page.status,
                status_text: match &page.detail {
                    Some(detail) => format!("{} ({detail})", page.status.label()),
                    None => page.status.label().to_string(),
                },
            })
            .collect();

        TableLines {
            heading,
            rule,
            rows,
        }
    }

    /// One `page: 320px=98.3%  768px=...` line per responsive page
    #[must_use]
    pub fn responsive_lines(&self) -> Vec<String> {
        self.responsive
            .iter()
            .map(|(page, breakpoints)| {
                let cells: Vec<String> = breakpoints.iter().map(breakpoint_cell).collect();
                format!("{page}: {}", cells.join("  "))
            })
            .collect()
    }

    /// Plain-text table of every page
    #[must_use]
    pub fn render_text(&self) -> String {
        let table = self.table();
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.header_line());
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", table.heading);
        let _ = writeln!(out, "{}", table.rule);
        for row in &table.rows {
            let _ = writeln!(out, "{}{}", row.cells, row.status_text);
        }
        let responsive = self.responsive_lines();
        if !responsive.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "=== Responsive ===");
            for line in responsive {
                let _ = writeln!(out, "{line}");
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.summary_line());
        out
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> FidelityResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `index.html` and `results.json` into `output_dir`
    pub fn write(&self, output_dir: &Path) -> FidelityResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        std::fs::write(output_dir.join(JSON_REPORT), self.to_json()?)?;
        let html_path = output_dir.join(HTML_REPORT);
        std::fs::write(&html_path, self.render_html())?;
        tracing::info!(path = %html_path.display(), "report written");
        Ok(html_path)
    }

    /// Render the navigable HTML report
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Fidelity Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        table { border-collapse: collapse; margin: 10px 0; }
        th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
        .pass { color: #2e7d32; font-weight: bold; }
        .fail { color: #c62828; font-weight: bold; }
        .missing { color: #ef6c00; font-weight: bold; }
        .page { border: 1px solid #ddd; border-radius: 8px; padding: 16px; margin: 20px 0; }
        .images { display: flex; gap: 10px; flex-wrap: wrap; }
        .images figure { margin: 0; }
        .images img { max-width: 300px; border: 1px solid #ddd; }
        .responsive { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 10px; }
        .responsive img { max-width: 100px; border: 1px solid #ddd; }
        .detail { color: #666; font-family: monospace; }
    </style>
</head>
<body>
"#,
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>Visual Fidelity Report</h1>
    <p>{}</p>
    <p>Metric: {} (requested: {}) &middot; Generated {}</p>
</div>
"#,
            escape_html(&self.summary_line()),
            self.run.effective_metric,
            self.run.requested_metric,
            escape_html(&self.run.generated_at),
        );
        if self.run.fell_back() {
            html.push_str(
                "<p class=\"missing\">Structural similarity unavailable; pages were compared by pixel tolerance.</p>\n",
            );
        }

        self.render_page_table(&mut html);
        for page in &self.pages {
            Self::render_page_card(&mut html, page);
        }
        self.render_responsive(&mut html);

        html.push_str("</body>\n</html>\n");
        html
    }

    fn render_page_table(&self, html: &mut String) {
        html.push_str(
            "<h2>Pages</h2>\n<table>\n<tr><th>Page</th><th>Pixel</th><th>Structural</th><th>Status</th></tr>\n",
        );
        for page in &self.pages {
            let _ = writeln!(
                html,
                r##"<tr><td><a href="#page-{anchor}">{name}</a></td><td>{pixel}</td><td>{structural}</td><td class="{class}">{status}</td></tr>"##,
                anchor = escape_html(&page.name),
                name = escape_html(&page.name),
                pixel = page
                    .pixel_similarity
                    .map_or_else(|| "N/A".to_string(), |v| format_score(Metric::Pixel, v)),
                structural = page
                    .structural_score
                    .map_or_else(|| "N/A".to_string(), |v| format_score(Metric::Structural, v)),
                class = page.status.css_class(),
                status = page.status.label(),
            );
        }
        html.push_str("</table>\n");
    }

    fn render_page_card(html: &mut String, page: &PageResult) {
        let _ = writeln!(
            html,
            r#"<div class="page" id="page-{}">
<h3>{} <span class="{}">{}</span></h3>"#,
            escape_html(&page.name),
            escape_html(&page.name),
            page.status.css_class(),
            page.status.label(),
        );
        if let Some(detail) = &page.detail {
            let _ = writeln!(html, r#"<p class="detail">{}</p>"#, escape_html(detail));
        }

        let figures = [
            ("Original", &page.original_image_path),
            ("Clone", &page.clone_image_path),
            ("Difference", &page.diff_image_path),
            ("Structural heatmap", &page.heatmap_path),
        ];
        if figures.iter().any(|(_, path)| path.is_some()) {
            html.push_str("<div class=\"images\">\n");
            for (caption, path) in figures {
                if let Some(path) = path {
                    let _ = writeln!(
                        html,
                        r#"<figure><img src="{src}" alt="{caption}"><figcaption>{caption}</figcaption></figure>"#,
                        src = link_href(path),
                    );
                }
            }
            html.push_str("</div>\n");
        }

        if !page.regions.is_empty() {
            html.push_str("<table>\n<tr><th>Region</th><th>Score</th><th>Metric</th></tr>\n");
            for region in &page.regions {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape_html(&region.label),
                    format_score(region.metric, region.score),
                    region.metric,
                );
            }
            html.push_str("</table>\n");
        }
        html.push_str("</div>\n");
    }

    fn render_responsive(&self, html: &mut String) {
        if self.responsive.is_empty() {
            return;
        }
        html.push_str("<h2>Responsive</h2>\n");
        for (page, breakpoints) in &self.responsive {
            let _ = writeln!(
                html,
                "<h3>{}</h3>\n<div class=\"responsive\">",
                escape_html(page)
            );
            for bp in breakpoints {
                let label = match (bp.score, &bp.error) {
                    (Some(score), _) => format_score(bp.metric, score),
                    (None, Some(error)) => format!("unavailable: {error}"),
                    (None, None) => "N/A".to_string(),
                };
                let _ = writeln!(html, "<div><strong>{}px</strong> {}<br>", bp.width, escape_html(&label));
                for (alt, path) in [
                    ("clone", &bp.clone_image_path),
                    ("original", &bp.original_image_path),
                ] {
                    if let Some(path) = path {
                        let _ = writeln!(
                            html,
                            r#"<img src="{}" alt="{alt} at {}px">"#,
                            link_href(path),
                            bp.width
                        );
                    }
                }
                html.push_str("</div>\n");
            }
            html.push_str("</div>\n");
        }
    }
}

/// Relative artifact path as an attribute value: each `/`-separated
/// component percent-encoded, then HTML-escaped
fn link_href(relative: &str) -> String {
    let encoded: Vec<_> = relative.split('/').map(urlencoding::encode).collect();
    escape_html(&encoded.join("/"))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
