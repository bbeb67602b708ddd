//! Summary image rendering and caching.

use std::fmt::Write as _;
use std::path::PathBuf;

use countryfx_common::{time, CountryFxError, CountryRecord, Result, Timestamp};
use tracing::debug;

/// File name of the cached summary inside the cache directory.
pub const SUMMARY_FILE: &str = "summary.svg";

/// Content type of the rendered summary.
pub const SUMMARY_CONTENT_TYPE: &str = "image/svg+xml";

/// Number of countries listed on the summary.
pub const SUMMARY_TOP_N: usize = 5;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

/// Inputs of one summary image.
#[derive(Debug, Clone)]
pub struct SummaryData {
    pub total_countries: u64,
    /// Highest-GDP countries, already ordered.
    pub top: Vec<CountryRecord>,
    pub last_refreshed_at: Timestamp,
}

/// Turns summary data into image bytes.
pub trait SummaryRenderer: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// Render the summary.
    fn render(&self, data: &SummaryData) -> Vec<u8>;
}

/// Renders the summary as an SVG document.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgSummaryRenderer;

impl SummaryRenderer for SvgSummaryRenderer {
    fn content_type(&self) -> &'static str {
        SUMMARY_CONTENT_TYPE
    }

    fn render(&self, data: &SummaryData) -> Vec<u8> {
        let mut svg = String::new();

        // write! into a String cannot fail
        let _ = writeln!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"##
        );
        let _ = writeln!(svg, r##"  <rect width="100%" height="100%" fill="#ffffff"/>"##);
        let _ = writeln!(
            svg,
            r##"  <text x="50" y="60" font-family="sans-serif" font-size="28" font-weight="bold" fill="#1a1a1a">Country Summary</text>"##
        );
        let _ = writeln!(
            svg,
            r##"  <text x="50" y="110" font-family="sans-serif" font-size="18" fill="#333333">Total Countries: {}</text>"##,
            data.total_countries
        );
        let _ = writeln!(
            svg,
            r##"  <text x="50" y="160" font-family="sans-serif" font-size="20" font-weight="bold" fill="#1a1a1a">Top 5 Countries by Estimated GDP:</text>"##
        );

        let mut y = 200;
        for (rank, record) in data.top.iter().enumerate() {
            let gdp = record
                .estimated_gdp
                .map(format_money)
                .unwrap_or_else(|| "N/A".to_string());
            let _ = writeln!(
                svg,
                r##"  <text x="70" y="{y}" font-family="sans-serif" font-size="16" fill="#333333">{}. {}: {}</text>"##,
                rank + 1,
                escape_xml(&record.name),
                gdp
            );
            y += 35;
        }

        let _ = writeln!(
            svg,
            r##"  <text x="50" y="{}" font-family="sans-serif" font-size="14" fill="#666666">Last Refreshed: {}</text>"##,
            HEIGHT - 50,
            time::display(&data.last_refreshed_at)
        );
        svg.push_str("</svg>\n");

        svg.into_bytes()
    }
}

/// Format an amount as `$1,234.56`.
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Stores the latest rendered summary on disk.
#[derive(Debug, Clone)]
pub struct SummaryImageCache {
    dir: PathBuf,
}

impl SummaryImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cached summary.
    pub fn path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    /// Replace the cached summary.
    pub async fn store(&self, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CountryFxError::InternalError(format!("create cache dir: {e}")))?;

        // write-then-rename so readers never see a partial file
        let tmp = self.dir.join(format!("{SUMMARY_FILE}.tmp"));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| CountryFxError::InternalError(format!("write summary: {e}")))?;
        tokio::fs::rename(&tmp, self.path())
            .await
            .map_err(|e| CountryFxError::InternalError(format!("replace summary: {e}")))?;

        debug!(path = %self.path().display(), bytes = bytes.len(), "Stored summary image");
        Ok(())
    }

    /// Read the cached summary, if one was produced.
    pub async fn load(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CountryFxError::InternalError(format!("read summary: {e}"))),
        }
    }
}
