use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// WebDriver session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriverConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Where the listing lives and how its markup is addressed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_table_body_selector")]
    pub table_body_selector: String,

    #[serde(default = "default_row_selector")]
    pub row_selector: String,

    #[serde(default = "default_value_cell_selector")]
    pub value_cell_selector: String,

    #[serde(default = "default_detail_root_selector")]
    pub detail_root_selector: String,

    #[serde(default = "default_purpose_field_selector")]
    pub purpose_field_selector: String,

    #[serde(default = "default_purpose_label")]
    pub purpose_label: String,

    #[serde(default = "default_next_selector")]
    pub next_selector: String,

    #[serde(default = "default_next_label")]
    pub next_label: String,
}

/// Bounded waits and settle delays, all in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_initial_settle_ms")]
    pub initial_settle_ms: u64,

    #[serde(default = "default_navigation_retries")]
    pub navigation_retries: usize,

    #[serde(default = "default_table_timeout_ms")]
    pub table_timeout_ms: u64,

    #[serde(default = "default_rows_timeout_ms")]
    pub rows_timeout_ms: u64,

    #[serde(default = "default_detail_timeout_ms")]
    pub detail_timeout_ms: u64,

    #[serde(default = "default_detail_settle_ms")]
    pub detail_settle_ms: u64,

    #[serde(default = "default_back_settle_ms")]
    pub back_settle_ms: u64,

    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Stop after this many pages. `None` crawls until pagination runs out.
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_listing_url() -> String {
    "https://transparencia.e-publica.net/epublica-portal/#/palmeira/portal/compras/contratoTable"
        .to_string()
}
fn default_table_body_selector() -> String {
    "#compublicaportalcontratoPortalContratoTableService tbody".to_string()
}
fn default_row_selector() -> String {
    r#"#compublicaportalcontratoPortalContratoTableService > tbody > tr[ng-repeat-start="(rowIndex, row) in tableReq.rows"]"#.to_string()
}
fn default_value_cell_selector() -> String {
    "td:nth-child(6) > div.table-xs-td-content.epublica-truncate-text > span".to_string()
}
fn default_detail_root_selector() -> String {
    "html > body > div:first-child > div > portal-shell > section > div > div:first-child > div > div > div > ng-transclude > div > div > div > form".to_string()
}
fn default_purpose_field_selector() -> String {
    format!(
        "{} > div:first-child > ng-form > div:nth-child(8) > p-list > dl > ng-repeat:nth-child(2)",
        default_detail_root_selector()
    )
}
fn default_purpose_label() -> String {
    "Finalidade".to_string()
}
fn default_next_selector() -> String {
    "a.btn.btn-blue.pagination-next".to_string()
}
fn default_next_label() -> String {
    "Próxima".to_string()
}
fn default_navigation_timeout_ms() -> u64 {
    30_000
}
fn default_initial_settle_ms() -> u64 {
    5_000
}
fn default_navigation_retries() -> usize {
    2
}
fn default_table_timeout_ms() -> u64 {
    15_000
}
fn default_rows_timeout_ms() -> u64 {
    10_000
}
fn default_detail_timeout_ms() -> u64 {
    10_000
}
fn default_detail_settle_ms() -> u64 {
    3_000
}
fn default_back_settle_ms() -> u64 {
    2_000
}
fn default_page_settle_ms() -> u64 {
    3_000
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            table_body_selector: default_table_body_selector(),
            row_selector: default_row_selector(),
            value_cell_selector: default_value_cell_selector(),
            detail_root_selector: default_detail_root_selector(),
            purpose_field_selector: default_purpose_field_selector(),
            purpose_label: default_purpose_label(),
            next_selector: default_next_selector(),
            next_label: default_next_label(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            initial_settle_ms: default_initial_settle_ms(),
            navigation_retries: default_navigation_retries(),
            table_timeout_ms: default_table_timeout_ms(),
            rows_timeout_ms: default_rows_timeout_ms(),
            detail_timeout_ms: default_detail_timeout_ms(),
            detail_settle_ms: default_detail_settle_ms(),
            back_settle_ms: default_back_settle_ms(),
            page_settle_ms: default_page_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
        }
    }
}

impl TimingConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
    pub fn initial_settle(&self) -> Duration {
        Duration::from_millis(self.initial_settle_ms)
    }
    pub fn table_timeout(&self) -> Duration {
        Duration::from_millis(self.table_timeout_ms)
    }
    pub fn rows_timeout(&self) -> Duration {
        Duration::from_millis(self.rows_timeout_ms)
    }
    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }
    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }
    pub fn back_settle(&self) -> Duration {
        Duration::from_millis(self.back_settle_ms)
    }
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Every wait and settle delay collapsed to zero, for scripted runs.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            navigation_timeout_ms: 0,
            initial_settle_ms: 0,
            navigation_retries: 0,
            table_timeout_ms: 0,
            rows_timeout_ms: 0,
            detail_timeout_ms: 0,
            detail_settle_ms: 0,
            back_settle_ms: 0,
            page_settle_ms: 0,
            poll_interval_ms: 0,
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("CONTRACTS").separator("__"))
            .build()?;

        Self::from_layers(cfg)
    }

    /// Deserializes merged sources; a mistyped value is an error, never a
    /// silent fallback to defaults.
    fn from_layers(cfg: config::Config) -> Result<Self> {
        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration (config/*.toml or CONTRACTS__* variables)")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.site.listing_url)
            .with_context(|| format!("Invalid listing URL {:?}", self.site.listing_url))?;
        url::Url::parse(&self.driver.webdriver_url)
            .with_context(|| format!("Invalid WebDriver URL {:?}", self.driver.webdriver_url))?;
        Ok(())
    }
}
