use std::sync::Arc;

use clap::{Args, ValueEnum};
use serde_json::{Map, Value, json};
use tally::{ActivityTotals, ForgePlatform, Settings, Tally};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, Forge};
use crate::progress::ProgressReporter;

/// Output format for the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Options shared by every platform subcommand.
///
/// Unset flags fall through to the config file and `TALLY_*` variables.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct CountArgs {
    /// API host, for self-hosted instances
    #[arg(short = 'H', long, value_name = "URL")]
    pub host: Option<String>,

    /// Your login on the platform
    #[arg(short, long)]
    pub username: Option<String>,

    /// Commit e-mail attributed to you (repeatable)
    #[arg(short, long = "email", value_name = "EMAIL")]
    pub emails: Vec<String>,

    /// Commit author name attributed to you (repeatable)
    #[arg(long = "name", value_name = "NAME")]
    pub names: Vec<String>,

    /// Only count activity on or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Only count activity on or before this date
    #[arg(long, value_name = "DATE")]
    pub until: Option<String>,

    /// Commits needed for a repository to count as a project
    #[arg(short, long, value_name = "N")]
    pub min_commits: Option<u64>,

    /// Repositories counted in parallel
    #[arg(short, long, value_name = "N")]
    pub concurrency: Option<u64>,

    /// Stop any listing after this many pages
    #[arg(long, value_name = "N")]
    pub max_pages: Option<u64>,

    /// Disable proactive rate limiting
    #[arg(short = 'R', long)]
    pub no_rate_limit: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

impl CountArgs {
    /// Layer the flags that were given over `options`.
    pub(crate) fn apply(&self, options: &mut Map<String, Value>) {
        if let Some(ref username) = self.username {
            options.insert("username".to_string(), json!(username));
        }
        if !self.emails.is_empty() {
            options.insert("emails".to_string(), json!(self.emails));
        }
        if !self.names.is_empty() {
            options.insert("names".to_string(), json!(self.names));
        }
        if let Some(ref from) = self.from {
            options.insert("from_date".to_string(), json!(from));
        }
        if let Some(ref until) = self.until {
            options.insert("until_date".to_string(), json!(until));
        }
        if let Some(min_commits) = self.min_commits {
            options.insert("min_commits".to_string(), json!(min_commits));
        }
        if let Some(concurrency) = self.concurrency {
            options.insert("concurrency".to_string(), json!(concurrency));
        }
        if let Some(max_pages) = self.max_pages {
            options.insert("max_pages".to_string(), json!(max_pages));
        }
        if self.no_rate_limit {
            options.insert("requests_per_second".to_string(), json!(0));
        }
    }
}

/// Totals for display.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, tabled::Tabled)]
pub(crate) struct TallyReport {
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[tabled(rename = "Projects")]
    pub projects: u64,
    #[tabled(rename = "Commits")]
    pub commits: u64,
}

impl TallyReport {
    fn new(platform: &str, totals: ActivityTotals) -> Self {
        Self {
            platform: platform.to_string(),
            projects: totals.projects,
            commits: totals.commits,
        }
    }

    pub(crate) fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(vec![self.clone()]);
                table.with(tabled::settings::Style::rounded());
                Ok(table.to_string())
            }
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }
}

/// Handle a platform subcommand: tally, then print the totals.
pub(crate) async fn handle_count(
    forge: Forge,
    args: CountArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = config.user_options(forge);
    args.apply(&mut options);
    let settings = Settings::resolve(&Value::Object(options));

    if settings.access_token.is_empty() {
        tracing::warn!("No access token configured; only public data is visible");
    }
    if settings.username.is_empty() && settings.emails.is_empty() && settings.names.is_empty() {
        return Err("No identity configured: pass --username, --email or --name".into());
    }

    let host = args.host.clone().unwrap_or_else(|| config.host(forge));
    let reporter = Arc::new(ProgressReporter::new());

    let report = match forge {
        #[cfg(feature = "github")]
        Forge::GitHub => {
            let platform = tally::github::GitHubPlatform::new(&host);
            run(platform, settings, &reporter, cancel.clone()).await?
        }
        #[cfg(feature = "gitlab")]
        Forge::GitLab => {
            let platform = tally::gitlab::GitLabPlatform::new(&host);
            run(platform, settings, &reporter, cancel.clone()).await?
        }
        #[cfg(feature = "gitea")]
        Forge::Gitea => {
            let platform = tally::gitea::GiteaPlatform::new(&host);
            run(platform, settings, &reporter, cancel.clone()).await?
        }
    };
    reporter.finish();

    if cancel.is_cancelled() {
        eprintln!("Interrupted: totals cover only the repositories counted so far.");
    }
    println!("{}", report.render(args.output)?);

    Ok(())
}

async fn run<P: ForgePlatform + 'static>(
    platform: P,
    settings: Settings,
    reporter: &Arc<ProgressReporter>,
    cancel: CancellationToken,
) -> tally::platform::Result<TallyReport> {
    let name = platform.name();
    let totals = Tally::new(platform, settings)?
        .with_progress(reporter.as_callback())
        .with_cancellation(cancel)
        .get()
        .await;

    Ok(TallyReport::new(name, totals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flags_leave_options_alone() {
        let mut options = Map::new();
        options.insert("min_commits".to_string(), json!(3));

        CountArgs::default().apply(&mut options);

        assert_eq!(options.len(), 1);
        assert_eq!(options["min_commits"], json!(3));
    }

    #[test]
    fn test_flags_override_config_options() {
        let mut options = Map::new();
        options.insert("min_commits".to_string(), json!(3));
        options.insert("requests_per_second".to_string(), json!(10));
        options.insert("emails".to_string(), json!(["old@example.com"]));

        let args = CountArgs {
            username: Some("octocat".to_string()),
            emails: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            from: Some("2024-01-01".to_string()),
            min_commits: Some(5),
            concurrency: Some(4),
            no_rate_limit: true,
            ..CountArgs::default()
        };
        args.apply(&mut options);

        let settings = Settings::resolve(&Value::Object(options));
        assert_eq!(settings.username, "octocat");
        assert_eq!(settings.emails, vec!["a@example.com", "b@example.com"]);
        assert_eq!(settings.from_date, "2024-01-01");
        assert_eq!(settings.min_commits, 5);
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.requests_per_second, 0);
    }

    #[test]
    fn test_json_report_has_platform_projects_and_commits() {
        let report = TallyReport::new(
            "GitHub",
            ActivityTotals {
                projects: 2,
                commits: 108,
            },
        );

        let rendered = report.render(OutputFormat::Json).expect("report should serialize");
        let value: Value = serde_json::from_str(&rendered).expect("report should be JSON");

        assert_eq!(
            value,
            json!({"platform": "GitHub", "projects": 2, "commits": 108})
        );
    }

    #[test]
    fn test_table_report_shows_totals() {
        let report = TallyReport::new(
            "Gitea",
            ActivityTotals {
                projects: 1,
                commits: 7,
            },
        );

        let rendered = report.render(OutputFormat::Table).expect("table renders");

        assert!(rendered.contains("Projects"));
        assert!(rendered.contains("Gitea"));
        assert!(rendered.contains('7'));
    }
}
