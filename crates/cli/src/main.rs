//! Testwright CLI - Main Entry Point
//!
//! Drives one orchestrated run: loads suite specs, applies tag/filter
//! selection, supervises retries, captures failure artifacts, and writes the
//! configured report. Exit code 0 on a clean run, 1 when tests failed, 2 on
//! a fatal configuration or session error.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use testwright_runner::{
    run_tests, ArtifactConfig, Browser, PlaywrightConfig, RunConfig, RunnerError, RunnerResult,
};

#[derive(Parser, Debug)]
#[command(name = "testwright")]
#[command(version, about = "Browser-test orchestrator")]
struct Args {
    /// Suite spec files or directories to load
    #[arg(required = true)]
    globs: Vec<String>,

    /// Tag expression; repeatable. Prefix `!` to exclude, a leading `#` is
    /// ignored
    #[arg(short, long = "tag")]
    tag: Vec<String>,

    /// Regex filter over fully-qualified test names
    #[arg(short, long)]
    filter: Option<String>,

    /// Extra attempts for a failing test
    #[arg(short, long, default_value = "0")]
    retries: u32,

    /// Reporter name (xunit, json)
    #[arg(long)]
    reporter: Option<String>,

    /// Reporter options, e.g. output=reports/run.xml
    #[arg(long)]
    reporter_options: Option<String>,

    /// Browser to drive (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Base URL steps navigate relative to
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Run the browser headless
    #[arg(long, default_value = "true")]
    headless: bool,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Directory for named screenshot steps
    #[arg(long, default_value = "test-results/screenshots")]
    screenshot_dir: std::path::PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> RunnerResult<bool> {
    let config = RunConfig {
        globs: args.globs,
        tag: args.tag,
        filter: args.filter,
        retries: args.retries,
        reporter: args.reporter,
        reporter_options: args.reporter_options,
        // the environment toggles are resolved here, once, into the
        // explicit capture config the core consumes
        artifacts: ArtifactConfig::from_env(),
        playwright: PlaywrightConfig {
            base_url: args.base_url,
            browser: args.browser.parse::<Browser>()?,
            headless: args.headless,
            viewport_width: args.viewport_width,
            viewport_height: args.viewport_height,
            screenshot_dir: args.screenshot_dir,
        },
    };

    let stats = tokio::select! {
        stats = run_tests(config) => stats?,
        _ = tokio::signal::ctrl_c() => return Err(RunnerError::Interrupted),
    };

    let summary = format!(
        "{} tests, {} passed, {} failed, {} pending",
        stats.tests, stats.passes, stats.failures, stats.pending
    );
    if stats.failures == 0 {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }

    Ok(stats.failures == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_arguments_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn tag_flag_repeats() {
        let args = Args::parse_from([
            "testwright",
            "suites/",
            "--tag",
            "smoke",
            "--tag",
            "!ff-legacy",
            "--retries",
            "2",
        ]);
        assert_eq!(args.tag, ["smoke", "!ff-legacy"]);
        assert_eq!(args.retries, 2);
    }
}
