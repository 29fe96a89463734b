//! CLI argument parsing and end-to-end run

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use crate::config::{HarnessConfig, JobConfig, DEFAULT_JOB_ID_HEADER};
use crate::dataset::{Instance, ProblemKind};
use crate::harness::{drive, HarnessBuilder};
use crate::client::JobClient;
use crate::sampling::UniformSampler;
use crate::transport::{HttpTransport, ReqwestTransport, RetryPolicy, RetryingTransport};

/// routeload - load generator for asynchronous route-optimization job APIs
#[derive(Parser, Debug)]
#[command(name = "routeload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Submission endpoint URL
    #[arg(short, long)]
    pub url: String,

    /// Status-URL template for polling accepted jobs. `{request_id}` is
    /// substituted if present, otherwise the identifier is appended.
    #[arg(short = 's', long)]
    pub status_url: Option<String>,

    /// Response header carrying the job identifier on a 202
    #[arg(long, default_value = DEFAULT_JOB_ID_HEADER)]
    pub job_id_header: String,

    /// Total number of jobs to submit
    #[arg(short, long, default_value = "100")]
    pub num_requests: usize,

    /// Maximum number of jobs in flight at once
    #[arg(short, long, default_value = "1")]
    pub concurrency: usize,

    /// Routing instance files used as payloads (repeatable)
    #[arg(short, long)]
    pub dataset: Vec<PathBuf>,

    /// Parse instance files as pickup-and-delivery (Li & Lim) instead of
    /// Solomon format
    #[arg(long)]
    pub pdp: bool,

    /// Inline JSON payloads (repeatable, alternative to --dataset)
    #[arg(long)]
    pub payload_json: Vec<String>,

    /// Per-call timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Retries per call for transient failures
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Exponential backoff factor in seconds
    #[arg(long, default_value = "0.3")]
    pub backoff_factor: f64,

    /// Also retry 404 status responses (eventual-consistency tolerance)
    #[arg(long)]
    pub retry_not_found: bool,

    /// Courtesy delay before every network call, in milliseconds
    #[arg(long, default_value = "0")]
    pub request_delay_ms: u64,

    /// Maximum status polls per job (unbounded when omitted)
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Overall run deadline in seconds; the batch is cancelled gracefully
    /// once it passes
    #[arg(long)]
    pub run_timeout_secs: Option<u64>,

    /// Extra request header, as "name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Bearer token added as an authorization header
    #[arg(long, env = "ROUTELOAD_API_KEY")]
    pub api_key: Option<String>,

    /// Write successful result bodies to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Run the load generator based on the parsed arguments.
    pub async fn run(&self) -> Result<()> {
        let payloads = self.load_payloads()?;
        tracing::info!(
            url = %self.url,
            num_requests = self.num_requests,
            concurrency = self.concurrency,
            payloads = payloads.len(),
            "starting routeload"
        );

        let job_config = self.job_config()?;
        let policy = self.retry_policy();

        let base = ReqwestTransport::new(Duration::from_secs(self.timeout_secs))
            .context("failed to construct HTTP transport")?;
        let transport: Arc<dyn HttpTransport> =
            Arc::new(RetryingTransport::new(Arc::new(base), policy));

        let client = Arc::new(JobClient::new(transport, job_config));
        let sampler = Arc::new(UniformSampler::new(payloads)?);

        let (harness, outcome_rx) = HarnessBuilder::new()
            .config(HarnessConfig::new(self.num_requests, self.concurrency))
            .client(client)
            .sampler(sampler)
            .build()?;

        // First Ctrl+C cancels the batch gracefully.
        let cancel = harness.cancel_flag();
        let signal_handle = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received Ctrl+C, cancelling batch");
                cancel.cancel();
            }
        });

        let timeout = self.run_timeout_secs.map(Duration::from_secs);
        let run = drive(harness, outcome_rx, timeout).await?;
        signal_handle.abort();

        println!();
        println!("{}", "=".repeat(60));
        println!("  routeload summary");
        println!("{}", "=".repeat(60));
        println!("  Requested:    {}", run.requested);
        println!("  Concurrency:  {}", run.concurrency);
        println!("  Succeeded:    {}", run.successes.len());
        println!("  Failed:       {}", run.failures);
        println!("  Elapsed:      {:.2}s", run.elapsed.as_secs_f64());
        println!("  Throughput:   {:.2} jobs/s", run.throughput());
        println!("{}", "=".repeat(60));

        if let Some(path) = &self.output {
            let bodies: Vec<&Value> = run.successes.iter().map(|s| &s.body).collect();
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, &bodies)
                .context("failed to write results file")?;
            tracing::info!(path = %path.display(), results = bodies.len(), "results written");
        }

        Ok(())
    }

    fn load_payloads(&self) -> Result<Vec<Value>> {
        let kind = if self.pdp {
            ProblemKind::Pdptw
        } else {
            ProblemKind::Cvrptw
        };

        let mut payloads = Vec::new();
        for path in &self.dataset {
            let instance = Instance::from_path(path, kind)
                .with_context(|| format!("failed to load instance {}", path.display()))?;
            tracing::debug!(
                path = %path.display(),
                nodes = instance.nodes.len(),
                vehicles = instance.vehicle_num,
                "instance loaded"
            );
            payloads.push(instance.to_payload());
        }
        for (index, raw) in self.payload_json.iter().enumerate() {
            let value: Value = serde_json::from_str(raw)
                .with_context(|| format!("--payload-json argument {} is not valid JSON", index + 1))?;
            payloads.push(value);
        }

        anyhow::ensure!(
            !payloads.is_empty(),
            "no payloads: pass at least one --dataset file or --payload-json document"
        );
        Ok(payloads)
    }

    fn job_config(&self) -> Result<JobConfig> {
        let mut config = JobConfig::new(&self.url)
            .with_job_id_header(&self.job_id_header)
            .with_request_delay(Duration::from_millis(self.request_delay_ms));

        if let Some(template) = &self.status_url {
            config = config.with_status_url_template(template);
        }
        if let Some(max_polls) = self.max_polls {
            config = config.with_max_polls(max_polls);
        }
        if let Some(key) = &self.api_key {
            config = config.with_header("authorization", format!("Bearer {key}"));
        }
        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            config = config.with_header(name, value);
        }

        Ok(config)
    }

    fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(self.max_retries, self.backoff_factor);
        if self.retry_not_found {
            policy.tolerate_not_found()
        } else {
            policy
        }
    }
}

/// Parse a `name: value` header argument.
fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("invalid header {raw:?}, expected \"name: value\""))?;
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "invalid header {raw:?}: empty name");
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_valid() {
        let (name, value) = parse_header("x-api-key: secret").unwrap();
        assert_eq!(name, "x-api-key");
        assert_eq!(value, "secret");
    }

    #[test]
    fn test_parse_header_preserves_colons_in_value() {
        let (name, value) = parse_header("referer: http://example.com/a").unwrap();
        assert_eq!(name, "referer");
        assert_eq!(value, "http://example.com/a");
    }

    #[test]
    fn test_parse_header_invalid() {
        assert!(parse_header("no-colon-here").is_err());
        assert!(parse_header(": empty name").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["routeload", "--url", "http://localhost/optimize"]);
        assert_eq!(cli.num_requests, 100);
        assert_eq!(cli.concurrency, 1);
        assert_eq!(cli.max_retries, 3);
        assert_eq!(cli.job_id_header, DEFAULT_JOB_ID_HEADER);
        assert!(cli.max_polls.is_none());
        assert!(!cli.pdp);
    }

    #[test]
    fn test_cli_job_config_assembly() {
        let cli = Cli::parse_from([
            "routeload",
            "--url",
            "http://localhost/optimize",
            "--status-url",
            "http://localhost/status/",
            "--max-polls",
            "50",
            "--header",
            "x-tenant: acme",
        ]);

        let config = cli.job_config().unwrap();
        assert_eq!(config.max_polls, Some(50));
        assert_eq!(
            config.status_url("abc").as_deref(),
            Some("http://localhost/status/abc")
        );
        assert_eq!(config.headers.get("x-tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_cli_requires_payload_source() {
        let cli = Cli::parse_from(["routeload", "--url", "http://localhost/optimize"]);
        assert!(cli.load_payloads().is_err());
    }

    #[test]
    fn test_cli_inline_payloads() {
        let cli = Cli::parse_from([
            "routeload",
            "--url",
            "http://localhost/optimize",
            "--payload-json",
            r#"{"n": 1}"#,
        ]);
        let payloads = cli.load_payloads().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["n"], 1);
    }
}
