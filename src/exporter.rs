//! Exporter wiring - builds the check pipeline and runs it
//!
//! This module assembles every component from a [`Config`]:
//! - The HTTP transport and randomized request identity
//! - Fetcher, parser and checker for single-domain lookups
//! - The shared rate limiter and metrics sink
//! - The scheduler driving periodic sweeps
//! - The HTTP server exposing metrics and the control API

use crate::config::Config;
use crate::lookup::{
    BrowserIdentity, Checker, Fetcher, HttpTransport, IdentityGenerator, PreFetchDelay,
    RateLimiter, RegexParser, ReqwestTransport, RetryPolicy, Scheduler,
};
use crate::metrics::{MetricsSink, PrometheusRegistry};
use crate::server::{self, AppState};
use crate::ExporterError;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

/// A fully wired exporter
pub struct Exporter {
    config: Arc<Config>,
    scheduler: Arc<Scheduler>,
    metrics: Arc<MetricsSink>,
    registry: Arc<PrometheusRegistry>,
}

impl Exporter {
    /// Creates an exporter that talks to the real lookup site
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Exporter)` - All components constructed
    /// * `Err(ExporterError)` - HTTP client, base URL or metrics registry failed
    pub fn new(config: Config) -> Result<Self, ExporterError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_components(config, transport, Arc::new(BrowserIdentity::new()))
    }

    /// Creates an exporter over the given transport and identity source
    pub fn with_components(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        identity: Arc<dyn IdentityGenerator>,
    ) -> Result<Self, ExporterError> {
        let base_url = Url::parse(&config.lookup.base_url)?;
        let fetcher = Fetcher::new(transport, identity, base_url).with_pre_fetch_delay(
            PreFetchDelay::from_millis(config.lookup.min_jitter_ms, config.lookup.max_jitter_ms),
        );
        let checker = Checker::new(
            fetcher,
            Arc::new(RegexParser::new()),
            config.request_timeout(),
        );

        let registry = Arc::new(PrometheusRegistry::new()?);
        let metrics = Arc::new(MetricsSink::new(registry.clone()));
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        let scheduler = Scheduler::new(
            config.domains.clone(),
            config.request_delay(),
            Arc::new(checker),
            rate_limiter,
            metrics.clone(),
        )
        .with_retry_policies(
            RetryPolicy::sweep(config.max_retries),
            RetryPolicy::on_demand(config.max_retries),
        );

        Ok(Self {
            config: Arc::new(config),
            scheduler: Arc::new(scheduler),
            metrics,
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<MetricsSink> {
        &self.metrics
    }

    pub fn registry(&self) -> &Arc<PrometheusRegistry> {
        &self.registry
    }

    fn app_state(&self) -> AppState {
        AppState {
            scheduler: self.scheduler.clone(),
            metrics: self.metrics.clone(),
            registry: self.registry.clone(),
            config: self.config.clone(),
        }
    }

    /// Binds the configured listen address
    pub async fn bind(&self) -> Result<TcpListener, ExporterError> {
        let addr = &self.config.server.listen;
        TcpListener::bind(addr)
            .await
            .map_err(|e| ExporterError::ListenAddr {
                addr: addr.clone(),
                message: e.to_string(),
            })
    }

    /// Runs periodic sweeps and serves HTTP until `shutdown` resolves
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ExporterError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            "Monitoring {} domain(s), sweeping every {}s",
            self.config.domains.len(),
            self.config.check_interval
        );

        let periodic = tokio::spawn(
            self.scheduler
                .clone()
                .run_periodic(self.config.check_interval()),
        );

        let served = server::serve(listener, self.app_state(), shutdown).await;
        periodic.abort();

        served?;
        tracing::info!("Exporter stopped");
        Ok(())
    }
}
