use serde_json::Value;
use std::time::Duration;

use crate::axes::RenameOptions;
use crate::cache::{Cache, CacheKey, FileCache, NoCache};
use crate::cast::{Table, decode_table, parse_ffcsv};
use crate::config::{ClientConfig, load_config};
use crate::error::{GenesisError, Result, format_http_error};
use crate::jobs::{DEFAULT_JOB_DEADLINE, DEFAULT_POLL_INTERVAL, JobDriver, JobPolicy};
use crate::status::{self, StatusKind};
use crate::transport::{Clock, HttpResponse, ReqwestTransport, SystemClock, Transport};
use crate::util::{Params, endpoint_url, params};

/// Endpoints whose answers are written through the cache.
const CACHED_ENDPOINTS: [&str; 1] = ["data"];

pub struct Client {
    config: ClientConfig,

    pub(crate) poll_interval: Duration,
    pub(crate) job_deadline: Duration,
    job_policy: JobPolicy,
    pub(crate) progress: bool,

    transport: Box<dyn Transport>,
    cache: Box<dyn Cache>,
    pub(crate) clock: Box<dyn Clock>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.config.url)
            .field("username", &self.config.username)
            .field("poll_interval", &self.poll_interval)
            .field("job_deadline", &self.job_deadline)
            .field("job_policy", &self.job_policy)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client using environment variables and/or `.genesisrc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`username`/`password` arguments
    /// - environment variables `GENESIS_URL` / `GENESIS_USERNAME` / `GENESIS_PASSWORD`
    /// - config file from `GENESIS_RC` or `.genesisrc`
    pub fn new(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> anyhow::Result<Self> {
        let cfg = load_config(url, username, password)?;
        Self::with_config(cfg)
    }

    /// Creates a client talking HTTP through reqwest.
    pub fn with_config(config: ClientConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a client on top of any [`Transport`]. The cache follows `config.cache_dir`.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        let cache: Box<dyn Cache> = match &config.cache_dir {
            Some(dir) => Box::new(FileCache::new(dir)),
            None => Box::new(NoCache),
        };

        Self {
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
            job_deadline: DEFAULT_JOB_DEADLINE,
            job_policy: JobPolicy::default(),
            progress: true,
            transport: Box::new(transport),
            cache,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_job_policy(mut self, policy: JobPolicy) -> Self {
        self.job_policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_job_deadline(mut self, deadline: Duration) -> Self {
        self.job_deadline = deadline;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issues `GET <url>/<endpoint>/<method>` and returns the raw answer.
    ///
    /// `data` requests carrying a `name` are served from and written to the cache. Queries the
    /// service defers to a background job are submitted and waited for according to the
    /// job policy.
    pub fn request(&self, endpoint: &str, method: &str, params: &Params) -> Result<String> {
        let key = cache_key(endpoint, method, params);

        if let Some(key) = &key {
            if self.cache.has(key) {
                tracing::debug!(name = %key.name, endpoint, method, "cache hit");
                return Ok(self.cache.get(key)?);
            }
        }

        let text = self.issue(endpoint, method, params)?;

        if let Some(key) = &key {
            if let Err(e) = self.cache.put(key, &text) {
                tracing::warn!(name = %key.name, "failed to cache data: {}", e);
            }
        }
        Ok(text)
    }

    fn issue(&self, endpoint: &str, method: &str, params: &Params) -> Result<String> {
        let text = self.call(endpoint, method, params)?;
        let Some(status) = status::interpret(&text) else {
            return Ok(text);
        };

        match status::surface(&status)? {
            StatusKind::DeferredJob => {
                if !self.job_policy.allows(&status) {
                    return Err(GenesisError::ServiceQuery(status.content));
                }
                tracing::info!(endpoint, method, "query too large, submitting a background job");
                JobDriver::new(self, endpoint, method, params.clone()).run()
            }
            _ => Ok(text),
        }
    }

    /// One authenticated round trip. Non-2xx answers are errors, the body is not inspected.
    pub(crate) fn call(&self, endpoint: &str, method: &str, params: &Params) -> Result<String> {
        let url = endpoint_url(&self.config.url, endpoint, method);
        let mut query = params.clone();
        query.insert("username".to_string(), self.config.username.clone());
        query.insert("password".to_string(), self.config.password.clone());
        let query: Vec<(String, String)> = query.into_iter().collect();

        tracing::debug!(%url, "GET");
        let resp = self.transport.get(&url, &query)?;
        checked(resp, &url)
    }

    /// Raw cube file of `name`.
    pub fn cubefile(&self, name: &str, extra: &Params) -> Result<String> {
        let mut p = params([("name", name), ("area", "all")]);
        p.extend(extra.clone());
        self.request("data", "cubefile", &p)
    }

    /// Downloads cube `name` and returns it as one typed table.
    pub fn cube(&self, name: &str, extra: &Params, options: &RenameOptions) -> Result<Table> {
        let text = self.cubefile(name, extra)?;
        decode_table(&text, options)
    }

    /// Table `name` in the flat `ffcsv` format.
    pub fn tablefile(&self, name: &str, extra: &Params) -> Result<String> {
        let mut p = params([("name", name), ("area", "all"), ("format", "ffcsv")]);
        p.extend(extra.clone());
        self.request("data", "tablefile", &p)
    }

    /// Table `name` parsed from its `ffcsv` answer, with numeric columns typed.
    ///
    /// The table's description is available separately through `metadata("table", name)`.
    pub fn table(&self, name: &str, extra: &Params) -> Result<Table> {
        let text = self.tablefile(name, extra)?;
        parse_ffcsv(&text)
    }

    /// Metadata of one object; `kind` is e.g. `cube`, `statistic`, `table`, `variable`.
    pub fn metadata(&self, kind: &str, name: &str) -> Result<Value> {
        let text = self.request("metadata", kind, &params([("name", name)]))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn catalogue(&self, method: &str, params: &Params) -> Result<Value> {
        let text = self.request("catalogue", method, params)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Removes a saved result table from `area`.
    pub fn remove_result(&self, name: &str, area: &str) -> Result<String> {
        self.request("profile", "removeresult", &params([("name", name), ("area", area)]))
    }

    /// Changes the account password, then uses the new one for every later request.
    pub fn change_password(&mut self, new: &str) -> Result<String> {
        let text = self.request("profile", "password", &params([("new", new), ("repeat", new)]))?;
        self.config.password = new.to_string();
        tracing::info!(username = %self.config.username, "password changed");
        Ok(text)
    }

    /// Host name and IP address as seen by the service. Needs no credentials.
    pub fn whoami(&self) -> Result<String> {
        let url = endpoint_url(&self.config.url, "helloworld", "whoami");
        let resp = self.transport.get(&url, &[])?;
        checked(resp, &url)
    }

    /// Tests the configured credentials.
    ///
    /// The answer uses a `Status` field of its own, so only the HTTP status is checked.
    pub fn logincheck(&self) -> Result<String> {
        self.call("helloworld", "logincheck", &Params::new())
    }
}

fn checked(resp: HttpResponse, url: &str) -> Result<String> {
    if !resp.is_success() {
        return Err(format_http_error(resp.status, url, &resp.text));
    }
    Ok(resp.text)
}

fn cache_key(endpoint: &str, method: &str, params: &Params) -> Option<CacheKey> {
    if !CACHED_ENDPOINTS.contains(&endpoint) {
        return None;
    }
    let name = params.get("name")?;
    Some(CacheKey::new(name, endpoint, method, params))
}
