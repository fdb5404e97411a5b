//! A minimal client of the MLflow tracking REST API.

use crate::common::*;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;

/// The connection to a tracking server.
#[derive(Debug, Clone)]
pub struct TrackingClient {
    client: Client,
    base_url: Url,
}

/// A run on the tracking server.
#[derive(Debug, Clone)]
pub struct TrackingRun {
    client: TrackingClient,
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

impl TrackingClient {
    pub fn new(uri: &str) -> Result<Self> {
        let base_url = Url::parse(uri)
            .with_context(|| format!("invalid tracking server URI '{}'", uri))?;
        ensure!(
            !base_url.cannot_be_a_base(),
            "invalid tracking server URI '{}'",
            uri
        );
        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self { client, base_url })
    }

    /// The URL of a REST endpoint, e.g. `runs/create`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| format_err!("invalid tracking server URI '{}'", self.base_url))?;
            segments.pop_if_empty();
            segments.extend(["api", "2.0", "mlflow"]);
            segments.extend(path.split('/'));
        }
        Ok(url)
    }

    async fn post<T>(&self, path: &str, body: serde_json::Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to call tracking endpoint '{}'", path))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("tracking endpoint '{}' responded {}: {}", path, status, text);
        }
        Ok(response.json().await?)
    }

    /// Returns the ID of the named experiment, creating it if it does not exist.
    pub async fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let url = Url::parse_with_params(
            self.endpoint("experiments/get-by-name")?.as_str(),
            &[("experiment_name", name)],
        )?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => {
                let GetExperimentResponse { experiment } = response.json().await?;
                Ok(experiment.experiment_id)
            }
            StatusCode::NOT_FOUND => {
                info!("create tracking experiment '{}'", name);
                let CreateExperimentResponse { experiment_id } = self
                    .post("experiments/create", json!({ "name": name }))
                    .await?;
                Ok(experiment_id)
            }
            status => bail!(
                "failed to look up tracking experiment '{}': {}",
                name,
                status
            ),
        }
    }

    /// Starts a run in the named experiment.
    pub async fn create_run(&self, experiment_name: &str) -> Result<TrackingRun> {
        let experiment_id = self.get_or_create_experiment(experiment_name).await?;
        let CreateRunResponse { run } = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "start_time": timestamp_millis(),
                }),
            )
            .await?;
        info!("started tracking run {}", run.info.run_id);

        Ok(TrackingRun {
            client: self.clone(),
            run_id: run.info.run_id,
        })
    }
}

impl TrackingRun {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn log_param(&self, key: &str, value: &str) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .post(
                "runs/log-parameter",
                json!({ "run_id": self.run_id, "key": key, "value": value }),
            )
            .await?;
        Ok(())
    }

    pub async fn log_metric(&self, key: &str, value: f64, step: i64) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .post("runs/log-metric", metric_body(&self.run_id, key, value, step))
            .await?;
        Ok(())
    }

    /// Marks the run as finished.
    pub async fn finish(&self) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .post(
                "runs/update",
                json!({
                    "run_id": self.run_id,
                    "status": "FINISHED",
                    "end_time": timestamp_millis(),
                }),
            )
            .await?;
        Ok(())
    }
}

fn metric_body(run_id: &str, key: &str, value: f64, step: i64) -> serde_json::Value {
    json!({
        "run_id": run_id,
        "key": key,
        "value": value,
        "timestamp": timestamp_millis(),
        "step": step,
    })
}

fn timestamp_millis() -> i64 {
    Local::now().timestamp_millis()
}

/// Local servers are reached directly, bypassing proxy settings.
fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// An in-process HTTP server answering MLflow REST calls with canned JSON.
#[cfg(test)]
pub(crate) mod mock_server {
    use super::*;
    use std::sync::Mutex;
    use tokio::{
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
        net::{TcpListener, TcpStream},
    };

    pub const RUN_ID: &str = "run-0001";
    pub const EXPERIMENT_ID: &str = "17";

    /// A received request. The path includes the query string.
    #[derive(Debug, Clone)]
    pub struct Request {
        pub method: String,
        pub path: String,
        pub body: serde_json::Value,
    }

    pub struct MockServer {
        pub uri: String,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl MockServer {
        /// Starts serving on an ephemeral port. `get-by-name` answers 404
        /// unless `experiment_exists` is set.
        pub async fn start(experiment_exists: bool) -> Result<Self> {
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            let uri = format!("http://{}", listener.local_addr()?);
            let requests = Arc::new(Mutex::new(vec![]));

            {
                let requests = requests.clone();
                tokio::spawn(async move {
                    while let Ok((stream, _)) = listener.accept().await {
                        let requests = requests.clone();
                        tokio::spawn(async move {
                            let _ = serve_connection(stream, requests, experiment_exists).await;
                        });
                    }
                });
            }

            Ok(Self { uri, requests })
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn serve_connection(
        stream: TcpStream,
        requests: Arc<Mutex<Vec<Request>>>,
        experiment_exists: bool,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        loop {
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).await? == 0 {
                return Ok(());
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await?;
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse()?;
                    }
                }
            }

            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).await?;
            let body = if body.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&body)?
            };

            let (status, response) = respond(&path, experiment_exists);
            requests.lock().unwrap().push(Request { method, path, body });

            let response = response.to_string();
            let message = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                status,
                response.len(),
                response
            );
            writer.write_all(message.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    fn respond(path: &str, experiment_exists: bool) -> (&'static str, serde_json::Value) {
        let endpoint = path.split('?').next().unwrap_or_default();

        match endpoint {
            "/api/2.0/mlflow/experiments/get-by-name" if experiment_exists => (
                "200 OK",
                json!({ "experiment": { "experiment_id": EXPERIMENT_ID } }),
            ),
            "/api/2.0/mlflow/experiments/get-by-name" => (
                "404 Not Found",
                json!({ "error_code": "RESOURCE_DOES_NOT_EXIST" }),
            ),
            "/api/2.0/mlflow/experiments/create" => {
                ("200 OK", json!({ "experiment_id": EXPERIMENT_ID }))
            }
            "/api/2.0/mlflow/runs/create" => (
                "200 OK",
                json!({ "run": { "info": { "run_id": RUN_ID } } }),
            ),
            _ => ("200 OK", json!({})),
        }
    }
}
