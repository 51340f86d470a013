//! In-memory transports standing in for a controller in tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{RequestMonitor, RequestOutcome, Response, Transport, TransportError};
use crate::endpoint::Endpoint;

/// A request as seen by a test transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub host: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Responder = dyn Fn(&Call) -> Result<Response, TransportError> + Send + Sync;

/// Transport answering every call through a closure
pub struct ScriptedTransport {
    responder: Box<Responder>,
    latency: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    monitor: RequestMonitor,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&Call) -> Result<Response, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            latency: None,
            calls: Mutex::new(Vec::new()),
            monitor: RequestMonitor::new(),
        }
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError> {
        let url = endpoint.url(path, query);
        self.monitor.record(&url, RequestOutcome::Pending);

        let call = Call {
            host: endpoint.host().to_owned(),
            path: path.to_owned(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        };
        self.calls.lock().unwrap().push(call.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = (self.responder)(&call);
        self.monitor.record(
            &url,
            match &result {
                Ok(response) => RequestOutcome::Status(response.code),
                Err(_) => RequestOutcome::Failed,
            },
        );

        result
    }

    fn monitor(&self) -> &RequestMonitor {
        &self.monitor
    }
}

/// Injected misbehavior for one command path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Code(u16),
    Offline,
}

/// Emulation of the controller firmware's selection and brightness handling
#[derive(Debug)]
pub struct ControllerState {
    pub num_leds: usize,
    pub bright: u8,
    pub selection: Option<(usize, usize)>,
    pub dirty: bool,
    pub color: Option<String>,
    pub local_brightness: Option<u8>,
    pub faults: HashMap<String, Fault>,
}

impl ControllerState {
    pub fn new(num_leds: usize) -> Self {
        Self {
            num_leds,
            bright: 128,
            selection: None,
            dirty: false,
            color: None,
            local_brightness: None,
            faults: HashMap::new(),
        }
    }

    fn state_body(&self) -> String {
        let selection = match self.selection {
            Some((start, end)) => format!(
                r#"{{"active":true,"start":{},"end":{},"dirty":{}}}"#,
                start, end, self.dirty
            ),
            None => r#"{"active":false}"#.to_owned(),
        };

        format!(
            r#"{{"ok":true,"num_leds":{},"bright":{},"selection":{}}}"#,
            self.num_leds, self.bright, selection
        )
    }

    fn clamp(&self, start: usize, end: usize) -> (usize, usize) {
        let last = self.num_leds.saturating_sub(1);
        let (s, e) = (start.min(last), end.min(last));
        if s > e {
            (e, s)
        } else {
            (s, e)
        }
    }

    fn handle(&mut self, call: &Call) -> Result<Response, TransportError> {
        match self.faults.get(&call.path) {
            Some(Fault::Offline) => {
                return Err(TransportError::NetworkFailure("connection refused".into()))
            }
            Some(Fault::Code(code)) => return Ok(Response::new(*code)),
            None => {}
        }

        let number = |name: &str| call.param(name).and_then(|v| v.parse::<usize>().ok());

        let code = match call.path.as_str() {
            "/state" | "/ping" => return Ok(Response::with_body(200, self.state_body())),
            "/select" => match (number("start"), number("end")) {
                (Some(start), Some(end)) => {
                    self.selection = Some(self.clamp(start, end));
                    self.dirty = false;
                    200
                }
                _ => 400,
            },
            "/set" => {
                if self.selection.is_none() {
                    409
                } else {
                    match call.param("hex") {
                        Some(hex) if hex.len() == 6 && hex::decode(hex).is_ok() => {
                            self.color = Some(hex.to_owned());
                            if let Some(lbright) = number("lbright") {
                                self.local_brightness = Some(lbright.min(255) as u8);
                            }
                            self.dirty = true;
                            200
                        }
                        _ => 400,
                    }
                }
            }
            "/lbright" => {
                if self.selection.is_none() {
                    409
                } else if let Some(value) = number("value") {
                    self.local_brightness = Some(value.min(255) as u8);
                    self.dirty = true;
                    200
                } else {
                    400
                }
            }
            "/brightness" => match number("value") {
                Some(value) => {
                    self.bright = value.min(255) as u8;
                    200
                }
                None => 400,
            },
            "/save" | "/load" => {
                self.selection = None;
                self.dirty = false;
                200
            }
            "/cancel" => {
                self.selection = None;
                self.dirty = false;
                self.color = None;
                self.local_brightness = None;
                200
            }
            "/blink" | "/reboot" => 200,
            _ => 404,
        };

        Ok(Response::new(code))
    }
}

/// Scripted transport backed by a [ControllerState]
pub fn fake_controller(
    num_leds: usize,
) -> (ScriptedTransport, std::sync::Arc<Mutex<ControllerState>>) {
    let state = std::sync::Arc::new(Mutex::new(ControllerState::new(num_leds)));

    let transport = ScriptedTransport::new({
        let state = state.clone();
        move |call| state.lock().unwrap().handle(call)
    });

    (transport, state)
}
