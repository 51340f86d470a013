//! Device session: the client's optimistic view of a controller
//!
//! The session tracks the LED count and brightness reported by the controller, the range the
//! user is working on and whether that range is claimed on the device, with or without an
//! unsaved preview. Every status change follows a successful response. Failed commands leave the
//! session untouched and are returned to the caller as a [SessionError].
//!
//! Brightness and color drags go through the [Dispatcher]. Their outcomes come back as
//! [Completion] values which the session applies when they are polled, on the caller's task.

use std::sync::Arc;

use strum::IntoEnumIterator;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::color::{self, Color, ColorSample};
use crate::config::DebounceSettings;
use crate::dispatcher::{Channel, Dispatcher};
use crate::endpoint::{Endpoint, EndpointError};
use crate::transport::{RequestRecord, Response, Transport, TransportError};

mod command;
pub use command::*;

mod selection;
pub use selection::*;

mod state;
pub use state::*;


#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0}")]
    InvalidAddress(#[from] EndpointError),
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("device rejected command with status {0}")]
    DeviceRejected(u16),
    #[error("device rejected the color value")]
    BadColor,
    #[error("no active selection on the device")]
    NoSelection,
    #[error("malformed state body")]
    MalformedState,
}

impl From<TransportError> for SessionError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::NetworkFailure(reason) | TransportError::Client(reason) => {
                Self::NetworkFailure(reason)
            }
        }
    }
}

/// Outcome of a debounced command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub channel: Channel,
    pub command: Command,
    pub result: Result<(), SessionError>,
    /// Controller the command was submitted to
    epoch: u64,
    /// Selection the command was submitted against
    generation: u64,
}

/// Send `command` and classify the response code
async fn execute<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Endpoint,
    command: &Command,
) -> Result<Response, SessionError> {
    let response = transport
        .request(endpoint, command.path(), &command.query())
        .await?;

    command.classify(response.code)?;
    Ok(response)
}

fn clamp_brightness(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

pub struct Session<T> {
    endpoint: Endpoint,
    transport: Arc<T>,
    dispatcher: Dispatcher,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    state: Option<DeviceState>,
    selection: Selection,
    draft: SelectionRange,
    local_brightness: Option<u8>,
    /// Bumped on every controller switch
    epoch: u64,
    /// Bumped on every acknowledged select, save, cancel and load
    generation: u64,
}

impl<T: Transport + 'static> Session<T> {
    pub fn new(endpoint: Endpoint, transport: Arc<T>, debounce: DebounceSettings) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            endpoint,
            transport,
            dispatcher: Dispatcher::new(debounce),
            completion_tx,
            completion_rx,
            state: None,
            selection: Selection::default(),
            draft: SelectionRange::default(),
            local_brightness: None,
            epoch: 0,
            generation: 0,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Point the session at another address
    ///
    /// A different controller starts unconnected, with nothing claimed.
    pub fn set_endpoint(&mut self, raw: &str) -> Result<(), SessionError> {
        let endpoint = Endpoint::resolve(raw)?;

        if endpoint != self.endpoint {
            info!(from = %self.endpoint, to = %endpoint, "switching controller");

            self.poll_completions();
            self.dispatcher.cancel_all();
            self.epoch += 1;
            self.generation += 1;
            self.endpoint = endpoint;
            self.state = None;
            self.selection.released();
            self.local_brightness = None;
        }

        Ok(())
    }

    /// `None` until the first successful [Session::refresh]
    pub fn state(&self) -> Option<&DeviceState> {
        self.state.as_ref()
    }

    pub fn num_leds(&self) -> Option<usize> {
        self.state.as_ref().map(|state| state.num_leds)
    }

    pub fn global_brightness(&self) -> Option<u8> {
        self.state.as_ref().map(|state| state.global_brightness)
    }

    pub fn local_brightness(&self) -> Option<u8> {
        self.local_brightness
    }

    pub fn status(&self) -> SelectionStatus {
        self.selection.status()
    }

    /// Range claimed on the device, if any
    pub fn selection(&self) -> Option<SelectionRange> {
        self.selection.range()
    }

    /// Range being edited, used when a command needs a selection and none is claimed
    pub fn draft(&self) -> SelectionRange {
        self.draft
    }

    pub fn set_bounds(&mut self, start: usize, end: usize) {
        self.draft = self
            .draft
            .with_start(start, self.num_leds())
            .with_end(end, self.num_leds());
    }

    pub fn last_request(&self) -> Option<RequestRecord> {
        self.transport.monitor().last()
    }

    async fn send(&self, command: &Command) -> Result<Response, SessionError> {
        let result = execute(&*self.transport, &self.endpoint, command).await;

        if let Err(error) = &result {
            warn!(path = command.path(), error = %error, "command failed");
        }

        result
    }

    /// Poll the controller status
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn refresh(&mut self) -> Result<&DeviceState, SessionError> {
        let response = self.send(&Command::State).await?;

        let state = response
            .body
            .as_deref()
            .and_then(DeviceState::parse)
            .ok_or(SessionError::MalformedState)?;

        debug!(
            num_leds = state.num_leds,
            bright = state.global_brightness,
            "refreshed state"
        );

        self.draft = self.draft.clamped(state.num_leds);
        self.selection.clamp(state.num_leds);

        Ok(&*self.state.insert(state))
    }

    /// Claim `range` on the device
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn select(
        &mut self,
        range: SelectionRange,
        blink: bool,
    ) -> Result<SelectionRange, SessionError> {
        let range = match self.num_leds() {
            Some(num_leds) => range.clamped(num_leds),
            None => range,
        };

        self.poll_completions();
        self.send(&Command::Select { range, blink }).await?;

        self.generation += 1;
        self.selection.claimed(range);
        self.draft = range;
        info!(range = %range, "selected");

        Ok(range)
    }

    /// Claim the draft range unless a range is already claimed
    async fn ensure_selection(&mut self) -> Result<(), SessionError> {
        if !self.selection.is_claimed() {
            debug!(range = %self.draft, "no selection, selecting draft range");
            self.select(self.draft, false).await?;
        }

        Ok(())
    }

    /// Preview `hex` on the claimed range
    ///
    /// `hex` may start with a `#` marker. The device validates the digits themselves.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn preview_hex(
        &mut self,
        hex: &str,
        local_brightness: Option<i32>,
    ) -> Result<(), SessionError> {
        self.ensure_selection().await?;

        let local_brightness = local_brightness.map(clamp_brightness);
        self.send(&Command::preview_hex(hex, local_brightness))
            .await?;

        self.selection.previewed();
        if local_brightness.is_some() {
            self.local_brightness = local_brightness;
        }

        Ok(())
    }

    pub async fn preview_color(&mut self, color: Color) -> Result<(), SessionError> {
        self.preview_hex(&color::to_hex(color), None).await
    }

    /// Debounced preview of a color being dragged
    pub async fn drag_color(&mut self, sample: ColorSample) -> Result<(), SessionError> {
        self.ensure_selection().await?;

        let hex = color::to_hex(sample.to_color());
        self.dispatch(Channel::Color, Command::preview_hex(&hex, None));
        Ok(())
    }

    /// Debounced local brightness of the claimed range
    pub fn set_local_brightness(&mut self, value: i32) -> Result<(), SessionError> {
        if !self.selection.is_claimed() {
            return Err(SessionError::NoSelection);
        }

        self.dispatch(
            Channel::LocalBrightness,
            Command::LocalBrightness(clamp_brightness(value)),
        );
        Ok(())
    }

    /// Debounced global brightness of the strip
    pub fn set_global_brightness(&mut self, value: i32) {
        self.dispatch(
            Channel::GlobalBrightness,
            Command::GlobalBrightness(clamp_brightness(value)),
        );
    }

    fn dispatch(&mut self, channel: Channel, command: Command) {
        let transport = self.transport.clone();
        let endpoint = self.endpoint.clone();
        let completion_tx = self.completion_tx.clone();
        let (epoch, generation) = (self.epoch, self.generation);

        self.dispatcher.submit(channel, command, move |command| async move {
            let result = execute(&*transport, &endpoint, &command)
                .await
                .map(|_| ());

            if let Err(error) = &result {
                warn!(path = command.path(), error = %error, "debounced command failed");
            }

            // The receiver lives as long as the session
            let _ = completion_tx.send(Completion {
                channel,
                command,
                result,
                epoch,
                generation,
            });
        });
    }

    fn apply(&mut self, completion: &Completion) {
        if completion.result.is_err() || completion.epoch != self.epoch {
            return;
        }

        // Previews sent before the last select, save, cancel or load do not mark the new
        // selection dirty
        let claimed =
            self.selection.is_claimed() && completion.generation == self.generation;

        match completion.command {
            Command::PreviewColor {
                local_brightness, ..
            } if claimed => {
                self.selection.previewed();
                if local_brightness.is_some() {
                    self.local_brightness = local_brightness;
                }
            }
            Command::LocalBrightness(value) if claimed => {
                self.selection.previewed();
                self.local_brightness = Some(value);
            }
            Command::GlobalBrightness(value) => {
                if let Some(state) = self.state.as_mut() {
                    state.global_brightness = value;
                }
            }
            _ => {}
        }
    }

    /// Apply every debounced outcome received so far
    pub fn poll_completions(&mut self) -> Vec<Completion> {
        let mut completions = Vec::new();

        while let Ok(completion) = self.completion_rx.try_recv() {
            self.apply(&completion);
            completions.push(completion);
        }

        completions
    }

    /// Wait for the next debounced outcome and apply it
    ///
    /// This waits forever if nothing was submitted.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let completion = self.completion_rx.recv().await?;
        self.apply(&completion);
        Some(completion)
    }

    /// true if no debounced command is scheduled or on the wire
    pub fn is_settled(&self) -> bool {
        Channel::iter().all(|channel| self.dispatcher.is_idle(channel))
    }

    /// Wait for every pending debounced command to run and apply the outcomes
    pub async fn flush(&mut self) -> Vec<Completion> {
        self.dispatcher.flush().await;
        self.poll_completions()
    }

    /// Persist the device's working state
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn save(&mut self) -> Result<(), SessionError> {
        self.poll_completions();
        self.send(&Command::Save).await?;

        self.generation += 1;
        self.selection.saved();
        info!("saved");
        Ok(())
    }

    /// Revert the device's working state and release the claimed range
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn cancel(&mut self) -> Result<(), SessionError> {
        self.poll_completions();
        self.send(&Command::Cancel).await?;

        self.generation += 1;
        self.selection.released();
        self.local_brightness = None;
        info!("cancelled");
        Ok(())
    }

    /// Flash `range` to identify it on the strip
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn blink(
        &self,
        range: SelectionRange,
        times: u32,
        ms: u32,
    ) -> Result<(), SessionError> {
        let range = match self.num_leds() {
            Some(num_leds) => range.clamped(num_leds),
            None => range,
        };

        self.send(&Command::blink(range, times, ms)).await?;
        Ok(())
    }

    /// Reload the scene saved on the device, dropping any claimed range
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn load(&mut self) -> Result<&DeviceState, SessionError> {
        self.poll_completions();
        self.send(&Command::Load).await?;

        self.generation += 1;
        self.selection.released();
        self.local_brightness = None;
        info!("loaded saved scene");

        self.refresh().await
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn reboot(&self) -> Result<(), SessionError> {
        self.send(&Command::Reboot).await?;
        Ok(())
    }
}
