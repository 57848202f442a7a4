//! Native JACK backend for Linux
//!
//! Registers one JACK port per bridge channel and runs the realtime adapter
//! inside the JACK process callback.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  in_NN ports   ┌──────────────────┐  rings   ┌──────────────────┐
//! │   JACK server    │───────────────►│  JACK RT thread  │◄────────►│ jackbridge-      │
//! │                  │◄───────────────│ (RealtimeAdapter)│          │ dispatch thread  │
//! └──────────────────┘  out_NN ports  └────────┬─────────┘          └──────────────────┘
//!                                              │ relaxed atomics + event queue
//!                                              ▼
//!                                     ┌──────────────────┐
//!                                     │   Main thread    │
//!                                     │ (RunningBridge)  │
//!                                     └──────────────────┘
//! ```

use std::sync::Arc;

use jack::{
    AsyncClient, AudioIn, AudioOut, Client, ClientOptions, ClientStatus, Control, Frames, Port,
    PortFlags, PortSpec, ProcessScope,
};

use super::error::{AudioError, AudioResult};
use crate::bridge::{
    self, CycleBuffers, DispatchSummary, Lifecycle, RealtimeAdapter, RunningBridge,
};
use crate::compute::ComputeEngine;
use crate::config::BridgeConfig;
use crate::types::{BlockShape, Direction, Sample};

/// A running bridge attached to a JACK server
///
/// Dropping it deactivates the client, then tears the bridge down.
pub struct JackBridge {
    /// Declared first so it is dropped (deactivated) before the bridge
    client: AsyncClient<JackNotifications, JackProcessor>,
    bridge: RunningBridge,
    client_name: String,
    sample_rate: usize,
}

impl JackBridge {
    /// Open a client, configure and start the bridge, register ports, activate
    ///
    /// The bridge adopts JACK's buffer size as its frames per cycle; a
    /// configured value that differs is a startup error.
    pub fn start<E: ComputeEngine + 'static>(config: &BridgeConfig, engine: E) -> AudioResult<Self> {
        // JACK may rename the client if the name is taken
        let (client, _status) = Client::new(&config.client_name, ClientOptions::NO_START_SERVER)
            .map_err(|e| AudioError::Client(e.to_string()))?;
        let client_name = client.name().to_string();
        let sample_rate = client.sample_rate();
        let buffer_size = client.buffer_size() as usize;

        log::info!(
            "JACK client '{}' created (sample rate: {}Hz, buffer: {} frames)",
            client_name,
            sample_rate,
            buffer_size
        );

        let configured = bridge::configure(config, buffer_size, engine)?;
        let shape = configured.context().shape();

        let (inputs, outputs) = match register_ports(&client, shape) {
            Ok(ports) => ports,
            Err(e) => {
                let _ = configured.close();
                return Err(e);
            }
        };

        let (adapter, running) = configured.start()?;
        let notifications = JackNotifications {
            lifecycle: running.lifecycle(),
        };
        let processor = JackProcessor {
            inputs,
            outputs,
            adapter,
        };

        // On failure `running` drops here and joins the dispatch thread
        let client = client
            .activate_async(notifications, processor)
            .map_err(|e| AudioError::Activation(e.to_string()))?;

        log::info!("JACK client activated");

        auto_connect(
            client.as_client(),
            &client_name,
            shape,
            config.input_connect.as_deref(),
            config.output_connect.as_deref(),
        );

        Ok(Self {
            client,
            bridge: running,
            client_name,
            sample_rate,
        })
    }

    /// Client name as granted by the server
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    pub fn shape(&self) -> BlockShape {
        self.bridge.shape()
    }

    /// One cycle of latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.shape().frames as f32 / self.sample_rate as f32) * 1000.0
    }

    pub fn bridge(&self) -> &RunningBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut RunningBridge {
        &mut self.bridge
    }

    /// Deactivate the client, then stop and join the dispatch thread
    pub fn close(self) -> AudioResult<DispatchSummary> {
        let Self { client, bridge, .. } = self;

        // Realtime callbacks stop before the rings go away
        let deactivated = client.deactivate().map(|_| ());
        let summary = bridge.shutdown()?;
        deactivated.map_err(|e| AudioError::Deactivation(e.to_string()))?;

        log::info!("JACK client closed");
        Ok(summary)
    }
}

impl std::fmt::Debug for JackBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JackBridge")
            .field("client_name", &self.client_name)
            .field("sample_rate", &self.sample_rate)
            .field("bridge", &self.bridge)
            .finish()
    }
}

fn register_ports(
    client: &Client,
    shape: BlockShape,
) -> AudioResult<(Vec<Port<AudioIn>>, Vec<Port<AudioOut>>)> {
    let inputs = (0..shape.inputs)
        .map(|ch| {
            let name = Direction::Input.port_name(ch);
            client
                .register_port(&name, AudioIn::default())
                .map_err(|e| AudioError::PortRegistration {
                    port: name,
                    reason: e.to_string(),
                })
        })
        .collect::<AudioResult<Vec<_>>>()?;

    let outputs = (0..shape.outputs)
        .map(|ch| {
            let name = Direction::Output.port_name(ch);
            client
                .register_port(&name, AudioOut::default())
                .map_err(|e| AudioError::PortRegistration {
                    port: name,
                    reason: e.to_string(),
                })
        })
        .collect::<AudioResult<Vec<_>>>()?;

    Ok((inputs, outputs))
}

/// JACK process handler
///
/// Owns the realtime adapter exclusively.
struct JackProcessor {
    inputs: Vec<Port<AudioIn>>,
    outputs: Vec<Port<AudioOut>>,
    adapter: RealtimeAdapter,
}

/// Port buffers of the current process cycle
struct JackCycle<'a> {
    inputs: &'a [Port<AudioIn>],
    outputs: &'a mut [Port<AudioOut>],
    ps: &'a ProcessScope,
}

impl CycleBuffers for JackCycle<'_> {
    fn input(&self, channel: usize) -> &[Sample] {
        self.inputs[channel].as_slice(self.ps)
    }

    fn output(&mut self, channel: usize) -> &mut [Sample] {
        self.outputs[channel].as_mut_slice(self.ps)
    }
}

impl jack::ProcessHandler for JackProcessor {
    fn process(&mut self, _client: &Client, ps: &ProcessScope) -> Control {
        let n_frames = ps.n_frames() as usize;
        let mut cycle = JackCycle {
            inputs: &self.inputs,
            outputs: &mut self.outputs,
            ps,
        };

        match self.adapter.process_cycle(n_frames, &mut cycle) {
            Ok(_) => Control::Continue,
            Err(_) => {
                for port in self.outputs.iter_mut() {
                    port.as_mut_slice(ps).fill(0.0);
                }
                Control::Quit
            }
        }
    }

    fn buffer_size(&mut self, _client: &Client, size: Frames) -> Control {
        if size as usize == self.adapter.frames_per_cycle() {
            Control::Continue
        } else {
            self.adapter.report_frame_mismatch(size as usize);
            Control::Quit
        }
    }
}

/// JACK notification handler
struct JackNotifications {
    lifecycle: Arc<Lifecycle>,
}

impl jack::NotificationHandler for JackNotifications {
    unsafe fn shutdown(&mut self, _status: ClientStatus, _reason: &str) {
        // Signal-handler context: atomics only
        self.lifecycle.request_shutdown();
    }

    fn sample_rate(&mut self, _client: &Client, srate: Frames) -> Control {
        log::info!("JACK sample rate changed to: {}", srate);
        Control::Continue
    }

    fn xrun(&mut self, _client: &Client) -> Control {
        log::warn!("JACK xrun detected");
        Control::Continue
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Port Connection
// ═══════════════════════════════════════════════════════════════════════════════

/// Connect our ports to another client's ports, channel by channel
///
/// `input_connect` names a client whose output ports feed our `in_NN` ports;
/// `output_connect` names a client whose input ports receive our `out_NN`
/// ports. Ports are paired in the server's order; extras on either side stay
/// unconnected. Failures are logged, never fatal.
pub fn auto_connect(
    client: &Client,
    own_name: &str,
    shape: BlockShape,
    input_connect: Option<&str>,
    output_connect: Option<&str>,
) {
    let audio_type = AudioIn::default().jack_port_type().to_string();

    if let Some(source) = input_connect {
        let sources = client.ports(
            Some(client_ports_pattern(source).as_str()),
            Some(audio_type.as_str()),
            PortFlags::IS_OUTPUT,
        );
        let ours = own_port_names(own_name, Direction::Input, shape.inputs);
        if sources.is_empty() {
            log::warn!("No audio output ports found on client '{}'", source);
        }
        for (theirs, mine) in sources.iter().zip(&ours) {
            match client.connect_ports_by_name(theirs, mine) {
                Ok(()) => log::info!("Connected {} -> {}", theirs, mine),
                Err(e) => log::warn!("Could not connect {} -> {}: {}", theirs, mine, e),
            }
        }
    }

    if let Some(sink) = output_connect {
        let sinks = client.ports(
            Some(client_ports_pattern(sink).as_str()),
            Some(audio_type.as_str()),
            PortFlags::IS_INPUT,
        );
        let ours = own_port_names(own_name, Direction::Output, shape.outputs);
        if sinks.is_empty() {
            log::warn!("No audio input ports found on client '{}'", sink);
        }
        for (mine, theirs) in ours.iter().zip(&sinks) {
            match client.connect_ports_by_name(mine, theirs) {
                Ok(()) => log::info!("Connected {} -> {}", mine, theirs),
                Err(e) => log::warn!("Could not connect {} -> {}: {}", mine, theirs, e),
            }
        }
    }
}

/// Full names of our ports in one direction (`client:in_01`, ...)
fn own_port_names(own_name: &str, direction: Direction, count: usize) -> Vec<String> {
    (0..count)
        .map(|ch| format!("{}:{}", own_name, direction.port_name(ch)))
        .collect()
}

/// Regex matching every port of one client
fn client_ports_pattern(client: &str) -> String {
    let mut pattern = String::with_capacity(client.len() + 2);
    pattern.push('^');
    for c in client.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push(':');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_pattern_escapes_regex_characters() {
        assert_eq!(client_ports_pattern("system"), "^system:");
        assert_eq!(client_ports_pattern("a.b (1)"), "^a\\.b \\(1\\):");
    }

    #[test]
    fn test_own_port_names() {
        assert_eq!(
            own_port_names("jackbridge-01", Direction::Output, 2),
            vec!["jackbridge-01:out_01", "jackbridge-01:out_02"]
        );
        assert!(own_port_names("x", Direction::Input, 0).is_empty());
    }
}
