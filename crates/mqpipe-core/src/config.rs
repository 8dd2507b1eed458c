//! Device topology configuration.
//!
//! The JSON schema is FairMQ-compatible: a root `fairMQOptions` object
//! holding device descriptors, each with channels and sockets. Both the
//! singular (`device`, `channel`, `socket`) and plural (`devices`,
//! `channels`, `sockets`) spellings are accepted and folded into the plural
//! model, and per-channel default fields are applied to socket entries that
//! omit them. Legacy files spell buffer sizes as JSON strings; the parser
//! accepts either and normalizes to integers.

use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Default send/receive buffer size when a socket omits it.
pub const DEFAULT_BUF_SIZE: u32 = 1000;

// ----------------------------------------------------------------------------
// Model
// ----------------------------------------------------------------------------

/// Top-level configuration of an mqpipe program.
///
/// The root-level `fer_id`, `fer_transport` and `fer_control` keys, when
/// present in the JSON document, override the corresponding command-line
/// flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    #[serde(rename = "fairMQOptions")]
    pub options: Options,
    /// Device id to select from the topology.
    #[serde(rename = "fer_id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Driver name ("zeromq", "nanomsg", ...).
    #[serde(rename = "fer_transport", skip_serializing_if = "String::is_empty")]
    pub transport: String,
    /// Control mode: "interactive" or "static".
    #[serde(rename = "fer_control", skip_serializing_if = "String::is_empty")]
    pub control: String,
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The normalized (plural-form) JSON rendering of this configuration.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The device descriptors of a topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Options {
    pub devices: Vec<Device>,
}

impl Options {
    /// Find the descriptor whose name matches `name`.
    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|dev| dev.name() == name)
    }
}

/// One device descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Device {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    pub channels: Vec<Channel>,
}

impl Device {
    /// The name of a device: its key when set, its id otherwise.
    pub fn name(&self) -> &str {
        if !self.key.is_empty() {
            &self.key
        } else {
            &self.id
        }
    }

    fn is_empty(&self) -> bool {
        self.id.is_empty() && self.channels.is_empty()
    }
}

/// One named channel of a device.
///
/// Per-channel default fields from the JSON form are already folded into the
/// socket entries; the resolved model carries complete sockets only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Channel {
    pub name: String,
    pub sockets: Vec<Socket>,
}

impl Channel {
    fn is_empty(&self) -> bool {
        self.name.is_empty() && self.sockets.is_empty()
    }
}

/// One socket endpoint of a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Socket {
    /// Socket type name (lowercase: "push", "pull", "pub", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// "bind" or "connect", case-insensitively.
    pub method: String,
    /// Endpoint address (`tcp://...`, `ipc://...`, `inproc://...`).
    pub address: String,
    #[serde(rename = "sndBufSize")]
    pub snd_buf_size: u32,
    #[serde(rename = "rcvBufSize")]
    pub rcv_buf_size: u32,
    #[serde(rename = "rateLogging")]
    pub rate_logging: u32,
}

impl Default for Socket {
    fn default() -> Self {
        Self {
            kind: String::new(),
            method: String::new(),
            address: String::new(),
            snd_buf_size: DEFAULT_BUF_SIZE,
            rcv_buf_size: DEFAULT_BUF_SIZE,
            rate_logging: 0,
        }
    }
}

// ----------------------------------------------------------------------------
// Deserialization (singular/plural folding, defaults, legacy values)
// ----------------------------------------------------------------------------

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "fairMQOptions", default)]
            options: Options,
            #[serde(rename = "fer_id", default)]
            id: String,
            #[serde(rename = "fer_transport", default)]
            transport: String,
            #[serde(rename = "fer_control", default)]
            control: String,
        }

        let raw = Raw::deserialize(de)?;
        Ok(Config {
            options: raw.options,
            id: raw.id,
            transport: raw.transport,
            control: raw.control,
        })
    }
}

impl<'de> Deserialize<'de> for Options {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            device: Option<Device>,
            #[serde(default)]
            devices: Vec<Device>,
        }

        let raw = Raw::deserialize(de)?;
        let mut devices = Vec::new();
        if let Some(dev) = raw.device {
            if !dev.is_empty() {
                devices.push(dev);
            }
        }
        devices.extend(raw.devices);
        Ok(Options { devices })
    }
}

impl<'de> Deserialize<'de> for Device {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            id: String,
            #[serde(default)]
            key: String,
            #[serde(default)]
            channel: Option<Channel>,
            #[serde(default)]
            channels: Vec<Channel>,
        }

        let raw = Raw::deserialize(de)?;
        let mut channels = Vec::new();
        if let Some(ch) = raw.channel {
            if !ch.is_empty() {
                channels.push(ch);
            }
        }
        channels.extend(raw.channels);
        Ok(Device {
            id: raw.id,
            key: raw.key,
            channels,
        })
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            name: String,
            #[serde(default)]
            socket: Option<RawSocket>,
            #[serde(default)]
            sockets: Vec<RawSocket>,

            // Per-channel defaults applied to sockets that omit the field.
            #[serde(rename = "type", default)]
            kind: Option<String>,
            #[serde(default)]
            method: Option<String>,
            #[serde(default)]
            address: Option<String>,
            #[serde(rename = "sndBufSize", default, deserialize_with = "de_opt_size")]
            snd_buf_size: Option<u32>,
            #[serde(rename = "rcvBufSize", default, deserialize_with = "de_opt_size")]
            rcv_buf_size: Option<u32>,
            #[serde(rename = "rateLogging", default, deserialize_with = "de_opt_size")]
            rate_logging: Option<u32>,
        }

        let raw = Raw::deserialize(de)?;
        let mut raw_sockets = Vec::new();
        raw_sockets.extend(raw.socket);
        raw_sockets.extend(raw.sockets);

        let sockets = raw_sockets
            .into_iter()
            .map(|sck| Socket {
                kind: sck.kind.or_else(|| raw.kind.clone()).unwrap_or_default(),
                method: sck.method.or_else(|| raw.method.clone()).unwrap_or_default(),
                address: sck
                    .address
                    .or_else(|| raw.address.clone())
                    .unwrap_or_default(),
                snd_buf_size: sck
                    .snd_buf_size
                    .or(raw.snd_buf_size)
                    .unwrap_or(DEFAULT_BUF_SIZE),
                rcv_buf_size: sck
                    .rcv_buf_size
                    .or(raw.rcv_buf_size)
                    .unwrap_or(DEFAULT_BUF_SIZE),
                rate_logging: sck.rate_logging.or(raw.rate_logging).unwrap_or(0),
            })
            .collect();

        Ok(Channel {
            name: raw.name,
            sockets,
        })
    }
}

#[derive(Deserialize)]
struct RawSocket {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(rename = "sndBufSize", default, deserialize_with = "de_opt_size")]
    snd_buf_size: Option<u32>,
    #[serde(rename = "rcvBufSize", default, deserialize_with = "de_opt_size")]
    rcv_buf_size: Option<u32>,
    #[serde(rename = "rateLogging", default, deserialize_with = "de_opt_size")]
    rate_logging: Option<u32>,
}

/// Accept an integer or a legacy string-spelled integer.
fn de_opt_size<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Int(u32),
        Str(String),
    }

    match Size::deserialize(de)? {
        Size::Int(v) => Ok(Some(v)),
        Size::Str(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid buffer size {s:?}"))),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name_prefers_key() {
        let dev = Device {
            id: "id-1".into(),
            key: "key-1".into(),
            channels: Vec::new(),
        };
        assert_eq!(dev.name(), "key-1");

        let dev = Device {
            id: "id-1".into(),
            ..Default::default()
        };
        assert_eq!(dev.name(), "id-1");
    }

    #[test]
    fn test_legacy_string_buffer_sizes() {
        let cfg = Config::from_json(
            r#"{
            "fairMQOptions": {
                "device": {
                    "id": "sampler1",
                    "channel": {
                        "name": "data1",
                        "socket": {
                            "type": "push",
                            "method": "bind",
                            "address": "tcp://*:5555",
                            "sndBufSize": "2000",
                            "rcvBufSize": 500,
                            "rateLogging": "0"
                        }
                    }
                }
            }
        }"#,
        )
        .unwrap();

        let sck = &cfg.options.devices[0].channels[0].sockets[0];
        assert_eq!(sck.snd_buf_size, 2000);
        assert_eq!(sck.rcv_buf_size, 500);
        assert_eq!(sck.rate_logging, 0);
    }

    #[test]
    fn test_buffer_size_defaults() {
        let cfg = Config::from_json(
            r#"{
            "fairMQOptions": {
                "device": {
                    "id": "d",
                    "channel": {
                        "name": "c",
                        "socket": {"type": "pull", "method": "connect", "address": "tcp://localhost:5555"}
                    }
                }
            }
        }"#,
        )
        .unwrap();

        let sck = &cfg.options.devices[0].channels[0].sockets[0];
        assert_eq!(sck.snd_buf_size, DEFAULT_BUF_SIZE);
        assert_eq!(sck.rcv_buf_size, DEFAULT_BUF_SIZE);
    }

    #[test]
    fn test_root_overrides() {
        let cfg = Config::from_json(
            r#"{
            "fer_id": "sink1",
            "fer_transport": "nanomsg",
            "fer_control": "static",
            "fairMQOptions": {"devices": []}
        }"#,
        )
        .unwrap();

        assert_eq!(cfg.id, "sink1");
        assert_eq!(cfg.transport, "nanomsg");
        assert_eq!(cfg.control, "static");
    }

    #[test]
    fn test_device_lookup() {
        let cfg = Config::from_json(
            r#"{
            "fairMQOptions": {
                "devices": [
                    {"id": "sampler1", "channels": []},
                    {"key": "processor", "channels": []}
                ]
            }
        }"#,
        )
        .unwrap();

        assert!(cfg.options.device("sampler1").is_some());
        assert!(cfg.options.device("processor").is_some());
        assert!(cfg.options.device("missing").is_none());
    }

    #[test]
    fn test_invalid_buffer_size_rejected() {
        let res = Config::from_json(
            r#"{
            "fairMQOptions": {
                "device": {
                    "id": "d",
                    "channel": {
                        "name": "c",
                        "socket": {"type": "pull", "sndBufSize": "lots"}
                    }
                }
            }
        }"#,
        );
        assert!(res.is_err());
    }
}
