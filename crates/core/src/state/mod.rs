//! Named, typed slots shared between the producer and the renderer.
//!
//! Slots are declared once on a [`StateChannelBuilder`], which then splits
//! into a [`StateWriter`] and a [`StateReader`]. Writes replace the stored
//! text atomically per slot and never block. There is no atomicity across
//! slots: a reader can see one slot from the latest producer tick and another
//! from an earlier one. Consumers are expected to handle such torn snapshots,
//! and [`ChannelSnapshot::is_torn`] reports when one happened.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwapOption;

use crate::{
    channel::{Channel, ChannelMap, FREQUENCY_COLOR},
    palette::Color,
    Result, SoundPainterError,
};

/// Grammar a slot's values must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSyntax {
    /// `*`, any text.
    Universal,
    /// `<color>`.
    Color,
}

impl ValueSyntax {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueSyntax::Universal => "*",
            ValueSyntax::Color => "<color>",
        }
    }

    fn accepts(self, value: &str) -> bool {
        match self {
            ValueSyntax::Universal => true,
            ValueSyntax::Color => value.parse::<Color>().is_ok(),
        }
    }
}

impl FromStr for ValueSyntax {
    type Err = SoundPainterError;

    fn from_str(text: &str) -> Result<Self> {
        match text.trim() {
            "*" => Ok(ValueSyntax::Universal),
            "<color>" => Ok(ValueSyntax::Color),
            other => Err(SoundPainterError::msg(format!(
                "unsupported value syntax `{other}`"
            ))),
        }
    }
}

impl fmt::Display for ValueSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    pub name: String,
    pub syntax: ValueSyntax,
    /// Recorded for completeness; slots have no parent context to inherit from.
    pub inherits: bool,
    pub initial_value: Option<String>,
}

/// A slot value together with the write that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    /// Number of writes the slot had seen; zero means the initial value.
    pub version: u64,
}

struct Slot {
    descriptor: SlotDescriptor,
    current: ArcSwapOption<String>,
    version: AtomicU64,
}

struct Slots {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl Slots {
    fn get(&self, key: &str) -> Option<&Slot> {
        self.index.get(key).map(|&i| &self.slots[i])
    }
}

/// Collects slot declarations before the channel is split into handles.
#[derive(Default)]
pub struct StateChannelBuilder {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl StateChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a slot. Each key may be declared once.
    pub fn declare(
        &mut self,
        key: &str,
        syntax: ValueSyntax,
        inherits: bool,
        initial_value: Option<&str>,
    ) -> Result<&mut Self> {
        if self.index.contains_key(key) {
            return Err(SoundPainterError::DuplicateSlot(key.to_string()));
        }
        if let Some(initial) = initial_value {
            if !syntax.accepts(initial) {
                return Err(SoundPainterError::SyntaxMismatch {
                    key: key.to_string(),
                    syntax: syntax.as_str(),
                    value: initial.to_string(),
                });
            }
        }

        self.index.insert(key.to_string(), self.slots.len());
        self.slots.push(Slot {
            descriptor: SlotDescriptor {
                name: key.to_string(),
                syntax,
                inherits,
                initial_value: initial_value.map(str::to_string),
            },
            current: ArcSwapOption::empty(),
            version: AtomicU64::new(0),
        });
        tracing::debug!(key, syntax = syntax.as_str(), "declared state slot");
        Ok(self)
    }

    pub fn build(self) -> (StateWriter, StateReader) {
        let shared = Arc::new(Slots {
            slots: self.slots,
            index: self.index,
        });
        (
            StateWriter {
                shared: shared.clone(),
            },
            StateReader { shared },
        )
    }
}

/// Producer-side handle.
#[derive(Clone)]
pub struct StateWriter {
    shared: Arc<Slots>,
}

impl StateWriter {
    /// Replaces the slot's value and returns its new version.
    pub fn write(&self, key: &str, value: impl Into<String>) -> Result<u64> {
        let slot = self
            .shared
            .get(key)
            .ok_or_else(|| SoundPainterError::UnknownSlot(key.to_string()))?;
        let value = value.into();
        let syntax = slot.descriptor.syntax;
        if !syntax.accepts(&value) {
            return Err(SoundPainterError::SyntaxMismatch {
                key: key.to_string(),
                syntax: syntax.as_str(),
                value,
            });
        }

        slot.current.store(Some(Arc::new(value)));
        Ok(slot.version.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// Consumer-side handle. Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct StateReader {
    shared: Arc<Slots>,
}

impl StateReader {
    pub fn is_declared(&self, key: &str) -> bool {
        self.shared.get(key).is_some()
    }

    pub fn descriptor(&self, key: &str) -> Option<&SlotDescriptor> {
        self.shared.get(key).map(|slot| &slot.descriptor)
    }

    /// Latest value, or the declared initial value before the first write.
    /// Undeclared keys read as `None`.
    pub fn read(&self, key: &str) -> Option<String> {
        self.read_versioned(key).and_then(|versioned| versioned.value)
    }

    pub fn read_versioned(&self, key: &str) -> Option<Versioned<Option<String>>> {
        let slot = self.shared.get(key)?;
        // The version may run ahead of the loaded value by one concurrent
        // write; it is diagnostic only.
        let version = slot.version.load(Ordering::Acquire);
        let value = match slot.current.load_full() {
            Some(text) => Some(text.as_ref().clone()),
            None => slot.descriptor.initial_value.clone(),
        };
        Some(Versioned { value, version })
    }

    pub fn channel_snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot::capture(self)
    }
}

impl fmt::Debug for StateWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateWriter")
            .field("slots", &self.shared.slots.len())
            .finish()
    }
}

impl fmt::Debug for StateReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateReader")
            .field("slots", &self.shared.slots.len())
            .finish()
    }
}

/// Everything a paint cycle reads, captured slot by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSnapshot {
    /// Serialized amplitudes per channel; `None` when absent.
    pub amplitudes: ChannelMap<Option<String>>,
    pub dominant_color: Option<String>,
    pub versions: ChannelMap<u64>,
    pub color_version: u64,
}

impl ChannelSnapshot {
    pub fn capture(reader: &StateReader) -> Self {
        let mut snapshot = Self::default();
        for channel in Channel::ALL {
            if let Some(read) = reader.read_versioned(channel.slot_key()) {
                snapshot.amplitudes[channel] = read.value;
                snapshot.versions[channel] = read.version;
            }
        }
        if let Some(read) = reader.read_versioned(FREQUENCY_COLOR) {
            snapshot.dominant_color = read.value;
            snapshot.color_version = read.version;
        }
        snapshot
    }

    /// Whether the captured slots came from different producer ticks.
    pub fn is_torn(&self) -> bool {
        let first = self.versions[Channel::Left];
        self.versions.iter().any(|(_, version)| *version != first) || self.color_version != first
    }
}
