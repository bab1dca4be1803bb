//! Channel tags, per-channel records and the textual sample codec shared by
//! the producer and the renderer.

use std::{
    fmt::{self, Write},
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

/// Slot carrying the color derived from the dominant frequency.
pub const FREQUENCY_COLOR: &str = "--frequency-color";

/// One analysed signal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Left,
    Right,
    /// The full, unsplit mix.
    Center,
}

impl Channel {
    /// Order in which the producer publishes.
    pub const ALL: [Channel; 3] = [Channel::Left, Channel::Right, Channel::Center];

    /// Order in which the renderer stacks lanes.
    pub const DRAW_ORDER: [Channel; 3] = [Channel::Left, Channel::Center, Channel::Right];

    /// Name of the state slot holding this channel's amplitude text.
    pub fn slot_key(self) -> &'static str {
        match self {
            Channel::Left => "--channel-l",
            Channel::Right => "--channel-r",
            Channel::Center => "--stereo",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Left => "left",
            Channel::Right => "right",
            Channel::Center => "center",
        };
        f.write_str(name)
    }
}

/// Record holding exactly one value per [`Channel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMap<T> {
    left: T,
    right: T,
    center: T,
}

impl<T> ChannelMap<T> {
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self {
            left: f(Channel::Left),
            right: f(Channel::Right),
            center: f(Channel::Center),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Channel) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            left: f(Channel::Left)?,
            right: f(Channel::Right)?,
            center: f(Channel::Center)?,
        })
    }

    pub fn map<U>(self, mut f: impl FnMut(Channel, T) -> U) -> ChannelMap<U> {
        ChannelMap {
            left: f(Channel::Left, self.left),
            right: f(Channel::Right, self.right),
            center: f(Channel::Center, self.center),
        }
    }

    /// Iterates in [`Channel::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().map(move |channel| (channel, &self[channel]))
    }
}

impl<T> Index<Channel> for ChannelMap<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
            Channel::Center => &self.center,
        }
    }
}

impl<T> IndexMut<Channel> for ChannelMap<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        match channel {
            Channel::Left => &mut self.left,
            Channel::Right => &mut self.right,
            Channel::Center => &mut self.center,
        }
    }
}

/// Value substituted for non-finite or unparsable samples.
///
/// Deployments pick one policy and use it on both sides of the state
/// channel; the two variants are not interchangeable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    #[default]
    Zero,
    NegativeOne,
}

impl Sentinel {
    pub fn value(self) -> f32 {
        match self {
            Sentinel::Zero => 0.0,
            Sentinel::NegativeOne => -1.0,
        }
    }

    pub fn normalize(self, value: f32) -> f32 {
        if value.is_finite() {
            value
        } else {
            self.value()
        }
    }

    pub fn normalize_slice(self, values: &mut [f32]) {
        for value in values {
            *value = self.normalize(*value);
        }
    }
}

/// Serializes samples as comma-joined decimals.
pub fn encode_samples(samples: &[f32]) -> String {
    let mut text = String::with_capacity(samples.len() * 8);
    for (index, sample) in samples.iter().enumerate() {
        if index > 0 {
            text.push(',');
        }
        // Writing into a String cannot fail.
        let _ = if sample.is_nan() {
            text.write_str("NaN")
        } else if sample.is_infinite() {
            text.write_str(if *sample > 0.0 { "Infinity" } else { "-Infinity" })
        } else {
            write!(text, "{sample}")
        };
    }
    text
}

/// Parses the text written by [`encode_samples`].
///
/// Non-finite and malformed tokens both collapse to `sentinel`; blank text
/// yields no samples.
pub fn decode_samples(text: &str, sentinel: Sentinel) -> Vec<f32> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    text.split(',')
        .map(|token| {
            token
                .trim()
                .parse::<f32>()
                .map(|value| sentinel.normalize(value))
                .unwrap_or(sentinel.value())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_map_indexes_every_channel() {
        let mut map = ChannelMap::from_fn(|channel| channel.slot_key().len());
        map[Channel::Center] = 0;

        let keys: Vec<_> = map.iter().map(|(channel, _)| channel).collect();
        assert_eq!(keys, Channel::ALL);
        assert_eq!(map[Channel::Left], "--channel-l".len());
        assert_eq!(map[Channel::Center], 0);
    }

    #[test]
    fn encodes_non_finite_values_textually() {
        let text = encode_samples(&[0.5, f32::NEG_INFINITY, f32::NAN, -1.0]);
        assert_eq!(text, "0.5,-Infinity,NaN,-1");
    }

    #[test]
    fn decode_collapses_bad_tokens_to_sentinel() {
        let decoded = decode_samples("0.25, Infinity,abc,,-0.5", Sentinel::NegativeOne);
        assert_eq!(decoded, vec![0.25, -1.0, -1.0, -1.0, -0.5]);

        let decoded = decode_samples("NaN,1", Sentinel::Zero);
        assert_eq!(decoded, vec![0.0, 1.0]);
    }

    #[test]
    fn blank_text_decodes_to_nothing() {
        assert!(decode_samples("", Sentinel::Zero).is_empty());
        assert!(decode_samples("  ", Sentinel::Zero).is_empty());
    }

    #[test]
    fn normalizes_slices_in_place() {
        let mut values = [f32::INFINITY, 0.1, f32::NAN];
        Sentinel::NegativeOne.normalize_slice(&mut values);
        assert_eq!(values, [-1.0, 0.1, -1.0]);
    }
}
