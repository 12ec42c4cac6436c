// ── Radio settings ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// A radio band an access point can be tuned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum RadioBand {
    #[serde(rename = "band_24")]
    #[strum(serialize = "band_24")]
    Band24,
    #[serde(rename = "band_5")]
    #[strum(serialize = "band_5")]
    Band5,
    #[serde(rename = "band_6")]
    #[strum(serialize = "band_6")]
    Band6,
}

impl RadioBand {
    /// Valid channel numbers for this band.
    pub fn channels(self) -> std::ops::RangeInclusive<u16> {
        match self {
            Self::Band24 => 1..=14,
            Self::Band5 => 36..=177,
            Self::Band6 => 1..=233,
        }
    }

    /// Channel widths (MHz) this band supports.
    pub fn bandwidths(self) -> &'static [u16] {
        match self {
            Self::Band24 => &[20, 40],
            Self::Band5 | Self::Band6 => &[20, 40, 80, 160],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Band24 => "2.4 GHz",
            Self::Band5 => "5 GHz",
            Self::Band6 => "6 GHz",
        }
    }
}

/// Transmit power bounds, dBm.
pub const POWER_RANGE: std::ops::RangeInclusive<u8> = 1..=25;

/// Settings pushed to one band of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandRadio {
    pub channel: u16,
    /// Transmit power, dBm.
    pub power: u8,
    /// Channel width, MHz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u16>,
}

impl BandRadio {
    /// Check these settings against `band`, returning every problem found.
    pub fn problems(&self, band: RadioBand) -> Vec<String> {
        let mut problems = Vec::new();
        if !band.channels().contains(&self.channel) {
            problems.push(format!(
                "channel {} is not valid on {} ({}-{})",
                self.channel,
                band.label(),
                band.channels().start(),
                band.channels().end()
            ));
        }
        if !POWER_RANGE.contains(&self.power) {
            problems.push(format!(
                "power {} dBm is outside {}-{} dBm",
                self.power,
                POWER_RANGE.start(),
                POWER_RANGE.end()
            ));
        }
        if let Some(width) = self.bandwidth {
            if !band.bandwidths().contains(&width) {
                problems.push(format!(
                    "bandwidth {width} MHz is not supported on {}",
                    band.label()
                ));
            }
        }
        problems
    }
}

/// Per-band radio settings for one device. Unset bands are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_24: Option<BandRadio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_5: Option<BandRadio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_6: Option<BandRadio>,
}

impl RadioSpec {
    /// Configured bands in push order (2.4, 5, 6).
    pub fn bands(&self) -> impl Iterator<Item = (RadioBand, BandRadio)> + '_ {
        [
            (RadioBand::Band24, self.band_24),
            (RadioBand::Band5, self.band_5),
            (RadioBand::Band6, self.band_6),
        ]
        .into_iter()
        .filter_map(|(band, radio)| radio.map(|r| (band, r)))
    }

    pub fn is_empty(&self) -> bool {
        self.bands().next().is_none()
    }
}
