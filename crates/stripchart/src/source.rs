//! Synthetic multi-channel signal for the viewer.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Channel {
    name: String,
    frequency: f32,
    phase: f32,
}

/// Noisy sine waves, one per channel, sampled at a fixed rate.
pub struct SignalSource {
    channels: Vec<Channel>,
    sample_rate: f32,
    /// Fractional samples carried between ticks.
    carry: f32,
    /// Samples emitted so far per channel.
    emitted: u64,
    noise: f32,
    rng: StdRng,
}

impl SignalSource {
    pub fn new(channels: usize, sample_rate: f32) -> Self {
        Self::with_rng(channels, sample_rate, StdRng::from_os_rng())
    }

    fn with_rng(channels: usize, sample_rate: f32, mut rng: StdRng) -> Self {
        let channels = (0..channels)
            .map(|i| Channel {
                name: format!("CH{}", i + 1),
                frequency: 0.5 + i as f32 * 0.35,
                phase: rng.random_range(0.0..std::f32::consts::TAU),
            })
            .collect();
        Self {
            channels,
            sample_rate: sample_rate.max(0.0),
            carry: 0.0,
            emitted: 0,
            noise: 0.08,
            rng,
        }
    }

    /// Samples due after `elapsed`, per channel in channel order. Channels
    /// with nothing due are left out.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<(String, Vec<f32>)> {
        let due = self.carry + elapsed.as_secs_f32() * self.sample_rate;
        let count = due.floor() as u64;
        self.carry = due - count as f32;
        if count == 0 {
            return Vec::new();
        }

        let start = self.emitted;
        self.emitted += count;
        let rate = self.sample_rate;
        let noise = self.noise;
        let rng = &mut self.rng;

        self.channels
            .iter()
            .map(|channel| {
                let samples = (start..start + count)
                    .map(|n| {
                        let t = n as f32 / rate;
                        let wave = (std::f32::consts::TAU * channel.frequency * t + channel.phase).sin();
                        0.8 * wave + rng.random_range(-noise..=noise)
                    })
                    .collect();
                (channel.name.clone(), samples)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(channels: usize, rate: f32) -> SignalSource {
        SignalSource::with_rng(channels, rate, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_one_second_yields_sample_rate() {
        let mut source = source(3, 250.0);
        let batches = source.advance(Duration::from_secs(1));
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0, "CH1");
        assert_eq!(batches[2].0, "CH3");
        assert!(batches.iter().all(|(_, s)| s.len() == 250));
    }

    #[test]
    fn test_fractional_samples_carry_over() {
        let mut source = source(1, 250.0);
        // 10 ms at 250 Hz is 2.5 samples
        let total: usize = (0..100)
            .flat_map(|_| source.advance(Duration::from_millis(10)))
            .map(|(_, s)| s.len())
            .sum();
        assert!((249..=250).contains(&total));
    }

    #[test]
    fn test_short_tick_yields_nothing() {
        let mut source = source(2, 100.0);
        assert!(source.advance(Duration::from_millis(1)).is_empty());
    }

    #[test]
    fn test_samples_stay_in_range() {
        let mut source = source(4, 500.0);
        for (_, samples) in source.advance(Duration::from_secs(2)) {
            assert!(samples.iter().all(|v| v.abs() <= 0.8 + 0.08 + 1e-6));
        }
    }
}
