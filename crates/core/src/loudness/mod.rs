//! Reference block-loudness measures for the producer side.
//!
//! The scope itself only sees one scalar per block. These helpers compute it
//! the way the plugin front-end does: RMS per channel, averaged over channels.
//! Both are allocation-free and safe to call on the audio thread.

/// Mean of the per-channel RMS levels of a planar block.
///
/// Empty blocks and blocks without channels measure `0.0`.
pub fn block_loudness<C: AsRef<[f32]>>(channels: &[C]) -> f32 {
    if channels.is_empty() {
        return 0.0;
    }
    let sum: f32 = channels.iter().map(|channel| rms(channel.as_ref())).sum();
    sum / channels.len() as f32
}

/// [`block_loudness`] for an interleaved buffer with `channels` lanes.
pub fn interleaved_loudness(samples: &[f32], channels: usize) -> f32 {
    if channels == 0 || samples.len() < channels {
        return 0.0;
    }
    let frames = samples.len() / channels;
    let mut total = 0.0;
    for lane in 0..channels {
        let sum_sq: f32 = samples
            .iter()
            .skip(lane)
            .step_by(channels)
            .take(frames)
            .map(|sample| sample * sample)
            .sum();
        total += (sum_sq / frames as f32).sqrt();
    }
    total / channels as f32
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}
