//! Segmentation of a channel set into fixed-duration windows
//!
//! The stream is split into `round(L / Ws)` windows of `Ws` samples, the last
//! one stretched or clipped so the segmentation always ends at the stream
//! end. Counts round half away from zero.

use std::ops::Range;
use wam_core::{config_error, ChannelId, ChannelSet, WamError, WamResult};

/// Default analysis window duration
pub const DEFAULT_WINDOW_SECONDS: f64 = 3.0;

/// Window length in samples: `round(fs * seconds)`
pub fn window_samples(sampling_rate: f64, seconds: f64) -> WamResult<usize> {
    let samples = (sampling_rate * seconds).round();
    if !samples.is_finite() || samples < 1.0 {
        return Err(config_error!(
            "a {seconds} s window at {sampling_rate} Hz holds no samples"
        ));
    }
    Ok(samples as usize)
}

/// Partition `[0, stream_len)` into ordered half-open ranges.
///
/// Fails with `InsufficientData` when the stream is shorter than one window.
pub fn segment(stream_len: usize, window_samples: usize) -> WamResult<Vec<Range<usize>>> {
    if window_samples == 0 {
        return Err(config_error!("window length must be at least one sample"));
    }
    if stream_len < window_samples {
        return Err(WamError::InsufficientData {
            required: window_samples,
            actual: stream_len,
            context: "segmentation into windows",
        });
    }

    let total = (stream_len as f64 / window_samples as f64).round() as usize;
    Ok((0..total)
        .map(|i| {
            let start = i * window_samples;
            let end = if i + 1 == total {
                stream_len
            } else {
                start + window_samples
            };
            start..end
        })
        .collect())
}

/// One analysis window: an index range over a channel set
#[derive(Debug, Clone)]
pub struct Window<'a> {
    index: usize,
    range: Range<usize>,
    channels: &'a ChannelSet,
}

impl<'a> Window<'a> {
    /// Zero-based chronological index
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn sampling_rate(&self) -> f64 {
        self.channels.sampling_rate()
    }

    /// Slice of one channel covered by this window
    pub fn samples(&self, id: &ChannelId) -> WamResult<&'a [f64]> {
        Ok(&self.channels.samples(id)?[self.range.clone()])
    }
}

/// Restartable, ordered segmentation of a channel set
#[derive(Debug, Clone)]
pub struct Segmentation<'a> {
    channels: &'a ChannelSet,
    ranges: Vec<Range<usize>>,
}

impl<'a> Segmentation<'a> {
    /// Segment a channel set into windows of `seconds`
    pub fn new(channels: &'a ChannelSet, seconds: f64) -> WamResult<Self> {
        let ws = window_samples(channels.sampling_rate(), seconds)?;
        let ranges = segment(channels.len(), ws)?;
        Ok(Segmentation { channels, ranges })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn window(&self, index: usize) -> Option<Window<'a>> {
        self.ranges.get(index).map(|range| Window {
            index,
            range: range.clone(),
            channels: self.channels,
        })
    }

    /// Windows in chronological order; each call starts from the beginning
    pub fn windows(&self) -> impl Iterator<Item = Window<'a>> + '_ {
        (0..self.ranges.len()).filter_map(move |i| self.window(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wam_core::{Axis, Channel};

    #[test]
    fn test_reference_segmentation() {
        let ws = window_samples(100.0, 3.0).unwrap();
        assert_eq!(ws, 300);
        assert_eq!(segment(1000, ws).unwrap(), vec![0..300, 300..600, 600..1000]);
    }

    #[test]
    fn test_rounding_clips_last_window() {
        // 1000 / 400 = 2.5 rounds up to 3; the last window is only 200 long.
        assert_eq!(segment(1000, 400).unwrap(), vec![0..400, 400..800, 800..1000]);
        assert_eq!(segment(1190, 400).unwrap().len(), 3);
        // 1300 / 400 = 3.25 rounds down; the last window absorbs 100 extra.
        assert_eq!(segment(1300, 400).unwrap().last(), Some(&(800..1300)));
    }

    #[test]
    fn test_short_stream() {
        let err = segment(299, 300).unwrap_err();
        assert!(matches!(err, WamError::InsufficientData { required: 300, actual: 299, .. }));
        assert_eq!(segment(300, 300).unwrap(), vec![0..300]);
    }

    #[test]
    fn test_window_samples_rounding() {
        assert_eq!(window_samples(128.0, 3.0).unwrap(), 384);
        assert_eq!(window_samples(30.5, 3.0).unwrap(), 92);
        assert!(window_samples(100.0, 0.0).is_err());
        assert!(window_samples(100.0, f64::NAN).is_err());
    }

    #[test]
    fn test_window_views() {
        let set = ChannelSet::new(
            2.0,
            vec![Channel::new(
                ChannelId::Axis(Axis::X),
                (0..20).map(f64::from).collect(),
            )],
        )
        .unwrap();
        let segmentation = Segmentation::new(&set, 3.0).unwrap();
        assert_eq!(segmentation.len(), 3);

        let windows: Vec<_> = segmentation.windows().collect();
        assert_eq!(windows[1].index(), 1);
        assert_eq!(
            windows[1].samples(&ChannelId::Axis(Axis::X)).unwrap(),
            &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]
        );
        assert_eq!(windows[2].len(), 8);

        // Restartable
        assert_eq!(segmentation.windows().count(), 3);
        assert!(windows[0].samples(&ChannelId::Axis(Axis::Y)).is_err());
    }

    proptest! {
        #[test]
        fn test_segments_partition_stream(ws in 1usize..500, extra in 0usize..5000) {
            let len = ws + extra;
            let ranges = segment(len, ws).unwrap();

            let expected = (len as f64 / ws as f64).round() as usize;
            prop_assert_eq!(ranges.len(), expected);
            prop_assert_eq!(ranges[0].start, 0);
            prop_assert_eq!(ranges.last().unwrap().end, len);
            for pair in ranges.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
                prop_assert_eq!(pair[0].len(), ws);
            }
            for range in &ranges {
                prop_assert!(!range.is_empty());
            }
        }
    }
}
