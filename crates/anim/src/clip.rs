use biomekit_render::{AnimationClip, MorphTrack};

/// Playback state binding one clip track to one primitive.
///
/// Created lazily on the first animated tick and left playing afterwards.
/// Clip time wraps at the clip's duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipAction {
    track: usize,
    playing: bool,
}

impl ClipAction {
    pub fn new(track: usize) -> Self {
        Self {
            track,
            playing: false,
        }
    }

    pub fn track(&self) -> usize {
        self.track
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Evaluate the bound track at absolute `time` seconds into `out`.
    ///
    /// Returns false, leaving `out` untouched, when stopped or the track is missing or empty.
    pub fn sample(&self, clip: &AnimationClip, time: f64, out: &mut [f32]) -> bool {
        if !self.playing {
            return false;
        }
        let Some(track) = clip.tracks.get(self.track) else {
            return false;
        };
        let duration = f64::from(clip.duration);
        let local = if duration > 0.0 {
            time.rem_euclid(duration)
        } else {
            0.0
        };
        sample_track(track, local as f32, out)
    }
}

/// Linearly interpolate a morph track at local time `t`.
fn sample_track(track: &MorphTrack, t: f32, out: &mut [f32]) -> bool {
    let keys = track.times.len();
    let channels = track.channels;
    if keys == 0 || channels == 0 || track.values.len() < keys * channels {
        return false;
    }
    let n = channels.min(out.len());
    let frame = |k: usize| &track.values[k * channels..k * channels + n];

    if t <= track.times[0] {
        out[..n].copy_from_slice(frame(0));
        return true;
    }
    if t >= track.times[keys - 1] {
        out[..n].copy_from_slice(frame(keys - 1));
        return true;
    }

    let next = track.times.partition_point(|&k| k <= t);
    let prev = next - 1;
    let span = track.times[next] - track.times[prev];
    let alpha = if span > 0.0 {
        (t - track.times[prev]) / span
    } else {
        0.0
    };
    let (a, b) = (frame(prev), frame(next));
    for c in 0..n {
        out[c] = a[c] + (b[c] - a[c]) * alpha;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> AnimationClip {
        AnimationClip {
            name: "sway".into(),
            duration: 2.0,
            tracks: vec![MorphTrack {
                part: "tree".into(),
                channels: 2,
                times: vec![0.0, 1.0, 2.0],
                values: vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0],
            }],
        }
    }

    fn playing() -> ClipAction {
        let mut action = ClipAction::new(0);
        action.play();
        action
    }

    #[test]
    fn stopped_action_does_nothing() {
        let action = ClipAction::new(0);
        let mut out = [9.0, 9.0];
        assert!(!action.sample(&clip(), 0.5, &mut out));
        assert_eq!(out, [9.0, 9.0]);
    }

    #[test]
    fn interpolates_between_keys() {
        let mut out = [0.0; 2];
        assert!(playing().sample(&clip(), 0.25, &mut out));
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);

        playing().sample(&clip(), 1.5, &mut out);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn repeat_wraps_time() {
        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        playing().sample(&clip(), 0.25, &mut a);
        playing().sample(&clip(), 4.25, &mut b);
        assert!((a[0] - b[0]).abs() < 1e-5);
        assert!((a[1] - b[1]).abs() < 1e-5);
    }

    #[test]
    fn negative_time_wraps_forward() {
        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        playing().sample(&clip(), -0.5, &mut a);
        playing().sample(&clip(), 1.5, &mut b);
        assert!((a[0] - b[0]).abs() < 1e-5);
        assert!((a[1] - b[1]).abs() < 1e-5);
    }

    #[test]
    fn missing_track_is_noop() {
        let action = {
            let mut a = ClipAction::new(3);
            a.play();
            a
        };
        let mut out = [5.0; 2];
        assert!(!action.sample(&clip(), 0.0, &mut out));
        assert_eq!(out, [5.0; 2]);
    }

    #[test]
    fn short_output_takes_prefix() {
        let mut out = [0.0; 1];
        assert!(playing().sample(&clip(), 1.0, &mut out));
        assert_eq!(out, [1.0]);
    }
}
