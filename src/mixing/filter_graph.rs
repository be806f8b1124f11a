//! ffmpeg `-filter_complex` graph that lays the jingle over the track start
//!
//! Input 0 is the primary track and input 1 the jingle. The graph:
//! `[1:a] atrim -> asetpts -> volume -> afade(out) -> [a1]`, then
//! `[0:a][a1] amix (duration=first) -> [m]`, so the output is exactly as long as the track.

use std::fmt;

use crate::config::MixSettings;

/// Label of the mixed stream, selected with `-map`
pub const MIXED_STREAM_LABEL: &str = "[m]";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntroFilterGraph {
    pub intro_duration: f64,
    pub fade_duration: f64,
    pub intro_volume: f64,
    pub dropout_transition: u32,
}

impl IntroFilterGraph {
    pub fn from_settings(settings: &MixSettings) -> Self {
        Self {
            intro_duration: settings.intro_duration,
            fade_duration: settings.fade_duration,
            intro_volume: settings.intro_volume,
            dropout_transition: settings.dropout_transition,
        }
    }

    /// Offset (seconds into the jingle) where the fade-out starts
    pub fn fade_start(&self) -> f64 {
        self.intro_duration - self.fade_duration
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

// f64 Display is the shortest exact decimal: 5.0 -> "5", 1.5 -> "1.5"
impl fmt::Display for IntroFilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[1:a]atrim=0:{intro},asetpts=PTS-STARTPTS,volume={volume},\
             afade=t=out:st={start}:d={fade}[a1];\
             [0:a][a1]amix=inputs=2:duration=first:dropout_transition={dropout}{label}",
            intro = self.intro_duration,
            volume = self.intro_volume,
            start = self.fade_start(),
            fade = self.fade_duration,
            dropout = self.dropout_transition,
            label = MIXED_STREAM_LABEL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_graph_text() {
        let graph = IntroFilterGraph::from_settings(&MixSettings::default());
        assert_eq!(
            graph.render(),
            "[1:a]atrim=0:5,asetpts=PTS-STARTPTS,volume=1.5,afade=t=out:st=3:d=2[a1];\
             [0:a][a1]amix=inputs=2:duration=first:dropout_transition=2[m]"
        );
    }

    #[test]
    fn test_fade_offset_is_intro_minus_fade() {
        let graph = IntroFilterGraph {
            intro_duration: 5.0,
            fade_duration: 2.0,
            intro_volume: 1.0,
            dropout_transition: 2,
        };
        assert_eq!(graph.fade_start(), 3.0);
        assert!(graph.render().contains("afade=t=out:st=3:d=2[a1]"));
    }

    #[test]
    fn test_fractional_values_not_truncated() {
        let graph = IntroFilterGraph {
            intro_duration: 7.5,
            fade_duration: 2.25,
            intro_volume: 0.35,
            dropout_transition: 2,
        };
        let text = graph.render();
        assert!(text.contains("atrim=0:7.5,"));
        assert!(text.contains("volume=0.35,"));
        assert!(text.contains("st=5.25:d=2.25"));
    }

    #[test]
    fn test_streams_referenced_by_position() {
        let text = IntroFilterGraph::from_settings(&MixSettings::default()).render();
        assert!(text.starts_with("[1:a]atrim"));
        assert!(text.contains(";[0:a][a1]amix=inputs=2"));
        assert!(text.ends_with(MIXED_STREAM_LABEL));
    }
}
