//! Animation descriptor (`meta.txt`) composition and parsing

use crate::bubble::{escape_line_breaks, BubbleConfig, BubblePlacement};
use crate::{Error, FrameSequence, Result};
use std::fmt::Write as _;

/// File name of the descriptor inside an animation folder
pub const META_FILE_NAME: &str = "meta.txt";

const FILETYPE: &str = "Flipper Animation";
const VERSION: u32 = 1;

/// Playback timing options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnimationSettings {
    /// How many times the active block repeats before returning to passive
    pub active_cycles: u32,
    /// Frames per second
    pub frame_rate: u32,
    /// Seconds before the pack cycles to the next animation
    pub duration: u32,
    /// Seconds before active frames can trigger again
    pub cooldown: u32,
    /// Frames reserved for the active block
    pub active_frames: u32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            active_cycles: 1,
            frame_rate: 4,
            duration: 3600,
            cooldown: 5,
            active_frames: 0,
        }
    }
}

impl AnimationSettings {
    /// Rejects zero for every timing field except `active_frames`
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("Active cycles", self.active_cycles),
            ("Frame rate", self.frame_rate),
            ("Duration", self.duration),
            ("Active cooldown", self.cooldown),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(Error::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl AnimationSettings {
    /// Loads settings from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Contents of a `meta.txt` descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMetadata {
    pub width: u32,
    pub height: u32,
    pub passive_frames: u32,
    pub settings: AnimationSettings,
    pub frame_order: Vec<u32>,
    pub bubble: Option<BubblePlacement>,
}

impl AnimationMetadata {
    /// Builds the descriptor for the frames packed so far. The bubble is only
    /// kept when its text is non-empty.
    pub fn compose(
        width: u32,
        height: u32,
        frames: &FrameSequence,
        settings: AnimationSettings,
        bubble: Option<&BubbleConfig>,
    ) -> Self {
        let passive_frames = frames.len() as u32;
        let bubble = bubble
            .filter(|b| b.is_active())
            .map(|b| b.place(passive_frames));

        Self {
            width,
            height,
            passive_frames,
            settings,
            frame_order: frames.order(),
            bubble,
        }
    }

    pub fn bubble_slots(&self) -> u32 {
        self.bubble.is_some() as u32
    }

    /// Renders the descriptor text
    pub fn render(&self) -> String {
        let mut out = String::new();
        let order = self
            .frame_order
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        // Writing into a String cannot fail
        let _ = writeln!(out, "Filetype: {FILETYPE}");
        let _ = writeln!(out, "Version: {VERSION}");
        out.push('\n');
        let _ = writeln!(out, "Width: {}", self.width);
        let _ = writeln!(out, "Height: {}", self.height);
        let _ = writeln!(out, "Passive frames: {}", self.passive_frames);
        let _ = writeln!(out, "Active frames: {}", self.settings.active_frames);
        let _ = writeln!(out, "Frames order: {order}");
        let _ = writeln!(out, "Active cycles: {}", self.settings.active_cycles);
        let _ = writeln!(out, "Frame rate: {}", self.settings.frame_rate);
        let _ = writeln!(out, "Duration: {}", self.settings.duration);
        let _ = writeln!(out, "Active cooldown: {}", self.settings.cooldown);
        out.push('\n');
        let _ = writeln!(out, "Bubble slots: {}", self.bubble_slots());

        if let Some(bubble) = &self.bubble {
            out.push('\n');
            let _ = writeln!(out, "Slot: 0");
            let _ = writeln!(out, "X: {}", bubble.x);
            let _ = writeln!(out, "Y: {}", bubble.y);
            let _ = writeln!(out, "Text: {}", escape_line_breaks(&bubble.text));
            let _ = writeln!(out, "AlignH: {}", bubble.align_h);
            let _ = writeln!(out, "AlignV: {}", bubble.align_v);
            let _ = writeln!(out, "StartFrame: {}", bubble.start_frame);
            let _ = writeln!(out, "EndFrame: {}", bubble.end_frame);
        }

        out
    }

    /// Parses descriptor text produced by [`render`](Self::render)
    pub fn parse(text: &str) -> Result<Self> {
        let fields = Fields::new(text.strip_prefix('\u{feff}').unwrap_or(text));

        let filetype = fields.get("Filetype")?.trim();
        if filetype != FILETYPE {
            return Err(Error::InvalidValue {
                key: "Filetype".to_string(),
                value: filetype.to_string(),
            });
        }
        let version: u32 = fields.number("Version")?;
        if version != VERSION {
            return Err(Error::InvalidValue {
                key: "Version".to_string(),
                value: version.to_string(),
            });
        }

        let frame_order = fields
            .get("Frames order")?
            .split_whitespace()
            .map(|index| parse_number("Frames order", index))
            .collect::<Result<Vec<u32>>>()?;

        let settings = AnimationSettings {
            active_cycles: fields.number("Active cycles")?,
            frame_rate: fields.number("Frame rate")?,
            duration: fields.number("Duration")?,
            cooldown: fields.number("Active cooldown")?,
            active_frames: fields.number("Active frames")?,
        };

        let bubble_slots: u32 = fields.number("Bubble slots")?;
        let bubble = if bubble_slots > 0 {
            Some(BubblePlacement {
                x: fields.number("X")?,
                y: fields.number("Y")?,
                text: fields.get("Text")?.to_string(),
                align_h: fields.get("AlignH")?.trim().parse()?,
                align_v: fields.get("AlignV")?.trim().parse()?,
                start_frame: fields.number("StartFrame")?,
                end_frame: fields.number("EndFrame")?,
            })
        } else {
            None
        };

        Ok(Self {
            width: fields.number("Width")?,
            height: fields.number("Height")?,
            passive_frames: fields.number("Passive frames")?,
            settings,
            frame_order,
            bubble,
        })
    }
}

/// `Key: value` lines in file order. Values keep everything after the single
/// space that follows the colon.
struct Fields<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim(), value.strip_prefix(' ').unwrap_or(value)))
            .collect();
        Self { entries }
    }

    fn get(&self, key: &'static str) -> Result<&'a str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or(Error::MissingKey(key))
    }

    fn number(&self, key: &'static str) -> Result<u32> {
        parse_number(key, self.get(key)?.trim())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value.parse().map_err(|_| Error::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bubble::{AlignH, AlignV, Locale};

    #[test]
    fn test_render_without_bubble() {
        let frames = FrameSequence::contiguous(3);
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), None);

        let expected = "Filetype: Flipper Animation\n\
                        Version: 1\n\
                        \n\
                        Width: 128\n\
                        Height: 64\n\
                        Passive frames: 3\n\
                        Active frames: 0\n\
                        Frames order: 0 1 2\n\
                        Active cycles: 1\n\
                        Frame rate: 4\n\
                        Duration: 3600\n\
                        Active cooldown: 5\n\
                        \n\
                        Bubble slots: 0\n";
        assert_eq!(meta.render(), expected);
    }

    #[test]
    fn test_render_with_bubble() {
        let frames = FrameSequence::contiguous(6);
        let settings = AnimationSettings {
            frame_rate: 8,
            ..AnimationSettings::default()
        };
        let bubble = BubbleConfig::new(Locale::BottomCenter, "Hello\\nworld");
        let meta = AnimationMetadata::compose(128, 64, &frames, settings, Some(&bubble));

        let text = meta.render();
        assert!(text.ends_with(
            "Bubble slots: 1\n\
             \n\
             Slot: 0\n\
             X: 10\n\
             Y: 37\n\
             Text: Hello\\nworld\n\
             AlignH: Center\n\
             AlignV: Top\n\
             StartFrame: 0\n\
             EndFrame: 6\n"
        ));
        assert!(text.contains("Frame rate: 8\n"));
    }

    #[test]
    fn test_empty_bubble_text_means_no_slot() {
        let frames = FrameSequence::contiguous(2);
        let bubble = BubbleConfig::new(Locale::TopLeft, "");
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), Some(&bubble));
        assert_eq!(meta.bubble_slots(), 0);
        assert!(!meta.render().contains("Slot: 0"));
    }

    #[test]
    fn test_zero_frames_with_bubble() {
        let frames = FrameSequence::new();
        let bubble = BubbleConfig::new(Locale::Center, "!");
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), Some(&bubble));
        let text = meta.render();
        assert!(text.contains("Passive frames: 0\n"));
        assert!(text.contains("Frames order: \n"));
        assert!(text.contains("StartFrame: 0\nEndFrame: 0\n"));
    }

    #[test]
    fn test_wraparound_order() {
        let mut frames = FrameSequence::with_wraparound();
        frames.next_index();
        frames.next_index();
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), None);
        assert_eq!(meta.passive_frames, 2);
        assert!(meta.render().contains("Frames order: 0 1 0\n"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let frames = FrameSequence::contiguous(4);
        let bubble = BubbleConfig::new(Locale::TopRight, "Hi").with_frames(1, 3);
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), Some(&bubble));

        let parsed = AnimationMetadata::parse(&meta.render()).unwrap();
        assert_eq!(parsed, meta);
        let placed = parsed.bubble.unwrap();
        assert_eq!(placed.align_h, AlignH::Left);
        assert_eq!(placed.align_v, AlignV::Bottom);
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let frames = FrameSequence::contiguous(1);
        let text = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), None).render();

        let err = AnimationMetadata::parse(&text.replace("Duration: 3600", "Duration: long")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref key, .. } if key == "Duration"));

        let err = AnimationMetadata::parse(&text.replace("Frame rate: 4\n", "")).unwrap_err();
        assert!(matches!(err, Error::MissingKey("Frame rate")));
    }

    #[test]
    fn test_real_line_breaks_stay_on_one_line() {
        let frames = FrameSequence::contiguous(2);
        let bubble = BubbleConfig::new(Locale::Center, "Hi\nAlignH: Left\r\nX: 99");
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), Some(&bubble));

        let text = meta.render();
        assert_eq!(text.lines().count(), 23);
        assert!(text.contains("Text: Hi\\nAlignH: Left\\nX: 99\n"));

        let parsed = AnimationMetadata::parse(&text).unwrap().bubble.unwrap();
        assert_eq!(parsed.align_h, AlignH::Center);
        assert_eq!(parsed.x, meta.bubble.unwrap().x);
        assert_eq!(parsed.text, "Hi\\nAlignH: Left\\nX: 99");
    }

    #[test]
    fn test_text_spacing_survives_parse() {
        let frames = FrameSequence::contiguous(1);
        let bubble = BubbleConfig::new(Locale::Center, "  two spaces  ");
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), Some(&bubble));

        let parsed = AnimationMetadata::parse(&meta.render()).unwrap();
        assert_eq!(parsed.bubble.unwrap().text, "  two spaces  ");
    }

    #[test]
    fn test_settings_validate() {
        assert!(AnimationSettings::default().validate().is_ok());

        let settings = AnimationSettings {
            active_frames: 0,
            ..AnimationSettings::default()
        };
        assert!(settings.validate().is_ok());

        for zeroed in [
            AnimationSettings { active_cycles: 0, ..AnimationSettings::default() },
            AnimationSettings { frame_rate: 0, ..AnimationSettings::default() },
            AnimationSettings { duration: 0, ..AnimationSettings::default() },
            AnimationSettings { cooldown: 0, ..AnimationSettings::default() },
        ] {
            assert!(matches!(zeroed.validate(), Err(Error::InvalidValue { .. })));
        }

        let err = AnimationSettings { frame_rate: 0, ..AnimationSettings::default() }
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref key, .. } if key == "Frame rate"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_settings_from_json() {
        let settings = AnimationSettings::from_json(r#"{ "frame_rate": 10, "cooldown": 30 }"#).unwrap();
        assert_eq!(settings.frame_rate, 10);
        assert_eq!(settings.cooldown, 30);
        assert_eq!(settings.duration, 3600);
    }
}
