//! Speech bubble placement

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Literal two-character line break marker inside bubble text
pub const LINE_MARKER: &str = "\\n";

/// Upward shift per extra text line
pub const LINE_STEP_Y: u32 = 12;

/// Leftward shift per extra character
pub const CHAR_STEP_X: u32 = 6;

/// Replaces real line breaks with [`LINE_MARKER`] so the text stays on one
/// descriptor line
pub fn escape_line_breaks(text: &str) -> String {
    text.replace("\r\n", LINE_MARKER)
        .replace(['\r', '\n'], LINE_MARKER)
}

/// Horizontal alignment of the bubble relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignH {
    Left,
    Center,
    Right,
}

/// Vertical alignment of the bubble relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignV {
    Top,
    Center,
    Bottom,
}

impl fmt::Display for AlignH {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "Left",
            Self::Center => "Center",
            Self::Right => "Right",
        })
    }
}

impl fmt::Display for AlignV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "Top",
            Self::Center => "Center",
            Self::Bottom => "Bottom",
        })
    }
}

impl FromStr for AlignH {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Left" => Ok(Self::Left),
            "Center" => Ok(Self::Center),
            "Right" => Ok(Self::Right),
            _ => Err(Error::InvalidValue {
                key: "AlignH".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for AlignV {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Top" => Ok(Self::Top),
            "Center" => Ok(Self::Center),
            "Bottom" => Ok(Self::Bottom),
            _ => Err(Error::InvalidValue {
                key: "AlignV".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Named anchor position on the 128x64 screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    Center,
    BottomCenter,
    TopCenter,
    LeftCenter,
    RightCenter,
    BottomRight,
    TopRight,
    BottomLeft,
    TopLeft,
}

impl Locale {
    /// Parses a locale name. Unknown or empty names fall back to `Center`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bottomcenter" => Self::BottomCenter,
            "topcenter" => Self::TopCenter,
            "leftcenter" => Self::LeftCenter,
            "rightcenter" => Self::RightCenter,
            "bottomright" => Self::BottomRight,
            "topright" => Self::TopRight,
            "bottomleft" => Self::BottomLeft,
            "topleft" => Self::TopLeft,
            _ => Self::Center,
        }
    }

    /// Base anchor and alignment before text-size displacement
    pub fn anchor(self) -> (u32, u32, AlignH, AlignV) {
        match self {
            Self::Center => (64, 32, AlignH::Center, AlignV::Bottom),
            Self::BottomCenter => (64, 49, AlignH::Center, AlignV::Top),
            Self::TopCenter => (64, 0, AlignH::Center, AlignV::Bottom),
            Self::LeftCenter => (0, 32, AlignH::Right, AlignV::Center),
            Self::RightCenter => (115, 32, AlignH::Left, AlignV::Center),
            Self::BottomRight => (115, 49, AlignH::Left, AlignV::Top),
            Self::TopRight => (115, 0, AlignH::Left, AlignV::Bottom),
            Self::BottomLeft => (0, 49, AlignH::Right, AlignV::Top),
            Self::TopLeft => (0, 0, AlignH::Right, AlignV::Bottom),
        }
    }
}

/// User-supplied bubble request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BubbleConfig {
    pub locale: Locale,
    /// Bubble text; `\n` written as two literal characters starts a new line
    pub text: String,
    pub start_frame: u32,
    pub end_frame: u32,
}

impl BubbleConfig {
    pub fn new(locale: Locale, text: impl Into<String>) -> Self {
        Self {
            locale,
            text: text.into(),
            start_frame: 0,
            end_frame: 0,
        }
    }

    pub fn with_frames(mut self, start_frame: u32, end_frame: u32) -> Self {
        self.start_frame = start_frame;
        self.end_frame = end_frame;
        self
    }

    /// Whether a bubble slot should be emitted at all
    pub fn is_active(&self) -> bool {
        !self.text.is_empty()
    }

    /// Text as written to the descriptor, real line breaks turned into markers
    pub fn marked_text(&self) -> String {
        escape_line_breaks(&self.text)
    }

    /// Number of logical lines in the text
    pub fn line_count(&self) -> usize {
        self.marked_text().split(LINE_MARKER).count()
    }

    /// Number of characters in the text, line markers excluded
    pub fn char_count(&self) -> usize {
        self.marked_text()
            .split(LINE_MARKER)
            .map(|line| line.chars().count())
            .sum()
    }

    /// Resolves the final anchor for an animation of `frame_count` frames
    pub fn place(&self, frame_count: u32) -> BubblePlacement {
        let (base_x, base_y, align_h, align_v) = self.locale.anchor();

        let extra_lines = self.line_count().saturating_sub(1) as u32;
        let extra_chars = self.char_count().saturating_sub(1) as u32;
        let y = base_y.saturating_sub(extra_lines.saturating_mul(LINE_STEP_Y));
        let x = base_x.saturating_sub(extra_chars.saturating_mul(CHAR_STEP_X));

        let (start_frame, end_frame) = if self.start_frame == 0 && self.end_frame == 0 {
            (0, frame_count)
        } else {
            (self.start_frame, self.end_frame)
        };

        BubblePlacement {
            x,
            y,
            text: self.marked_text(),
            align_h,
            align_v,
            start_frame,
            end_frame,
        }
    }
}

/// Bubble slot as written to the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BubblePlacement {
    pub x: u32,
    pub y: u32,
    pub text: String,
    pub align_h: AlignH,
    pub align_v: AlignV,
    pub start_frame: u32,
    pub end_frame: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_table() {
        assert_eq!(Locale::parse("bottomcenter").anchor(), (64, 49, AlignH::Center, AlignV::Top));
        assert_eq!(Locale::parse("TopRight").anchor(), (115, 0, AlignH::Left, AlignV::Bottom));
        assert_eq!(Locale::parse("leftcenter").anchor(), (0, 32, AlignH::Right, AlignV::Center));
        assert_eq!(Locale::parse("topleft").anchor(), (0, 0, AlignH::Right, AlignV::Bottom));
    }

    #[test]
    fn test_unknown_locale_falls_back_to_center() {
        for name in ["", "middle", "top-center"] {
            let placement = BubbleConfig::new(Locale::parse(name), "A").place(4);
            assert_eq!((placement.x, placement.y), (64, 32));
            assert_eq!(placement.align_h, AlignH::Center);
            assert_eq!(placement.align_v, AlignV::Bottom);
        }
    }

    #[test]
    fn test_lines_shift_up() {
        let placement = BubbleConfig::new(Locale::BottomCenter, "one\\ntwo\\nthree").place(1);
        assert_eq!(placement.y, 25);

        let mut previous = u32::MAX;
        for lines in 1..8 {
            let text = vec!["x"; lines].join(LINE_MARKER);
            let y = BubbleConfig::new(Locale::BottomCenter, text).place(1).y;
            assert!(y <= previous);
            previous = y;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_chars_shift_left() {
        let placement = BubbleConfig::new(Locale::Center, "Hi").place(1);
        assert_eq!(placement.x, 58);

        // 19 extra characters overshoot the left edge
        let placement = BubbleConfig::new(Locale::RightCenter, "a".repeat(20)).place(1);
        assert_eq!(placement.x, 1);
        let placement = BubbleConfig::new(Locale::RightCenter, "a".repeat(21)).place(1);
        assert_eq!(placement.x, 0);

        let mut previous = u32::MAX;
        for len in 1..30 {
            let x = BubbleConfig::new(Locale::RightCenter, "a".repeat(len)).place(1).x;
            assert!(x <= previous);
            previous = x;
        }
    }

    #[test]
    fn test_markers_not_counted_as_chars() {
        let bubble = BubbleConfig::new(Locale::Center, "ab\\ncd");
        assert_eq!(bubble.line_count(), 2);
        assert_eq!(bubble.char_count(), 4);
        let placement = bubble.place(1);
        assert_eq!((placement.x, placement.y), (64 - 18, 20));
    }

    #[test]
    fn test_real_line_breaks_become_markers() {
        let bubble = BubbleConfig::new(Locale::BottomCenter, "one\ntwo\r\nthree");
        assert_eq!(bubble.marked_text(), "one\\ntwo\\nthree");
        assert_eq!(bubble.line_count(), 3);
        assert_eq!(bubble.char_count(), 11);

        let placement = bubble.place(1);
        assert_eq!(placement.text, "one\\ntwo\\nthree");
        assert_eq!(placement.y, 25);
    }

    #[test]
    fn test_frame_range_defaults() {
        let placement = BubbleConfig::new(Locale::Center, "Hey").place(12);
        assert_eq!((placement.start_frame, placement.end_frame), (0, 12));

        let placement = BubbleConfig::new(Locale::Center, "Hey").place(0);
        assert_eq!((placement.start_frame, placement.end_frame), (0, 0));

        let placement = BubbleConfig::new(Locale::Center, "Hey").with_frames(2, 5).place(12);
        assert_eq!((placement.start_frame, placement.end_frame), (2, 5));
    }
}
