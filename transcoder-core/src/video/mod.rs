//! Video domain vocabulary shared by every controller component.
//!
//! These types describe *intent* ("component input with pedestal, video range
//! 3, composite output") rather than register values. Chip recipes translate
//! them into bus writes on the far side of [`crate::chips::ChipDriver`].

use core::fmt;

/// Physical connector routed into the decoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PhysicalInput {
    Cvbs,
    SVideo,
    Component,
}

impl PhysicalInput {
    /// Every physical input in cycling order.
    pub const ALL: [PhysicalInput; 3] = [
        PhysicalInput::Cvbs,
        PhysicalInput::SVideo,
        PhysicalInput::Component,
    ];

    /// Cyclic successor used when the active input has gone quiet.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            PhysicalInput::Cvbs => PhysicalInput::SVideo,
            PhysicalInput::SVideo => PhysicalInput::Component,
            PhysicalInput::Component => PhysicalInput::Cvbs,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PhysicalInput::Cvbs => "cvbs",
            PhysicalInput::SVideo => "s-video",
            PhysicalInput::Component => "component",
        }
    }
}

impl fmt::Display for PhysicalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logical input selector as stored in the settings record.
///
/// The selector distinguishes pedestal variants of the CVBS and S-Video
/// inputs; component video never carries a setup offset.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputSelector {
    Cvbs,
    CvbsPedestal,
    SVideo,
    SVideoPedestal,
    Component,
}

impl InputSelector {
    #[must_use]
    pub const fn physical(self) -> PhysicalInput {
        match self {
            InputSelector::Cvbs | InputSelector::CvbsPedestal => PhysicalInput::Cvbs,
            InputSelector::SVideo | InputSelector::SVideoPedestal => PhysicalInput::SVideo,
            InputSelector::Component => PhysicalInput::Component,
        }
    }

    /// Returns `true` when the selector expects a 7.5 IRE black level.
    #[must_use]
    pub const fn pedestal(self) -> bool {
        matches!(
            self,
            InputSelector::CvbsPedestal | InputSelector::SVideoPedestal
        )
    }

    /// Builds the selector for `input`, honouring the pedestal preference when the
    /// input supports it.
    #[must_use]
    pub const fn from_physical(input: PhysicalInput, pedestal: bool) -> Self {
        match (input, pedestal) {
            (PhysicalInput::Cvbs, false) => InputSelector::Cvbs,
            (PhysicalInput::Cvbs, true) => InputSelector::CvbsPedestal,
            (PhysicalInput::SVideo, false) => InputSelector::SVideo,
            (PhysicalInput::SVideo, true) => InputSelector::SVideoPedestal,
            (PhysicalInput::Component, _) => InputSelector::Component,
        }
    }

    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            InputSelector::Cvbs => 0,
            InputSelector::CvbsPedestal => 1,
            InputSelector::SVideo => 2,
            InputSelector::SVideoPedestal => 3,
            InputSelector::Component => 4,
        }
    }

    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(InputSelector::Cvbs),
            1 => Some(InputSelector::CvbsPedestal),
            2 => Some(InputSelector::SVideo),
            3 => Some(InputSelector::SVideoPedestal),
            4 => Some(InputSelector::Component),
            _ => None,
        }
    }
}

/// Decoder lock classification derived from the status registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockState {
    Unknown,
    RunningFree,
    Locked,
}

impl LockState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LockState::Unknown => "unknown",
            LockState::RunningFree => "free-run",
            LockState::Locked => "locked",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scan type reported by the decoder. Sticky once observed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterlaceState {
    Unknown,
    Interlaced,
    Progressive,
}

impl InterlaceState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            InterlaceState::Unknown => "unknown",
            InterlaceState::Interlaced => "interlaced",
            InterlaceState::Progressive => "progressive",
        }
    }
}

impl fmt::Display for InterlaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Autodetected video standard (bits 6:4 of status register 1).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VideoStandard {
    NtscMj,
    Ntsc443,
    PalM,
    Pal60,
    PalBghid,
    Secam,
    PalCombinationN,
    Secam525,
}

impl VideoStandard {
    /// Decodes the 3-bit autodetect field; every value is a valid standard.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x00 => VideoStandard::NtscMj,
            0x01 => VideoStandard::Ntsc443,
            0x02 => VideoStandard::PalM,
            0x03 => VideoStandard::Pal60,
            0x04 => VideoStandard::PalBghid,
            0x05 => VideoStandard::Secam,
            0x06 => VideoStandard::PalCombinationN,
            _ => VideoStandard::Secam525,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            VideoStandard::NtscMj => "NTSC M/J",
            VideoStandard::Ntsc443 => "NTSC 4.43",
            VideoStandard::PalM => "PAL M",
            VideoStandard::Pal60 => "PAL 60",
            VideoStandard::PalBghid => "PAL B/G/H/I/D",
            VideoStandard::Secam => "SECAM",
            VideoStandard::PalCombinationN => "PAL Combination N",
            VideoStandard::Secam525 => "SECAM 525",
        }
    }
}

impl fmt::Display for VideoStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field rate reported by status register 3.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldRate {
    Hz50,
    Hz60,
}

/// Number of video-range recipes reachable from the option button.
pub const VIDEO_RANGE_COUNT: u8 = 6;

/// Index into the chip layer's video-range (brightness / IRE) recipes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct VideoRange(u8);

impl VideoRange {
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < VIDEO_RANGE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// Encoder color space for component output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColorSpace {
    Rgb,
    YPbPr,
}

impl ColorSpace {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            ColorSpace::Rgb => ColorSpace::YPbPr,
            ColorSpace::YPbPr => ColorSpace::Rgb,
        }
    }
}

/// Display mode dimension advanced by the option button.
///
/// Stepping past the last video range wraps to range 0 and flips the color
/// space, so the button walks every range in RGB and then every range in YPbPr.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisplayMode {
    pub range: VideoRange,
    pub color: ColorSpace,
}

impl DisplayMode {
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            range: VideoRange(0),
            color: ColorSpace::Rgb,
        }
    }

    #[must_use]
    pub const fn advanced(self) -> Self {
        let next = self.range.0 + 1;
        if next < VIDEO_RANGE_COUNT {
            Self {
                range: VideoRange(next),
                color: self.color,
            }
        } else {
            Self {
                range: VideoRange(0),
                color: self.color.toggled(),
            }
        }
    }
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self::initial()
    }
}

/// Digital noise reduction placement, advanced by the advance button.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum NoiseReduction {
    #[default]
    Off,
    InputOnly,
    OutputOnly,
    Both,
}

impl NoiseReduction {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            NoiseReduction::Off => NoiseReduction::InputOnly,
            NoiseReduction::InputOnly => NoiseReduction::OutputOnly,
            NoiseReduction::OutputOnly => NoiseReduction::Both,
            NoiseReduction::Both => NoiseReduction::Off,
        }
    }

    /// Decoder-side DNR enabled.
    #[must_use]
    pub const fn on_input(self) -> bool {
        matches!(self, NoiseReduction::InputOnly | NoiseReduction::Both)
    }

    /// Encoder-side DNR enabled.
    #[must_use]
    pub const fn on_output(self) -> bool {
        matches!(self, NoiseReduction::OutputOnly | NoiseReduction::Both)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            NoiseReduction::Off => "off",
            NoiseReduction::InputOnly => "input",
            NoiseReduction::OutputOnly => "output",
            NoiseReduction::Both => "input+output",
        }
    }
}

/// Encoder output encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Component,
    Composite,
}

impl OutputFormat {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            OutputFormat::Component => OutputFormat::Composite,
            OutputFormat::Composite => OutputFormat::Component,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            OutputFormat::Component => "component",
            OutputFormat::Composite => "composite",
        }
    }
}
