//! Clinical capture angles and standard photo series.
//!
//! Angles cover facial plastic surgery, aesthetic medicine, body contouring
//! and dentistry. A [`PhotoSeries`] lists the angles a procedure needs so a
//! capture client can walk the photographer through them in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GlowError;

macro_rules! capture_angles {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)+) => {
        /// View a clinical photo was taken from.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum CaptureAngle {
            $($(#[$doc])* $variant,)+
        }

        impl CaptureAngle {
            pub const ALL: &'static [CaptureAngle] = &[$(Self::$variant,)+];

            /// Wire name, as stored in the ledger record.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

capture_angles! {
    /// Frontal, Frankfort plane horizontal.
    FaceFrontal => "face_frontal",
    FaceLeftProfile => "face_left_profile",
    FaceRightProfile => "face_right_profile",
    /// 45 degrees, both eyes visible.
    FaceLeftOblique => "face_left_oblique",
    FaceRightOblique => "face_right_oblique",
    /// Submental, looking up at nose and chin.
    FaceBasal => "face_basal",
    /// Superior, looking down the nose bridge.
    FaceBirdsEye => "face_birds_eye",
    FaceLeftLateralSmile => "face_left_lateral_smile",
    FaceRightLateralSmile => "face_right_lateral_smile",
    FaceFrontalSmile => "face_frontal_smile",
    /// Frontal during expression.
    FaceFrontalAnimation => "face_frontal_animation",
    FaceNoseCloseup => "face_nose_closeup",
    FaceNoseBasalCloseup => "face_nose_basal_closeup",
    FaceEyesCloseup => "face_eyes_closeup",
    FaceLipsCloseup => "face_lips_closeup",
    FaceEarsLeft => "face_ears_left",
    FaceEarsRight => "face_ears_right",
    BodyFrontal => "body_frontal",
    BodyLeftLateral => "body_left_lateral",
    BodyRightLateral => "body_right_lateral",
    BodyLeftOblique => "body_left_oblique",
    BodyRightOblique => "body_right_oblique",
    BodyPosterior => "body_posterior",
    DentalFrontalSmile => "dental_frontal_smile",
    /// Retractors in, full dentition visible.
    DentalFrontalRetracted => "dental_frontal_retracted",
    DentalLeftLateral => "dental_left_lateral",
    DentalRightLateral => "dental_right_lateral",
    DentalFrontalRest => "dental_frontal_rest",
    DentalOcclusalUpper => "dental_occlusal_upper",
    DentalOcclusalLower => "dental_occlusal_lower",
    DentalBuccalLeft => "dental_buccal_left",
    DentalBuccalRight => "dental_buccal_right",
    DentalAnteriorCloseup => "dental_anterior_closeup",
    DentalLingual => "dental_lingual",
    Custom => "custom",
}

impl CaptureAngle {
    /// Whether the subject's face is the primary content, so alignment
    /// scoring applies.
    pub fn is_face(&self) -> bool {
        self.as_str().starts_with("face_")
    }
}

impl fmt::Display for CaptureAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureAngle {
    type Err = GlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|angle| angle.as_str() == s)
            .ok_or_else(|| GlowError::InvalidConfig(format!("Unknown capture angle '{s}'")))
    }
}

use CaptureAngle::*;

const FACE_FIVE_VIEW: [CaptureAngle; 5] = [
    FaceFrontal,
    FaceLeftProfile,
    FaceRightProfile,
    FaceLeftOblique,
    FaceRightOblique,
];

/// Standard series by procedure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSeries {
    FaceStandard,
    Rhinoplasty,
    Blepharoplasty,
    Facelift,
    LipFiller,
    Botox,
    BodyContouring,
    DentalAesthetic,
    DentalOrtho,
    DentalFull,
}

impl PhotoSeries {
    pub const ALL: [PhotoSeries; 10] = [
        Self::FaceStandard,
        Self::Rhinoplasty,
        Self::Blepharoplasty,
        Self::Facelift,
        Self::LipFiller,
        Self::Botox,
        Self::BodyContouring,
        Self::DentalAesthetic,
        Self::DentalOrtho,
        Self::DentalFull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FaceStandard => "face_standard",
            Self::Rhinoplasty => "rhinoplasty",
            Self::Blepharoplasty => "blepharoplasty",
            Self::Facelift => "facelift",
            Self::LipFiller => "lip_filler",
            Self::Botox => "botox",
            Self::BodyContouring => "body_contouring",
            Self::DentalAesthetic => "dental_aesthetic",
            Self::DentalOrtho => "dental_ortho",
            Self::DentalFull => "dental_full",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FaceStandard => "Face: Standard 5-View",
            Self::Rhinoplasty => "Rhinoplasty Series",
            Self::Blepharoplasty => "Blepharoplasty Series",
            Self::Facelift => "Facelift / Neck Lift Series",
            Self::LipFiller => "Lip Filler Series",
            Self::Botox => "Botox Series",
            Self::BodyContouring => "Body Contouring Series",
            Self::DentalAesthetic => "Dental Aesthetic Series",
            Self::DentalOrtho => "Orthodontic Series",
            Self::DentalFull => "Full Dental Documentation",
        }
    }

    /// Angles in capture order.
    pub fn angles(&self) -> Vec<CaptureAngle> {
        match self {
            Self::FaceStandard => FACE_FIVE_VIEW.to_vec(),
            Self::Rhinoplasty => [
                &FACE_FIVE_VIEW[..],
                &[FaceBasal, FaceBirdsEye, FaceNoseCloseup, FaceNoseBasalCloseup][..],
            ]
            .concat(),
            Self::Blepharoplasty => {
                vec![FaceFrontal, FaceLeftOblique, FaceRightOblique, FaceEyesCloseup]
            }
            Self::Facelift => [&FACE_FIVE_VIEW[..], &[FaceBasal][..]].concat(),
            Self::LipFiller => vec![
                FaceFrontal,
                FaceFrontalSmile,
                FaceLeftOblique,
                FaceRightOblique,
                FaceLipsCloseup,
            ],
            Self::Botox => vec![
                FaceFrontal,
                FaceFrontalAnimation,
                FaceLeftOblique,
                FaceRightOblique,
            ],
            Self::BodyContouring => vec![
                BodyFrontal,
                BodyLeftLateral,
                BodyRightLateral,
                BodyLeftOblique,
                BodyRightOblique,
                BodyPosterior,
            ],
            Self::DentalAesthetic => vec![
                DentalFrontalSmile,
                DentalFrontalRetracted,
                DentalFrontalRest,
                DentalLeftLateral,
                DentalRightLateral,
                FaceFrontalSmile,
                FaceLeftLateralSmile,
                FaceRightLateralSmile,
            ],
            Self::DentalOrtho => vec![
                DentalFrontalRetracted,
                DentalBuccalLeft,
                DentalBuccalRight,
                DentalOcclusalUpper,
                DentalOcclusalLower,
                FaceFrontal,
                FaceLeftProfile,
                FaceRightProfile,
            ],
            Self::DentalFull => vec![
                DentalFrontalSmile,
                DentalFrontalRetracted,
                DentalFrontalRest,
                DentalLeftLateral,
                DentalRightLateral,
                DentalOcclusalUpper,
                DentalOcclusalLower,
                DentalBuccalLeft,
                DentalBuccalRight,
                DentalAnteriorCloseup,
                FaceFrontal,
                FaceFrontalSmile,
                FaceLeftProfile,
                FaceRightProfile,
            ],
        }
    }
}

impl fmt::Display for PhotoSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoSeries {
    type Err = GlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|series| series.as_str() == s)
            .ok_or_else(|| GlowError::InvalidConfig(format!("Unknown photo series '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_angle_names_match_serde() {
        for angle in CaptureAngle::ALL {
            let json = serde_json::to_string(angle).unwrap();
            assert_eq!(json, format!("\"{}\"", angle.as_str()));
            assert_eq!(angle.as_str().parse::<CaptureAngle>().unwrap(), *angle);
        }
        assert_eq!(CaptureAngle::ALL.len(), 35);
    }

    #[test]
    fn test_unknown_angle() {
        assert!("face_upside_down".parse::<CaptureAngle>().is_err());
    }

    #[test]
    fn test_face_angles() {
        assert!(CaptureAngle::FaceBirdsEye.is_face());
        assert!(!CaptureAngle::DentalLingual.is_face());
        assert!(!CaptureAngle::Custom.is_face());
    }

    #[test]
    fn test_series_have_distinct_angles() {
        for series in PhotoSeries::ALL {
            let angles = series.angles();
            let unique: HashSet<_> = angles.iter().collect();
            assert_eq!(unique.len(), angles.len(), "{series}");
            assert_eq!(series.as_str().parse::<PhotoSeries>().unwrap(), series);
        }
    }

    #[test]
    fn test_series_contents() {
        assert_eq!(PhotoSeries::FaceStandard.angles().len(), 5);
        assert_eq!(PhotoSeries::Rhinoplasty.angles().len(), 9);
        assert_eq!(PhotoSeries::Facelift.angles().last(), Some(&CaptureAngle::FaceBasal));
        assert_eq!(PhotoSeries::DentalFull.angles().len(), 14);
        assert!(!PhotoSeries::DentalFull
            .angles()
            .contains(&CaptureAngle::DentalLingual));
        assert_eq!(PhotoSeries::DentalOrtho.label(), "Orthodontic Series");
    }
}
