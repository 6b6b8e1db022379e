use serde::Serialize;

use crate::{
    Bitmap,
    error::CanvasError,
    ink::{CANDIDATE_INK, REFERENCE_INK},
};

const COVERAGE_WEIGHT: f64 = 0.7;
const IOU_WEIGHT: f64 = 0.3;

/// Outcome of comparing a drawing against its reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accuracy {
    pub reference_ink: usize,
    pub candidate_ink: usize,
    pub matched: usize,
    pub union: usize,
    /// Share of reference ink the drawing reproduced.
    pub coverage: f64,
    /// Intersection over union; stray strokes pull this down.
    pub iou: f64,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Feedback {
    Excellent,
    Good,
    #[serde(rename = "Needs Practice")]
    NeedsPractice,
}

impl Feedback {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Feedback::Excellent,
            70..=89 => Feedback::Good,
            _ => Feedback::NeedsPractice,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feedback::Excellent => "Excellent",
            Feedback::Good => "Good",
            Feedback::NeedsPractice => "Needs Practice",
        }
    }
}

impl Accuracy {
    pub fn feedback(&self) -> Feedback {
        Feedback::from_score(self.score)
    }
}

/// Compares a reference bitmap with a candidate already composited onto white.
///
/// An empty reference (nothing rendered) scores 0 whatever the candidate holds.
pub fn compare(reference: &Bitmap, candidate: &Bitmap) -> Result<Accuracy, CanvasError> {
    if reference.dimensions() != candidate.dimensions() {
        return Err(CanvasError::DimensionMismatch {
            reference: reference.dimensions(),
            candidate: candidate.dimensions(),
        });
    }

    let mut reference_ink = 0;
    let mut candidate_ink = 0;
    let mut matched = 0;
    let mut union = 0;

    for (reference_pixel, candidate_pixel) in reference.pixels().zip(candidate.pixels()) {
        let is_reference_ink = REFERENCE_INK.is_ink(reference_pixel);
        let is_candidate_ink = CANDIDATE_INK.is_ink(candidate_pixel);

        if is_reference_ink {
            reference_ink += 1;
        }
        if is_candidate_ink {
            candidate_ink += 1;
        }
        if is_reference_ink || is_candidate_ink {
            union += 1;
        }
        if is_reference_ink && is_candidate_ink {
            matched += 1;
        }
    }

    if reference_ink == 0 {
        return Ok(Accuracy {
            reference_ink,
            candidate_ink,
            matched,
            union,
            coverage: 0.0,
            iou: 0.0,
            score: 0,
        });
    }

    // union >= reference_ink > 0 here
    let coverage = matched as f64 / reference_ink as f64;
    let iou = matched as f64 / union as f64;
    let blended = (COVERAGE_WEIGHT * coverage + IOU_WEIGHT * iou).clamp(0.0, 1.0);

    Ok(Accuracy {
        reference_ink,
        candidate_ink,
        matched,
        union,
        coverage,
        iou,
        score: (blended * 100.0).round() as u8,
    })
}

pub fn score(reference: &Bitmap, candidate: &Bitmap) -> Result<u8, CanvasError> {
    compare(reference, candidate).map(|accuracy| accuracy.score)
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::{CANVAS_HEIGHT, CANVAS_WIDTH, white_canvas};

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn fill_square(bitmap: &mut Bitmap, x0: u32, y0: u32, side: u32) {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                bitmap.put_pixel(x, y, BLACK);
            }
        }
    }

    fn square_reference() -> Bitmap {
        let mut reference = white_canvas();
        fill_square(&mut reference, 100, 100, 10);
        reference
    }

    #[test]
    fn test_exact_reproduction_scores_100() {
        let reference = square_reference();
        let accuracy = compare(&reference, &reference.clone()).unwrap();

        assert_eq!(accuracy.reference_ink, 100);
        assert_eq!(accuracy.coverage, 1.0);
        assert_eq!(accuracy.iou, 1.0);
        assert_eq!(accuracy.score, 100);
        assert_eq!(accuracy.feedback(), Feedback::Excellent);
    }

    #[test]
    fn test_blank_candidate_scores_0() {
        let accuracy = compare(&square_reference(), &white_canvas()).unwrap();

        assert_eq!(accuracy.matched, 0);
        assert_eq!(accuracy.score, 0);
        assert_eq!(accuracy.feedback(), Feedback::NeedsPractice);
    }

    #[test]
    fn test_stray_square_halves_iou() {
        let reference = square_reference();
        let mut candidate = reference.clone();
        fill_square(&mut candidate, 500, 200, 10);

        let accuracy = compare(&reference, &candidate).unwrap();

        assert_eq!(accuracy.coverage, 1.0);
        assert_eq!(accuracy.iou, 0.5);
        assert_eq!(accuracy.score, 85);
        assert_eq!(accuracy.feedback(), Feedback::Good);
    }

    #[test]
    fn test_empty_reference_scores_0() {
        let mut candidate = white_canvas();
        fill_square(&mut candidate, 0, 0, 50);

        let accuracy = compare(&white_canvas(), &candidate).unwrap();

        assert_eq!(accuracy.reference_ink, 0);
        assert_eq!(accuracy.candidate_ink, 2500);
        assert_eq!(accuracy.score, 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let small = Bitmap::new(10, 10);
        let err = compare(&white_canvas(), &small).unwrap_err();

        assert!(matches!(
            err,
            CanvasError::DimensionMismatch {
                reference: (CANVAS_WIDTH, CANVAS_HEIGHT),
                candidate: (10, 10),
            }
        ));
    }

    #[test]
    fn test_adding_correct_ink_never_lowers_score() {
        let mut reference = white_canvas();
        fill_square(&mut reference, 200, 100, 40);

        let mut candidate = white_canvas();
        let mut previous = 0;

        for row in 100..140 {
            for x in 200..240 {
                candidate.put_pixel(x, row, BLACK);
            }

            let current = score(&reference, &candidate).unwrap();
            assert!(current >= previous, "row {row}: {current} < {previous}");
            previous = current;
        }

        assert_eq!(previous, 100);
    }

    #[test]
    fn test_score_stays_in_range() {
        let reference = square_reference();

        let mut everything = white_canvas();
        fill_square(&mut everything, 0, 0, CANVAS_HEIGHT);

        for candidate in [white_canvas(), reference.clone(), everything] {
            let value = score(&reference, &candidate).unwrap();
            assert!(value <= 100);
        }
    }

    #[test]
    fn test_colored_strokes_count_as_ink() {
        let reference = square_reference();
        let mut candidate = white_canvas();

        for y in 100..110 {
            for x in 100..110 {
                candidate.put_pixel(x, y, Rgba([30, 90, 220, 255]));
            }
        }

        assert_eq!(score(&reference, &candidate).unwrap(), 100);
    }

    #[test]
    fn test_feedback_bands() {
        assert_eq!(Feedback::from_score(90), Feedback::Excellent);
        assert_eq!(Feedback::from_score(89), Feedback::Good);
        assert_eq!(Feedback::from_score(70), Feedback::Good);
        assert_eq!(Feedback::from_score(69), Feedback::NeedsPractice);
        assert_eq!(Feedback::NeedsPractice.label(), "Needs Practice");
    }
}
