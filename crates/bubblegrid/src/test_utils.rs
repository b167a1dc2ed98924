//! Shared test utilities: synthetic layouts, score lists and rendered sheets.

use image::{GrayImage, Luma};

use crate::homography::{homography_from_quad, project};
use crate::layout::{Choice, IdBubble, LayoutConfig, Question, StudentIdGrid};
use crate::scoring::BubbleScore;

pub(crate) const SHEET_W: u32 = 320;
pub(crate) const SHEET_H: u32 = 480;

const PAPER: u8 = 240;
const QUESTION_BUBBLE_PX: f64 = 14.0;
const ID_BUBBLE_PX: f64 = 10.0;

/// A `SHEET_W x SHEET_H` layout with questions in blocks of twelve rows and
/// an optional identifier grid in the top right.
///
/// Question bubbles are 14 px, 20 px apart, starting at (60, 180). Identifier
/// bubbles are 10 px, columns 14 px apart from x = 200, rows 12 px apart from
/// y = 40.
pub(crate) fn grid_layout(n_questions: u32, n_choices: usize, id_digits: usize) -> LayoutConfig {
    let (w, h) = (SHEET_W as f64, SHEET_H as f64);
    let questions = (0..n_questions)
        .map(|i| {
            let block = (i / 12) as f64;
            let row = (i % 12) as f64;
            let choices = (0..n_choices)
                .map(|c| Choice {
                    option: char::from(b'A' + c as u8).to_string(),
                    x: (60.0 + 120.0 * block + 20.0 * c as f64) / w,
                    y: (180.0 + 20.0 * row) / h,
                    width: QUESTION_BUBBLE_PX / w,
                    height: QUESTION_BUBBLE_PX / h,
                })
                .collect();
            Question {
                number: i + 1,
                choices,
            }
        })
        .collect();

    let student_id = (id_digits > 0).then(|| StudentIdGrid {
        digit_count: id_digits,
        bubbles: (0..id_digits)
            .flat_map(|col| {
                (0..10u8).map(move |digit| IdBubble {
                    digit,
                    column: col,
                    x: (200.0 + 14.0 * col as f64) / w,
                    y: (40.0 + 12.0 * digit as f64) / h,
                    width: ID_BUBBLE_PX / w,
                    height: ID_BUBBLE_PX / h,
                })
            })
            .collect(),
    });

    match LayoutConfig::new(SHEET_W, SHEET_H, questions, student_id) {
        Ok(layout) => layout,
        Err(e) => panic!("test layout invalid: {}", e),
    }
}

/// Score list from `(option, fill)` pairs.
pub(crate) fn scores(pairs: &[(&str, f64)]) -> Vec<BubbleScore> {
    pairs
        .iter()
        .map(|(o, f)| BubbleScore {
            option: o.to_string(),
            fill_ratio: *f,
        })
        .collect()
}

/// Similarity transform from sheet to capture pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CaptureTransform {
    pub scale: f64,
    /// Paper-colored border around the sheet, in capture pixels.
    pub margin: f64,
    /// Rotation about the sheet center.
    pub angle_deg: f64,
}

impl Default for CaptureTransform {
    fn default() -> Self {
        Self {
            scale: 2.0,
            margin: 50.0,
            angle_deg: 0.0,
        }
    }
}

struct Bubble {
    center: [f64; 2],
    radius: f64,
    /// Half width of the printed ring.
    ring: f64,
    filled: bool,
}

fn bubbles(layout: &LayoutConfig, marks: &[(u32, &str)], student_id: Option<&str>) -> Vec<Bubble> {
    let (w, h) = (layout.width as f64, layout.height as f64);
    let mut out = Vec::new();
    for q in &layout.questions {
        for c in &q.choices {
            out.push(Bubble {
                center: [c.x * w, c.y * h],
                radius: (c.width * w).min(c.height * h) / 2.0,
                ring: 0.6,
                filled: marks.contains(&(q.number, c.option.as_str())),
            });
        }
    }
    if let Some(grid) = &layout.student_id {
        let digits: Vec<Option<u8>> = student_id
            .map(|s| s.bytes().map(|b| b.checked_sub(b'0')).collect())
            .unwrap_or_default();
        for b in &grid.bubbles {
            out.push(Bubble {
                center: [b.x * w, b.y * h],
                radius: (b.width * w).min(b.height * h) / 2.0,
                ring: 0.3,
                filled: digits.get(b.column).copied().flatten() == Some(b.digit),
            });
        }
    }
    out
}

/// Gray value of the printed and marked sheet at sheet coordinates `p`.
///
/// Markers are solid black squares. Each bubble has a thin printed ring,
/// thinner on the identifier grid. A marked bubble's interior darkens toward its center like pencil
/// pressure, which keeps it darker than its local neighborhood everywhere.
fn sheet_value(layout: &LayoutConfig, bubbles: &[Bubble], p: [f64; 2]) -> u8 {
    let (w, h) = (layout.width as f64, layout.height as f64);
    if p[0] < 0.0 || p[1] < 0.0 || p[0] >= w || p[1] >= h {
        return PAPER;
    }
    let lo = layout.marker_offset_px;
    let hi = lo + layout.marker_size_px;
    let in_band =
        |v: f64, extent: f64| (lo..hi).contains(&v) || (extent - hi..extent - lo).contains(&v);
    if in_band(p[0], w) && in_band(p[1], h) {
        return 0;
    }

    let mut value = PAPER;
    for b in bubbles {
        let d = (p[0] - b.center[0]).hypot(p[1] - b.center[1]);
        if d > b.radius + 1.0 {
            continue;
        }
        if b.filled && d <= b.radius - 1.5 {
            value = value.min((30.0 + 2.0 * d * d).min(200.0) as u8);
        }
        if (d - (b.radius - 1.0)).abs() <= b.ring {
            value = 0;
        }
    }
    value
}

/// Render a capture of a sheet with the given question marks and identifier.
pub(crate) fn render_capture(
    layout: &LayoutConfig,
    marks: &[(u32, &str)],
    student_id: Option<&str>,
    t: CaptureTransform,
) -> GrayImage {
    let (sw, sh) = (layout.width as f64, layout.height as f64);
    let out_w = (sw * t.scale + 2.0 * t.margin).round() as u32;
    let out_h = (sh * t.scale + 2.0 * t.margin).round() as u32;
    let (pcx, pcy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);
    let (scx, scy) = (sw / 2.0, sh / 2.0);
    let (sin, cos) = (-t.angle_deg.to_radians()).sin_cos();

    render_mapped(layout, marks, student_id, (out_w, out_h), |x, y| {
        let dx = (x - pcx) / t.scale;
        let dy = (y - pcy) / t.scale;
        [scx + cos * dx - sin * dy, scy + sin * dx + cos * dy]
    })
}

/// Render a perspective capture whose sheet corners land on `quad`
/// (tl, tr, br, bl) in an `out_w x out_h` image.
pub(crate) fn render_perspective(
    layout: &LayoutConfig,
    marks: &[(u32, &str)],
    student_id: Option<&str>,
    (out_w, out_h): (u32, u32),
    quad: [[f64; 2]; 4],
) -> GrayImage {
    let (sw, sh) = (layout.width as f64, layout.height as f64);
    let sheet = [[0.0, 0.0], [sw, 0.0], [sw, sh], [0.0, sh]];
    let to_sheet = match homography_from_quad(&quad, &sheet) {
        Ok(h) => h,
        Err(e) => panic!("perspective quad invalid: {}", e),
    };
    render_mapped(layout, marks, student_id, (out_w, out_h), |x, y| {
        project(&to_sheet, x, y)
    })
}

fn render_mapped(
    layout: &LayoutConfig,
    marks: &[(u32, &str)],
    student_id: Option<&str>,
    (out_w, out_h): (u32, u32),
    to_sheet: impl Fn(f64, f64) -> [f64; 2],
) -> GrayImage {
    let bubbles = bubbles(layout, marks, student_id);
    GrayImage::from_fn(out_w, out_h, |x, y| {
        Luma([sheet_value(layout, &bubbles, to_sheet(x as f64, y as f64))])
    })
}

/// Render the sheet directly in canonical pixels.
pub(crate) fn render_sheet(
    layout: &LayoutConfig,
    marks: &[(u32, &str)],
    student_id: Option<&str>,
) -> GrayImage {
    render_capture(
        layout,
        marks,
        student_id,
        CaptureTransform {
            scale: 1.0,
            margin: 0.0,
            angle_deg: 0.0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_places_markers_at_scaled_offsets() {
        let layout = grid_layout(4, 4, 0);
        let img = render_capture(&layout, &[], None, CaptureTransform::default());
        assert_eq!(img.dimensions(), (740, 1060));
        // Marker spans sheet [5, 23) -> capture [60, 96).
        assert_eq!(img.get_pixel(60, 60)[0], 0);
        assert_eq!(img.get_pixel(95, 95)[0], 0);
        assert_eq!(img.get_pixel(96, 60)[0], PAPER);
        assert_eq!(img.get_pixel(59, 60)[0], PAPER);
    }

    #[test]
    fn perspective_capture_lands_markers_on_the_quad() {
        let layout = grid_layout(4, 4, 0);
        let quad = [[90.0, 50.0], [650.0, 50.0], [690.0, 1010.0], [50.0, 1010.0]];
        let img = render_perspective(&layout, &[], None, (740, 1060), quad);
        assert_eq!(img.dimensions(), (740, 1060));
        // Just inside each sheet corner lies paper margin; the markers sit
        // slightly further in.
        assert_eq!(img.get_pixel(92, 52)[0], PAPER);
        assert_eq!(img.get_pixel(100, 62)[0], 0);
        assert_eq!(img.get_pixel(40, 1000)[0], PAPER);
        assert_eq!(img.get_pixel(10, 10)[0], PAPER);
    }

    #[test]
    fn marked_bubble_is_dark_at_center() {
        let layout = grid_layout(1, 4, 0);
        let img = render_sheet(&layout, &[(1, "B")], None);
        assert_eq!(img.get_pixel(80, 180)[0], 30);
        assert_eq!(img.get_pixel(60, 180)[0], PAPER);
        // Printed ring of the unmarked bubble A at radius 6.
        assert_eq!(img.get_pixel(66, 180)[0], 0);
    }
}
