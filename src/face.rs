//! Braille-canvas avatar.
//!
//! Draws the interviewer's face and animates the mouth from the current
//! openness value. Blinking runs on its own random timer so the face stays
//! alive between replies.

use rand::Rng;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::{
        Widget,
        canvas::{Canvas, Context, Line},
    },
};

const CANVAS_X_BOUND: f64 = 80.0;
const CANVAS_Y_BOUND: f64 = 48.0;

const EYE_X_OFFSET: f64 = 8.0;
const EYE_Y: f64 = 8.0;
const EYE_OPEN_HEIGHT: f64 = 2.2;
const MOUTH_Y: f64 = -10.0;
const MOUTH_RX: f64 = 7.0;
/// SVG-pixel mouth radius scaled into canvas units.
const MOUTH_RY_SCALE: f64 = 0.35;

const COLOR_FACE: Color = Color::Rgb(230, 190, 140);
const COLOR_HAIR: Color = Color::Rgb(60, 50, 45);
const COLOR_GLASSES: Color = Color::Rgb(40, 40, 50);
const COLOR_MOUTH: Color = Color::Rgb(170, 60, 60);
const COLOR_TEETH: Color = Color::White;

/// Vertical mouth radius in face units for a given openness.
pub fn mouth_ry(openness: f32) -> f64 {
    2.0 + openness as f64 * 18.0
}

/// Teeth show once the mouth is open past this point.
pub fn teeth_visible(openness: f32) -> bool {
    openness > 0.3
}

/// Blink timer and frame counter; the mouth itself is stateless and driven
/// by the openness passed to `widget`.
pub struct AvatarFace {
    frame: u64,
    next_blink_frame: u64,
    is_blinking: bool,
}

impl AvatarFace {
    pub fn new() -> Self {
        Self {
            frame: 0,
            next_blink_frame: 60,
            is_blinking: false,
        }
    }

    pub fn tick(&mut self) {
        self.frame += 1;
        if !self.is_blinking && self.frame >= self.next_blink_frame {
            self.is_blinking = true;
        }
        // A blink lasts 4 frames, then the next one is scheduled at random.
        if self.is_blinking && self.frame >= self.next_blink_frame + 4 {
            self.is_blinking = false;
            let mut rng = rand::thread_rng();
            self.next_blink_frame = self.frame + rng.gen_range(80..200);
        }
    }

    pub fn widget(&self, openness: f32) -> AvatarWidget<'_> {
        AvatarWidget {
            face: self,
            openness,
        }
    }
}

pub struct AvatarWidget<'a> {
    face: &'a AvatarFace,
    openness: f32,
}

impl Widget for AvatarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let openness = self.openness.clamp(0.0, 1.0);
        let eye_height = if self.face.is_blinking {
            0.4
        } else {
            EYE_OPEN_HEIGHT
        };

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([-CANVAS_X_BOUND / 2.0, CANVAS_X_BOUND / 2.0])
            .y_bounds([-CANVAS_Y_BOUND / 2.0, CANVAS_Y_BOUND / 2.0])
            .paint(|ctx| {
                // Head and ears
                draw_ellipse(ctx, 0.0, 2.0, 21.0, 18.0, COLOR_FACE);
                draw_ellipse(ctx, -21.0, 4.0, 2.5, 4.0, COLOR_FACE);
                draw_ellipse(ctx, 21.0, 4.0, 2.5, 4.0, COLOR_FACE);

                // Hairline arc across the top of the head
                draw_arc(ctx, 0.0, 2.0, 21.0, 18.5, 0.08, 0.42, COLOR_HAIR);

                // Glasses: two round rims and the bridge
                draw_circle(ctx, -EYE_X_OFFSET, EYE_Y, 5.5, COLOR_GLASSES);
                draw_circle(ctx, EYE_X_OFFSET, EYE_Y, 5.5, COLOR_GLASSES);
                ctx.draw(&Line {
                    x1: -EYE_X_OFFSET + 5.5,
                    y1: EYE_Y,
                    x2: EYE_X_OFFSET - 5.5,
                    y2: EYE_Y,
                    color: COLOR_GLASSES,
                });

                // Eyes inside the rims; a blink collapses them to a slit
                draw_ellipse(ctx, -EYE_X_OFFSET, EYE_Y, 1.6, eye_height, COLOR_HAIR);
                draw_ellipse(ctx, EYE_X_OFFSET, EYE_Y, 1.6, eye_height, COLOR_HAIR);

                // Eyebrows
                ctx.draw(&Line {
                    x1: -EYE_X_OFFSET - 4.5,
                    y1: EYE_Y + 7.0,
                    x2: -EYE_X_OFFSET + 4.0,
                    y2: EYE_Y + 8.0,
                    color: COLOR_HAIR,
                });
                ctx.draw(&Line {
                    x1: EYE_X_OFFSET - 4.0,
                    y1: EYE_Y + 8.0,
                    x2: EYE_X_OFFSET + 4.5,
                    y2: EYE_Y + 7.0,
                    color: COLOR_HAIR,
                });

                // Nose
                ctx.draw(&Line {
                    x1: 0.0,
                    y1: EYE_Y - 2.0,
                    x2: -1.5,
                    y2: -2.5,
                    color: COLOR_HAIR,
                });
                ctx.draw(&Line {
                    x1: -1.5,
                    y1: -2.5,
                    x2: 1.0,
                    y2: -2.5,
                    color: COLOR_HAIR,
                });

                // Moustache: two arcs sweeping down from under the nose
                draw_arc(ctx, -4.5, -4.5, 5.0, 2.0, 0.5, 1.0, COLOR_HAIR);
                draw_arc(ctx, 4.5, -4.5, 5.0, 2.0, 0.5, 1.0, COLOR_HAIR);

                // Mouth: vertical radius follows the audio
                let ry = (mouth_ry(openness) * MOUTH_RY_SCALE).max(0.5);
                draw_ellipse(ctx, 0.0, MOUTH_Y, MOUTH_RX, ry, COLOR_MOUTH);
                if teeth_visible(openness) {
                    ctx.draw(&Line {
                        x1: -MOUTH_RX * 0.8,
                        y1: MOUTH_Y + ry * 0.45,
                        x2: MOUTH_RX * 0.8,
                        y2: MOUTH_Y + ry * 0.45,
                        color: COLOR_TEETH,
                    });
                }
            })
            .render(area, buf);
    }
}

fn draw_ellipse(ctx: &mut Context, cx: f64, cy: f64, rx: f64, ry: f64, color: Color) {
    draw_arc(ctx, cx, cy, rx, ry, 0.0, 1.0, color);
    // A nearly closed ellipse still needs a visible line
    if ry < 1.0 {
        ctx.draw(&Line {
            x1: cx - rx,
            y1: cy,
            x2: cx + rx,
            y2: cy,
            color,
        });
    }
}

/// Polyline approximation of an ellipse arc; `from`/`to` are fractions of a
/// full turn starting at the positive x axis.
fn draw_arc(ctx: &mut Context, cx: f64, cy: f64, rx: f64, ry: f64, from: f64, to: f64, color: Color) {
    let segments = 32;
    let mut prev: Option<(f64, f64)> = None;
    for i in 0..=segments {
        let t = from + (to - from) * (i as f64 / segments as f64);
        let theta = t * std::f64::consts::PI * 2.0;
        let point = (cx + rx * theta.cos(), cy + ry * theta.sin());
        if let Some((px, py)) = prev {
            ctx.draw(&Line {
                x1: px,
                y1: py,
                x2: point.0,
                y2: point.1,
                color,
            });
        }
        prev = Some(point);
    }
}

fn draw_circle(ctx: &mut Context, cx: f64, cy: f64, r: f64, color: Color) {
    draw_ellipse(ctx, cx, cy, r, r, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouth_radius_tracks_openness() {
        assert!((mouth_ry(0.0) - 2.0).abs() < 1e-9);
        assert!((mouth_ry(0.5) - 11.0).abs() < 1e-9);
        assert!((mouth_ry(1.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn teeth_threshold() {
        assert!(!teeth_visible(0.0));
        assert!(!teeth_visible(0.3));
        assert!(teeth_visible(0.31));
    }

    #[test]
    fn blink_opens_again() {
        let mut face = AvatarFace::new();
        for _ in 0..70 {
            face.tick();
        }
        assert!(face.is_blinking);
        for _ in 0..10 {
            face.tick();
        }
        assert!(!face.is_blinking);
    }
}
