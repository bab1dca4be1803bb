//! Waveform geometry: sample positions, the two-edged ribbon and its
//! uniform cubic B-spline outline.

use tiny_skia::{Path, PathBuilder};

use super::PaintSize;

/// Affine map from a domain interval onto a range interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f32, f32),
    range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    /// A collapsed domain maps everything to the middle of the range.
    pub fn apply(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span != 0.0 { (value - d0) / span } else { 0.5 };
        r0 + t * (r1 - r0)
    }
}

/// One sample of the ribbon: its x position and both edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RibbonPoint {
    pub x: f32,
    /// Edge mapped from `[-1, 1]` onto `[height, 0]`.
    pub y0: f32,
    /// Edge mapped from `[-1, 1]` onto `[0, height]`.
    pub y1: f32,
}

/// Spreads `values` across the full width and mirrors each into two edges.
pub fn ribbon_points(values: &[f32], size: PaintSize) -> Vec<RibbonPoint> {
    let last = values.len().saturating_sub(1) as f32;
    let x_scale = LinearScale::new((0.0, last), (0.0, size.width));
    let lower = LinearScale::new((-1.0, 1.0), (size.height, 0.0));
    let upper = LinearScale::new((-1.0, 1.0), (0.0, size.height));

    values
        .iter()
        .enumerate()
        .map(|(index, value)| RibbonPoint {
            x: x_scale.apply(index as f32),
            y0: lower.apply(*value),
            y1: upper.apply(*value),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// Closed outline of the ribbon: the upper edge left to right, then the
/// lower edge back, both smoothed with a B-spline.
pub fn area_commands(points: &[RibbonPoint]) -> Vec<PathCommand> {
    let mut commands = Vec::with_capacity(points.len() * 2 + 4);
    if points.is_empty() {
        return commands;
    }

    basis_line(&mut commands, points.iter().map(|p| (p.x, p.y1)), false);
    basis_line(&mut commands, points.iter().rev().map(|p| (p.x, p.y0)), true);
    commands.push(PathCommand::Close);
    commands
}

fn basis_line(
    out: &mut Vec<PathCommand>,
    points: impl IntoIterator<Item = (f32, f32)>,
    connect: bool,
) {
    let (mut x0, mut y0, mut x1, mut y1) = (0.0, 0.0, 0.0, 0.0);
    let mut count = 0usize;

    for (x, y) in points {
        match count {
            0 if connect => out.push(PathCommand::LineTo(x, y)),
            0 => out.push(PathCommand::MoveTo(x, y)),
            1 => {}
            2 => {
                out.push(PathCommand::LineTo(
                    (5.0 * x0 + x1) / 6.0,
                    (5.0 * y0 + y1) / 6.0,
                ));
                out.push(basis_segment((x0, y0), (x1, y1), (x, y)));
            }
            _ => out.push(basis_segment((x0, y0), (x1, y1), (x, y))),
        }
        count += 1;
        (x0, y0, x1, y1) = (x1, y1, x, y);
    }

    match count {
        0 | 1 => {}
        2 => out.push(PathCommand::LineTo(x1, y1)),
        _ => {
            out.push(basis_segment((x0, y0), (x1, y1), (x1, y1)));
            out.push(PathCommand::LineTo(x1, y1));
        }
    }
}

fn basis_segment(p0: (f32, f32), p1: (f32, f32), p: (f32, f32)) -> PathCommand {
    PathCommand::CubicTo(
        (2.0 * p0.0 + p1.0) / 3.0,
        (2.0 * p0.1 + p1.1) / 3.0,
        (p0.0 + 2.0 * p1.0) / 3.0,
        (p0.1 + 2.0 * p1.1) / 3.0,
        (p0.0 + 4.0 * p1.0 + p.0) / 6.0,
        (p0.1 + 4.0 * p1.1 + p.1) / 6.0,
    )
}

/// Converts commands to a fillable path; degenerate outlines yield `None`.
pub fn to_path(commands: &[PathCommand]) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for command in commands {
        match *command {
            PathCommand::MoveTo(x, y) => builder.move_to(x, y),
            PathCommand::LineTo(x, y) => builder.line_to(x, y),
            PathCommand::CubicTo(x1, y1, x2, y2, x, y) => builder.cubic_to(x1, y1, x2, y2, x, y),
            PathCommand::Close => builder.close(),
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: PaintSize = PaintSize {
        width: 100.0,
        height: 50.0,
    };

    fn end_point(command: &PathCommand) -> Option<(f32, f32)> {
        match *command {
            PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => Some((x, y)),
            PathCommand::CubicTo(.., x, y) => Some((x, y)),
            PathCommand::Close => None,
        }
    }

    #[test]
    fn ribbon_spans_the_full_width() {
        let points = ribbon_points(&[0.0, 1.0, -1.0], SIZE);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[1].x, 50.0);
        assert_eq!(points[2].x, 100.0);

        assert_eq!((points[0].y0, points[0].y1), (25.0, 25.0));
        assert_eq!((points[1].y0, points[1].y1), (0.0, 50.0));
        assert_eq!((points[2].y0, points[2].y1), (50.0, 0.0));
    }

    #[test]
    fn single_sample_sits_mid_width() {
        let points = ribbon_points(&[0.5], SIZE);
        assert_eq!(points[0].x, 50.0);
    }

    #[test]
    fn outline_starts_and_ends_on_the_samples() {
        let points = ribbon_points(&[0.0, 0.5, -0.5, 0.25], SIZE);
        let commands = area_commands(&points);

        assert_eq!(commands.first(), Some(&PathCommand::MoveTo(0.0, points[0].y1)));
        assert_eq!(commands.last(), Some(&PathCommand::Close));

        // The upper edge ends exactly on its last sample before turning back.
        let turn = commands
            .iter()
            .position(|c| *c == PathCommand::LineTo(100.0, points[3].y1))
            .unwrap();
        assert_eq!(
            commands[turn + 1],
            PathCommand::LineTo(100.0, points[3].y0)
        );

        let before_close = end_point(&commands[commands.len() - 2]).unwrap();
        assert_eq!(before_close, (0.0, points[0].y0));
    }

    #[test]
    fn two_samples_draw_straight_edges() {
        let points = ribbon_points(&[0.5, 0.5], SIZE);
        let commands = area_commands(&points);
        assert!(commands
            .iter()
            .all(|c| !matches!(c, PathCommand::CubicTo(..))));
        assert!(to_path(&commands).is_some());
    }

    #[test]
    fn empty_input_has_no_outline() {
        assert!(area_commands(&[]).is_empty());
        assert!(to_path(&[]).is_none());
    }
}
