//! ASCII `x y z r g b` point files.

use crate::{with_file_bytes, FormatError, ReadError};
use rayon::prelude::*;
use std::path::Path;

/// Lines smaller than this are parsed on the calling thread.
const PAR_MIN_LINES: usize = 4096;

/// A single colored point. Color channels stay in the file's 0..=255 range;
/// normalisation happens when GPU geometry is built.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Point {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Points in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point>,
    /// Lines dropped because they did not have six tokens, or (with
    /// [`MalformedLinePolicy::Skip`]) because a token was not a number.
    pub skipped_lines: usize,
}

impl PointCloud {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// What to do with a line that has six tokens but not six numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MalformedLinePolicy {
    /// Fail the whole read with a [`FormatError`].
    #[default]
    Reject,
    /// Drop the line like any other misshapen line.
    Skip,
}

enum Line {
    Point(Point),
    Skipped,
    Malformed(FormatError),
}

fn parse_line(number: usize, line: &str) -> Line {
    let mut tokens = [""; 6];
    let mut count = 0;
    for token in line.split_whitespace() {
        if count == tokens.len() {
            return Line::Skipped;
        }
        tokens[count] = token;
        count += 1;
    }
    if count != tokens.len() {
        return Line::Skipped;
    }

    let mut values = [0.0f32; 6];
    for (value, token) in values.iter_mut().zip(tokens) {
        match token.parse::<f32>() {
            Ok(v) => *value = v,
            Err(_) => {
                return Line::Malformed(FormatError {
                    line: number,
                    token: token.to_owned(),
                })
            }
        }
    }

    Line::Point(Point {
        position: [values[0], values[1], values[2]],
        color: [values[3], values[4], values[5]],
    })
}

/// Parse point text. Empty and misshapen lines are skipped; six-token lines
/// with a non-numeric token are handled per `policy`.
pub fn parse_points(text: &str, policy: MalformedLinePolicy) -> Result<PointCloud, FormatError> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .collect();

    // Indexed parallel collect keeps file order.
    let parsed: Vec<Line> = if lines.len() >= PAR_MIN_LINES {
        lines.par_iter().map(|&(n, l)| parse_line(n, l)).collect()
    } else {
        lines.iter().map(|&(n, l)| parse_line(n, l)).collect()
    };

    let mut cloud = PointCloud {
        points: Vec::with_capacity(parsed.len()),
        skipped_lines: 0,
    };

    for line in parsed {
        match line {
            Line::Point(p) => cloud.points.push(p),
            Line::Skipped => cloud.skipped_lines += 1,
            Line::Malformed(err) => match policy {
                MalformedLinePolicy::Reject => return Err(err),
                MalformedLinePolicy::Skip => {
                    log::warn!("skipping {}", err);
                    cloud.skipped_lines += 1;
                }
            },
        }
    }

    log::debug!(
        "parsed {} points, skipped {} lines",
        cloud.points.len(),
        cloud.skipped_lines
    );

    Ok(cloud)
}

/// Read an ASCII point file from disk.
pub fn read_points<P: AsRef<Path>>(
    path: P,
    policy: MalformedLinePolicy,
) -> Result<PointCloud, ReadError> {
    with_file_bytes(path.as_ref(), |bytes| {
        parse_points(&String::from_utf8_lossy(bytes), policy)
    })
}
