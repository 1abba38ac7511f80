//! Polygon vertex lists and the banks they're read from (spec §4.7, §6).

use byteorder::ReadBytesExt;
use thiserror::Error;

use crate::numeric::{scale_coordinate, BoundingBox, Point};

pub const MAX_POLYGON_VERTICES: usize = 50;

/// Vertex-to-vertex Y delta above which a clockwise edge is rejected (spec
/// §3, §8: `dy = 1023` draws, `dy = 1024` fails).
const MAX_VERTICAL_DELTA: i32 = 1023;

#[derive(Error, Debug)]
pub enum PolygonError {
    #[error("polygon declares {0} vertices, above the {MAX_POLYGON_VERTICES} limit")]
    VertexCountTooHigh(usize),
    #[error("polygon declares fewer than 4 vertices")]
    VertexCountTooLow,
    #[error("polygon has an odd vertex count or vertex {0} does not share its mirror's Y")]
    VerticesMisaligned(usize),
    #[error("vertex {index} is {delta} rows further down than its predecessor, above the {MAX_VERTICAL_DELTA} limit")]
    VerticesTooFarApart { index: usize, delta: i32 },
    #[error("I/O error reading polygon data")]
    Io(std::io::Error),
}

impl From<std::io::Error> for PolygonError {
    fn from(value: std::io::Error) -> Self {
        PolygonError::Io(value)
    }
}

/// Checks the four structural invariants spec §3 lists for a `Polygon`'s
/// vertex list: even count, vertex `i`/`n-1-i` mirror pairing, Y
/// non-decreasing walking down each side, and per-edge `dy` within the
/// rasterizer's slope table. Validated once, when the polygon is read.
fn validate_geometry(points: &[Point]) -> Result<(), PolygonError> {
    let n = points.len();
    if n % 2 != 0 {
        return Err(PolygonError::VerticesMisaligned(n));
    }
    for i in 0..n / 2 {
        if points[i].y != points[n - 1 - i].y {
            return Err(PolygonError::VerticesMisaligned(i));
        }
    }
    for i in 0..n / 2 - 1 {
        let delta = points[n - 2 - i].y as i32 - points[n - 1 - i].y as i32;
        if delta > MAX_VERTICAL_DELTA {
            return Err(PolygonError::VerticesTooFarApart { index: n - 1 - i, delta });
        }
    }
    Ok(())
}

/// A scaled vertex list and its bounding box, ready for rasterization
/// (spec §4.7).
#[derive(Debug)]
pub struct Polygon {
    pub bbox: BoundingBox,
    pub points: Vec<Point>,
}

impl Polygon {
    /// Reads `raw_width, raw_height, count, {x,y}*count` from `reader`,
    /// scaling every coordinate by `scale/64` (spec §4.7, §6).
    pub fn read(reader: &mut impl std::io::Read, origin: Point, scale: u16) -> Result<Self, PolygonError> {
        let raw_width = reader.read_u8()?;
        let raw_height = reader.read_u8()?;
        let count = reader.read_u8()? as usize;

        if count > MAX_POLYGON_VERTICES {
            return Err(PolygonError::VertexCountTooHigh(count));
        }
        if count < 4 {
            return Err(PolygonError::VertexCountTooLow);
        }

        let width = scale_coordinate(raw_width, scale);
        let height = scale_coordinate(raw_height, scale);
        let half_width = width / 2;
        let half_height = height / 2;

        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let x = reader.read_u8()?;
            let y = reader.read_u8()?;
            let px = origin.x as i32 - half_width + scale_coordinate(x, scale);
            let py = origin.y as i32 - half_height + scale_coordinate(y, scale);
            points.push(Point::new(px as i16, py as i16));
        }

        let bbox = BoundingBox::new(
            origin.x as i32 - half_width,
            origin.y as i32 - half_height,
            origin.x as i32 - half_width + width,
            origin.y as i32 - half_height + height,
        );

        validate_geometry(&points)?;

        Ok(Polygon { bbox, points })
    }

    /// A 4-vertex polygon whose scaled bounding box spans 0 in x and 1 in y
    /// is drawn as a single pixel rather than rasterized (spec §4.7).
    pub fn is_dot(&self) -> bool {
        self.points.len() == 4 && self.bbox.x2 - self.bbox.x1 == 0 && self.bbox.y2 - self.bbox.y1 == 1
    }

    pub fn origin(&self) -> Point {
        Point::new(self.bbox.x1 as i16, self.bbox.y1 as i16)
    }
}
