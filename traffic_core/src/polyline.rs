//! Encoded polyline format (precision 5), as returned by the routing service
//! with `geometries=polyline`.

use crate::geo::Coordinate;
use thiserror::Error;

const PRECISION: f64 = 1e5;

#[derive(Error, Debug, PartialEq)]
pub enum PolylineError {
    #[error("Invalid byte {byte:#x} at position {position}")]
    InvalidByte { byte: u8, position: usize },
    #[error("Polyline ends in the middle of a value")]
    Truncated,
    #[error("Value at position {0} overflows")]
    Overflow(usize),
}

pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(decode_value(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;
        if index >= bytes.len() {
            return Err(PolylineError::Truncated);
        }
        let start = index;
        lon = lon
            .checked_add(decode_value(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;
        points.push(Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let position = *index;
        let byte = *bytes.get(position).ok_or(PolylineError::Truncated)?;
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidByte { byte, position });
        }
        if shift > 60 {
            return Err(PolylineError::Overflow(position));
        }
        *index += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

pub fn encode(points: &[Coordinate]) -> String {
    let mut out = String::new();
    let mut prev_lat = 0;
    let mut prev_lon = 0;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lon = (point.lon * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push(char::from((0x20 | (v & 0x1f)) as u8 + 63));
        v >>= 5;
    }
    out.push(char::from(v as u8 + 63));
}
