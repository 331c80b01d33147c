//! Fixed-layout field decoders shared by the per-box decoders.
//!
//! Each reader consumes a statically known number of bytes from a
//! [`ByteCursor`] and returns a typed value. Fixed-point and timestamp
//! types keep the raw integer and convert on demand.

use crate::boxes::FourCC;
use crate::cursor::ByteCursor;
use crate::parser::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::Read;
use std::sync::LazyLock;

/// Seconds from 1970-01-01T00:00:00Z to 1904-01-01T00:00:00Z (negative).
static EPOCH_OFFSET: LazyLock<i64> = LazyLock::new(|| {
    let mac = NaiveDate::from_ymd_opt(1904, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    let unix = DateTime::<Utc>::UNIX_EPOCH;
    mac.map(|m| (m - unix).num_seconds()).unwrap_or(-2_082_844_800)
});

pub fn epoch_offset() -> i64 {
    *EPOCH_OFFSET
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionFlags {
    pub version: u8,
    pub flags: u32,
}

pub fn read_version_flags<R: Read>(cur: &mut ByteCursor<R>) -> Result<VersionFlags> {
    let word = cur.read_u32()?;
    Ok(VersionFlags { version: (word >> 24) as u8, flags: word & 0x00ff_ffff })
}

pub fn read_fourcc<R: Read>(cur: &mut ByteCursor<R>) -> Result<FourCC> {
    Ok(FourCC(cur.read_array::<4>()?))
}

macro_rules! fixed_point {
    ($(#[$doc:meta])* $name:ident, $raw:ty, $signed:ty, $divisor:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub $raw);

        impl $name {
            pub const ONE: Self = Self($divisor as $raw);

            pub fn value(self) -> f64 {
                self.0 as $signed as f64 / $divisor as f64
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.4}", self.value())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
                s.serialize_f64(self.value())
            }
        }
    };
}

fixed_point!(
    /// Signed 16.16 fixed point: rates, widths and heights, matrix a/b/c/d/x/y.
    Fixed16_16, u32, i32, 65_536u32
);
fixed_point!(
    /// Signed 2.30 fixed point: the u/v/w column of a transform matrix.
    Fixed2_30, u32, i32, 1_073_741_824u32
);
fixed_point!(
    /// Signed 8.8 fixed point: 16-bit volume fields.
    Fixed8_8, u16, i16, 256u16
);

pub fn read_fixed16_16<R: Read>(cur: &mut ByteCursor<R>) -> Result<Fixed16_16> {
    Ok(Fixed16_16(cur.read_u32()?))
}

pub fn read_fixed8_8<R: Read>(cur: &mut ByteCursor<R>) -> Result<Fixed8_8> {
    Ok(Fixed8_8(cur.read_u16()?))
}

/// Seconds since 1904-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// `None` only when the value is beyond what `chrono` can represent.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.0).ok()?.checked_add(epoch_offset())?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "out-of-range({})", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

pub fn read_timestamp32<R: Read>(cur: &mut ByteCursor<R>) -> Result<Timestamp> {
    Ok(Timestamp(cur.read_u32()? as u64))
}

pub fn read_timestamp64<R: Read>(cur: &mut ByteCursor<R>) -> Result<Timestamp> {
    Ok(Timestamp(cur.read_u64()?))
}

/// 3x3 transform matrix, nine raw words in row-major order.
///
/// Columns 0 and 1 are 16.16 fixed point, column 2 is 2.30.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matrix(pub [u32; 9]);

impl Matrix {
    pub const IDENTITY: Matrix = {
        let (one, w) = (Fixed16_16::ONE.0, Fixed2_30::ONE.0);
        Matrix([one, 0, 0, 0, one, 0, 0, 0, w])
    };

    pub fn cell(&self, row: usize, col: usize) -> f64 {
        let raw = self.0[row * 3 + col];
        if col == 2 { Fixed2_30(raw).value() } else { Fixed16_16(raw).value() }
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.cell(r, c)))
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.rows().serialize(s)
    }
}

pub fn read_matrix<R: Read>(cur: &mut ByteCursor<R>) -> Result<Matrix> {
    let mut m = [0u32; 9];
    for cell in m.iter_mut() {
        *cell = cur.read_u32()?;
    }
    Ok(Matrix(m))
}

/// Unpack an ISO-639-2/T code stored as three 5-bit letters.
pub fn language_from_u16(code: u16) -> String {
    if code & 0x7fff == 0 {
        return "und".to_string();
    }
    [(code >> 10) & 0x1f, (code >> 5) & 0x1f, code & 0x1f]
        .iter()
        .map(|&c| (c as u8 + 0x60) as char)
        .collect()
}
