//! Common types shared across the geodata-subset stack.

pub mod crs;
pub mod geom;
pub mod ranges;
pub mod time;

pub use crs::{Crs, CrsParseError};
pub use geom::{GeometryError, SubsetGeometry};
pub use ranges::{parse_range, RangeParseError};
pub use time::{DateGrain, DateParseError, DateSelection, RequestDate};
