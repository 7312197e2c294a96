//! Data layer: typed grid, addressing, file boundary and well selection.
//!
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  decode file → Grid (cell types fixed here)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  model    │  Cell, Grid, Well; address: A1 coordinates
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  letter group × number range → selected wells
//!   └──────────┘
//! ```

pub mod address;
pub mod filter;
pub mod loader;
pub mod model;
