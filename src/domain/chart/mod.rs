//! Chart aggregate: domain calculation, coordinate mapping, zoom and layout.

pub mod coordinates;
pub mod entities;
pub mod layout;
pub mod price_domain;
pub mod value_objects;
pub mod viewport;

pub use coordinates::*;
pub use entities::*;
pub use layout::*;
pub use price_domain::*;
pub use value_objects::*;
pub use viewport::*;
