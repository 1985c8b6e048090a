pub mod location;
pub mod route;
pub mod update;

pub use location::{InvalidLocationId, Location, LocationDocument, LocationId, NewLocation};
pub use route::{Coordinate, RoutedLocation};
pub use update::{provided, LocationChanges, UpdateInstruction, UpdateOutcome, ZeroIsUnset};
