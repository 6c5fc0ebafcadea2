pub mod account;
pub mod amount;
pub mod booking;
pub mod error;
pub mod slot;
pub mod venue;

pub use account::Address;
pub use amount::Amount;
pub use booking::{Booking, BookingDuration, BookingId, BookingRequest, MAX_BOOKING_HOURS};
pub use error::ValidationError;
pub use slot::TimeSlot;
pub use venue::{NewVenue, Venue, VenueId};
