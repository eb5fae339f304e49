use std::borrow::Cow;

/// Any value in this range is a valid magnitude of a measurement.
///
/// We use integers because they are the fastest data type - floating point math is too slow
/// for recording that happens on every call and container transition.
///
/// If you are measuring fractional data, scale it up to be representable as integers.
/// For example, instead of counting seconds, count milliseconds.
pub type Magnitude = i64;

/// The name of an instrument, used for display and keying purposes.
///
/// The fixed call lifecycle instruments have `&'static str` names but instruments built
/// from startup configuration (docker stats, container states) need owned strings,
/// so we support both via `Cow`.
pub type InstrumentName = Cow<'static, str>;
