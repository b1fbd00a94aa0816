/// Identifier for a segment in a [`crate::skeleton::Skeleton`].
///
/// This is an index into `Skeleton::segments`, and is only meaningful
/// within the lifetime of a given `Skeleton` instance.
pub type SegmentId = usize;

/// Stable string key of a person in a [`crate::genealogy::Genealogy`].
pub type PersonId = String;
