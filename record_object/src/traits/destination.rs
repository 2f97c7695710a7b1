use super::record::Record;
use serde::de::DeserializeOwned;

/// Target of `Mapper::find`.
///
/// A single record decodes the first row of a result; a `Vec` of records
/// decodes every row. `#[derive(Record)]` implements this for the record
/// type itself.
pub trait Destination: DeserializeOwned {
    /// Whether all rows are decoded rather than the first one
    const MANY: bool = false;
}

impl<T: Record> Destination for Vec<T> {
    const MANY: bool = true;
}
