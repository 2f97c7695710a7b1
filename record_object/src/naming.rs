//! Table name resolution
//!
//! Every record type maps to a table named after the lower-cased, pluralized
//! simple type name. The derive macro calls the same function at expansion
//! time so generated names and runtime names never diverge.

/// Resolve the table name for a record type name.
///
/// Any module path prefix is dropped, the remainder is lower-cased and then
/// pluralized with English rules.
///
/// ```
/// use record_object::naming::table_name_for;
///
/// assert_eq!(table_name_for("Node"), "nodes");
/// assert_eq!(table_name_for("Category"), "categories");
/// assert_eq!(table_name_for("crate::models::Box"), "boxes");
/// ```
pub fn table_name_for(type_name: &str) -> String {
    let simple = type_name.rsplit("::").next().unwrap_or(type_name);
    let lowered = simple.to_lowercase();
    pluralizer::pluralize(&lowered, 2, false)
}
