//! Relation loading
//!
//! Called from derive-generated code. Resolution goes exactly one hop: a
//! referenced entity is loaded without resolving its own references.

use tracing::warn;

use crate::connection::Connection;
use crate::database::Database;
use crate::entity::{Entity, PRIMARY_KEY};
use crate::error::Result;
use crate::filter::Filter;
use crate::value::SqlValue;

/// Replace the stub in `target` with the row its primary key points at.
///
/// A stub without a key is left untouched. Foreign keys are not enforced by
/// the database, so a key with no matching row keeps the stub and logs a
/// warning.
pub fn resolve_reference<P: Entity, C: Connection>(db: &Database<C>, target: &mut P) -> Result<()> {
    let Some(id) = target.identity() else {
        return Ok(());
    };

    match db.load::<P>(&[Filter::eq(PRIMARY_KEY, id)])?.into_iter().next() {
        Some(loaded) => *target = loaded,
        None => warn!(
            table = P::TABLE_NAME,
            id, "Dangling reference, keeping unresolved stub"
        ),
    }
    Ok(())
}

/// A referenced entity carrying only its primary key, as read from a
/// foreign-key column.
pub fn reference_stub<P: Entity>(value: SqlValue) -> Result<P> {
    let mut stub = P::default();
    if !value.is_null() {
        stub.set(PRIMARY_KEY, value)?;
    }
    Ok(stub)
}

/// Every `Ch` whose `column` equals `key`.
pub fn load_children<Ch: Entity, C: Connection>(
    db: &Database<C>,
    column: &str,
    key: SqlValue,
) -> Result<Vec<Ch>> {
    db.load::<Ch>(&[Filter::eq(column, key)])
}
