//! Reassembly of one-to-many LEFT JOIN results.
//!
//! A LEFT JOIN returns one flat row per (parent, child) pair, or a single
//! row with null child columns when the parent has no children. The
//! functions here fold such rows back into one root per parent key, in the
//! order the parent keys first appear, with children in row order.

use std::collections::HashMap;
use std::hash::Hash;

/// A root object that owns a child collection
pub trait HasChildren {
    type Child;

    fn children_mut(&mut self) -> &mut Vec<Self::Child>;
}

/// One decoded row of a parent/child LEFT JOIN
pub trait FlatRow {
    type Key: Eq + Hash + Clone;
    type Root: HasChildren;

    /// Parent primary key
    fn key(&self) -> Self::Key;

    /// Parent projection with an empty child collection
    fn to_root(&self) -> Self::Root;

    /// Child projection; `None` when the joined child columns are null
    fn into_child(self) -> Option<<Self::Root as HasChildren>::Child>;
}

/// Group rows by parent key, first-seen order
pub fn aggregate<R, I>(rows: I) -> Vec<R::Root>
where
    R: FlatRow,
    I: IntoIterator<Item = R>,
{
    let mut index: HashMap<R::Key, usize> = HashMap::new();
    let mut roots: Vec<R::Root> = Vec::new();

    for row in rows {
        let key = row.key();
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                roots.push(row.to_root());
                index.insert(key, roots.len() - 1);
                roots.len() - 1
            }
        };

        if let Some(child) = row.into_child() {
            roots[slot].children_mut().push(child);
        }
    }

    roots
}

/// Like [`aggregate`] over rows that may have failed to decode.
/// The first error aborts the whole aggregation.
pub fn try_aggregate<R, E, I>(rows: I) -> Result<Vec<R::Root>, E>
where
    R: FlatRow,
    I: IntoIterator<Item = Result<R, E>>,
{
    let decoded = rows.into_iter().collect::<Result<Vec<R>, E>>()?;
    Ok(aggregate(decoded))
}

/// Single-root variant; `None` when there are no rows
pub fn aggregate_one<R, I>(rows: I) -> Option<R::Root>
where
    R: FlatRow,
    I: IntoIterator<Item = R>,
{
    aggregate(rows).into_iter().next()
}

pub fn try_aggregate_one<R, E, I>(rows: I) -> Result<Option<R::Root>, E>
where
    R: FlatRow,
    I: IntoIterator<Item = Result<R, E>>,
{
    Ok(try_aggregate(rows)?.into_iter().next())
}
