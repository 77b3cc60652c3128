//! Relation declarations.

use super::Entity;

/// How a relation is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Forward: this entity holds the foreign key (`appointment.doctorId`).
    /// Resolved by a point lookup on the target's identifier.
    BelongsTo,
    /// Reverse, at most one: the target holds a foreign key pointing here
    /// (`doctor.userId` seen from the user).
    HasOne,
    /// Reverse, any number: the target holds a foreign key pointing here
    /// (`appointment.patientId` seen from the patient).
    HasMany,
}

impl RelationKind {
    /// Returns `true` if the root document holds the foreign key.
    pub fn is_forward(&self) -> bool {
        matches!(self, RelationKind::BelongsTo)
    }

    /// Returns `true` if the relation resolves to an array.
    pub fn is_to_many(&self) -> bool {
        matches!(self, RelationKind::HasMany)
    }
}

/// One entry of an entity's relation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Name the related value is attached under.
    pub name: &'static str,
    /// The related entity.
    pub target: Entity,
    /// Lookup direction and cardinality.
    pub kind: RelationKind,
    /// The foreign-key field (on the root for `BelongsTo`, on the target otherwise).
    pub foreign_key: &'static str,
}
