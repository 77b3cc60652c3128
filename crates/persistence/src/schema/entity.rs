//! Entities, their collections, relation tables and write rules.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::enums::{AppointmentStatus, BillStatus, OrderStatus, Role};
use super::relations::{Relation, RelationKind};
use crate::error::ValidationError;
use crate::types::Document;

/// A logical entity. Each one is a collection in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Login account.
    User,
    /// Patient profile.
    Patient,
    /// Doctor profile.
    Doctor,
    /// Appointment between a patient and a doctor.
    Appointment,
    /// Doctor availability window.
    Availability,
    /// Medical record entry.
    MedicalRecord,
    /// Prescription.
    Prescription,
    /// Lab test order.
    LabTest,
    /// Patient bill.
    Bill,
    /// Inventory item.
    Inventory,
    /// In-app notification.
    Notification,
}

use Entity::*;
use RelationKind::{BelongsTo, HasMany, HasOne};

const fn rel(name: &'static str, target: Entity, kind: RelationKind, foreign_key: &'static str) -> Relation {
    Relation {
        name,
        target,
        kind,
        foreign_key,
    }
}

const USER_RELATIONS: &[Relation] = &[
    rel("Patient", Patient, HasOne, "userId"),
    rel("Doctor", Doctor, HasOne, "userId"),
    rel("notifications", Notification, HasMany, "userId"),
];

const PATIENT_RELATIONS: &[Relation] = &[
    rel("user", User, BelongsTo, "userId"),
    rel("appointments", Appointment, HasMany, "patientId"),
    rel("medicalRecords", MedicalRecord, HasMany, "patientId"),
    rel("prescriptions", Prescription, HasMany, "patientId"),
    rel("labTests", LabTest, HasMany, "patientId"),
    rel("bills", Bill, HasMany, "patientId"),
];

const DOCTOR_RELATIONS: &[Relation] = &[
    rel("user", User, BelongsTo, "userId"),
    rel("appointments", Appointment, HasMany, "doctorId"),
    rel("availability", Availability, HasMany, "doctorId"),
    rel("medicalRecords", MedicalRecord, HasMany, "doctorId"),
    rel("prescriptions", Prescription, HasMany, "doctorId"),
    rel("labTests", LabTest, HasMany, "doctorId"),
];

const CLINICAL_RELATIONS: &[Relation] = &[
    rel("patient", Patient, BelongsTo, "patientId"),
    rel("doctor", Doctor, BelongsTo, "doctorId"),
];

const AVAILABILITY_RELATIONS: &[Relation] = &[rel("doctor", Doctor, BelongsTo, "doctorId")];

const BILL_RELATIONS: &[Relation] = &[rel("patient", Patient, BelongsTo, "patientId")];

const NOTIFICATION_RELATIONS: &[Relation] = &[rel("user", User, BelongsTo, "userId")];

impl Entity {
    /// Every entity.
    pub const ALL: [Entity; 11] = [
        User,
        Patient,
        Doctor,
        Appointment,
        Availability,
        MedicalRecord,
        Prescription,
        LabTest,
        Bill,
        Inventory,
        Notification,
    ];

    /// Model name, which is also the collection name.
    pub fn name(&self) -> &'static str {
        match self {
            User => "User",
            Patient => "Patient",
            Doctor => "Doctor",
            Appointment => "Appointment",
            Availability => "Availability",
            MedicalRecord => "MedicalRecord",
            Prescription => "Prescription",
            LabTest => "LabTest",
            Bill => "Bill",
            Inventory => "Inventory",
            Notification => "Notification",
        }
    }

    /// The collection backing this entity.
    pub fn collection(&self) -> &'static str {
        self.name()
    }

    /// The relation table of this entity.
    pub fn relations(&self) -> &'static [Relation] {
        match self {
            User => USER_RELATIONS,
            Patient => PATIENT_RELATIONS,
            Doctor => DOCTOR_RELATIONS,
            Appointment | MedicalRecord | Prescription | LabTest => CLINICAL_RELATIONS,
            Availability => AVAILABILITY_RELATIONS,
            Bill => BILL_RELATIONS,
            Notification => NOTIFICATION_RELATIONS,
            Inventory => &[],
        }
    }

    /// Foreign-key fields held by this entity's own documents.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &'static str> {
        self.relations()
            .iter()
            .filter(|r| r.kind.is_forward())
            .map(|r| r.foreign_key)
    }

    /// Looks up a declared relation by name.
    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations().iter().find(|r| r.name == name)
    }

    /// Looks up a declared relation, failing with a validation error.
    pub fn require_relation(&self, name: &str) -> Result<&'static Relation, ValidationError> {
        self.relation(name).ok_or_else(|| ValidationError::UnknownRelation {
            entity: self.name().to_string(),
            relation: name.to_string(),
        })
    }

    /// Fields carrying a unique index. Absent values are not indexed.
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            User => &["email"],
            Patient | Doctor => &["userId"],
            _ => &[],
        }
    }

    /// Fills in create-time defaults for fields the caller left out.
    pub fn apply_defaults(&self, doc: &mut Document) {
        let defaults: Vec<(&str, Value)> = match self {
            User => vec![("role", Value::from(Role::Patient.as_str()))],
            Appointment => vec![("status", Value::from(AppointmentStatus::Pending.as_str()))],
            Availability => vec![("isAvailable", Value::Bool(true))],
            Bill => vec![("status", Value::from(BillStatus::Pending.as_str()))],
            Prescription | LabTest => vec![("status", Value::from(OrderStatus::Pending.as_str()))],
            Notification => vec![("read", Value::Bool(false))],
            Patient | Doctor | MedicalRecord | Inventory => Vec::new(),
        };
        for (field, default) in defaults {
            if !doc.contains_key(field) {
                doc.insert(field.to_string(), default);
            }
        }
    }

    /// Returns `true` if `field` holds an enumerated value on this entity.
    pub fn has_enum_domain(&self, field: &str) -> bool {
        matches!(
            (*self, field),
            (User, "role")
                | (Appointment | Bill | Prescription | LabTest, "status")
        )
    }

    /// Checks one field value against the entity's enumerated domains.
    ///
    /// Fields without a declared domain always pass.
    pub fn validate_field(&self, field: &str, value: &Value) -> Result<(), ValidationError> {
        if !self.has_enum_domain(field) {
            return Ok(());
        }
        let accepted = value.as_str().is_some_and(|s| match *self {
            User => Role::is_stored_spelling(s),
            Appointment => AppointmentStatus::from_stored(s).is_some(),
            Bill => BillStatus::from_stored(s).is_some(),
            _ => OrderStatus::from_stored(s).is_some(),
        });
        if accepted {
            return Ok(());
        }
        Err(ValidationError::InvalidEnumValue {
            entity: self.name().to_string(),
            field: field.to_string(),
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
    }

    /// Checks every field of a document against the enumerated domains.
    pub fn validate_document(&self, doc: &Document) -> Result<(), ValidationError> {
        doc.iter()
            .try_for_each(|(field, value)| self.validate_field(field, value))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Entity {
    type Err = ValidationError;

    /// Accepts model names in any case, with or without `_`/`-` separators
    /// (`LabTest`, `labTest`, `lab_test`, `lab-test`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Entity::ALL
            .into_iter()
            .find(|entity| entity.name().to_ascii_lowercase() == folded)
            .ok_or_else(|| ValidationError::UnknownEntity {
                name: s.to_string(),
            })
    }
}
