//! Negotiation classification of objects.

/// What the requester knows about one object on the answering side.
///
/// An object moves through `Unknown -> Asked -> {Have, Need}` and never
/// back; it is queried at most once per negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectStatus {
    /// Never mentioned in this negotiation.
    #[default]
    Unknown,
    /// A query was sent and its answer is pending.
    Asked,
    /// The answering side has the object (and, by closure, its ancestors).
    Have,
    /// The answering side lacks the object; it must be transferred.
    Need,
}

impl ObjectStatus {
    /// Returns true if the object may still be queried.
    pub fn can_ask(&self) -> bool {
        matches!(self, ObjectStatus::Unknown)
    }

    /// The status after an answer arrives.
    pub fn answered(present: bool) -> Self {
        if present {
            ObjectStatus::Have
        } else {
            ObjectStatus::Need
        }
    }
}
