//! Entity types that carry PII, and the fields each one encrypts.

use piiseal_crypto::PiiField;

/// An entity type persisted through a [`PiiService`](crate::PiiService).
pub trait PiiEntity: Send + Sync + 'static {
    /// Record-store collection holding this entity.
    const COLLECTION: &'static str;

    /// The entity's PII fields.
    type Field: PiiField;
}

/// A platform account.
pub struct User;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserField {
    Name,
}

impl PiiField for UserField {
    const ALL: &'static [Self] = &[Self::Name];

    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
        }
    }
}

impl PiiEntity for User {
    const COLLECTION: &'static str = "users";
    type Field = UserField;
}

/// Public profile of a conference speaker.
pub struct SpeakerProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakerProfileField {
    FullName,
    Phone,
    Company,
    JobTitle,
    Location,
}

impl PiiField for SpeakerProfileField {
    const ALL: &'static [Self] = &[
        Self::FullName,
        Self::Phone,
        Self::Company,
        Self::JobTitle,
        Self::Location,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::JobTitle => "jobTitle",
            Self::Location => "location",
        }
    }
}

impl PiiEntity for SpeakerProfile {
    const COLLECTION: &'static str = "speaker_profiles";
    type Field = SpeakerProfileField;
}

/// Profile of a talk reviewer.
pub struct ReviewerProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewerProfileField {
    Phone,
    Company,
    JobTitle,
}

impl PiiField for ReviewerProfileField {
    const ALL: &'static [Self] = &[Self::Phone, Self::Company, Self::JobTitle];

    fn name(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Company => "company",
            Self::JobTitle => "jobTitle",
        }
    }
}

impl PiiEntity for ReviewerProfile {
    const COLLECTION: &'static str = "reviewer_profiles";
    type Field = ReviewerProfileField;
}
